//! The game session state machine.
//!
//! A session owns question sequencing, delegates validation and scoring
//! to the pure filter and scoring functions, appends to its history log,
//! and exposes the pause/resume/complete transitions. Every command is
//! all-or-nothing: it either succeeds with all its effects applied or
//! fails leaving score, pointer, state, and history untouched.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::event::SessionEvent;
use crate::history::{AnswerVerdict, EventPayload, HistoryEntry, HistoryLog};
use crate::model::{BankRef, Question, QuestionBank, Submission};
use crate::profanity::{Classification, ProfanityFilter};
use crate::scoring;

/// Session lifecycle states.
///
/// `created → in_progress ⇄ paused → completed`, with `failed` reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    InProgress,
    Paused,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "created",
            SessionState::InProgress => "in_progress",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Simple LCG used for the seeded question shuffle.
///
/// Kept self-contained so the question order for a given seed never
/// changes underneath saved sessions when dependencies move.
#[derive(Debug, Clone)]
struct SessionRng {
    state: u64,
}

impl SessionRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // Knuth MMIX constants.
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_range(&mut self, max: u64) -> u64 {
        self.next_u64() % max
    }

    /// Fisher-Yates shuffle.
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range(i as u64 + 1) as usize;
            slice.swap(i, j);
        }
    }
}

/// The result of an accepted `submit_answer` command.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The recorded verdict.
    pub verdict: AnswerVerdict,
    /// Score awarded by this submission.
    pub delta: u32,
    /// Session score after the submission.
    pub score: u32,
    /// The question now pointed at, or `None` when the session completed.
    pub current_question: Option<String>,
    /// Events for the rendering layer.
    pub events: Vec<SessionEvent>,
}

/// Everything needed to rebuild a session from a validated snapshot.
///
/// Constructed by the session store; `GameSession::restore` re-checks the
/// invariants so a tampered snapshot can never become a live session.
#[derive(Debug)]
pub struct SessionParts {
    pub id: Uuid,
    pub profile: String,
    pub bank: QuestionBank,
    pub seed: u64,
    pub order: Vec<String>,
    pub state: SessionState,
    pub score: u32,
    pub question_pointer: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One play-through instance for a profile.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: Uuid,
    profile: String,
    /// The bank snapshot pinned at creation time. Never re-resolved.
    bank: QuestionBank,
    bank_ref: BankRef,
    seed: u64,
    /// Question ids in play order, a seeded permutation of the bank.
    order: Vec<String>,
    /// Index into `order`; equals `order.len()` when exhausted.
    cursor: usize,
    state: SessionState,
    score: u32,
    history: HistoryLog,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GameSession {
    /// Create a new session for `profile`, pinning `bank` and deriving
    /// the question order from `seed`.
    pub fn new(
        profile: impl Into<String>,
        bank: QuestionBank,
        seed: u64,
    ) -> Result<Self, SessionError> {
        if bank.is_empty() {
            return Err(SessionError::Validation(format!(
                "question bank '{}' has no questions",
                bank.id
            )));
        }

        let mut order = bank.question_ids();
        SessionRng::new(seed).shuffle(&mut order);

        let now = Utc::now();
        let bank_ref = bank.bank_ref();
        Ok(Self {
            id: Uuid::new_v4(),
            profile: profile.into(),
            bank,
            bank_ref,
            seed,
            order,
            cursor: 0,
            state: SessionState::Created,
            score: 0,
            history: HistoryLog::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn bank_ref(&self) -> &BankRef {
        &self.bank_ref
    }

    /// Question ids in play order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Id of the question currently pointed at. `None` before `start`
    /// and in terminal states.
    pub fn current_question_id(&self) -> Option<&str> {
        match self.state {
            SessionState::InProgress | SessionState::Paused => {
                self.order.get(self.cursor).map(String::as_str)
            }
            _ => None,
        }
    }

    /// The question currently pointed at.
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question_id()
            .and_then(|id| self.bank.question(id))
    }

    /// Questions answered correctly so far.
    pub fn answered_count(&self) -> usize {
        self.cursor
    }

    /// Total number of questions in this session.
    pub fn question_count(&self) -> usize {
        self.order.len()
    }

    /// Begin play: `created → in_progress`, selecting the first question.
    pub fn start(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if self.state != SessionState::Created {
            return Err(self.invalid_state("start"));
        }

        let first = self.order[0].clone();
        self.state = SessionState::InProgress;
        self.history.append(
            EventPayload::Started {
                first_question: first.clone(),
            },
            Utc::now(),
        );
        self.touch();

        tracing::debug!(session = %self.id, question = %first, "session started");
        Ok(vec![SessionEvent::QuestionChanged {
            session_id: self.id,
            question_id: first,
        }])
    }

    /// Submit an answer for the current question.
    ///
    /// Free text goes through the content filter first; a rejected
    /// submission is recorded with verdict `rejected`, awards nothing,
    /// and leaves the pointer in place so the player can resubmit. An
    /// accepted submission is scored; a correct answer advances the
    /// pointer and completes the session when no questions remain.
    pub fn submit_answer(
        &mut self,
        submission: &Submission,
        filter: &ProfanityFilter,
    ) -> Result<SubmitOutcome, SessionError> {
        if self.state != SessionState::InProgress {
            return Err(self.invalid_state("submit_answer"));
        }

        let current_id = self.order[self.cursor].clone();
        if submission.question_id != current_id {
            return Err(SessionError::Validation(format!(
                "submission targets question '{}' but the current question is '{current_id}'",
                submission.question_id
            )));
        }

        let Some(question) = self.bank.question(&current_id) else {
            // The order is validated against the bank at construction, so
            // this indicates in-memory corruption.
            return Err(SessionError::CorruptSnapshot(format!(
                "question '{current_id}' missing from pinned bank"
            )));
        };

        if submission.value.kind() != question.accepted.kind() {
            return Err(SessionError::Validation(format!(
                "question '{current_id}' expects a {} answer, got {}",
                question.accepted.kind(),
                submission.value.kind()
            )));
        }

        // Content filter gate for free text.
        if let Some(text) = submission.value.free_text() {
            if let Classification::Rejected { reason } = filter.classify(text) {
                let verdict = AnswerVerdict::Rejected {
                    reason: reason.clone(),
                };
                self.history.append(
                    EventPayload::Answered {
                        question_id: current_id.clone(),
                        value: submission.value.clone(),
                        verdict: verdict.clone(),
                        delta: 0,
                    },
                    submission.submitted_at,
                );
                self.touch();

                tracing::debug!(session = %self.id, question = %current_id, %reason, "submission rejected by content filter");
                return Ok(SubmitOutcome {
                    events: vec![SessionEvent::AnswerResult {
                        session_id: self.id,
                        question_id: current_id.clone(),
                        verdict: verdict.clone(),
                        delta: 0,
                    }],
                    verdict,
                    delta: 0,
                    score: self.score,
                    current_question: Some(current_id),
                });
            }
        }

        let result = scoring::score(question, &submission.value);
        let verdict = if result.correct {
            AnswerVerdict::Correct
        } else {
            AnswerVerdict::Incorrect
        };

        // Score update, history append, and pointer movement are one
        // conceptual transaction; nothing below can fail.
        self.history.append(
            EventPayload::Answered {
                question_id: current_id.clone(),
                value: submission.value.clone(),
                verdict: verdict.clone(),
                delta: result.delta,
            },
            submission.submitted_at,
        );
        self.score += result.delta;

        let mut events = vec![SessionEvent::AnswerResult {
            session_id: self.id,
            question_id: current_id.clone(),
            verdict: verdict.clone(),
            delta: result.delta,
        }];
        if result.delta > 0 {
            events.push(SessionEvent::ScoreChanged {
                session_id: self.id,
                score: self.score,
            });
        }

        let mut current_question = Some(current_id);
        if result.correct {
            self.cursor += 1;
            match self.order.get(self.cursor) {
                Some(next) => {
                    current_question = Some(next.clone());
                    events.push(SessionEvent::QuestionChanged {
                        session_id: self.id,
                        question_id: next.clone(),
                    });
                }
                None => {
                    self.state = SessionState::Completed;
                    current_question = None;
                    events.push(SessionEvent::SessionCompleted {
                        session_id: self.id,
                        final_score: self.score,
                    });
                    tracing::info!(session = %self.id, score = self.score, "session completed");
                }
            }
        }
        self.touch();

        Ok(SubmitOutcome {
            verdict,
            delta: result.delta,
            score: self.score,
            current_question,
            events,
        })
    }

    /// `in_progress → paused`. No scoring side effects.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::InProgress {
            return Err(self.invalid_state("pause"));
        }
        self.state = SessionState::Paused;
        self.history.append(EventPayload::Paused, Utc::now());
        self.touch();
        Ok(())
    }

    /// `paused → in_progress`. No scoring side effects.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Paused {
            return Err(self.invalid_state("resume"));
        }
        self.state = SessionState::InProgress;
        self.history.append(EventPayload::Resumed, Utc::now());
        self.touch();
        Ok(())
    }

    /// Force termination (e.g. time-limit expiry). Valid from
    /// `in_progress` or `paused`.
    pub fn complete(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if !matches!(
            self.state,
            SessionState::InProgress | SessionState::Paused
        ) {
            return Err(self.invalid_state("complete"));
        }
        self.state = SessionState::Completed;
        self.history.append(
            EventPayload::Completed {
                final_score: self.score,
                forced: true,
            },
            Utc::now(),
        );
        self.touch();

        tracing::info!(session = %self.id, score = self.score, "session force-completed");
        Ok(vec![SessionEvent::SessionCompleted {
            session_id: self.id,
            final_score: self.score,
        }])
    }

    /// Transition to the `failed` terminal state after an unrecoverable
    /// validation failure. Valid from any non-terminal state.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<Vec<SessionEvent>, SessionError> {
        if self.state.is_terminal() {
            return Err(self.invalid_state("fail"));
        }
        let reason = reason.into();
        self.state = SessionState::Failed;
        self.touch();

        tracing::warn!(session = %self.id, %reason, "session failed");
        Ok(vec![SessionEvent::SessionFailed {
            session_id: self.id,
            reason,
        }])
    }

    /// Adopt a fresh identity after an import whose original id collided
    /// with an existing session, recording provenance in the history.
    pub fn adopt_identity(&mut self, new_id: Uuid, source_version: u32) {
        let original_id = self.id;
        self.id = new_id;
        self.history.append(
            EventPayload::Imported {
                original_id,
                source_version,
            },
            Utc::now(),
        );
        self.touch();
    }

    /// Rebuild a session from validated snapshot parts, re-checking every
    /// structural invariant. Used by the session store for load/import.
    pub fn restore(parts: SessionParts) -> Result<Self, SessionError> {
        let SessionParts {
            id,
            profile,
            bank,
            seed,
            order,
            state,
            score,
            question_pointer,
            history,
            created_at,
            updated_at,
        } = parts;

        if bank.is_empty() {
            return Err(SessionError::CorruptSnapshot(format!(
                "pinned bank '{}' has no questions",
                bank.id
            )));
        }

        // The order must be a permutation of the bank's question ids.
        let bank_ids: HashSet<&str> = bank.questions.iter().map(|q| q.id.as_str()).collect();
        let order_ids: HashSet<&str> = order.iter().map(String::as_str).collect();
        if order.len() != bank.len() || order_ids != bank_ids {
            return Err(SessionError::CorruptSnapshot(
                "question order is not a permutation of the pinned bank".into(),
            ));
        }

        let history = HistoryLog::from_entries(history).map_err(|seq| {
            SessionError::CorruptSnapshot(format!("history sequence broken at entry {seq}"))
        })?;

        let replayed = history
            .replay_score(&bank)
            .map_err(SessionError::CorruptSnapshot)?;
        if replayed != score {
            return Err(SessionError::CorruptSnapshot(format!(
                "stored score {score} does not match replayed score {replayed}"
            )));
        }

        let cursor = match (&state, &question_pointer) {
            (SessionState::Created, None) => 0,
            (SessionState::InProgress | SessionState::Paused, Some(pointer)) => order
                .iter()
                .position(|q| q == pointer)
                .ok_or_else(|| {
                    SessionError::CorruptSnapshot(format!(
                        "question pointer '{pointer}' not present in play order"
                    ))
                })?,
            (SessionState::Completed | SessionState::Failed, None) => order.len(),
            (state, pointer) => {
                return Err(SessionError::CorruptSnapshot(format!(
                    "question pointer {pointer:?} is inconsistent with state {state}"
                )));
            }
        };

        let bank_ref = bank.bank_ref();
        Ok(Self {
            id,
            profile,
            bank,
            bank_ref,
            seed,
            order,
            cursor,
            state,
            score,
            history,
            created_at,
            updated_at,
        })
    }

    fn invalid_state(&self, command: &'static str) -> SessionError {
        SessionError::InvalidState {
            command,
            state: self.state,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
