//! Append-only session history.
//!
//! The history log is the source of truth for a session: the score is a
//! derived cache that must always be recomputable by replaying the log
//! against the pinned question bank. Entries are never mutated or
//! removed; corrections are expressed as new entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnswerValue, QuestionBank};
use crate::scoring;

/// The kind of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Started,
    Answered,
    Paused,
    Resumed,
    Completed,
    Imported,
    Corrected,
}

/// The scoring verdict recorded with an `Answered` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum AnswerVerdict {
    Correct,
    Incorrect,
    /// The submission was rejected by the content filter and never
    /// reached the scoring engine.
    Rejected { reason: String },
}

impl AnswerVerdict {
    pub fn is_rejected(&self) -> bool {
        matches!(self, AnswerVerdict::Rejected { .. })
    }
}

/// The payload of a history entry, tagged by event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventPayload {
    Started {
        /// First question selected by the seeded order.
        first_question: String,
    },
    Answered {
        question_id: String,
        value: AnswerValue,
        verdict: AnswerVerdict,
        /// Score awarded. Zero for incorrect and rejected answers.
        delta: u32,
    },
    Paused,
    Resumed,
    Completed {
        final_score: u32,
        /// True when termination was forced (e.g. time-limit expiry)
        /// rather than reached by answering the last question.
        forced: bool,
    },
    Imported {
        /// Session id the snapshot carried before it was adopted under
        /// a fresh identity.
        original_id: Uuid,
        /// Schema version of the imported blob.
        source_version: u32,
    },
    Corrected {
        /// Sequence number of the entry being corrected.
        refers_to: u64,
        note: String,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Started { .. } => EventKind::Started,
            EventPayload::Answered { .. } => EventKind::Answered,
            EventPayload::Paused => EventKind::Paused,
            EventPayload::Resumed => EventKind::Resumed,
            EventPayload::Completed { .. } => EventKind::Completed,
            EventPayload::Imported { .. } => EventKind::Imported,
            EventPayload::Corrected { .. } => EventKind::Corrected,
        }
    }
}

/// One immutable, sequenced record of something that happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Strictly increasing, gap-free sequence number starting at 1.
    pub seq: u64,
    pub kind: EventKind,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub ts: DateTime<Utc>,
}

/// Append-only ordered record of session events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from persisted entries, verifying that sequence
    /// numbers are contiguous starting at 1. Returns the first offending
    /// sequence number on failure.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Result<Self, u64> {
        for (i, entry) in entries.iter().enumerate() {
            let expected = i as u64 + 1;
            if entry.seq != expected {
                return Err(entry.seq);
            }
        }
        Ok(Self { entries })
    }

    /// Append a new entry, assigning the next sequence number.
    pub fn append(&mut self, payload: EventPayload, ts: DateTime<Utc>) -> &HistoryEntry {
        let entry = HistoryEntry {
            seq: self.entries.len() as u64 + 1,
            kind: payload.kind(),
            payload,
            ts,
        };
        self.entries.push(entry);
        self.entries.last().expect("just pushed")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence number of the last entry, or 0 for an empty log.
    pub fn last_seq(&self) -> u64 {
        self.entries.last().map(|e| e.seq).unwrap_or(0)
    }

    /// All entries in order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Forward-only iterator over entries with `seq` strictly greater
    /// than the given value. Restartable by calling again with a
    /// different `seq`.
    pub fn entries_since(&self, seq: u64) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.seq > seq)
    }

    /// Fold all entries through a state-transition function.
    pub fn replay<S>(&self, initial: S, mut apply: impl FnMut(S, &HistoryEntry) -> S) -> S {
        self.entries.iter().fold(initial, |state, e| apply(state, e))
    }

    /// Sum of the recorded score deltas of non-rejected answers.
    pub fn summed_deltas(&self) -> u32 {
        self.replay(0u32, |acc, e| match &e.payload {
            EventPayload::Answered { delta, verdict, .. } if !verdict.is_rejected() => {
                acc + delta
            }
            _ => acc,
        })
    }

    /// Recompute the final score by re-applying every answered entry
    /// through the scoring engine against the pinned bank.
    ///
    /// Returns an error naming the offending sequence number when an
    /// entry references an unknown question or its recorded verdict or
    /// delta disagrees with the scoring engine.
    pub fn replay_score(&self, bank: &QuestionBank) -> Result<u32, String> {
        let mut score = 0u32;
        for entry in &self.entries {
            let EventPayload::Answered {
                question_id,
                value,
                verdict,
                delta,
            } = &entry.payload
            else {
                continue;
            };

            if verdict.is_rejected() {
                if *delta != 0 {
                    return Err(format!("entry {} records a rejected answer with a nonzero delta", entry.seq));
                }
                continue;
            }

            let question = bank.question(question_id).ok_or_else(|| {
                format!("entry {} references unknown question '{question_id}'", entry.seq)
            })?;

            let rescored = scoring::score(question, value);
            let recorded_correct = matches!(verdict, AnswerVerdict::Correct);
            if rescored.correct != recorded_correct || rescored.delta != *delta {
                return Err(format!(
                    "entry {} disagrees with the scoring engine (recorded delta {delta}, replayed {})",
                    entry.seq, rescored.delta
                ));
            }
            score += rescored.delta;
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AcceptedAnswer, Difficulty, Prompt, Question};

    fn bank() -> QuestionBank {
        QuestionBank {
            id: "b".into(),
            name: "B".into(),
            description: String::new(),
            version: "1".into(),
            questions: vec![Question {
                id: "q1".into(),
                prompt: Prompt::Text { text: "?".into() },
                accepted: AcceptedAnswer::Text {
                    alternatives: vec!["cat".into()],
                },
                category: None,
                difficulty: Difficulty::Easy,
                points: 10,
            }],
        }
    }

    fn answered(question_id: &str, text: &str, verdict: AnswerVerdict, delta: u32) -> EventPayload {
        EventPayload::Answered {
            question_id: question_id.into(),
            value: AnswerValue::Text { text: text.into() },
            verdict,
            delta,
        }
    }

    #[test]
    fn append_assigns_contiguous_seqs() {
        let mut log = HistoryLog::new();
        assert_eq!(log.last_seq(), 0);

        log.append(
            EventPayload::Started {
                first_question: "q1".into(),
            },
            Utc::now(),
        );
        log.append(EventPayload::Paused, Utc::now());
        log.append(EventPayload::Resumed, Utc::now());

        let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(log.last_seq(), 3);
    }

    #[test]
    fn kind_mirrors_payload() {
        let mut log = HistoryLog::new();
        let entry = log.append(EventPayload::Paused, Utc::now());
        assert_eq!(entry.kind, EventKind::Paused);
    }

    #[test]
    fn entries_since_is_restartable() {
        let mut log = HistoryLog::new();
        for _ in 0..5 {
            log.append(EventPayload::Paused, Utc::now());
        }
        assert_eq!(log.entries_since(3).count(), 2);
        assert_eq!(log.entries_since(0).count(), 5);
        assert_eq!(log.entries_since(5).count(), 0);
    }

    #[test]
    fn from_entries_rejects_gaps() {
        let mut log = HistoryLog::new();
        log.append(EventPayload::Paused, Utc::now());
        log.append(EventPayload::Resumed, Utc::now());

        let mut entries = log.entries().to_vec();
        entries.remove(0);
        assert_eq!(HistoryLog::from_entries(entries).unwrap_err(), 2);

        let good = HistoryLog::from_entries(log.entries().to_vec()).unwrap();
        assert_eq!(good.len(), 2);
    }

    #[test]
    fn replay_score_matches_summed_deltas() {
        let bank = bank();
        let mut log = HistoryLog::new();
        log.append(answered("q1", "cat", AnswerVerdict::Correct, 10), Utc::now());
        log.append(answered("q1", "fox", AnswerVerdict::Incorrect, 0), Utc::now());

        assert_eq!(log.summed_deltas(), 10);
        assert_eq!(log.replay_score(&bank).unwrap(), 10);
    }

    #[test]
    fn replay_score_ignores_rejected_entries() {
        let bank = bank();
        let mut log = HistoryLog::new();
        log.append(
            answered(
                "q1",
                "some blocked word",
                AnswerVerdict::Rejected {
                    reason: "matched blocked term".into(),
                },
                0,
            ),
            Utc::now(),
        );
        assert_eq!(log.replay_score(&bank).unwrap(), 0);
    }

    #[test]
    fn replay_score_detects_tampered_delta() {
        let bank = bank();
        let mut log = HistoryLog::new();
        // Claims 50 points for an answer the engine scores at 10.
        log.append(answered("q1", "cat", AnswerVerdict::Correct, 50), Utc::now());
        let err = log.replay_score(&bank).unwrap_err();
        assert!(err.contains("entry 1"));
    }

    #[test]
    fn replay_score_detects_unknown_question() {
        let bank = bank();
        let mut log = HistoryLog::new();
        log.append(answered("ghost", "cat", AnswerVerdict::Correct, 10), Utc::now());
        assert!(log.replay_score(&bank).is_err());
    }

    #[test]
    fn entry_serde_roundtrip() {
        let mut log = HistoryLog::new();
        log.append(
            answered("q1", "cat", AnswerVerdict::Correct, 10),
            Utc::now(),
        );
        let json = serde_json::to_string(log.entries()).unwrap();
        let back: Vec<HistoryEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log.entries());

        // The payload is flattened into the entry object.
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["event"], "answered");
        assert_eq!(value[0]["question_id"], "q1");
    }
}
