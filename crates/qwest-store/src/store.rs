//! The session store: save, load, export, import.
//!
//! Sits between live sessions and a [`DurableStore`] backend. Every blob
//! that comes back in goes through the same gauntlet: schema version
//! gate, structural checks, score replay, and (for imports) a content
//! filter pass over embedded free text.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use uuid::Uuid;

use qwest_core::error::SessionError;
use qwest_core::history::{AnswerVerdict, EventPayload};
use qwest_core::model::{BankRef, QuestionBank};
use qwest_core::profanity::ProfanityFilter;
use qwest_core::session::{GameSession, SessionParts, SessionState};
use qwest_core::traits::DurableStore;

use crate::snapshot::SessionSnapshot;

/// Registry of question banks available for resolution, keyed by pinned
/// reference. Sessions resolve against it on load and import.
#[derive(Debug, Default, Clone)]
pub struct BankRegistry {
    banks: HashMap<BankRef, QuestionBank>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bank under its pinned reference, replacing any bank
    /// previously registered under the same id and version.
    pub fn register(&mut self, bank: QuestionBank) {
        self.banks.insert(bank.bank_ref(), bank);
    }

    /// Resolve a pinned reference to its bank.
    pub fn resolve(&self, bank_ref: &BankRef) -> Result<&QuestionBank, SessionError> {
        self.banks
            .get(bank_ref)
            .ok_or_else(|| SessionError::BankNotFound(bank_ref.to_string()))
    }

    /// All registered references, unordered.
    pub fn refs(&self) -> Vec<BankRef> {
        self.banks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

/// A cheap listing row decoded from a stored snapshot.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub profile: String,
    pub bank_ref: BankRef,
    pub state: SessionState,
    pub score: u32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&SessionSnapshot> for SessionSummary {
    fn from(s: &SessionSnapshot) -> Self {
        SessionSummary {
            id: s.session_id,
            profile: s.profile.clone(),
            bank_ref: s.bank_ref.clone(),
            state: s.state,
            score: s.score,
            updated_at: s.updated_at,
        }
    }
}

fn session_key(id: Uuid) -> String {
    format!("sessions/{id}")
}

/// Snapshot persistence over an abstract backend.
pub struct SessionStore {
    backend: Arc<dyn DurableStore>,
    banks: BankRegistry,
    filter: ProfanityFilter,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn DurableStore>, banks: BankRegistry, filter: ProfanityFilter) -> Self {
        Self {
            backend,
            banks,
            filter,
        }
    }

    pub fn banks(&self) -> &BankRegistry {
        &self.banks
    }

    /// Persist a snapshot of a live session, replacing any previous one.
    pub async fn save(&self, session: &GameSession) -> Result<(), SessionError> {
        let snapshot = SessionSnapshot::from_session(session);
        let bytes = snapshot.encode()?;
        self.backend.put(&session_key(session.id()), &bytes).await?;
        tracing::debug!(session = %session.id(), bytes = bytes.len(), "session saved");
        Ok(())
    }

    /// Load and validate a stored session.
    pub async fn load(&self, id: Uuid) -> Result<GameSession, SessionError> {
        let bytes = self
            .backend
            .get(&session_key(id))
            .await?
            .ok_or(SessionError::SessionNotFound(id))?;
        let snapshot = SessionSnapshot::decode(&bytes)?;
        self.restore(snapshot, false)
    }

    /// Remove a stored session. Removing an absent one is not an error.
    pub async fn delete(&self, id: Uuid) -> Result<(), SessionError> {
        self.backend.delete(&session_key(id)).await?;
        Ok(())
    }

    /// Whether a snapshot exists for this id.
    pub async fn contains(&self, id: Uuid) -> Result<bool, SessionError> {
        Ok(self.backend.get(&session_key(id)).await?.is_some())
    }

    /// Summaries of every stored session. Corrupt blobs are skipped with
    /// a warning rather than failing the whole listing.
    pub async fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let mut summaries = Vec::new();
        for key in self.backend.list_keys("sessions/").await? {
            let Some(bytes) = self.backend.get(&key).await? else {
                continue;
            };
            match SessionSnapshot::decode(&bytes) {
                Ok(snapshot) => summaries.push(SessionSummary::from(&snapshot)),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping unreadable snapshot");
                }
            }
        }
        summaries.sort_by_key(|s| std::cmp::Reverse(s.updated_at));
        Ok(summaries)
    }

    /// Export a live session as a self-describing JSON blob.
    pub fn export_session(&self, session: &GameSession) -> Result<Vec<u8>, SessionError> {
        SessionSnapshot::from_session(session).encode_pretty()
    }

    /// Export a stored session, validating it on the way out so a blob
    /// that would not import again is never handed to the user.
    pub async fn export(&self, id: Uuid) -> Result<Vec<u8>, SessionError> {
        let session = self.load(id).await?;
        self.export_session(&session)
    }

    /// Export a stored session into a writer.
    pub async fn export_to(&self, id: Uuid, mut writer: impl Write) -> Result<(), SessionError> {
        let blob = self.export(id).await?;
        writer
            .write_all(&blob)
            .map_err(qwest_core::error::StorageError::from)?;
        Ok(())
    }

    /// Validate an exported blob and restore it as a live session.
    ///
    /// The caller decides whether and under which identity to persist
    /// it; see the session manager's import command.
    pub fn import(&self, bytes: &[u8]) -> Result<GameSession, SessionError> {
        let snapshot = SessionSnapshot::decode(bytes)?;
        self.restore(snapshot, true)
    }

    fn restore(&self, snapshot: SessionSnapshot, imported: bool) -> Result<GameSession, SessionError> {
        let bank = self.banks.resolve(&snapshot.bank_ref)?.clone();

        if imported {
            self.screen_history(&snapshot)?;
        }

        // v1 snapshots predate seeded ordering; they played the bank in
        // authored order.
        let order = if snapshot.order.is_empty() {
            bank.question_ids()
        } else {
            snapshot.order
        };

        GameSession::restore(SessionParts {
            id: snapshot.session_id,
            profile: snapshot.profile,
            bank,
            seed: snapshot.seed,
            order,
            state: snapshot.state,
            score: snapshot.score,
            question_pointer: snapshot.question_pointer,
            history: snapshot.history,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }

    /// Re-run the content filter over free text embedded in an imported
    /// history. Entries already recorded as rejected keep their original
    /// text; anything else that now fails the filter refuses the import.
    fn screen_history(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        for entry in &snapshot.history {
            let EventPayload::Answered { value, verdict, .. } = &entry.payload else {
                continue;
            };
            if matches!(verdict, AnswerVerdict::Rejected { .. }) {
                continue;
            }
            if let Some(text) = value.free_text() {
                if let qwest_core::profanity::Classification::Rejected { reason } =
                    self.filter.classify(text)
                {
                    return Err(SessionError::ContentRejected {
                        reason: format!("imported history entry {}: {reason}", entry.seq),
                    });
                }
            }
        }
        Ok(())
    }
}
