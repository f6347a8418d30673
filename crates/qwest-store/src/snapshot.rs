//! Versioned session snapshots.
//!
//! A snapshot is the durable and exportable form of a session. It pins
//! the bank by reference instead of embedding it, so the store resolves
//! the bank again on load and the restored session replays against
//! exactly the content it was created with.
//!
//! Decoding is version-gated: blobs newer than [`SCHEMA_VERSION`] are
//! refused, older ones are migrated forward one version at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qwest_core::error::SessionError;
use qwest_core::history::HistoryEntry;
use qwest_core::model::BankRef;
use qwest_core::session::{GameSession, SessionState};

/// Newest snapshot schema this build reads and writes.
pub const SCHEMA_VERSION: u32 = 2;

/// The current (v2) snapshot schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub schema_version: u32,
    pub session_id: Uuid,
    pub profile: String,
    pub bank_ref: BankRef,
    /// Seed the question order was derived from.
    pub seed: u64,
    /// Question ids in play order. Empty only in snapshots migrated from
    /// v1, which predates seeded ordering; the store then falls back to
    /// the bank's authored order.
    pub order: Vec<String>,
    pub state: SessionState,
    pub score: u32,
    pub question_pointer: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The v1 schema, kept for migration.
#[derive(Debug, Deserialize)]
struct SnapshotV1 {
    session_id: Uuid,
    profile: String,
    bank_ref: BankRef,
    state: SessionState,
    score: u32,
    question_pointer: Option<String>,
    history: Vec<HistoryEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SnapshotV1> for SessionSnapshot {
    fn from(v1: SnapshotV1) -> Self {
        SessionSnapshot {
            schema_version: SCHEMA_VERSION,
            session_id: v1.session_id,
            profile: v1.profile,
            bank_ref: v1.bank_ref,
            seed: 0,
            order: Vec::new(),
            state: v1.state,
            score: v1.score,
            question_pointer: v1.question_pointer,
            history: v1.history,
            created_at: v1.created_at,
            updated_at: v1.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    #[serde(default)]
    schema_version: u32,
}

impl SessionSnapshot {
    /// Capture a snapshot of a live session.
    pub fn from_session(session: &GameSession) -> Self {
        SessionSnapshot {
            schema_version: SCHEMA_VERSION,
            session_id: session.id(),
            profile: session.profile().to_string(),
            bank_ref: session.bank_ref().clone(),
            seed: session.seed(),
            order: session.order().to_vec(),
            state: session.state(),
            score: session.score(),
            question_pointer: session.current_question_id().map(String::from),
            history: session.history().entries().to_vec(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }

    /// Compact JSON for the durable store.
    pub fn encode(&self) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec(self)
            .map_err(|e| SessionError::CorruptSnapshot(format!("failed to encode snapshot: {e}")))
    }

    /// Human-readable JSON for export blobs. Same schema as [`encode`],
    /// so an exported blob imports like any stored snapshot.
    ///
    /// [`encode`]: SessionSnapshot::encode
    pub fn encode_pretty(&self) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| SessionError::CorruptSnapshot(format!("failed to encode snapshot: {e}")))
    }

    /// Decode a snapshot blob, gating on the schema version and
    /// migrating older schemas to the current one.
    pub fn decode(bytes: &[u8]) -> Result<Self, SessionError> {
        let probe: VersionProbe = serde_json::from_slice(bytes)
            .map_err(|e| SessionError::CorruptSnapshot(format!("not a snapshot: {e}")))?;

        match probe.schema_version {
            0 => Err(SessionError::CorruptSnapshot(
                "snapshot declares no schema version".into(),
            )),
            1 => {
                let v1: SnapshotV1 = serde_json::from_slice(bytes).map_err(|e| {
                    SessionError::CorruptSnapshot(format!("malformed v1 snapshot: {e}"))
                })?;
                tracing::debug!(session = %v1.session_id, "migrating v1 snapshot");
                Ok(v1.into())
            }
            2 => serde_json::from_slice(bytes).map_err(|e| {
                SessionError::CorruptSnapshot(format!("malformed v2 snapshot: {e}"))
            }),
            newer => Err(SessionError::UnsupportedVersion {
                found: newer,
                max: SCHEMA_VERSION,
            }),
        }
    }

    /// Schema version the blob declared before any migration.
    pub fn peek_version(bytes: &[u8]) -> Result<u32, SessionError> {
        let probe: VersionProbe = serde_json::from_slice(bytes)
            .map_err(|e| SessionError::CorruptSnapshot(format!("not a snapshot: {e}")))?;
        Ok(probe.schema_version)
    }
}
