//! qwest-manager: live session registry and command orchestration.
//!
//! The manager owns at most one live instance per session id and at most
//! one live non-terminal session per profile. Commands run to completion
//! synchronously; store I/O is the only suspension point, and while a
//! save or load is in flight for a session, commands against it are
//! rejected as busy rather than queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use qwest_core::error::{SessionError, StorageError};
use qwest_core::event::{dispatch, NoopObserver, SessionEvent, SessionObserver};
use qwest_core::model::{BankRef, Question, Submission};
use qwest_core::profanity::ProfanityFilter;
use qwest_core::session::{GameSession, SessionState, SubmitOutcome};
use qwest_store::snapshot::SessionSnapshot;
use qwest_store::store::{SessionStore, SessionSummary};

/// A read-only view of a live session, safe to hand to rendering code.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub id: Uuid,
    pub profile: String,
    pub bank_ref: BankRef,
    pub state: SessionState,
    pub score: u32,
    pub current_question: Option<Question>,
    pub answered: usize,
    pub total: usize,
    pub updated_at: DateTime<Utc>,
}

impl SessionView {
    fn of(session: &GameSession) -> Self {
        SessionView {
            id: session.id(),
            profile: session.profile().to_string(),
            bank_ref: session.bank_ref().clone(),
            state: session.state(),
            score: session.score(),
            current_question: session.current_question().cloned(),
            answered: session.answered_count(),
            total: session.question_count(),
            updated_at: session.updated_at(),
        }
    }
}

struct LiveSession {
    session: GameSession,
    /// Set while a store operation for this session is in flight.
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when dropped, so a cancelled store future never
/// leaves the session wedged.
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn engage(flag: &Arc<AtomicBool>, id: Uuid) -> Result<Self, SessionError> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(Self { flag: flag.clone() })
        } else {
            Err(SessionError::SessionBusy(id))
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Registry {
    live: HashMap<Uuid, LiveSession>,
    /// Profile name to the id of its live non-terminal session.
    by_profile: HashMap<String, Uuid>,
}

impl Registry {
    fn get(&self, id: Uuid) -> Result<&LiveSession, SessionError> {
        self.live.get(&id).ok_or(SessionError::SessionNotFound(id))
    }

    fn get_unlocked(&mut self, id: Uuid) -> Result<&mut GameSession, SessionError> {
        let live = self
            .live
            .get_mut(&id)
            .ok_or(SessionError::SessionNotFound(id))?;
        if live.busy.load(Ordering::SeqCst) {
            return Err(SessionError::SessionBusy(id));
        }
        Ok(&mut live.session)
    }

    fn claim_profile(&mut self, profile: &str, id: Uuid) -> Result<(), SessionError> {
        if let Some(owner) = self.by_profile.get(profile) {
            if *owner != id {
                return Err(SessionError::ProfileBusy(profile.to_string()));
            }
        }
        self.by_profile.insert(profile.to_string(), id);
        Ok(())
    }

    /// Drop the profile claim once a session reaches a terminal state.
    fn release_if_terminal(&mut self, id: Uuid) {
        let Some(live) = self.live.get(&id) else {
            return;
        };
        if live.session.state().is_terminal() {
            let profile = live.session.profile().to_string();
            if self.by_profile.get(&profile) == Some(&id) {
                self.by_profile.remove(&profile);
            }
        }
    }

    fn insert(&mut self, session: GameSession) -> Result<Uuid, SessionError> {
        let id = session.id();
        if self.live.contains_key(&id) {
            return Err(SessionError::SessionAlreadyLive(id));
        }
        if !session.state().is_terminal() {
            self.claim_profile(session.profile(), id)?;
        }
        self.live.insert(
            id,
            LiveSession {
                session,
                busy: Arc::new(AtomicBool::new(false)),
            },
        );
        Ok(id)
    }

    fn remove(&mut self, id: Uuid) -> Option<GameSession> {
        let live = self.live.remove(&id)?;
        let profile = live.session.profile().to_string();
        if self.by_profile.get(&profile) == Some(&id) {
            self.by_profile.remove(&profile);
        }
        Some(live.session)
    }
}

/// Orchestrates live sessions over a [`SessionStore`].
pub struct SessionManager {
    store: SessionStore,
    filter: ProfanityFilter,
    observer: Arc<dyn SessionObserver>,
    registry: Mutex<Registry>,
}

impl SessionManager {
    pub fn new(store: SessionStore, filter: ProfanityFilter) -> Self {
        Self {
            store,
            filter,
            observer: Arc::new(NoopObserver),
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Replace the event observer (rendering layer, recorder, ...).
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>, SessionError> {
        self.registry
            .lock()
            .map_err(|_| StorageError::Unavailable("session registry lock poisoned".into()).into())
    }

    fn emit(&self, events: &[SessionEvent]) {
        for event in events {
            dispatch(self.observer.as_ref(), event);
        }
    }

    /// Create and start a session for `profile` against a registered
    /// bank. A random seed is drawn unless one is supplied.
    pub fn start_session(
        &self,
        profile: &str,
        bank_ref: &BankRef,
        seed: Option<u64>,
    ) -> Result<Uuid, SessionError> {
        let bank = self.store.banks().resolve(bank_ref)?.clone();
        let mut session = GameSession::new(profile, bank, seed.unwrap_or_else(entropy_seed))?;
        let events = session.start()?;
        let id = {
            let mut registry = self.lock()?;
            registry.insert(session)?
        };
        self.emit(&events);
        tracing::info!(session = %id, %profile, bank = %bank_ref, "session started");
        Ok(id)
    }

    /// Submit an answer to a live session.
    pub fn submit(&self, id: Uuid, submission: &Submission) -> Result<SubmitOutcome, SessionError> {
        let outcome = {
            let mut registry = self.lock()?;
            let outcome = registry
                .get_unlocked(id)?
                .submit_answer(submission, &self.filter)?;
            registry.release_if_terminal(id);
            outcome
        };
        self.emit(&outcome.events);
        Ok(outcome)
    }

    pub fn pause(&self, id: Uuid) -> Result<(), SessionError> {
        self.lock()?.get_unlocked(id)?.pause()
    }

    pub fn resume(&self, id: Uuid) -> Result<(), SessionError> {
        self.lock()?.get_unlocked(id)?.resume()
    }

    /// Force a live session to completion.
    pub fn complete(&self, id: Uuid) -> Result<Vec<SessionEvent>, SessionError> {
        let events = {
            let mut registry = self.lock()?;
            let events = registry.get_unlocked(id)?.complete()?;
            registry.release_if_terminal(id);
            events
        };
        self.emit(&events);
        Ok(events)
    }

    /// Mark a live session failed.
    pub fn fail(&self, id: Uuid, reason: &str) -> Result<Vec<SessionEvent>, SessionError> {
        let events = {
            let mut registry = self.lock()?;
            let events = registry.get_unlocked(id)?.fail(reason)?;
            registry.release_if_terminal(id);
            events
        };
        self.emit(&events);
        Ok(events)
    }

    /// Snapshot view of a live session.
    pub fn view(&self, id: Uuid) -> Result<SessionView, SessionError> {
        Ok(SessionView::of(&self.lock()?.get(id)?.session))
    }

    /// Persist a live session. The session stays live; commands issued
    /// while the write is in flight are rejected as busy.
    pub async fn save_session(&self, id: Uuid) -> Result<(), SessionError> {
        let (_guard, session) = {
            let registry = self.lock()?;
            let live = registry.get(id)?;
            let guard = BusyGuard::engage(&live.busy, id)?;
            (guard, live.session.clone())
        };
        self.store.save(&session).await
    }

    /// Bring a persisted session back into memory. Fails if an instance
    /// for this id is already live.
    pub async fn load_session(&self, id: Uuid) -> Result<SessionView, SessionError> {
        if self.lock()?.live.contains_key(&id) {
            return Err(SessionError::SessionAlreadyLive(id));
        }
        let session = self.store.load(id).await?;
        let view = SessionView::of(&session);
        self.lock()?.insert(session)?;
        tracing::info!(session = %id, "session loaded");
        Ok(view)
    }

    /// Drop a live instance without persisting it.
    pub fn evict(&self, id: Uuid) -> Result<(), SessionError> {
        let mut registry = self.lock()?;
        registry.get_unlocked(id)?;
        registry.remove(id);
        Ok(())
    }

    /// Remove a session everywhere: live registry and durable store.
    pub async fn delete_session(&self, id: Uuid) -> Result<(), SessionError> {
        {
            let mut registry = self.lock()?;
            if registry.live.contains_key(&id) {
                registry.get_unlocked(id)?;
                registry.remove(id);
            }
        }
        self.store.delete(id).await
    }

    /// Export a session as a portable blob, preferring the live instance
    /// over the stored snapshot.
    pub async fn export_session(&self, id: Uuid) -> Result<Vec<u8>, SessionError> {
        let live = {
            let registry = self.lock()?;
            match registry.live.get(&id) {
                Some(live) => {
                    if live.busy.load(Ordering::SeqCst) {
                        return Err(SessionError::SessionBusy(id));
                    }
                    Some(live.session.clone())
                }
                None => None,
            }
        };
        match live {
            Some(session) => self.store.export_session(&session),
            None => self.store.export(id).await,
        }
    }

    /// Import an exported blob and persist it.
    ///
    /// If the blob's session id collides with a live or stored session,
    /// the import is adopted under a fresh id and the provenance is
    /// recorded in its history. The imported session is brought live
    /// unless its profile already owns a live session; it is then left
    /// stored, to be loaded once the profile frees up.
    pub async fn import_session(&self, bytes: &[u8]) -> Result<Uuid, SessionError> {
        let source_version = SessionSnapshot::peek_version(bytes)?;
        let mut session = self.store.import(bytes)?;

        let collides = self.lock()?.live.contains_key(&session.id())
            || self.store.contains(session.id()).await?;
        if collides {
            let fresh = Uuid::new_v4();
            tracing::info!(
                original = %session.id(),
                adopted = %fresh,
                "imported session id collides, adopting fresh identity"
            );
            session.adopt_identity(fresh, source_version);
        }

        self.store.save(&session).await?;
        let id = session.id();
        let mut registry = self.lock()?;
        match registry.insert(session) {
            Ok(id) => Ok(id),
            Err(SessionError::ProfileBusy(profile)) => {
                tracing::info!(session = %id, %profile, "import stored but not live, profile busy");
                Ok(id)
            }
            Err(e) => Err(e),
        }
    }

    /// Stored sessions overlaid with any fresher live state.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let mut by_id: HashMap<Uuid, SessionSummary> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        {
            let registry = self.lock()?;
            for live in registry.live.values() {
                let snapshot = SessionSnapshot::from_session(&live.session);
                by_id.insert(live.session.id(), SessionSummary::from(&snapshot));
            }
        }

        let mut summaries: Vec<SessionSummary> = by_id.into_values().collect();
        summaries.sort_by_key(|s| std::cmp::Reverse(s.updated_at));
        Ok(summaries)
    }

    /// Number of live instances.
    pub fn live_count(&self) -> usize {
        self.lock().map(|r| r.live.len()).unwrap_or(0)
    }
}

fn entropy_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use qwest_core::model::{AcceptedAnswer, Difficulty, Prompt, Question, QuestionBank};
    use qwest_core::traits::DurableStore;
    use qwest_store::memory::MemoryStore;
    use qwest_store::store::BankRegistry;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    fn bank() -> QuestionBank {
        QuestionBank {
            id: "animals".into(),
            name: "Animals".into(),
            description: String::new(),
            version: "1".into(),
            questions: vec![
                Question {
                    id: "q1".into(),
                    prompt: Prompt::Text {
                        text: "meow?".into(),
                    },
                    accepted: AcceptedAnswer::Text {
                        alternatives: vec!["cat".into()],
                    },
                    category: None,
                    difficulty: Difficulty::Easy,
                    points: 10,
                },
                Question {
                    id: "q2".into(),
                    prompt: Prompt::Text {
                        text: "woof?".into(),
                    },
                    accepted: AcceptedAnswer::Text {
                        alternatives: vec!["dog".into(), "puppy".into()],
                    },
                    category: None,
                    difficulty: Difficulty::Easy,
                    points: 10,
                },
            ],
        }
    }

    fn manager_over(backend: Arc<dyn DurableStore>) -> SessionManager {
        let mut banks = BankRegistry::new();
        banks.register(bank());
        let filter = ProfanityFilter::default();
        let store = SessionStore::new(backend, banks, filter.clone());
        SessionManager::new(store, filter)
    }

    fn manager() -> SessionManager {
        manager_over(Arc::new(MemoryStore::new()))
    }

    fn answer_current(manager: &SessionManager, id: Uuid) -> SubmitOutcome {
        let view = manager.view(id).unwrap();
        let question = view.current_question.unwrap();
        let answer = match &question.accepted {
            AcceptedAnswer::Text { alternatives } => alternatives[0].clone(),
            AcceptedAnswer::Pairing { .. } => panic!("text questions only"),
        };
        manager
            .submit(id, &Submission::text(&question.id, answer))
            .unwrap()
    }

    #[tokio::test]
    async fn start_submit_complete_flow() {
        let manager = manager();
        let id = manager
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();

        assert_eq!(manager.view(id).unwrap().state, SessionState::InProgress);
        answer_current(&manager, id);
        let outcome = answer_current(&manager, id);

        assert_eq!(outcome.score, 20);
        let view = manager.view(id).unwrap();
        assert_eq!(view.state, SessionState::Completed);
        assert!(view.current_question.is_none());
    }

    #[tokio::test]
    async fn one_live_session_per_profile() {
        let manager = manager();
        let bank_ref: BankRef = "animals@1".parse().unwrap();
        let id = manager.start_session("kid", &bank_ref, Some(1)).unwrap();

        assert!(matches!(
            manager.start_session("kid", &bank_ref, Some(2)),
            Err(SessionError::ProfileBusy(_))
        ));
        // A different profile is fine.
        manager.start_session("other", &bank_ref, Some(2)).unwrap();

        // Completing the first session releases the profile.
        manager.complete(id).unwrap();
        manager.start_session("kid", &bank_ref, Some(3)).unwrap();
    }

    #[tokio::test]
    async fn unknown_bank_is_rejected() {
        let manager = manager();
        assert!(matches!(
            manager.start_session("kid", &"nope@1".parse().unwrap(), None),
            Err(SessionError::BankNotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_then_load_round_trip() {
        let manager = manager();
        let id = manager
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();
        answer_current(&manager, id);
        manager.save_session(id).await.unwrap();

        // A second live instance for the same id is refused.
        assert!(matches!(
            manager.load_session(id).await,
            Err(SessionError::SessionAlreadyLive(id2)) if id2 == id
        ));

        manager.evict(id).unwrap();
        let view = manager.load_session(id).await.unwrap();
        assert_eq!(view.score, 10);
        assert_eq!(view.state, SessionState::InProgress);
    }

    #[tokio::test]
    async fn loading_claims_the_profile_again() {
        let manager = manager();
        let bank_ref: BankRef = "animals@1".parse().unwrap();
        let id = manager.start_session("kid", &bank_ref, Some(1)).unwrap();
        manager.save_session(id).await.unwrap();
        manager.evict(id).unwrap();

        manager.load_session(id).await.unwrap();
        assert!(matches!(
            manager.start_session("kid", &bank_ref, Some(2)),
            Err(SessionError::ProfileBusy(_))
        ));
    }

    #[tokio::test]
    async fn failed_store_leaves_live_session_intact() {
        let backend = Arc::new(MemoryStore::new());
        let manager = manager_over(backend.clone());
        let id = manager
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();
        answer_current(&manager, id);

        backend.fail_writes(true);
        assert!(matches!(
            manager.save_session(id).await,
            Err(SessionError::Storage(_))
        ));

        // The in-memory session still works, and the busy flag cleared.
        backend.fail_writes(false);
        let outcome = answer_current(&manager, id);
        assert_eq!(outcome.score, 20);
        manager.save_session(id).await.unwrap();
    }

    #[tokio::test]
    async fn export_import_adopts_fresh_id_on_collision() {
        let manager = manager();
        let id = manager
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();
        answer_current(&manager, id);
        manager.save_session(id).await.unwrap();

        let blob = manager.export_session(id).await.unwrap();
        let imported = manager.import_session(&blob).await.unwrap();
        assert_ne!(imported, id);

        // The original still owns the profile, so the copy is stored but
        // not live.
        assert!(matches!(
            manager.view(imported),
            Err(SessionError::SessionNotFound(_))
        ));
        let sessions = manager.list_sessions().await.unwrap();
        assert!(sessions.iter().any(|s| s.id == imported));

        // Once the profile frees up the copy can be loaded and played.
        manager.complete(id).unwrap();
        let view = manager.load_session(imported).await.unwrap();
        assert_eq!(view.score, 10);
        assert_eq!(view.state, SessionState::InProgress);
    }

    #[tokio::test]
    async fn import_into_a_fresh_manager_keeps_identity() {
        let backend = Arc::new(MemoryStore::new());
        let exporter = manager_over(backend.clone());
        let id = exporter
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();
        answer_current(&exporter, id);
        let blob = exporter.export_session(id).await.unwrap();

        // No collision on another device; the id survives the import.
        let importer = manager_over(Arc::new(MemoryStore::new()));
        let imported = importer.import_session(&blob).await.unwrap();
        assert_eq!(imported, id);
        assert_eq!(importer.view(id).unwrap().score, 10);
    }

    #[tokio::test]
    async fn list_merges_live_and_stored() {
        let manager = manager();
        let id = manager
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();
        manager.save_session(id).await.unwrap();
        answer_current(&manager, id);

        let sessions = manager.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        // The live score wins over the stale stored snapshot.
        assert_eq!(sessions[0].score, 10);
    }

    /// Backend whose writes block until released, to hold a session in
    /// the busy window.
    struct StallingStore {
        inner: MemoryStore,
        gate: Notify,
        stalled: StdMutex<bool>,
    }

    #[async_trait]
    impl DurableStore for StallingStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key).await
        }
        async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            if *self.stalled.lock().unwrap() {
                self.gate.notified().await;
            }
            self.inner.put(key, bytes).await
        }
        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.inner.delete(key).await
        }
        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.inner.list_keys(prefix).await
        }
    }

    #[tokio::test]
    async fn commands_are_rejected_while_a_save_is_in_flight() {
        let backend = Arc::new(StallingStore {
            inner: MemoryStore::new(),
            gate: Notify::new(),
            stalled: StdMutex::new(false),
        });
        let manager = Arc::new(manager_over(backend.clone()));
        let id = manager
            .start_session("kid", &"animals@1".parse().unwrap(), Some(3))
            .unwrap();

        *backend.stalled.lock().unwrap() = true;
        let saving = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.save_session(id).await })
        };
        // Let the save future reach the stalled write.
        tokio::task::yield_now().await;

        let question = manager.view(id).unwrap().current_question.unwrap();
        assert!(matches!(
            manager.submit(id, &Submission::text(&question.id, "cat")),
            Err(SessionError::SessionBusy(_))
        ));
        assert!(matches!(manager.pause(id), Err(SessionError::SessionBusy(_))));

        backend.gate.notify_waiters();
        saving.await.unwrap().unwrap();

        // Busy window over; commands flow again.
        manager.pause(id).unwrap();
    }
}
