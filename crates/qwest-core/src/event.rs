//! Events emitted by the session engine and the observer seam.
//!
//! Rendering, help, and history-UI collaborators consume these instead of
//! reaching into the engine; the engine never calls UI code directly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::AnswerVerdict;

/// An event emitted by a session command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    QuestionChanged {
        session_id: Uuid,
        question_id: String,
    },
    AnswerResult {
        session_id: Uuid,
        question_id: String,
        verdict: AnswerVerdict,
        delta: u32,
    },
    ScoreChanged {
        session_id: Uuid,
        score: u32,
    },
    SessionCompleted {
        session_id: Uuid,
        final_score: u32,
    },
    SessionFailed {
        session_id: Uuid,
        reason: String,
    },
}

/// Observer trait for session events.
pub trait SessionObserver: Send + Sync {
    fn on_question_changed(&self, session_id: Uuid, question_id: &str);
    fn on_answer_result(&self, session_id: Uuid, question_id: &str, verdict: &AnswerVerdict, delta: u32);
    fn on_score_changed(&self, session_id: Uuid, score: u32);
    fn on_session_completed(&self, session_id: Uuid, final_score: u32);
    fn on_session_failed(&self, session_id: Uuid, reason: &str);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_question_changed(&self, _: Uuid, _: &str) {}
    fn on_answer_result(&self, _: Uuid, _: &str, _: &AnswerVerdict, _: u32) {}
    fn on_score_changed(&self, _: Uuid, _: u32) {}
    fn on_session_completed(&self, _: Uuid, _: u32) {}
    fn on_session_failed(&self, _: Uuid, _: &str) {}
}

/// Route one event to the matching observer callback.
pub fn dispatch(observer: &dyn SessionObserver, event: &SessionEvent) {
    match event {
        SessionEvent::QuestionChanged {
            session_id,
            question_id,
        } => observer.on_question_changed(*session_id, question_id),
        SessionEvent::AnswerResult {
            session_id,
            question_id,
            verdict,
            delta,
        } => observer.on_answer_result(*session_id, question_id, verdict, *delta),
        SessionEvent::ScoreChanged { session_id, score } => {
            observer.on_score_changed(*session_id, *score)
        }
        SessionEvent::SessionCompleted {
            session_id,
            final_score,
        } => observer.on_session_completed(*session_id, *final_score),
        SessionEvent::SessionFailed { session_id, reason } => {
            observer.on_session_failed(*session_id, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recording {
        fn on_question_changed(&self, _: Uuid, question_id: &str) {
            self.seen.lock().unwrap().push(format!("question:{question_id}"));
        }
        fn on_answer_result(&self, _: Uuid, _: &str, verdict: &AnswerVerdict, _: u32) {
            let tag = if verdict.is_rejected() { "rejected" } else { "scored" };
            self.seen.lock().unwrap().push(format!("answer:{tag}"));
        }
        fn on_score_changed(&self, _: Uuid, score: u32) {
            self.seen.lock().unwrap().push(format!("score:{score}"));
        }
        fn on_session_completed(&self, _: Uuid, final_score: u32) {
            self.seen.lock().unwrap().push(format!("completed:{final_score}"));
        }
        fn on_session_failed(&self, _: Uuid, reason: &str) {
            self.seen.lock().unwrap().push(format!("failed:{reason}"));
        }
    }

    #[test]
    fn dispatch_routes_each_variant() {
        let observer = Recording::default();
        let id = Uuid::new_v4();

        dispatch(
            &observer,
            &SessionEvent::QuestionChanged {
                session_id: id,
                question_id: "q1".into(),
            },
        );
        dispatch(
            &observer,
            &SessionEvent::ScoreChanged {
                session_id: id,
                score: 20,
            },
        );
        dispatch(
            &observer,
            &SessionEvent::SessionCompleted {
                session_id: id,
                final_score: 20,
            },
        );

        let seen = observer.seen.lock().unwrap();
        assert_eq!(*seen, vec!["question:q1", "score:20", "completed:20"]);
    }
}
