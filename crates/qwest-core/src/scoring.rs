//! Pure scoring functions.
//!
//! `score` maps a question plus a submitted value to a correctness verdict
//! and a score delta. It has no hidden state: the same inputs always
//! produce the same output, which is what makes history replay exact.
//! Deltas are never negative, so replay order cannot change the result.

use std::collections::HashSet;

use crate::model::{AcceptedAnswer, AnswerValue, Pair, Question};

/// The outcome of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the answer was correct.
    pub correct: bool,
    /// Score awarded; zero for incorrect answers.
    pub delta: u32,
}

impl Verdict {
    fn correct(points: u32) -> Self {
        Self {
            correct: true,
            delta: points,
        }
    }

    fn incorrect() -> Self {
        Self {
            correct: false,
            delta: 0,
        }
    }
}

/// Score a submitted value against a question.
///
/// Free text is matched case-insensitively with whitespace normalized;
/// pairing answers must match the accepted pairing set exactly (order of
/// the pairs does not matter). A value whose shape does not match the
/// question is simply incorrect.
pub fn score(question: &Question, value: &AnswerValue) -> Verdict {
    match (&question.accepted, value) {
        (AcceptedAnswer::Text { alternatives }, AnswerValue::Text { text }) => {
            let submitted = normalize_text(text);
            if alternatives.iter().any(|a| normalize_text(a) == submitted) {
                Verdict::correct(question.points)
            } else {
                Verdict::incorrect()
            }
        }
        (AcceptedAnswer::Pairing { pairs: accepted }, AnswerValue::Pairing { pairs }) => {
            if pairing_matches(accepted, pairs) {
                Verdict::correct(question.points)
            } else {
                Verdict::incorrect()
            }
        }
        _ => Verdict::incorrect(),
    }
}

/// Lowercase and collapse runs of whitespace to single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact set equality over normalized pairs.
fn pairing_matches(accepted: &[Pair], submitted: &[Pair]) -> bool {
    if accepted.len() != submitted.len() {
        return false;
    }
    let normalize = |pairs: &[Pair]| -> HashSet<(String, String)> {
        pairs
            .iter()
            .map(|p| (normalize_text(&p.left), normalize_text(&p.right)))
            .collect()
    };
    normalize(accepted) == normalize(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, Prompt};

    fn text_question(answers: &[&str]) -> Question {
        Question {
            id: "q".into(),
            prompt: Prompt::Text {
                text: "?".into(),
            },
            accepted: AcceptedAnswer::Text {
                alternatives: answers.iter().map(|s| s.to_string()).collect(),
            },
            category: None,
            difficulty: Difficulty::Easy,
            points: 10,
        }
    }

    fn pairing_question(pairs: Vec<Pair>) -> Question {
        Question {
            id: "q".into(),
            prompt: Prompt::Image {
                asset: "animals.png".into(),
                alt: String::new(),
            },
            accepted: AcceptedAnswer::Pairing { pairs },
            category: None,
            difficulty: Difficulty::Easy,
            points: 10,
        }
    }

    #[test]
    fn text_match_is_case_insensitive() {
        let q = text_question(&["cat"]);
        let v = score(&q, &AnswerValue::Text { text: "Cat".into() });
        assert!(v.correct);
        assert_eq!(v.delta, 10);
    }

    #[test]
    fn text_match_normalizes_whitespace() {
        let q = text_question(&["polar bear"]);
        let v = score(
            &q,
            &AnswerValue::Text {
                text: "  Polar\tBEAR ".into(),
            },
        );
        assert!(v.correct);
    }

    #[test]
    fn text_accepts_any_alternative() {
        let q = text_question(&["dog", "puppy"]);
        assert!(score(&q, &AnswerValue::Text { text: "puppy".into() }).correct);
        assert!(score(&q, &AnswerValue::Text { text: "dog".into() }).correct);
        let wrong = score(&q, &AnswerValue::Text { text: "fox".into() });
        assert!(!wrong.correct);
        assert_eq!(wrong.delta, 0);
    }

    #[test]
    fn pairing_matches_exactly_order_insensitive() {
        let q = pairing_question(vec![
            Pair::new("cat", "tabby.png"),
            Pair::new("dog", "beagle.png"),
        ]);

        let swapped = AnswerValue::Pairing {
            pairs: vec![
                Pair::new("dog", "beagle.png"),
                Pair::new("cat", "tabby.png"),
            ],
        };
        assert!(score(&q, &swapped).correct);

        let crossed = AnswerValue::Pairing {
            pairs: vec![
                Pair::new("cat", "beagle.png"),
                Pair::new("dog", "tabby.png"),
            ],
        };
        assert!(!score(&q, &crossed).correct);
    }

    #[test]
    fn pairing_requires_full_set() {
        let q = pairing_question(vec![
            Pair::new("cat", "tabby.png"),
            Pair::new("dog", "beagle.png"),
        ]);
        let partial = AnswerValue::Pairing {
            pairs: vec![Pair::new("cat", "tabby.png")],
        };
        assert!(!score(&q, &partial).correct);
    }

    #[test]
    fn shape_mismatch_is_incorrect() {
        let q = text_question(&["cat"]);
        let v = score(
            &q,
            &AnswerValue::Pairing {
                pairs: vec![Pair::new("cat", "tabby.png")],
            },
        );
        assert!(!v.correct);
        assert_eq!(v.delta, 0);
    }

    #[test]
    fn delta_uses_question_points() {
        let mut q = text_question(&["cat"]);
        q.points = 25;
        let v = score(&q, &AnswerValue::Text { text: "cat".into() });
        assert_eq!(v.delta, 25);
    }

    #[test]
    fn scoring_is_deterministic() {
        let q = text_question(&["cat"]);
        let value = AnswerValue::Text { text: "cAt".into() };
        let a = score(&q, &value);
        let b = score(&q, &value);
        assert_eq!(a, b);
    }
}
