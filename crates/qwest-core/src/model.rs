//! Core data model types for qwest.
//!
//! These are the fundamental types the entire qwest system uses to
//! represent questions, question banks, and answer submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the player is shown for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prompt {
    /// A plain text question.
    Text { text: String },
    /// An image reference (e.g. an animal picture to be named or matched).
    Image {
        /// Asset identifier resolved by the rendering layer.
        asset: String,
        /// Alternative text for accessibility.
        #[serde(default)]
        alt: String,
    },
}

/// One left/right pairing, e.g. an animal name matched to a picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub left: String,
    pub right: String,
}

impl Pair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// The shape of answer a question accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Text,
    Pairing,
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKind::Text => write!(f, "text"),
            AnswerKind::Pairing => write!(f, "pairing"),
        }
    }
}

/// The accepted answers for a question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcceptedAnswer {
    /// Free text with one or more accepted alternatives.
    Text { alternatives: Vec<String> },
    /// A drag-and-drop pairing set; a correct answer matches it exactly.
    Pairing { pairs: Vec<Pair> },
}

impl AcceptedAnswer {
    pub fn kind(&self) -> AnswerKind {
        match self {
            AcceptedAnswer::Text { .. } => AnswerKind::Text,
            AcceptedAnswer::Pairing { .. } => AnswerKind::Pairing,
        }
    }
}

/// A submitted answer value, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerValue {
    Text { text: String },
    Pairing { pairs: Vec<Pair> },
}

impl AnswerValue {
    pub fn kind(&self) -> AnswerKind {
        match self {
            AnswerValue::Text { .. } => AnswerKind::Text,
            AnswerValue::Pairing { .. } => AnswerKind::Pairing,
        }
    }

    /// The free-text content of this value, if any. Pairing values carry
    /// no player-typed text and are never content-filtered.
    pub fn free_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text { text } => Some(text),
            AnswerValue::Pairing { .. } => None,
        }
    }
}

/// Question difficulty tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// A single question. Immutable once loaded into a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within its bank.
    pub id: String,
    /// What the player sees.
    pub prompt: Prompt,
    /// The accepted answer(s).
    pub accepted: AcceptedAnswer,
    /// Category tag for filtering.
    #[serde(default)]
    pub category: Option<String>,
    /// Difficulty tag.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Score awarded for a correct answer.
    #[serde(default = "default_points")]
    pub points: u32,
}

fn default_points() -> u32 {
    10
}

/// A pinned reference to a specific bank version.
///
/// Sessions hold a `BankRef` rather than re-resolving the bank later, so
/// replays stay deterministic even if the bank is updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankRef {
    pub id: String,
    pub version: String,
}

impl fmt::Display for BankRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl FromStr for BankRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('@') {
            Some((id, version)) if !id.is_empty() && !version.is_empty() => Ok(BankRef {
                id: id.to_string(),
                version: version.to_string(),
            }),
            _ => Err(format!("malformed bank reference: {s}")),
        }
    }
}

/// A collection of questions, versioned so sessions can pin it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    /// Unique identifier for this bank.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Description of this bank.
    #[serde(default)]
    pub description: String,
    /// Content version; bumped whenever questions change.
    pub version: String,
    /// The questions in this bank, in authored order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// The pinned reference sessions bind to at creation time.
    pub fn bank_ref(&self) -> BankRef {
        BankRef {
            id: self.id.clone(),
            version: self.version.clone(),
        }
    }

    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// All question ids in authored order.
    pub fn question_ids(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A submitted answer, consumed by the scoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The question this answers.
    pub question_id: String,
    /// The submitted value.
    pub value: AnswerValue,
    /// When the player submitted it.
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    /// Convenience constructor for a free-text submission.
    pub fn text(question_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            value: AnswerValue::Text { text: text.into() },
            submitted_at: Utc::now(),
        }
    }

    /// Convenience constructor for a pairing submission.
    pub fn pairing(question_id: impl Into<String>, pairs: Vec<Pair>) -> Self {
        Self {
            question_id: question_id.into(),
            value: AnswerValue::Pairing { pairs },
            submitted_at: Utc::now(),
        }
    }
}
