//! TOML question bank parser.
//!
//! Loads question banks from TOML files and directories, and validates
//! them before they are offered for play.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AcceptedAnswer, Difficulty, Pair, Prompt, Question, QuestionBank};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_version")]
    version: String,
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    image: Option<TomlImagePrompt>,
    #[serde(default)]
    answers: Vec<String>,
    #[serde(default)]
    pairs: Vec<TomlPair>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    points: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlImagePrompt {
    asset: String,
    #[serde(default)]
    alt: String,
}

#[derive(Debug, Deserialize)]
struct TomlPair {
    left: String,
    right: String,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let prompt = match (q.prompt, q.image) {
                (Some(text), None) => Prompt::Text { text },
                (None, Some(image)) => Prompt::Image {
                    asset: image.asset,
                    alt: image.alt,
                },
                (Some(_), Some(_)) => {
                    anyhow::bail!("question '{}' has both a text and an image prompt", q.id)
                }
                (None, None) => {
                    anyhow::bail!("question '{}' has no prompt", q.id)
                }
            };

            let accepted = match (q.answers.is_empty(), q.pairs.is_empty()) {
                (false, true) => AcceptedAnswer::Text {
                    alternatives: q.answers,
                },
                (true, false) => AcceptedAnswer::Pairing {
                    pairs: q
                        .pairs
                        .into_iter()
                        .map(|p| Pair::new(p.left, p.right))
                        .collect(),
                },
                (true, true) => {
                    anyhow::bail!("question '{}' has neither answers nor pairs", q.id)
                }
                (false, false) => {
                    anyhow::bail!("question '{}' has both answers and pairs", q.id)
                }
            };

            let difficulty = q
                .difficulty
                .map(|d| d.parse::<Difficulty>().map_err(|e| anyhow::anyhow!(e)))
                .transpose()?
                .unwrap_or_default();

            Ok(Question {
                id: q.id,
                prompt,
                accepted,
                category: q.category,
                difficulty,
                points: q.points.unwrap_or(10),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        version: parsed.bank.version,
        questions,
    })
}

/// Recursively load all `.toml` bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for common authoring issues.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions and cannot be played".into(),
        });
    }

    // Check for duplicate question IDs
    let mut seen_ids = std::collections::HashSet::new();
    for question in &bank.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &bank.questions {
        match &question.prompt {
            Prompt::Text { text } if text.trim().is_empty() => {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    message: "prompt text is empty".into(),
                });
            }
            Prompt::Image { alt, .. } if alt.trim().is_empty() => {
                warnings.push(ValidationWarning {
                    question_id: Some(question.id.clone()),
                    message: "image prompt has no alt text".into(),
                });
            }
            _ => {}
        }

        match &question.accepted {
            AcceptedAnswer::Text { alternatives } => {
                if alternatives.iter().any(|a| a.trim().is_empty()) {
                    warnings.push(ValidationWarning {
                        question_id: Some(question.id.clone()),
                        message: "accepted answer list contains an empty alternative".into(),
                    });
                }
            }
            AcceptedAnswer::Pairing { pairs } => {
                let mut lefts = std::collections::HashSet::new();
                for pair in pairs {
                    if !lefts.insert(&pair.left) {
                        warnings.push(ValidationWarning {
                            question_id: Some(question.id.clone()),
                            message: format!("duplicate pairing source: {}", pair.left),
                        });
                    }
                }
            }
        }

        if question.points == 0 {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "question awards zero points".into(),
            });
        }
    }

    warnings
}
