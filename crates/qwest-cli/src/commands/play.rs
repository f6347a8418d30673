//! The `qwest play` command.
//!
//! A line-oriented play loop: prints the current question, reads one
//! answer per line, and reports the verdict. Slash commands control the
//! session; end of input saves and exits like `/quit`.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use qwest_core::history::AnswerVerdict;
use qwest_core::model::{AnswerKind, Pair, Prompt, Question, Submission};
use qwest_core::session::SessionState;

pub async fn execute(
    profile: String,
    bank: Option<String>,
    resume: Option<Uuid>,
    seed: Option<u64>,
    config: Option<PathBuf>,
) -> Result<()> {
    let manager = super::build_manager(config.as_deref())?;

    let id = match (resume, bank) {
        (Some(id), _) => {
            manager.load_session(id).await?;
            if manager.view(id)?.state == SessionState::Paused {
                manager.resume(id)?;
            }
            println!("Resumed session {id}");
            id
        }
        (None, Some(bank)) => {
            let bank_ref = bank
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("expected a bank reference like \"animals@1\"")?;
            let id = manager.start_session(&profile, &bank_ref, seed)?;
            println!("Started session {id} for profile '{profile}'");
            id
        }
        (None, None) => bail!("either --bank or --resume is required"),
    };

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut shown: Option<String> = None;

    loop {
        let view = manager.view(id)?;
        match view.state {
            SessionState::Completed => {
                println!("Session completed! Final score: {}", view.score);
                manager.save_session(id).await?;
                break;
            }
            SessionState::Failed => {
                println!("Session failed.");
                manager.save_session(id).await?;
                break;
            }
            _ => {}
        }

        let Some(question) = view.current_question else {
            bail!("session has no current question");
        };
        if shown.as_deref() != Some(question.id.as_str()) {
            show_question(&question, view.answered, view.total);
            shown = Some(question.id.clone());
        }

        print!("> ");
        std::io::stdout().flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            // End of input behaves like /quit.
            None => {
                manager.save_session(id).await?;
                println!("\nSaved session {id}");
                break;
            }
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" => {
                manager.save_session(id).await?;
                println!("Saved session {id}");
                break;
            }
            "/pause" => {
                manager.pause(id)?;
                manager.save_session(id).await?;
                println!("Paused and saved session {id}");
                break;
            }
            "/score" => {
                println!("Score: {} ({} of {} answered)", view.score, view.answered, view.total);
                continue;
            }
            "/giveup" => {
                manager.complete(id)?;
                continue;
            }
            _ => {}
        }

        let submission = match question.accepted.kind() {
            AnswerKind::Text => Submission::text(&question.id, line),
            AnswerKind::Pairing => match parse_pairs(line) {
                Ok(pairs) => Submission::pairing(&question.id, pairs),
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            },
        };

        match manager.submit(id, &submission) {
            Ok(outcome) => match outcome.verdict {
                AnswerVerdict::Correct => {
                    println!("Correct! +{} (score: {})", outcome.delta, outcome.score);
                }
                AnswerVerdict::Incorrect => println!("Not quite, try again."),
                AnswerVerdict::Rejected { reason } => {
                    println!("That answer can't be accepted ({reason}).");
                }
            },
            Err(e) => println!("Error: {e}"),
        }
    }

    Ok(())
}

fn show_question(question: &Question, answered: usize, total: usize) {
    println!();
    match &question.prompt {
        Prompt::Text { text } => println!("[{}/{}] {}", answered + 1, total, text),
        Prompt::Image { asset, alt } => {
            println!("[{}/{}] (image: {asset}) {alt}", answered + 1, total);
        }
    }
    if question.accepted.kind() == AnswerKind::Pairing {
        println!("Answer with pairs, e.g. \"cow=cow.png, pig=pig.png\"");
    }
}

/// Parse "left=right, left=right" into pairs.
fn parse_pairs(line: &str) -> Result<Vec<Pair>> {
    line.split(',')
        .map(|part| {
            part.trim()
                .split_once('=')
                .map(|(l, r)| Pair::new(l.trim(), r.trim()))
                .with_context(|| format!("expected \"left=right\", got \"{}\"", part.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_accepts_spaced_input() {
        let pairs = parse_pairs("cow = cow.png , pig=pig.png").unwrap();
        assert_eq!(pairs, vec![Pair::new("cow", "cow.png"), Pair::new("pig", "pig.png")]);
    }

    #[test]
    fn parse_pairs_rejects_missing_separator() {
        assert!(parse_pairs("cow cow.png").is_err());
    }
}
