//! services/client/src/interactive.rs
//!
//! Drives a `QuizRunner` from line-based input, one question at a time.

use std::io::{BufRead, Write};

use studyflow_core::{PortError, QuizError, QuizRunner, QuizState, SessionBridge, StudyError};

use crate::error::CliError;

/// How an interactive attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Completed,
    /// The user quit, or input ran out. Graded wrong answers are already stored.
    Abandoned,
}

enum Command {
    Previous,
    Next,
    Quit,
    Answer(String),
}

fn parse_command(line: &str) -> Command {
    match line.trim() {
        ":p" | ":prev" => Command::Previous,
        ":n" | ":next" => Command::Next,
        ":q" | ":quit" => Command::Quit,
        _ => Command::Answer(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// Maps a typed line to an answer: option numbers select that option.
fn resolve_answer(options: &[String], raw: &str) -> String {
    if options.is_empty() {
        return raw.to_string();
    }
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].clone(),
        _ => raw.trim().to_string(),
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, CliError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

pub async fn run_quiz<R: BufRead, W: Write>(
    runner: &mut QuizRunner,
    bridge: &dyn SessionBridge,
    input: &mut R,
    out: &mut W,
) -> Result<QuizOutcome, CliError> {
    loop {
        let state = runner.state().clone();
        match state {
            QuizState::Presenting { index, selection } => {
                let question = runner.questions()[index].clone();
                let (_, total) = runner.progress();
                writeln!(out, "\nQuestion {} / {}", index + 1, total)?;
                writeln!(out, "{}", question.question)?;
                for (i, option) in question.options.iter().enumerate() {
                    writeln!(out, "  {}. {}", i + 1, option)?;
                }
                if let Some(result) = runner.recorded_result(index) {
                    writeln!(
                        out,
                        "Already answered '{}' ({}). Type :n to continue.",
                        result.user_answer,
                        if result.is_correct { "correct" } else { "incorrect" }
                    )?;
                } else if question.is_free_text() {
                    writeln!(out, "Type your answer:")?;
                } else {
                    writeln!(out, "Choose an option number:")?;
                }

                let Some(line) = read_line(input)? else {
                    return Ok(QuizOutcome::Abandoned);
                };
                match parse_command(&line) {
                    Command::Quit => return Ok(QuizOutcome::Abandoned),
                    Command::Previous => report_quiz_error(out, runner.previous().err())?,
                    Command::Next => report_quiz_error(out, runner.advance().err())?,
                    Command::Answer(raw) => {
                        // A bare enter resubmits the kept answer after a failed submission.
                        let retry = raw.trim().is_empty() && selection.is_some();
                        if !retry {
                            if let Err(e) = runner.select(resolve_answer(&question.options, &raw)) {
                                writeln!(out, "{}", e)?;
                                continue;
                            }
                        }
                        writeln!(out, "Checking...")?;
                        match runner.submit(bridge).await {
                            Ok(_) => {}
                            Err(StudyError::Quiz(e)) => writeln!(out, "{}", e)?,
                            Err(StudyError::Port(e)) => {
                                writeln!(out, "Submission failed: {}. Press enter to retry.", describe(&e))?
                            }
                            Err(StudyError::Store(e)) => {
                                writeln!(out, "Warning: this wrong answer could not be added to your notes ({}).", e)?
                            }
                        }
                    }
                }
            }
            QuizState::Feedback { index, result } => {
                if result.is_correct {
                    writeln!(out, "Correct!")?;
                } else {
                    writeln!(out, "Incorrect. The answer is: {}", result.correct_answer)?;
                }
                if !result.feedback.trim().is_empty() {
                    writeln!(out, "{}", result.feedback)?;
                }
                let last = index + 1 == runner.questions().len();
                writeln!(
                    out,
                    "Press enter for {} (:p previous, :q quit).",
                    if last { "results" } else { "the next question" }
                )?;

                let Some(line) = read_line(input)? else {
                    return Ok(QuizOutcome::Abandoned);
                };
                match parse_command(&line) {
                    Command::Quit => return Ok(QuizOutcome::Abandoned),
                    Command::Previous => report_quiz_error(out, runner.previous().err())?,
                    Command::Next | Command::Answer(_) => report_quiz_error(out, runner.advance().err())?,
                }
            }
            QuizState::Complete => {
                let report = runner.report();
                writeln!(
                    out,
                    "\nQuiz complete: {} / {} correct ({}%)",
                    report.correct,
                    report.total,
                    report.score_percent()
                )?;
                for wrong in &report.wrong {
                    writeln!(out, "  - {} (you: {}, answer: {})", wrong.question, wrong.user_answer, wrong.correct_answer)?;
                }
                return Ok(QuizOutcome::Completed);
            }
            QuizState::Submitting { .. } => {
                return Err(CliError::Internal("quiz left waiting on a grade".to_string()));
            }
        }
    }
}

fn report_quiz_error<W: Write>(out: &mut W, error: Option<QuizError>) -> Result<(), CliError> {
    if let Some(e) = error {
        writeln!(out, "{}", e)?;
    }
    Ok(())
}

/// A short, user-facing description of a backend failure.
pub fn describe(error: &PortError) -> String {
    match error {
        PortError::Network(_) => "the server could not be reached".to_string(),
        PortError::Unauthorized => "please sign in again".to_string(),
        other => other.to_string(),
    }
}
