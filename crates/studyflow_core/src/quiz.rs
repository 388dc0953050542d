//! crates/studyflow_core/src/quiz.rs
//!
//! The state machine that drives one quiz attempt, question by question.
//!
//! A `QuizRunner` moves through `Presenting -> Submitting -> Feedback` for each
//! question and ends in `Complete`. Grading is always done by the backend; the
//! runner never decides correctness itself. Wrong answers are handed to the
//! `WrongNoteStore` as soon as they are graded.

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{Grade, QuizQuestion, QuizReport, QuizResult, WrongNote};
use crate::error::{StudyError, StudyResult};
use crate::ports::{GradeRequest, SessionBridge};
use crate::wrong_notes::WrongNoteStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("The quiz has no questions")]
    EmptyQuiz,
    #[error("An answer is required before submitting")]
    EmptyAnswer,
    #[error("'{0}' is not one of the options")]
    InvalidOption(String),
    #[error("Question {} has already been graded", .0 + 1)]
    AlreadyGraded(usize),
    #[error("Question {} has not been graded yet", .0 + 1)]
    NotGraded(usize),
    #[error("Already at the first question")]
    AtFirstQuestion,
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    /// A grade arrived for a question the runner is no longer waiting on.
    #[error("Ignoring a late grade for question {}", .0 + 1)]
    StaleResponse(usize),
    #[error("The quiz is already complete")]
    Finished,
}

/// Where an attempt currently is. `index` is the zero-based question index.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizState {
    /// Waiting for the user to pick or type an answer.
    Presenting {
        index: usize,
        selection: Option<String>,
    },
    /// A grading request is in flight.
    Submitting { index: usize, answer: String },
    /// The grade for `index` is shown.
    Feedback { index: usize, result: QuizResult },
    Complete,
}

impl QuizState {
    pub fn index(&self) -> Option<usize> {
        match self {
            QuizState::Presenting { index, .. }
            | QuizState::Submitting { index, .. }
            | QuizState::Feedback { index, .. } => Some(*index),
            QuizState::Complete => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            QuizState::Presenting { .. } => "presenting a question",
            QuizState::Submitting { .. } => "a grade is pending",
            QuizState::Feedback { .. } => "feedback is shown",
            QuizState::Complete => "the quiz is complete",
        }
    }
}

/// Issued by `begin_submit`; must be handed back with the grade.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeTicket {
    index: usize,
    request: GradeRequest,
}

impl GradeTicket {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn request(&self) -> &GradeRequest {
        &self.request
    }
}

pub struct QuizRunner {
    questions: Vec<QuizQuestion>,
    results: Vec<QuizResult>,
    state: QuizState,
    notes: WrongNoteStore,
}

impl QuizRunner {
    pub fn new(questions: Vec<QuizQuestion>, notes: WrongNoteStore) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::EmptyQuiz);
        }
        Ok(Self {
            questions,
            results: Vec::new(),
            state: QuizState::Presenting {
                index: 0,
                selection: None,
            },
            notes,
        })
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Graded results in question order.
    pub fn results(&self) -> &[QuizResult] {
        &self.results
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.state.index().map(|i| &self.questions[i])
    }

    /// The result recorded for `index`, if that question was already graded.
    pub fn recorded_result(&self, index: usize) -> Option<&QuizResult> {
        self.results.get(index)
    }

    /// `(graded, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.results.len(), self.questions.len())
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, QuizState::Complete)
    }

    pub fn report(&self) -> QuizReport {
        QuizReport::from_results(&self.results)
    }

    pub fn into_results(self) -> Vec<QuizResult> {
        self.results
    }

    /// Sets or replaces the pending answer for the current question.
    pub fn select(&mut self, answer: impl Into<String>) -> Result<(), QuizError> {
        let answer = answer.into();
        match &mut self.state {
            QuizState::Presenting { index, selection } => {
                let question = &self.questions[*index];
                if !question.is_free_text() && !question.options.iter().any(|o| *o == answer) {
                    return Err(QuizError::InvalidOption(answer));
                }
                *selection = Some(answer);
                Ok(())
            }
            QuizState::Complete => Err(QuizError::Finished),
            other => Err(QuizError::InvalidState {
                action: "change the answer",
                state: other.describe(),
            }),
        }
    }

    /// Locks the current selection and moves to `Submitting`.
    ///
    /// Blank answers are rejected without any state change.
    pub fn begin_submit(&mut self) -> Result<GradeTicket, QuizError> {
        let (index, selection) = match &self.state {
            QuizState::Presenting { index, selection } => (*index, selection.clone()),
            QuizState::Complete => return Err(QuizError::Finished),
            other => {
                return Err(QuizError::InvalidState {
                    action: "submit",
                    state: other.describe(),
                })
            }
        };
        if index < self.results.len() {
            return Err(QuizError::AlreadyGraded(index));
        }
        let answer = selection
            .filter(|a| !a.trim().is_empty())
            .ok_or(QuizError::EmptyAnswer)?;

        let question = &self.questions[index];
        let request = GradeRequest {
            question: question.question.clone(),
            user_answer: answer.clone(),
            correct_answer: question.answer.clone(),
        };
        self.state = QuizState::Submitting { index, answer };
        Ok(GradeTicket { index, request })
    }

    /// Records the backend's grade for `ticket` and moves to `Feedback`.
    ///
    /// The result and the `Feedback` state stand even when the wrong note
    /// cannot be written; that failure is returned as `StudyError::Store`.
    pub fn complete_submit(&mut self, ticket: GradeTicket, grade: Grade) -> StudyResult<QuizResult> {
        match &self.state {
            QuizState::Submitting { index, .. } if *index == ticket.index => {}
            _ => return Err(QuizError::StaleResponse(ticket.index).into()),
        }
        debug_assert_eq!(ticket.index, self.results.len());

        let GradeRequest {
            question,
            user_answer,
            correct_answer,
        } = ticket.request;
        let result = QuizResult {
            index: ticket.index,
            question,
            user_answer,
            correct_answer,
            is_correct: grade.is_correct,
            feedback: grade.feedback,
        };
        self.results.push(result.clone());
        self.state = QuizState::Feedback {
            index: ticket.index,
            result: result.clone(),
        };

        if !result.is_correct {
            let explanation = Some(result.feedback.clone())
                .filter(|f| !f.trim().is_empty())
                .or_else(|| self.questions[ticket.index].explanation.clone());
            let note = WrongNote {
                question: result.question.clone(),
                user_answer: result.user_answer.clone(),
                correct_answer: result.correct_answer.clone(),
                explanation,
                created_at: Utc::now(),
            };
            if let Err(e) = self.notes.add(note) {
                warn!("Failed to persist wrong note for question {}: {}", ticket.index + 1, e);
                return Err(StudyError::Store(e));
            }
        }
        Ok(result)
    }

    /// The grading call failed: return to `Presenting` with the answer kept so
    /// the user can retry.
    pub fn fail_submit(&mut self, ticket: GradeTicket) -> Result<(), QuizError> {
        let answer = match &mut self.state {
            QuizState::Submitting { index, answer } if *index == ticket.index => std::mem::take(answer),
            _ => return Err(QuizError::StaleResponse(ticket.index)),
        };
        self.state = QuizState::Presenting {
            index: ticket.index,
            selection: Some(answer),
        };
        Ok(())
    }

    /// Submits the current selection to the backend and records the grade.
    pub async fn submit(&mut self, bridge: &dyn SessionBridge) -> StudyResult<QuizResult> {
        let ticket = self.begin_submit()?;
        let graded = bridge.grade(ticket.request()).await;
        match graded {
            Ok(grade) => self.complete_submit(ticket, grade),
            Err(e) => {
                warn!("Grading question {} failed: {}", ticket.index() + 1, e);
                self.fail_submit(ticket)?;
                Err(e.into())
            }
        }
    }

    /// Moves to the next question, or to `Complete` after the last one.
    pub fn advance(&mut self) -> Result<&QuizState, QuizError> {
        let index = match &self.state {
            QuizState::Feedback { index, .. } => *index,
            QuizState::Presenting { index, .. } if *index < self.results.len() => *index,
            QuizState::Presenting { index, .. } => return Err(QuizError::NotGraded(*index)),
            QuizState::Complete => return Err(QuizError::Finished),
            other => {
                return Err(QuizError::InvalidState {
                    action: "advance",
                    state: other.describe(),
                })
            }
        };

        let next = index + 1;
        self.state = if next < self.questions.len() {
            QuizState::Presenting {
                index: next,
                selection: None,
            }
        } else {
            let report = self.report();
            info!(
                "Quiz complete: {}/{} correct ({}%)",
                report.correct,
                report.total,
                report.score_percent()
            );
            QuizState::Complete
        };
        Ok(&self.state)
    }

    /// Goes back one question with the selection cleared. Results already
    /// recorded for that question stand.
    pub fn previous(&mut self) -> Result<&QuizState, QuizError> {
        let index = match &self.state {
            QuizState::Presenting { index, .. } | QuizState::Feedback { index, .. } => *index,
            QuizState::Complete => return Err(QuizError::Finished),
            other => {
                return Err(QuizError::InvalidState {
                    action: "go back",
                    state: other.describe(),
                })
            }
        };
        if index == 0 {
            return Err(QuizError::AtFirstQuestion);
        }
        self.state = QuizState::Presenting {
            index: index - 1,
            selection: None,
        };
        Ok(&self.state)
    }
}
