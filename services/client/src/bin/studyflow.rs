//! services/client/src/bin/studyflow.rs

use bytes::Bytes;
use clap::{Parser, Subcommand};
use client_lib::{
    adapters::{FileKeyValueStore, HttpSessionBridge},
    config::Config,
    error::CliError,
    interactive::{describe, run_quiz, QuizOutcome},
};
use std::path::PathBuf;
use std::sync::Arc;
use studyflow_core::{
    AuthState, Decoded, KeyValueStore, QuizKind, SavedSession, StudyContext, StudyError, StudyWorkflow,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// studyflow - study a document with AI-generated summaries and quizzes
#[derive(Parser, Debug)]
#[command(name = "studyflow")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a PDF or TXT document and start a new study session
    Upload {
        /// Path to the document
        file: PathBuf,
        /// Display name for the document
        #[arg(short, long)]
        name: String,
        /// Category; "english" documents are also translated by the backend
        #[arg(short, long, default_value = "general")]
        category: String,
    },

    /// Take a quiz over the current document
    Quiz {
        /// Generate a new quiz with this many questions instead of reusing the last one
        #[arg(short = 'n', long)]
        count: Option<u32>,
        /// Quiz type: objective, truefalse or short
        #[arg(short, long, default_value = "objective")]
        kind: QuizKind,
    },

    /// Show pending wrong notes
    Notes,

    /// Save summary, quiz and wrong notes to your account
    Save,

    /// Discard pending wrong notes
    Discard,

    /// List saved study sessions, or inspect one
    Files {
        #[command(subcommand)]
        action: Option<FilesCommand>,
    },

    /// Delete a saved study session
    Delete {
        id: i64,
    },

    /// Ask a question about the current document
    Ask {
        question: Vec<String>,
    },

    /// Export the current summary, last quiz attempt and wrong notes as a PDF
    Pdf {
        #[arg(short, long, default_value = "study.pdf")]
        out: PathBuf,
    },

    /// Store the access token sent with backend requests
    Login {
        token: String,
    },

    /// Forget the stored access token
    Logout,
}

#[derive(Subcommand, Debug)]
enum FilesCommand {
    /// Show the summary, quiz and wrong notes of a saved session
    Show {
        id: i64,
    },
    /// Export a saved session as a PDF
    Pdf {
        id: i64,
        /// Output path; defaults to "<name>_study.pdf"
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Using backend at {}", config.api_base_url);

    // --- 2. Open Local State & Build the Backend Adapter ---
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(config.state_dir.clone()));
    let context = StudyContext::new(storage.clone());
    let token = context.auth().map(|auth| auth.token);
    let http_client = HttpSessionBridge::build_client(config.request_timeout)?;
    let bridge = Arc::new(HttpSessionBridge::new(
        http_client,
        config.api_base_url.clone(),
        token,
    ));

    // --- 3. Build the Workflow & Run the Command ---
    let workflow = StudyWorkflow::new(bridge, storage, config.max_upload_bytes);
    if let Err(e) = run(cli.command, &workflow).await {
        error!("Command failed: {}", e);
        eprintln!("error: {}", user_message(&e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, workflow: &StudyWorkflow) -> Result<(), CliError> {
    match command {
        Commands::Upload { file, name, category } => {
            let bytes = Bytes::from(tokio::fs::read(&file).await?);
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CliError::Internal(format!("'{}' has no file name", file.display())))?;
            let result = workflow.upload_document(file_name, bytes, &name, &category).await?;

            if let Some(summary) = &result.summary {
                println!("{}\n", summary);
            }
            let keywords = result.keyword_list();
            if !keywords.is_empty() {
                println!("Keywords: {}", keywords.join(", "));
            }
            match result.session_id {
                Some(id) => println!("Study session {} started.", id),
                None => println!("Not signed in: this session cannot be saved."),
            }
        }
        Commands::Quiz { count, kind } => {
            if let Some(count) = count {
                workflow.generate_quiz(count, kind).await?;
            }
            let mut runner = workflow.start_quiz()?;
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut out = std::io::stdout();
            let outcome = run_quiz(&mut runner, workflow.bridge(), &mut input, &mut out).await;
            workflow.record_attempt(&runner)?;
            if outcome? == QuizOutcome::Abandoned {
                println!("Quiz stopped. Wrong answers so far are kept in your notes.");
            }
        }
        Commands::Notes => {
            let notes = workflow.wrong_notes();
            if notes.is_empty() {
                println!("No wrong notes. Well done!");
            }
            for note in notes {
                println!("[{}] {}", note.created_at.format("%Y-%m-%d %H:%M"), note.question);
                println!("    your answer:    {}", note.user_answer);
                println!("    correct answer: {}", note.correct_answer);
                if let Some(explanation) = note.explanation {
                    println!("    {}", explanation);
                }
            }
        }
        Commands::Save => {
            let saved = workflow.save_session().await?;
            println!("Study session saved with {} wrong notes.", saved);
        }
        Commands::Discard => {
            workflow.discard_and_restart()?;
            println!("Wrong notes discarded. Run `studyflow quiz -n <count>` for a new round.");
        }
        Commands::Files { action: Some(FilesCommand::Show { id }) } => {
            let saved = workflow.saved_session(id).await?;
            show_saved(&saved);
        }
        Commands::Files { action: Some(FilesCommand::Pdf { id, out }) } => {
            let (saved, pdf) = workflow.export_saved_pdf(id).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}_study.pdf", saved.custom_filename)));
            tokio::fs::write(&out, &pdf).await?;
            println!("Wrote {} ({} bytes).", out.display(), pdf.len());
        }
        Commands::Files { action: None } => {
            for file in workflow.list_saved().await? {
                println!(
                    "{:>5}  {}  [{}]  {}{}",
                    file.id,
                    file.custom_filename,
                    file.category.as_deref().unwrap_or("-"),
                    file.created_at.as_deref().unwrap_or(""),
                    if file.has_study_data() { "  (saved study data)" } else { "" }
                );
            }
        }
        Commands::Delete { id } => {
            workflow.delete_saved(id).await?;
            println!("Deleted saved session {}.", id);
        }
        Commands::Ask { question } => {
            let answer = workflow.ask(&question.join(" ")).await?;
            println!("{}", answer);
        }
        Commands::Pdf { out } => {
            let pdf = workflow.export_pdf().await?;
            tokio::fs::write(&out, &pdf).await?;
            println!("Wrote {} ({} bytes).", out.display(), pdf.len());
        }
        Commands::Login { token } => {
            workflow.context().set_auth(&AuthState { token, user: None })?;
            println!("Token stored.");
        }
        Commands::Logout => {
            workflow.context().clear_auth()?;
            println!("Signed out.");
        }
    }
    Ok(())
}

fn show_saved(saved: &SavedSession) {
    println!("{} (#{})", saved.custom_filename, saved.id);
    if let Some(created_at) = &saved.created_at {
        println!("Saved at {}", created_at);
    }
    if !saved.has_study_data() {
        println!("No study data was saved with this file.");
        return;
    }

    println!("\n== Summary ==");
    match saved.summary_text() {
        Some(text) => println!("{}", text),
        None => println!("(unavailable)"),
    }
    let keywords = saved.keywords();
    if !keywords.is_empty() {
        println!("Keywords: {}", keywords.join(", "));
    }

    println!("\n== Quiz ==");
    match saved.quiz() {
        Decoded::Available(quiz) => {
            for (i, question) in quiz.questions.iter().enumerate() {
                println!("{}. {}", i + 1, question.question);
                println!("   answer: {}", question.answer);
            }
        }
        Decoded::Unavailable { reason } => println!("(unavailable: {})", reason),
    }

    println!("\n== Wrong notes ==");
    match saved.wrong_notes() {
        Decoded::Available(notes) if notes.is_empty() => println!("None."),
        Decoded::Available(notes) => {
            for note in notes {
                println!("- {}", note.question);
                println!("    your answer:    {}", note.user_answer);
                println!("    correct answer: {}", note.correct_answer);
            }
        }
        Decoded::Unavailable { reason } => println!("(unavailable: {})", reason),
    }
}

fn user_message(error: &CliError) -> String {
    match error {
        CliError::Study(StudyError::Port(e)) => describe(e),
        other => other.to_string(),
    }
}
