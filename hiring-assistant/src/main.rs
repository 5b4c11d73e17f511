use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

use hiring_assistant::conversation::machine::{ConversationEngine, TurnOutput};
use hiring_assistant::conversation::state::{ConversationState, Phase};
use hiring_assistant::generation::{CellOutcome, GenerationReport};
use hiring_assistant::profile::{CompanyProfile, ProfileStore};
use hiring_assistant::providers::{MarkdownWriter, OpenAiCompletion};
use hiring_assistant::session::SessionStore;
use hiring_assistant_sdk::DocumentWriter;

/// Conversational hiring planner CLI
#[derive(Parser, Debug)]
#[command(
    name = "hiring-assistant",
    version,
    about = "Turns a free-text hiring request into job descriptions, checklists, timelines, salary recommendations and interview questions"
)]
struct Args {
    /// Initial hiring request; prompted interactively when omitted
    request: Option<String>,

    /// Resume an existing session by id
    #[arg(long)]
    session: Option<Uuid>,

    /// List stored sessions and exit
    #[arg(long)]
    list_sessions: bool,

    /// Delete sessions older than N days and exit
    #[arg(long)]
    cleanup_days: Option<i64>,

    /// Directory for generated hiring documents
    #[arg(long, default_value = "hiring_materials")]
    output_dir: PathBuf,

    /// Number of documents generated in parallel
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Session database path (default: ~/.hiring-assistant/sessions.db)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Company profile file
    #[arg(long, default_value = "company_profile.yaml")]
    profile: PathBuf,
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".hiring-assistant").join("sessions.db"))
        .unwrap_or_else(|| PathBuf::from("sessions.db"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let store = SessionStore::new(args.db_path.clone().unwrap_or_else(default_db_path))?;
    store.initialize_schema()?;

    if args.list_sessions {
        return print_sessions(&store);
    }
    if let Some(days) = args.cleanup_days {
        let deleted = store.cleanup_older_than(days)?;
        println!("Deleted {} old session(s)", deleted);
        return Ok(());
    }

    let profile_store = ProfileStore::new(&args.profile);
    let mut profile = profile_store.load()?;

    let completion = Arc::new(OpenAiCompletion::from_env()?);
    let engine = ConversationEngine::new(completion);
    let writer: Arc<dyn DocumentWriter> = Arc::new(MarkdownWriter::new(&args.output_dir));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut state = match args.session {
        Some(id) => {
            let state = store
                .load(&id)?
                .with_context(|| format!("No stored session with id {}", id))?;
            println!(
                "Resuming session {} ({} role(s), phase: {})",
                state.session_id,
                state.roles.len(),
                state.phase.as_str()
            );
            if !state.pending_questions.is_empty() {
                println!("Open questions:");
                for (i, q) in state.pending_questions.iter().enumerate() {
                    println!("{}. {}", i + 1, q);
                }
            }
            state
        }
        None => {
            let request = match args.request.clone() {
                Some(request) => request,
                None => {
                    println!("What would you like to hire for?");
                    read_line(&mut lines).await?.context("No input received")?
                }
            };
            let (state, output) = engine.start(&request, &profile).await;
            handle_output(&output, &profile_store, &mut profile)?;
            store.save(&state)?;
            state
        }
    };

    loop {
        match state.phase {
            Phase::GeneratingContent => {
                run_generation_passes(
                    &engine,
                    &mut state,
                    &profile,
                    writer.clone(),
                    args.concurrency,
                    &store,
                )
                .await?;
            }
            Phase::Complete => {
                println!(
                    "\nAll done! Your hiring materials are in {}/{}",
                    args.output_dir.display(),
                    state.session_id
                );
                break;
            }
            _ => {
                let Some(input) = read_line(&mut lines).await? else {
                    println!("\nSession saved. Resume with --session {}", state.session_id);
                    break;
                };
                if input.trim().is_empty() {
                    continue;
                }
                let output = engine.submit_user_text(&mut state, input.trim(), &profile).await;
                handle_output(&output, &profile_store, &mut profile)?;
                store.save(&state)?;
            }
        }
    }

    Ok(())
}

/// Drive generation passes until every cell is resolved
async fn run_generation_passes(
    engine: &ConversationEngine,
    state: &mut ConversationState,
    profile: &CompanyProfile,
    writer: Arc<dyn DocumentWriter>,
    concurrency: usize,
    store: &SessionStore,
) -> Result<()> {
    loop {
        let report = engine
            .run_generation(state, profile, writer.clone(), concurrency)
            .await?;
        store.save(state)?;
        print_report(&report);

        if report.pending_retry == 0 {
            break;
        }
        println!("Retrying {} failed document(s)...\n", report.pending_retry);
    }
    Ok(())
}

fn print_report(report: &GenerationReport) {
    println!();
    for cell in &report.cells {
        match &cell.outcome {
            CellOutcome::Success { artifact } => {
                println!(
                    "✓ {} for {}: {}",
                    cell.kind.label(),
                    cell.role_title,
                    artifact.location
                );
            }
            CellOutcome::Failed { error, permanent } => {
                if *permanent {
                    println!(
                        "✗ {} for {} failed permanently: {}",
                        cell.kind.label(),
                        cell.role_title,
                        error
                    );
                } else {
                    println!(
                        "… {} for {} failed, will retry: {}",
                        cell.kind.label(),
                        cell.role_title,
                        error
                    );
                }
            }
        }
    }
    println!(
        "\n{} succeeded, {} permanently failed",
        report.succeeded(),
        report.failed_permanently()
    );
}

fn handle_output(
    output: &TurnOutput,
    profile_store: &ProfileStore,
    profile: &mut CompanyProfile,
) -> Result<()> {
    for message in &output.messages {
        println!("\n{}", message);
    }
    if !output.profile_updates.is_empty() {
        *profile = profile_store.apply(&output.profile_updates)?;
    }
    Ok(())
}

fn print_sessions(store: &SessionStore) -> Result<()> {
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No stored sessions.");
        return Ok(());
    }
    for session in sessions {
        let status = if session.completed { "done" } else { "open" };
        println!(
            "{}  [{}]  {}  ({})",
            session.id,
            status,
            session.request,
            if session.role_titles.is_empty() {
                "no roles yet".to_string()
            } else {
                session.role_titles.join(", ")
            }
        );
    }
    Ok(())
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}
