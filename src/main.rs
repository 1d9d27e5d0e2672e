use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use toxgate::config::Config;
use toxgate::error::{is_kind, ModerationError};
use toxgate::features::tokenize::VectorizerConfig;
use toxgate::ledger::{CommentLedger, CsvLedger};
use toxgate::model::cache::ModelCache;
use toxgate::model::store::ModelStore;
use toxgate::moderation::{ModerationSession, SessionOutcome};
use toxgate::output::terminal;
use toxgate::training::{TrainingConfig, TrainingPipeline};

/// Toxgate: toxicity-gated comment moderation.
///
/// Trains a text classifier on labelled comments and uses it to hold back
/// toxic submissions until the author edits, overrides or cancels them.
#[derive(Parser)]
#[command(name = "toxgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and publish a model from a CSV corpus with text and label columns
    Train {
        /// Path to the training corpus
        corpus: PathBuf,
    },

    /// Classify a piece of text with the current model
    Classify {
        /// The text to classify
        text: String,
    },

    /// Submit a comment through the moderation workflow
    Submit {
        /// Comment text (prompted for if omitted)
        text: Option<String>,

        /// Display name (random if omitted)
        #[arg(long)]
        name: Option<String>,

        /// Profile colour as rgb(r,g,b) (random if omitted)
        #[arg(long)]
        color: Option<String>,
    },

    /// List published comments, newest first
    Comments {
        /// Only show comments labelled toxic
        #[arg(long)]
        toxic_only: bool,

        /// Maximum number of comments to show (default: 100)
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Summarize the comment ledger
    Report,

    /// Show system status (ledger size, current model)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("toxgate=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { corpus } => {
            let config = Config::load()?;
            let training_config = TrainingConfig {
                vectorizer: VectorizerConfig {
                    max_features: config.max_features,
                    ..VectorizerConfig::default()
                },
                ..TrainingConfig::default()
            };
            let store = ModelStore::new(&config.model_dir);
            let pipeline = TrainingPipeline::new(store.clone(), training_config);
            let cache = Arc::new(ModelCache::new(store));

            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner} {msg} ({elapsed})")
                    .unwrap(),
            );
            pb.set_message(format!("Training on {}", corpus.display()));
            pb.enable_steady_tick(Duration::from_millis(120));

            let trained = Arc::clone(&cache);
            let result = tokio::task::spawn_blocking(move || {
                pipeline.train_from_path_into(&corpus, &trained)
            })
            .await
            .context("Training task panicked")?;
            pb.finish_and_clear();
            let run = result?;

            terminal::display_training_run(&run);
            println!(
                "\n{}",
                format!("Model published to {}", config.model_dir.display()).bold()
            );

            // Label any pending ledger rows with the model just trained
            let ledger = CsvLedger::new(&config.ledger_path);
            let rows = ledger.load_all(cache.as_ref()).await?;
            info!(rows = rows.len(), "Ledger labelled with new model");
        }

        Commands::Classify { text } => {
            let config = Config::load()?;
            config.require_model()?;
            let cache = ModelCache::new(ModelStore::new(&config.model_dir));
            let model = cache.get()?;
            terminal::display_classification(&text, model.classify(&text));
        }

        Commands::Submit { text, name, color } => {
            let config = Config::load()?;
            config.require_model()?;

            // Load the model once for the whole session
            let cache = ModelCache::new(ModelStore::new(&config.model_dir));
            let classifier = cache.get()?;
            let ledger: Arc<dyn CommentLedger> = Arc::new(CsvLedger::new(&config.ledger_path));

            let mut author = toxgate::profile::random_author();
            if let Some(name) = name {
                author.display_name = name;
            }
            if let Some(color) = color {
                author.color = color;
            }
            println!("Posting as {}", author.display_name.bold());

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let text = match text {
                Some(text) => text,
                None => prompt(&mut lines, "Comment: ").await?.unwrap_or_default(),
            };

            let mut session = ModerationSession::new(text, author, classifier, ledger)?;
            run_session(&mut session, &mut lines).await?;
        }

        Commands::Comments { toxic_only, limit } => {
            let config = Config::load()?;
            let cache = ModelCache::new(ModelStore::new(&config.model_dir));
            let ledger = CsvLedger::new(&config.ledger_path);
            let all = ledger.load_all(&cache).await?;

            let mut shown = toxgate::report::recent(&all, all.len());
            if toxic_only {
                shown.retain(|c| c.is_toxic);
            }
            shown.truncate(limit);

            let title = if toxic_only { "Toxic Comments" } else { "Recent Comments" };
            terminal::display_comments(title, &shown);
        }

        Commands::Report => {
            let config = Config::load()?;
            let cache = ModelCache::new(ModelStore::new(&config.model_dir));
            let ledger = CsvLedger::new(&config.ledger_path);
            let all = ledger.load_all(&cache).await?;
            info!(rows = all.len(), "Loaded ledger for report");

            terminal::display_summary(&toxgate::report::summarize(&all));
            terminal::display_user_activity(&toxgate::report::user_activity(&all));

            let recent = toxgate::report::recent(&all, toxgate::report::DEFAULT_RECENT_LIMIT);
            terminal::display_comments("Recent Comments", &recent);

            let toxic = toxgate::report::toxic_only(&all);
            if !toxic.is_empty() {
                terminal::display_comments("Toxic Comments", &toxic);
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            let ledger = CsvLedger::new(&config.ledger_path);
            toxgate::status::show(&config, &ledger).await?;
        }
    }

    Ok(())
}

/// Drive a submission until it is published or cancelled.
/// End of input while flagged counts as cancel.
async fn run_session(
    session: &mut ModerationSession,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    let mut outcome = session.submit().await?;

    loop {
        outcome = match outcome {
            SessionOutcome::Published(comment) => {
                let note = if comment.is_toxic {
                    " (recorded as toxic)".red().to_string()
                } else {
                    String::new()
                };
                println!("{} Comment published{}", "✓".green(), note);
                return Ok(());
            }
            SessionOutcome::Cancelled => {
                println!("Submission cancelled. Nothing was saved.");
                return Ok(());
            }
            SessionOutcome::Flagged { text, warning } => {
                terminal::display_flag(&text, warning);
                println!(
                    "  {}  {}  {}",
                    "[e] edit and check again".dimmed(),
                    "[s] submit anyway".dimmed(),
                    "[c] cancel".dimmed()
                );

                let Some(choice) = prompt(lines, "> ").await? else {
                    session.cancel().await?;
                    print_input_closed();
                    return Ok(());
                };

                match choice.trim().to_ascii_lowercase().as_str() {
                    "e" | "edit" => {
                        let Some(edited) = prompt(lines, "Edited comment: ").await? else {
                            session.cancel().await?;
                            print_input_closed();
                            return Ok(());
                        };
                        match session.recheck(&edited).await {
                            Ok(next) => next,
                            Err(e) if is_kind(&e, |k| matches!(k, ModerationError::EmptyComment)) => {
                                println!("{}", "Comment cannot be empty.".yellow());
                                SessionOutcome::Flagged { text, warning }
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    "s" | "submit" => session.submit_anyway().await?,
                    "c" | "cancel" => session.cancel().await?,
                    other => {
                        println!("{}", format!("Unknown choice {other:?}").yellow());
                        SessionOutcome::Flagged { text, warning }
                    }
                }
            }
        };
    }
}

fn print_input_closed() {
    println!("\nInput closed. Submission cancelled; nothing was saved.");
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}
