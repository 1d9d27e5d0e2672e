// System status display: ledger size and row count, current model run.

use anyhow::Result;

use crate::config::Config;
use crate::ledger::CommentLedger;
use crate::model::store::ModelStore;

/// Display system status to the terminal.
pub async fn show(config: &Config, ledger: &dyn CommentLedger) -> Result<()> {
    match std::fs::metadata(&config.ledger_path) {
        Ok(meta) => {
            println!(
                "Ledger: {} ({})",
                config.ledger_path.display(),
                format_bytes(meta.len())
            );
            println!("Comments: {}", ledger.count().await?);
        }
        Err(_) => {
            println!("Ledger: {} (not created yet)", config.ledger_path.display());
            println!("  The first published comment creates it");
        }
    }

    let store = ModelStore::new(&config.model_dir);
    match store.current_run()? {
        Some(run) if store.artifacts_present() => {
            println!("Model: {} in {}", run, config.model_dir.display());
        }
        Some(run) => {
            println!("Model: run {} is incomplete", run);
            println!("  Run `toxgate train <corpus.csv>` to publish a new one");
        }
        None => {
            println!("Model: not trained yet");
            println!("  Run `toxgate train <corpus.csv>` to build it");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
