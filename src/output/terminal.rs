// Colored terminal output for comments, reports and training results.
//
// This module handles all terminal-specific formatting: colors, tables,
// labels. The main.rs command handlers delegate here.

use chrono::{Local, NaiveDateTime};
use colored::Colorize;

use crate::ledger::Comment;
use crate::report::{Summary, UserActivity};
use crate::training::TrainingRun;

/// Display a comment feed, newest first as given.
pub fn display_comments(title: &str, comments: &[&Comment]) {
    if comments.is_empty() {
        println!("No comments yet. Run `toxgate submit` to add one.");
        return;
    }

    println!(
        "\n{}",
        format!("=== {} ({} comments) ===", title, comments.len()).bold()
    );
    println!();

    let now = Local::now().naive_local();
    for comment in comments {
        display_comment(comment, now);
    }
}

fn display_comment(comment: &Comment, now: NaiveDateTime) {
    let name = match parse_rgb(&comment.author.color) {
        Some((r, g, b)) => comment.author.display_name.truecolor(r, g, b).bold(),
        None => comment.author.display_name.bold(),
    };
    println!(
        "  {}  {}  {}",
        name,
        super::relative_time(comment.submitted_at, now).dimmed(),
        colorize_label(comment.is_toxic)
    );
    println!("    {}", super::truncate_chars(&comment.text, 200));
    println!();
}

pub fn display_summary(summary: &Summary) {
    println!("\n{}", "=== Comment Summary ===".bold());
    println!("  Total comments: {}", summary.total);
    println!(
        "  Toxic:          {} ({:.1}%)",
        summary.toxic.to_string().red(),
        summary.toxic_pct()
    );
    println!(
        "  Non-toxic:      {} ({:.1}%)",
        summary.non_toxic.to_string().green(),
        summary.non_toxic_pct()
    );
}

pub fn display_user_activity(users: &[UserActivity]) {
    if users.is_empty() {
        return;
    }

    println!("\n{}", "=== User Activity ===".bold());
    println!(
        "  {:<24} {:>7} {:>7}",
        "User".dimmed(),
        "Total".dimmed(),
        "Toxic".dimmed()
    );
    println!("  {}", "-".repeat(40).dimmed());
    for user in users {
        let toxic = if user.toxic > 0 {
            user.toxic.to_string().red()
        } else {
            user.toxic.to_string().normal()
        };
        println!("  {:<24} {:>7} {:>7}", user.username, user.total, toxic);
    }
}

pub fn display_training_run(run: &TrainingRun) {
    println!("\n{}", "=== Training Complete ===".bold());
    println!("  Run: {}", run.model.run_id());
    println!("  Vocabulary: {} terms", run.model.extractor().dim());
    println!(
        "  Rows: {} training, {} held out",
        run.train_size, run.eval_size
    );
    if !run.model.classifier().converged() {
        println!(
            "  {} optimizer stopped after {} iterations without converging",
            "Warning:".yellow(),
            run.model.classifier().iterations()
        );
    }

    match run.report.accuracy {
        Some(accuracy) => {
            println!("  Accuracy: {:.2}\n", accuracy);
            for line in run.report.to_string().lines() {
                println!("  {line}");
            }
        }
        None => println!(
            "  {}",
            "Not enough rows to hold any out for evaluation.".dimmed()
        ),
    }
}

pub fn display_classification(text: &str, is_toxic: bool) {
    println!("{}  {}", colorize_label(is_toxic), super::truncate_chars(text, 120).dimmed());
}

pub fn display_flag(text: &str, warning: &str) {
    println!("\n{} {}", "Flagged:".red().bold(), warning);
    println!("  \"{}\"", super::truncate_chars(text, 200).dimmed());
}

fn colorize_label(is_toxic: bool) -> colored::ColoredString {
    if is_toxic {
        "TOXIC".red().bold()
    } else {
        "ok".green()
    }
}

/// Parse a stored `rgb(r,g,b)` colour.
fn parse_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let inner = color.trim().strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>());
    let rgb = (parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
    parts.next().is_none().then_some(rgb)
}
