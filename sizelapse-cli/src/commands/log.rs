use super::{format_bytes, require_timeline, SourceArgs};
use anyhow::Result;
use colored::Colorize;
use sizelapse_core::ViewConfig;

pub async fn run(source: SourceArgs, limit: Option<usize>) -> Result<()> {
    let state = source.load(ViewConfig::default()).await?;
    let Some(timeline) = require_timeline(state)? else {
        return Ok(());
    };
    let commits = timeline.history();

    println!("{}", "Commit History".bold().cyan());
    println!();

    let to_show = limit.unwrap_or(commits.len()).min(commits.len());

    for commit in commits.iter().rev().take(to_show) {
        println!(
            "{} {} {}",
            "commit".yellow().bold(),
            commit.hash.yellow(),
            format!("({}/{})", commit.commit_number, commits.len()).dimmed()
        );
        println!("{}: {}", "Author".bold(), commit.author);
        println!();
        println!("    {}", commit.message);
        println!();
        println!(
            "    {} file(s), {}",
            commit.tree.file_count().to_string().cyan(),
            format_bytes(commit.tree.aggregate_size()).cyan()
        );
        println!();
    }

    if commits.len() > to_show {
        println!(
            "{}",
            format!("... and {} more commits", commits.len() - to_show).dimmed()
        );
        println!("Use {} to see more", "--limit N".cyan());
    }

    Ok(())
}
