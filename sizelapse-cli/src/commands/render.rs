use super::{require_timeline, SourceArgs};
use anyhow::Result;
use colored::Colorize;
use sizelapse_core::{
    render_commit, render_svg, Error, FilterConfig, FrontChainPacker, ViewConfig,
};
use std::path::PathBuf;

pub async fn run(
    source: SourceArgs,
    commit: Option<usize>,
    hide_json: bool,
    hide_images: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = ViewConfig::default();
    let state = source.load(config.clone()).await?;
    let Some(timeline) = require_timeline(state)? else {
        return Ok(());
    };

    let number = commit.unwrap_or(timeline.len());
    let snapshot = number
        .checked_sub(1)
        .and_then(|index| timeline.history().get(index))
        .ok_or(Error::CommitNotFound(number))?;

    let filters = FilterConfig {
        hide_json,
        hide_images,
    };
    let frame = render_commit(snapshot, &filters, &config, &FrontChainPacker);
    let svg = render_svg(&frame, &config);

    match output {
        Some(path) => {
            tokio::fs::write(&path, svg).await?;
            eprintln!(
                "{} commit {} to {}",
                "Rendered".green().bold(),
                number,
                path.display()
            );
        }
        None => print!("{}", svg),
    }

    Ok(())
}
