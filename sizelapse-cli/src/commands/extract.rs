use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sizelapse_core::{ExtractOptions, GitCli, HistoryExtractor, HistoryResponse};
use std::path::PathBuf;

pub async fn run(repo: PathBuf, output: Option<PathBuf>, jobs: usize, pretty: bool) -> Result<()> {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} commits")?
            .progress_chars("##-"),
    );

    let bar = progress.clone();
    let extractor = HistoryExtractor::new(GitCli::new(&repo))
        .with_options(ExtractOptions { concurrency: jobs })
        .with_progress(move |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        });

    let response = extractor.extract_response().await;
    progress.finish_and_clear();

    let json = response.to_json(pretty)?;

    match &output {
        Some(path) => tokio::fs::write(path, json + "\n").await?,
        None => println!("{}", json),
    }

    if let HistoryResponse::Failure { error } = response {
        anyhow::bail!(error);
    }

    Ok(())
}
