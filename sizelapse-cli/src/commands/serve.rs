use anyhow::Result;
use colored::Colorize;
use sizelapse_core::ExtractOptions;
use sizelapse_server::SizelapseServer;
use std::path::PathBuf;

pub async fn run(repo: PathBuf, port: u16, static_dir: Option<PathBuf>, jobs: usize) -> Result<()> {
    let abs_path = std::fs::canonicalize(&repo)?;

    println!("{}", "Starting sizelapse server...".bold().cyan());
    println!("   {}: {:?}", "Repository".bold(), abs_path);
    if let Some(dir) = &static_dir {
        println!("   {}: {:?}", "Static files".bold(), dir);
    }

    let server = SizelapseServer::new(abs_path, static_dir)?
        .with_options(ExtractOptions { concurrency: jobs });

    println!(
        "   {}: {}",
        "History API".bold(),
        format!("http://localhost:{}/api/history", port).green()
    );
    println!();
    println!("{}", "Press Ctrl+C to stop".dimmed());
    println!();

    let addr = format!("0.0.0.0:{}", port).parse()?;
    server.serve(addr).await?;

    Ok(())
}
