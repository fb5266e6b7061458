use super::{require_timeline, SourceArgs};
use anyhow::Result;
use colored::Colorize;
use sizelapse_core::{render_svg, Control, FilterConfig, Player, PlayerEvent, ViewConfig};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const MIN_DELAY: Duration = Duration::from_millis(50);
const MAX_DELAY: Duration = Duration::from_secs(10);

pub async fn run(
    source: SourceArgs,
    out: PathBuf,
    speed: u64,
    hide_json: bool,
    hide_images: bool,
) -> Result<()> {
    let config = ViewConfig {
        playback_delay_ms: speed,
        ..ViewConfig::default()
    };
    let state = source.load(config.clone()).await?;
    let Some(mut timeline) = require_timeline(state)? else {
        return Ok(());
    };

    let filters = FilterConfig {
        hide_json,
        hide_images,
    };
    timeline.set_filters(filters);
    timeline.set_commit(0);
    tokio::fs::create_dir_all(&out).await?;

    println!("{}", "Playing history...".bold().cyan());
    println!("   {}: {} commits", "History".bold(), timeline.len());
    println!("   {}: {}", "Frames".bold(), out.display());
    println!(
        "   {}",
        "space/p play-pause, n/b next/back, <number> seek, j/i filters, +/- speed, q quit".dimmed()
    );
    println!();

    let (control_tx, control_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let input_closed = CancellationToken::new();

    let player = tokio::spawn(
        Player::new(timeline, control_rx, event_tx)
            .with_cancellation(cancel.clone())
            .run(),
    );

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // Stdin is read on a plain thread so a pending read never holds up exit.
    {
        let controls = control_tx.clone();
        let input_closed = input_closed.clone();
        let delay = config.playback_delay();
        std::thread::spawn(move || read_controls(controls, filters, delay, input_closed));
    }

    control_tx.send(Control::Play).await?;

    let mut written = 0usize;
    let mut stopped = false;
    let mut animating = true;
    let mut input_done = false;
    let mut shutdown_sent = false;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    PlayerEvent::Frame { index, frame } => {
                        animating = true;
                        let path = out.join(format!("frame-{:05}.svg", written));
                        tokio::fs::write(&path, render_svg(&frame, &config)).await?;
                        debug!(index, path = %path.display(), "Wrote frame");
                        written += 1;
                    }
                    PlayerEvent::Settled { index } => {
                        animating = false;
                        println!(
                            "{} commit {}",
                            "Showing".green(),
                            (index + 1).to_string().cyan()
                        );
                    }
                    PlayerEvent::PlaybackStopped { index } => {
                        stopped = true;
                        println!(
                            "{} at commit {}",
                            "Playback stopped".yellow(),
                            (index + 1).to_string().cyan()
                        );
                    }
                }
            }
            _ = input_closed.cancelled(), if !input_done => {
                input_done = true;
            }
        }

        if input_done && stopped && !animating && !shutdown_sent {
            shutdown_sent = true;
            if control_tx.send(Control::Shutdown).await.is_err() {
                break;
            }
        }
    }

    let timeline = player.await?;
    println!();
    println!(
        "{} {} frame(s) to {}",
        "Wrote".green().bold(),
        written,
        out.display()
    );
    println!("{}", timeline.caption().dimmed());

    Ok(())
}

fn read_controls(
    controls: mpsc::Sender<Control>,
    mut filters: FilterConfig,
    mut delay: Duration,
    input_closed: CancellationToken,
) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let Some(control) = parse_control(&line, &mut filters, &mut delay) else {
            if !line.trim().is_empty() {
                warn!("Unknown command: {:?}", line.trim());
            }
            continue;
        };
        let quit = control == Control::Shutdown;
        if controls.blocking_send(control).is_err() || quit {
            break;
        }
    }
    input_closed.cancel();
}

/// Map one line of input to a player control.
fn parse_control(line: &str, filters: &mut FilterConfig, delay: &mut Duration) -> Option<Control> {
    let command = line.trim();
    if command.is_empty() {
        return line.contains(' ').then_some(Control::TogglePlay);
    }

    match command {
        "p" | "space" => Some(Control::TogglePlay),
        "n" => Some(Control::Next),
        "b" => Some(Control::Previous),
        "q" => Some(Control::Shutdown),
        "j" => {
            filters.hide_json = !filters.hide_json;
            Some(Control::SetFilters(*filters))
        }
        "i" => {
            filters.hide_images = !filters.hide_images;
            Some(Control::SetFilters(*filters))
        }
        "+" => {
            *delay = (*delay / 2).max(MIN_DELAY);
            Some(Control::SetSpeed(*delay))
        }
        "-" => {
            *delay = (*delay * 2).min(MAX_DELAY);
            Some(Control::SetSpeed(*delay))
        }
        _ => command
            .parse::<usize>()
            .ok()
            .map(|number| Control::Seek(number.saturating_sub(1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<Control> {
        let mut filters = FilterConfig::default();
        let mut delay = Duration::from_millis(500);
        parse_control(line, &mut filters, &mut delay)
    }

    #[test]
    fn test_parse_navigation() {
        assert_eq!(parse(" "), Some(Control::TogglePlay));
        assert_eq!(parse("p"), Some(Control::TogglePlay));
        assert_eq!(parse("n"), Some(Control::Next));
        assert_eq!(parse("b"), Some(Control::Previous));
        assert_eq!(parse("q"), Some(Control::Shutdown));
        assert_eq!(parse("3"), Some(Control::Seek(2)));
        assert_eq!(parse("0"), Some(Control::Seek(0)));
        assert_eq!(parse(""), None);
        assert_eq!(parse("zoom"), None);
    }

    #[test]
    fn test_filter_toggles_accumulate() {
        let mut filters = FilterConfig::default();
        let mut delay = Duration::from_millis(500);

        parse_control("j", &mut filters, &mut delay);
        let control = parse_control("i", &mut filters, &mut delay);
        assert_eq!(
            control,
            Some(Control::SetFilters(FilterConfig {
                hide_json: true,
                hide_images: true,
            }))
        );

        let control = parse_control("j", &mut filters, &mut delay);
        assert_eq!(
            control,
            Some(Control::SetFilters(FilterConfig {
                hide_json: false,
                hide_images: true,
            }))
        );
    }

    #[test]
    fn test_speed_is_bounded() {
        let mut filters = FilterConfig::default();
        let mut delay = Duration::from_millis(80);

        assert_eq!(
            parse_control("+", &mut filters, &mut delay),
            Some(Control::SetSpeed(Duration::from_millis(50)))
        );
        for _ in 0..20 {
            parse_control("-", &mut filters, &mut delay);
        }
        assert_eq!(delay, MAX_DELAY);
    }
}
