//! Async driver for a [`Timeline`].
//!
//! The player owns the timeline, turns wall-clock time into transition
//! progress and playback ticks, and applies controls as they arrive.
//! Frames are published on a channel for whatever does the drawing.

use crate::models::FilterConfig;
use crate::scene::Frame;
use crate::timeline::{Tick, Timeline};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Seek(usize),
    Next,
    Previous,
    Play,
    Pause,
    TogglePlay,
    SetSpeed(Duration),
    SetFilters(FilterConfig),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// An intermediate or final frame of the running transition.
    Frame { index: usize, frame: Frame },
    /// The transition for `index` finished.
    Settled { index: usize },
    /// Playback ended, at the last commit or on request.
    PlaybackStopped { index: usize },
}

pub struct Player {
    timeline: Timeline,
    controls: mpsc::Receiver<Control>,
    events: mpsc::Sender<PlayerEvent>,
    cancel: CancellationToken,
}

impl Player {
    pub fn new(
        timeline: Timeline,
        controls: mpsc::Receiver<Control>,
        events: mpsc::Sender<PlayerEvent>,
    ) -> Self {
        Self {
            timeline,
            controls,
            events,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run until shutdown, cancellation, or either channel closing.
    /// Returns the timeline in its final state.
    pub async fn run(self) -> Timeline {
        let Player {
            mut timeline,
            mut controls,
            events,
            cancel,
        } = self;

        let duration = timeline.config().transition();
        let mut frames = tokio::time::interval(timeline.config().frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let sleep = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(sleep);
        let mut scheduled: Option<Tick> = None;
        let mut started: Option<Instant> = None;

        if timeline.is_animating() {
            started = Some(Instant::now());
            if !emit_frame(&mut timeline, &events, 0.0).await {
                return timeline;
            }
        }

        loop {
            let revision = timeline.revision();
            let was_playing = timeline.is_playing();
            let mut play_requested = false;

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Player cancelled");
                    break;
                }
                control = controls.recv() => {
                    let Some(control) = control else { break };
                    debug!(?control, "Applying control");
                    let mut fresh = None;
                    match control {
                        Control::Shutdown => break,
                        Control::Seek(index) => timeline.set_commit(index),
                        Control::Next => timeline.next(),
                        Control::Previous => timeline.previous(),
                        Control::Play if timeline.is_playing() => {}
                        Control::Play => {
                            play_requested = true;
                            fresh = timeline.play();
                        }
                        Control::Pause => timeline.pause(),
                        Control::TogglePlay => {
                            play_requested = !timeline.is_playing();
                            fresh = timeline.toggle_play();
                        }
                        Control::SetSpeed(delay) => timeline.set_speed(delay),
                        Control::SetFilters(filters) => timeline.set_filters(filters),
                    }
                    if !timeline.is_playing() {
                        scheduled = None;
                    }
                    if fresh.is_some() {
                        scheduled = fresh;
                        sleep.as_mut().reset(Instant::now() + timeline.delay());
                    }
                }
                () = &mut sleep, if scheduled.is_some() => {
                    if let Some(tick) = scheduled.take() {
                        scheduled = timeline.advance(tick);
                        if scheduled.is_some() {
                            sleep.as_mut().reset(Instant::now() + timeline.delay());
                        }
                    }
                }
                _ = frames.tick(), if started.is_some() => {
                    let elapsed = started.map(|s| s.elapsed()).unwrap_or_default();
                    let t = if duration.is_zero() {
                        1.0
                    } else {
                        elapsed.as_secs_f64() / duration.as_secs_f64()
                    };
                    if !emit_frame(&mut timeline, &events, t).await {
                        break;
                    }
                    if t >= 1.0 {
                        started = None;
                        let settled = PlayerEvent::Settled { index: timeline.index() };
                        if events.send(settled).await.is_err() {
                            break;
                        }
                    }
                }
            }

            if timeline.revision() != revision {
                started = Some(Instant::now());
                frames.reset();
                if !emit_frame(&mut timeline, &events, 0.0).await {
                    break;
                }
            }

            // A play request on a one-commit history stops immediately.
            if (was_playing || play_requested) && !timeline.is_playing() {
                let stopped = PlayerEvent::PlaybackStopped { index: timeline.index() };
                if events.send(stopped).await.is_err() {
                    break;
                }
            }
        }

        info!(index = timeline.index(), "Player stopped");
        timeline
    }
}

async fn emit_frame(timeline: &mut Timeline, events: &mpsc::Sender<PlayerEvent>, t: f64) -> bool {
    let frame = timeline.sample(t);
    let event = PlayerEvent::Frame {
        index: timeline.index(),
        frame,
    };
    events.send(event).await.is_ok()
}
