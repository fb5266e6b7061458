//! Renderer state: which commit is shown, playback and filters.
//!
//! All state lives in one owned [`Timeline`]. Every operation that changes
//! what is on screen starts a fresh [`Transition`] from whatever geometry
//! was last displayed, cancelling any transition still in flight.

use crate::config::ViewConfig;
use crate::filter::apply_filters;
use crate::models::{CommitSnapshot, FilterConfig, HistoryList, HistoryResponse};
use crate::pack::{FrontChainPacker, Packer};
use crate::scene::{Frame, Scene, Transition};
use std::time::Duration;
use tracing::debug;

pub const NO_DATA_MESSAGE: &str = "No history data found. Is the repository empty?";

/// Outcome of loading the data contract.
pub enum LoadState {
    /// The repository has no commits.
    NoData,
    /// The extractor reported an error; the message is kept verbatim.
    Failed(String),
    Ready(Timeline),
}

impl LoadState {
    pub fn from_response(response: HistoryResponse, config: ViewConfig) -> Self {
        match response {
            HistoryResponse::Failure { error } => LoadState::Failed(error),
            HistoryResponse::History(history) => match Timeline::new(history, config) {
                Some(timeline) => LoadState::Ready(timeline),
                None => LoadState::NoData,
            },
        }
    }

    /// Text shown in place of the chart, if there is no chart.
    pub fn status_text(&self) -> Option<String> {
        match self {
            LoadState::NoData => Some(NO_DATA_MESSAGE.to_string()),
            LoadState::Failed(message) => Some(format!(
                "Error: {}\nCheck the server console for more details.",
                message
            )),
            LoadState::Ready(_) => None,
        }
    }
}

/// Handle for one scheduled playback step.
///
/// Only the most recently issued tick is honoured; pausing, seeking or
/// changing filters invalidates every outstanding one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    generation: u64,
}

pub struct Timeline {
    history: HistoryList,
    config: ViewConfig,
    packer: Box<dyn Packer>,
    index: usize,
    playing: bool,
    delay: Duration,
    filters: FilterConfig,
    scene: Scene,
    transition: Option<Transition>,
    progress: f64,
    generation: u64,
    revision: u64,
}

impl Timeline {
    /// Show the most recent commit, paused. `None` for an empty history.
    pub fn new(history: HistoryList, config: ViewConfig) -> Option<Self> {
        if history.is_empty() {
            return None;
        }

        let mut timeline = Self {
            index: history.len() - 1,
            delay: config.playback_delay(),
            history,
            config,
            packer: Box::new(FrontChainPacker),
            playing: false,
            filters: FilterConfig::default(),
            scene: Scene::default(),
            transition: None,
            progress: 0.0,
            generation: 0,
            revision: 0,
        };
        timeline.redraw();
        Some(timeline)
    }

    pub fn with_packer(mut self, packer: impl Packer + 'static) -> Self {
        self.packer = Box::new(packer);
        self.scene = Scene::default();
        self.transition = None;
        self.redraw();
        self
    }

    pub fn history(&self) -> &[CommitSnapshot] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &CommitSnapshot {
        &self.history[self.index]
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn filters(&self) -> FilterConfig {
        self.filters
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Bumped on every redraw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Jump to `index`, clamped to the history. Stops playback first.
    pub fn set_commit(&mut self, index: usize) {
        self.stop();
        self.index = index.min(self.history.len() - 1);
        self.redraw();
    }

    pub fn next(&mut self) {
        self.set_commit(self.index + 1);
    }

    pub fn previous(&mut self) {
        self.set_commit(self.index.saturating_sub(1));
    }

    /// Start playback and take the first step right away.
    ///
    /// From the last commit playback restarts at the first one. Returns the
    /// tick to deliver to [`advance`](Self::advance) after [`delay`](Self::delay).
    pub fn play(&mut self) -> Option<Tick> {
        self.playing = true;
        self.generation += 1;
        if self.index >= self.history.len() - 1 {
            self.index = 0;
            self.redraw();
        }
        self.step()
    }

    pub fn pause(&mut self) {
        self.stop();
    }

    pub fn toggle_play(&mut self) -> Option<Tick> {
        if self.playing {
            self.pause();
            None
        } else {
            self.play()
        }
    }

    /// Timer-driven step. Stale ticks are ignored.
    pub fn advance(&mut self, tick: Tick) -> Option<Tick> {
        if !self.playing || tick.generation != self.generation {
            debug!(?tick, generation = self.generation, "Ignoring stale tick");
            return None;
        }
        self.step()
    }

    pub fn set_speed(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Change filters and redraw the current commit. Stops playback.
    pub fn set_filters(&mut self, filters: FilterConfig) {
        self.stop();
        self.filters = filters;
        self.redraw();
    }

    /// Sample the running transition at progress `t`.
    ///
    /// Sampling at `t >= 1` finishes the transition.
    pub fn sample(&mut self, t: f64) -> Frame {
        let t = t.clamp(0.0, 1.0);
        match &self.transition {
            Some(transition) => {
                let frame = transition.sample(t);
                self.progress = t;
                if t >= 1.0 {
                    self.transition = None;
                }
                frame
            }
            None => self.scene.frame(),
        }
    }

    pub fn settled_frame(&self) -> Frame {
        self.scene.frame()
    }

    pub fn caption(&self) -> String {
        let commit = self.current();
        format!(
            "Commit {}/{}: {}\n{} - {}",
            commit.commit_number,
            self.history.len(),
            commit.short_hash(),
            commit.message,
            commit.author
        )
    }

    fn stop(&mut self) {
        self.playing = false;
        self.generation += 1;
    }

    fn step(&mut self) -> Option<Tick> {
        if !self.playing {
            return None;
        }
        let next = self.index + 1;
        if next >= self.history.len() {
            debug!(index = self.index, "Reached the last commit, stopping playback");
            self.stop();
            return None;
        }
        self.index = next;
        self.redraw();
        Some(Tick {
            generation: self.generation,
        })
    }

    fn redraw(&mut self) {
        let previous = match &self.transition {
            Some(transition) => transition.scene_at(self.progress),
            None => self.scene.clone(),
        };

        let filtered = apply_filters(&self.history[self.index].tree, &self.filters);
        let next = Scene::build(&filtered, self.packer.as_ref(), &self.config);

        self.transition = Some(Transition::between(&previous, &next));
        self.scene = next;
        self.progress = 0.0;
        self.revision += 1;
        debug!(index = self.index, nodes = self.scene.len(), "Redrew commit");
    }
}

/// Settled frame for a single commit, without any timeline state.
pub fn render_commit(
    snapshot: &CommitSnapshot,
    filters: &FilterConfig,
    config: &ViewConfig,
    packer: &dyn Packer,
) -> Frame {
    let filtered = apply_filters(&snapshot.tree, filters);
    Scene::build(&filtered, packer, config).frame()
}
