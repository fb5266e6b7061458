use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Canvas, label and timing settings shared by every renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Canvas width in pixels, margin included
    #[serde(default = "default_side")]
    pub width: f64,

    /// Canvas height in pixels, margin included
    #[serde(default = "default_side")]
    pub height: f64,

    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Leaves smaller than this radius get no label
    #[serde(default = "default_label_min_radius")]
    pub label_min_radius: f64,

    /// Label budget in characters per pixel of radius
    #[serde(default = "default_label_chars_per_radius")]
    pub label_chars_per_radius: f64,

    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,

    /// Delay between commits during playback
    #[serde(default = "default_playback_delay_ms")]
    pub playback_delay_ms: u64,

    /// Interval between sampled animation frames
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_side() -> f64 {
    960.0
}

fn default_margin() -> f64 {
    10.0
}

fn default_label_min_radius() -> f64 {
    20.0
}

fn default_label_chars_per_radius() -> f64 {
    0.25
}

fn default_transition_ms() -> u64 {
    750
}

fn default_playback_delay_ms() -> u64 {
    500
}

fn default_frame_interval_ms() -> u64 {
    33
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: default_side(),
            height: default_side(),
            margin: default_margin(),
            label_min_radius: default_label_min_radius(),
            label_chars_per_radius: default_label_chars_per_radius(),
            transition_ms: default_transition_ms(),
            playback_delay_ms: default_playback_delay_ms(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl ViewConfig {
    /// Width of the area the packer lays circles out in.
    pub fn pack_width(&self) -> f64 {
        (self.width - self.margin * 2.0).max(0.0)
    }

    pub fn pack_height(&self) -> f64 {
        (self.height - self.margin * 2.0).max(0.0)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    pub fn playback_delay(&self) -> Duration {
        Duration::from_millis(self.playback_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewConfig::default();

        assert_eq!(config.pack_width(), 940.0);
        assert_eq!(config.transition(), Duration::from_millis(750));
        assert_eq!(config.playback_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: ViewConfig = serde_json::from_str(r#"{"width": 400, "height": 300}"#).unwrap();

        assert_eq!(config.pack_width(), 380.0);
        assert_eq!(config.pack_height(), 280.0);
        assert_eq!(config.label_min_radius, 20.0);
    }
}
