use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::playback::DEFAULT_MAX_SPEED;
use crate::playback::DEFAULT_MIN_SPEED;

pub const MIN_POLL_INTERVAL_MS: u64 = 50;
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;

/// Duration of marker transitions when animation is on.
pub const TRANSITION_SECS: f64 = 0.25;

/// Operator-tunable settings, persisted with the rest of the app state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pixels subtracted from the viewport width before computing the projection factor.
    #[serde(default = "default_viewport_margin")]
    pub viewport_margin: f32,
    #[serde(default = "default_speed_min")]
    pub speed_min: f64,
    #[serde(default = "default_speed_max")]
    pub speed_max: f64,
    #[serde(default = "default_bool::<true>")]
    pub animate_transitions: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            viewport_margin: default_viewport_margin(),
            speed_min: default_speed_min(),
            speed_max: default_speed_max(),
            animate_transitions: true,
        }
    }
}

impl ConsoleSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn transition_secs(&self) -> f64 {
        if self.animate_transitions { TRANSITION_SECS } else { 0.0 }
    }

    /// Bring hand-edited or stale values back into range.
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);
        if !self.viewport_margin.is_finite() || self.viewport_margin < 0.0 {
            self.viewport_margin = default_viewport_margin();
        }
        if !self.speed_min.is_finite() || !self.speed_max.is_finite() {
            self.speed_min = default_speed_min();
            self.speed_max = default_speed_max();
        }
        if self.speed_min > self.speed_max {
            std::mem::swap(&mut self.speed_min, &mut self.speed_max);
        }
        if self.backend_url.trim().is_empty() {
            self.backend_url = default_backend_url();
        }
    }
}

pub const fn default_bool<const V: bool>() -> bool {
    V
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_viewport_margin() -> f32 {
    5.0
}

fn default_speed_min() -> f64 {
    DEFAULT_MIN_SPEED
}

fn default_speed_max() -> f64 {
    DEFAULT_MAX_SPEED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: ConsoleSettings = serde_json::from_str(r#"{ "backend_url": "http://sim:9000" }"#).expect("valid json");
        assert_eq!(settings.backend_url, "http://sim:9000");
        assert_eq!(settings.poll_interval_ms, 200);
        assert_eq!(settings.viewport_margin, 5.0);
        assert!(settings.animate_transitions);
    }

    #[test]
    fn poll_interval_is_clamped() {
        let settings = ConsoleSettings { poll_interval_ms: 1, ..Default::default() };
        assert_eq!(settings.poll_interval(), Duration::from_millis(MIN_POLL_INTERVAL_MS));
        let settings = ConsoleSettings { poll_interval_ms: 60_000, ..Default::default() };
        assert_eq!(settings.poll_interval(), Duration::from_millis(MAX_POLL_INTERVAL_MS));
    }

    #[test]
    fn sanitize_repairs_bad_values() {
        let mut settings = ConsoleSettings {
            backend_url: "  ".to_string(),
            viewport_margin: -3.0,
            speed_min: 8.0,
            speed_max: 2.0,
            ..Default::default()
        };
        settings.sanitize();
        assert_eq!(settings.backend_url, default_backend_url());
        assert_eq!(settings.viewport_margin, 5.0);
        assert_eq!((settings.speed_min, settings.speed_max), (2.0, 8.0));
    }

    #[test]
    fn no_animation_means_zero_transition() {
        let settings = ConsoleSettings { animate_transitions: false, ..Default::default() };
        assert_eq!(settings.transition_secs(), 0.0);
    }
}
