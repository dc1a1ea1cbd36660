use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoopMode {
    #[default]
    Off,
    LoopPlaylist,
    LoopSingle,
}

impl LoopMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::LoopPlaylist,
            Self::LoopPlaylist => Self::LoopSingle,
            Self::LoopSingle => Self::Off,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::LoopPlaylist => "Playlist",
            Self::LoopSingle => "Single",
        }
    }
}

/// Loop mode and shuffle flag, toggled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationPolicy {
    pub loop_mode: LoopMode,
    pub shuffle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRef {
    pub path: PathBuf,
    /// Seconds; 0 until resolved.
    pub duration: f64,
}

impl TrackRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: 0.0,
        }
    }

    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackPosition {
    pub elapsed: f64,
    /// 0 means not yet known.
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorTier {
    Low,
    Mid,
    High,
}

impl ColorTier {
    pub fn for_height(height: f64) -> Self {
        if height < 33.0 {
            Self::Low
        } else if height < 66.0 {
            Self::Mid
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub height: f64,
    pub tier: ColorTier,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualizerFrame {
    pub bars: Vec<Bar>,
}

/// Values handed to whatever draws the player.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Progress(PlaybackPosition),
    Visualizer(VisualizerFrame),
    Rotation(f64),
    Transport(TransportState),
    TrackChanged { index: usize, display_name: String },
    Volume(u8),
    Policy(NavigationPolicy),
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_rotation_interval_ms")]
    pub rotation_interval_ms: u64,
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f64,
    #[serde(default = "default_end_epsilon_secs")]
    pub end_epsilon_secs: f64,
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,
    #[serde(default = "default_noise_amplitude")]
    pub noise_amplitude: i32,
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,
    #[serde(default = "default_metadata_retry_ms")]
    pub metadata_retry_ms: u64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
    #[serde(default)]
    pub loop_mode: LoopMode,
    #[serde(default)]
    pub shuffle: bool,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_frame_interval_ms() -> u64 {
    30
}

fn default_rotation_interval_ms() -> u64 {
    16
}

fn default_rotation_speed() -> f64 {
    0.4
}

fn default_end_epsilon_secs() -> f64 {
    0.5
}

fn default_decay_rate() -> f64 {
    0.1
}

fn default_bar_count() -> usize {
    50
}

fn default_noise_amplitude() -> i32 {
    5
}

fn default_metadata_timeout_secs() -> u64 {
    5
}

fn default_metadata_retry_ms() -> u64 {
    5_000
}

fn default_initial_volume() -> u8 {
    80
}

fn default_volume_step() -> u8 {
    5
}

impl PlayerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn metadata_retry_interval(&self) -> Duration {
        Duration::from_millis(self.metadata_retry_ms)
    }

    pub fn policy(&self) -> NavigationPolicy {
        NavigationPolicy {
            loop_mode: self.loop_mode,
            shuffle: self.shuffle,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            rotation_interval_ms: default_rotation_interval_ms(),
            rotation_speed: default_rotation_speed(),
            end_epsilon_secs: default_end_epsilon_secs(),
            decay_rate: default_decay_rate(),
            bar_count: default_bar_count(),
            noise_amplitude: default_noise_amplitude(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            metadata_retry_ms: default_metadata_retry_ms(),
            initial_volume: default_initial_volume(),
            volume_step: default_volume_step(),
            loop_mode: LoopMode::default(),
            shuffle: false,
        }
    }
}
