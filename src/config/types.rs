use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    #[serde(default)]
    pub keep_alive: KeepAliveConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub controls: ControlsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the media-library server, e.g. `http://192.168.3.200:9090`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the byte-range media endpoint
    #[serde(default = "default_media_path")]
    pub media_path: String,

    /// Whole-request timeout; bounds a hung chunk fetch (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:9090".to_string()
}
fn default_media_path() -> String {
    "/video".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    8
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            media_path: default_media_path(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// How fetched segments reach the media element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferingStrategy {
    /// Swap the element's source for the newly fetched bytes
    ReplaceSource,
    /// Append the bytes to the element's existing buffer
    #[default]
    Append,
}

/// Unit in which the playhead is compared against the chunk cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorGate {
    /// Compare `current_time` (seconds) with the cursor end directly
    #[default]
    Seconds,
    /// Project `current_time` into bytes using `content_length / duration`
    ProjectedBytes,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Bytes requested per range fetch (default: 500 KiB)
    #[serde(default = "default_segment_size")]
    pub segment_size_bytes: u64,

    /// Buffered-ahead margin below which a fetch is considered (default: 10)
    #[serde(default = "default_low_watermark")]
    pub low_watermark_secs: f64,

    #[serde(default)]
    pub buffering: BufferingStrategy,

    #[serde(default)]
    pub cursor_gate: CursorGate,
}

fn default_segment_size() -> u64 {
    500 * 1024
}
fn default_low_watermark() -> f64 {
    10.0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            segment_size_bytes: default_segment_size(),
            low_watermark_secs: default_low_watermark(),
            buffering: BufferingStrategy::default(),
            cursor_gate: CursorGate::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeartbeatConfig {
    /// Seconds between progress saves (default: 60)
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

fn default_heartbeat_interval() -> u64 {
    60
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_heartbeat_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeepAliveConfig {
    /// Start the backend keep-alive job for sessions that ask for it (default: true)
    #[serde(default = "default_keep_alive_enabled")]
    pub enabled: bool,

    /// Interval expression understood by the backend scheduler, e.g. `@every 10m`
    #[serde(default = "default_keep_alive_interval")]
    pub interval: String,
}

fn default_keep_alive_enabled() -> bool {
    true
}
fn default_keep_alive_interval() -> String {
    "@every 10m".to_string()
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: default_keep_alive_enabled(),
            interval: default_keep_alive_interval(),
        }
    }
}

/// Interval expressions accepted by the backend's `/start-cronos` endpoint.
pub const KEEP_ALIVE_INTERVALS: &[&str] = &[
    "@every 1s",
    "@every 1m",
    "@every 5m",
    "@every 10m",
    "@every 1h",
    "@every 1d",
    "@every 1w",
    "@every 1M",
    "@every 1y",
    "@every 1ms",
    "@every 1us",
    "@every 1ns",
    "@every 1µs",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Delay between opening a session and starting playback (default: 2000)
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,

    /// Request fullscreen the first time a session starts playing (default: true)
    #[serde(default = "default_fullscreen_on_start")]
    pub fullscreen_on_start: bool,
}

fn default_startup_delay() -> u64 {
    2000
}
fn default_fullscreen_on_start() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay(),
            fullscreen_on_start: default_fullscreen_on_start(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlsConfig {
    /// Inactivity before the overlay hides (default: 3000)
    #[serde(default = "default_hide_after")]
    pub hide_after_ms: u64,

    /// Distance of the back/forward buttons (default: 15)
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: f64,
}

fn default_hide_after() -> u64 {
    3000
}
fn default_seek_step() -> f64 {
    15.0
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            hide_after_ms: default_hide_after(),
            seek_step_secs: default_seek_step(),
        }
    }
}
