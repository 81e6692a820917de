//! anteroom.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for an anteroom deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnteroomConfig {
    pub room: RoomConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// The two URLs every component ultimately serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Static waiting-room page visitors are parked on.
    pub waiting_room_url: String,
    /// Protected endpoint admitted visitors navigate to.
    pub protect_url: String,
}

/// Admission throughput knobs consumed by the processor and trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Admissions per scheduling tick.
    pub rate: u32,
    /// Queue messages received per drain cycle.
    pub batch_size: u32,
    /// Drain cycles per processor invocation.
    pub max_iterations_per_call: u32,
    /// Concurrent processor invocations per tick.
    pub max_concurrency: u32,
    /// Wall-clock budget per processor invocation (e.g. "30s").
    pub invocation_budget: String,
    /// Scheduling tick driving the trigger and the health loop (e.g. "60s").
    pub tick_interval: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            rate: 100,
            batch_size: 10,
            max_iterations_per_call: 100,
            max_concurrency: 10,
            invocation_budget: "30s".to_string(),
            tick_interval: "60s".to_string(),
        }
    }
}

impl AdmissionConfig {
    pub fn invocation_budget(&self) -> Duration {
        parse_duration(&self.invocation_budget).unwrap_or(Duration::from_secs(30))
    }

    pub fn tick_interval(&self) -> Duration {
        parse_duration(&self.tick_interval).unwrap_or(Duration::from_secs(60))
    }
}

/// Admission queue delivery semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// How long a received message stays invisible before redelivery (e.g. "30s").
    pub visibility_timeout: String,
    /// Delivery attempts before a message is diverted to the dead-letter buffer.
    pub max_receive_count: u32,
    /// Optional cap on queue depth; unbounded when absent.
    pub max_depth: Option<usize>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            visibility_timeout: "30s".to_string(),
            max_receive_count: 10,
            max_depth: None,
        }
    }
}

impl QueueSettings {
    pub fn visibility_timeout(&self) -> Duration {
        parse_duration(&self.visibility_timeout).unwrap_or(Duration::from_secs(30))
    }
}

/// Health prober and rate controller knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Protected endpoint to probe, as `host:port`.
    pub target: String,
    /// Request path probed on the target.
    pub path: String,
    /// Timed requests per sampling run.
    pub sample_size: usize,
    /// Timeout per probe request (e.g. "2s").
    pub timeout: String,
    /// Minimum interval between two rate adjustments (e.g. "120s").
    /// Absent means every verdict may adjust the rate.
    pub min_adjust_interval: Option<String>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            target: "127.0.0.1:80".to_string(),
            path: "/".to_string(),
            sample_size: 20,
            timeout: "2s".to_string(),
            min_adjust_interval: None,
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(2))
    }

    pub fn min_adjust_interval(&self) -> Option<Duration> {
        self.min_adjust_interval.as_deref().and_then(parse_duration)
    }
}

/// Daemon process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// HTTP listen port for the gate and poll-check routes.
    pub port: u16,
    /// Data directory for the persistent allow-list store.
    pub data_dir: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("/var/lib/anteroom"),
        }
    }
}

impl AnteroomConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnteroomConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Parse a duration string like "5s", "500ms", "2m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[room]
waiting_room_url = "https://cdn.example.com/room/index.html"
protect_url = "https://shop.example.com"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: AnteroomConfig = toml::from_str(MINIMAL).unwrap();

        assert_eq!(config.admission.rate, 100);
        assert_eq!(config.admission.batch_size, 10);
        assert_eq!(config.admission.max_iterations_per_call, 100);
        assert_eq!(config.queue.max_receive_count, 10);
        assert_eq!(config.queue.visibility_timeout(), Duration::from_secs(30));
        assert_eq!(config.probe.sample_size, 20);
        assert!(config.probe.min_adjust_interval().is_none());
        assert_eq!(config.daemon.port, 8080);
    }

    #[test]
    fn overrides_are_honored() {
        let toml_src = r#"
[room]
waiting_room_url = "https://cdn.example.com/room/index.html"
protect_url = "https://shop.example.com"

[admission]
rate = 500
tick_interval = "30s"

[queue]
visibility_timeout = "10s"
max_receive_count = 3

[probe]
target = "shop.example.com:80"
min_adjust_interval = "2m"
"#;
        let config: AnteroomConfig = toml::from_str(toml_src).unwrap();

        assert_eq!(config.admission.rate, 500);
        assert_eq!(config.admission.tick_interval(), Duration::from_secs(30));
        assert_eq!(config.queue.visibility_timeout(), Duration::from_secs(10));
        assert_eq!(config.queue.max_receive_count, 3);
        assert_eq!(
            config.probe.min_adjust_interval(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anteroom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = AnteroomConfig::from_file(&path).unwrap();
        assert_eq!(config.room.protect_url, "https://shop.example.com");

        // Serialized form parses back to the same settings.
        let reparsed: AnteroomConfig =
            toml::from_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(reparsed.admission.rate, config.admission.rate);
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("bogus"), None);
    }
}
