//! Harness configuration loaded from environment variables.
//!
//! Invalid values fall back to defaults without failing the run.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `OVERRUN_HARNESS_PROBE_BIN` | current executable | Binary that runs `probe` |
//! | `OVERRUN_HARNESS_LARGE_MALLOC` | 16777216 | Large allocation size (bytes) |
//! | `OVERRUN_HARNESS_MAX_WIDTH` | native word | Widest optional sweep (`oob_short`, `oob_long`) |
//! | `OVERRUN_HARNESS_HWASAN` | false | Probe is built with HWAddressSanitizer |
//! | `OVERRUN_HARNESS_LOG` | warn | Log filter |
//! | `OVERRUN_HARNESS_LOG_FORMAT` | pretty | `pretty` or `json` |
//! | `OVERRUN_HARNESS_LOG_FILE` | stderr | Log file (JSON format only) |

use std::path::PathBuf;

use crate::access::Width;
use crate::platform::WORD_SIZE;
use crate::sweep::DEFAULT_LARGE_MALLOC;
use crate::telemetry::{LogConfig, LogFormat};

pub const ENV_PROBE_BIN: &str = "OVERRUN_HARNESS_PROBE_BIN";
pub const ENV_LARGE_MALLOC: &str = "OVERRUN_HARNESS_LARGE_MALLOC";
pub const ENV_MAX_WIDTH: &str = "OVERRUN_HARNESS_MAX_WIDTH";
pub const ENV_HWASAN: &str = "OVERRUN_HARNESS_HWASAN";
pub const ENV_LOG: &str = "OVERRUN_HARNESS_LOG";
pub const ENV_LOG_FORMAT: &str = "OVERRUN_HARNESS_LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "OVERRUN_HARNESS_LOG_FILE";

/// Everything a harness run can be tuned with.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Binary re-executed for each attempt. `None` means the running executable.
    pub probe_bin: Option<PathBuf>,
    /// Size of the allocation whose edges end every sweep.
    pub large_malloc: usize,
    /// Widest access in bytes for the optional 2- and 8-byte sweeps. The
    /// 1- and 4-byte sweeps always run.
    pub max_width: usize,
    /// Enables `hwasan_smoke`.
    pub hwasan: bool,
    pub log: LogConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            probe_bin: None,
            large_malloc: DEFAULT_LARGE_MALLOC,
            max_width: default_max_width(),
            hwasan: false,
            log: LogConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let probe_bin = lookup(ENV_PROBE_BIN)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let large_malloc = lookup(ENV_LARGE_MALLOC)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= isize::MAX as usize)
            .unwrap_or(defaults.large_malloc);
        let max_width = lookup(ENV_MAX_WIDTH)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(Width::from_bytes)
            .map(Width::bytes)
            .unwrap_or(defaults.max_width);
        let hwasan = lookup(ENV_HWASAN)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.hwasan);

        let mut log = defaults.log;
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            log.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).and_then(|v| v.parse::<LogFormat>().ok()) {
            log.format = format;
        }
        log.output_path = lookup(ENV_LOG_FILE)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            probe_bin,
            large_malloc,
            max_width,
            hwasan,
            log,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_max_width() -> usize {
    Width::up_to(WORD_SIZE).map(Width::bytes).max().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = HarnessConfig::from_lookup(|_| None);
        assert!(config.probe_bin.is_none());
        assert_eq!(config.large_malloc, 1 << 24);
        assert_eq!(config.max_width, WORD_SIZE.min(8));
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn reads_every_variable() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            (ENV_PROBE_BIN, "/usr/local/bin/probe"),
            (ENV_LARGE_MALLOC, "4096"),
            (ENV_MAX_WIDTH, "4"),
            (ENV_HWASAN, "yes"),
            (ENV_LOG, "overrun_harness=debug"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_LOG_FILE, "/tmp/harness.log"),
        ]));
        assert_eq!(config.probe_bin, Some(PathBuf::from("/usr/local/bin/probe")));
        assert_eq!(config.large_malloc, 4096);
        assert_eq!(config.max_width, 4);
        assert!(config.hwasan);
        assert_eq!(config.log.level, "overrun_harness=debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.output_path, Some(PathBuf::from("/tmp/harness.log")));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = HarnessConfig::from_lookup(lookup_from(&[
            (ENV_LARGE_MALLOC, "lots"),
            (ENV_MAX_WIDTH, "3"),
            (ENV_HWASAN, "maybe"),
            (ENV_LOG_FORMAT, "xml"),
            (ENV_PROBE_BIN, "  "),
        ]));
        let defaults = HarnessConfig::default();
        assert_eq!(config.large_malloc, defaults.large_malloc);
        assert_eq!(config.max_width, defaults.max_width);
        assert!(!config.hwasan);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.probe_bin.is_none());
    }

    #[test]
    fn zero_large_malloc_is_rejected() {
        let config = HarnessConfig::from_lookup(lookup_from(&[(ENV_LARGE_MALLOC, "0")]));
        assert_eq!(config.large_malloc, DEFAULT_LARGE_MALLOC);
    }

    #[test]
    fn narrow_max_width_is_accepted() {
        let config = HarnessConfig::from_lookup(lookup_from(&[(ENV_MAX_WIDTH, "2")]));
        assert_eq!(config.max_width, 2);
    }
}
