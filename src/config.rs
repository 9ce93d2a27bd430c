use std::path::PathBuf;
use std::time::Duration;

use crate::error::CollectorError;

/// Total budget for collecting both spreadsheets. Default derived from an
/// average run of ~4.5min.
pub const DEFAULT_GENERAL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Settle pause between collector steps.
pub const DEFAULT_TIME_BETWEEN_STEPS: Duration = Duration::from_secs(4);

const DEFAULT_OUTPUT_FOLDER: &str = "/output";

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub month: u32,
    pub year: u32,
    pub output_dir: PathBuf,
    pub general_timeout: Duration,
    pub time_between_steps: Duration,
    pub headless: bool,
    pub debug: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            month: 1,
            year: 2024,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            general_timeout: DEFAULT_GENERAL_TIMEOUT,
            time_between_steps: DEFAULT_TIME_BETWEEN_STEPS,
            headless: true,
            debug: false,
        }
    }
}

impl CollectorConfig {
    pub fn new(month: u32, year: u32) -> Self {
        Self {
            month,
            year,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_general_timeout(mut self, timeout: Duration) -> Self {
        self.general_timeout = timeout;
        self
    }

    pub fn with_time_between_steps(mut self, pause: Duration) -> Self {
        self.time_between_steps = pause;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builds the configuration from the process environment. All validation
    /// happens here, before any browser session exists.
    pub fn from_env() -> Result<Self, CollectorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CollectorError> {
        let month = parse_month(lookup("MONTH").as_deref())?;
        let year = parse_year(lookup("YEAR").as_deref())?;

        let output_dir = lookup("OUTPUT_FOLDER")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FOLDER));

        let general_timeout = match lookup("GENERAL_TIMEOUT").filter(|v| !v.is_empty()) {
            Some(raw) => parse_duration(&raw).ok_or_else(|| {
                CollectorError::InvalidInput(format!("invalid GENERAL_TIMEOUT (\"{raw}\")"))
            })?,
            None => DEFAULT_GENERAL_TIMEOUT,
        };

        let time_between_steps = match lookup("TIME_BETWEEN_STEPS").filter(|v| !v.is_empty()) {
            Some(raw) => parse_duration(&raw).ok_or_else(|| {
                CollectorError::InvalidInput(format!("invalid TIME_BETWEEN_STEPS (\"{raw}\")"))
            })?,
            None => DEFAULT_TIME_BETWEEN_STEPS,
        };

        Ok(Self {
            month,
            year,
            output_dir,
            general_timeout,
            time_between_steps,
            headless: true,
            debug: false,
        })
    }

    /// Period as shown on the portal and in filenames, e.g. `01/2024`.
    pub fn period(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }
}

fn parse_month(raw: Option<&str>) -> Result<u32, CollectorError> {
    let raw = raw.unwrap_or_default();
    let month: u32 = raw
        .parse()
        .map_err(|_| CollectorError::InvalidInput(format!("invalid month (\"{raw}\")")))?;
    if !(1..=12).contains(&month) {
        return Err(CollectorError::InvalidInput(format!(
            "month out of range (\"{raw}\")"
        )));
    }
    Ok(month)
}

fn parse_year(raw: Option<&str>) -> Result<u32, CollectorError> {
    let raw = raw.unwrap_or_default();
    raw.parse()
        .map_err(|_| CollectorError::InvalidInput(format!("invalid year (\"{raw}\")")))
}

/// Parses Go-style duration strings (`5m`, `300s`, `1m30s`, `500ms`,
/// `300000000ns`, `1.5m`). Returns `None` for anything malformed, including
/// bare numbers and values that overflow `Duration`.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    if raw.is_empty() {
        return None;
    }
    let mut total = Duration::ZERO;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: f64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let secs = match &rest[..unit_len] {
            "ns" => value / 1_000_000_000.0,
            "us" | "µs" | "μs" => value / 1_000_000.0,
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total = total.checked_add(Duration::try_from_secs_f64(secs).ok()?)?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn from_map(map: &HashMap<String, String>) -> Result<CollectorConfig, CollectorError> {
        CollectorConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_config_builder() {
        let config = CollectorConfig::new(3, 2023)
            .with_output_dir("/tmp/out")
            .with_headless(false)
            .with_general_timeout(Duration::from_secs(120));

        assert_eq!(config.month, 3);
        assert_eq!(config.year, 2023);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(!config.headless);
        assert_eq!(config.general_timeout, Duration::from_secs(120));
        assert_eq!(config.time_between_steps, DEFAULT_TIME_BETWEEN_STEPS);
    }

    #[test]
    fn test_period_is_zero_padded() {
        assert_eq!(CollectorConfig::new(1, 2024).period(), "01/2024");
        assert_eq!(CollectorConfig::new(11, 2024).period(), "11/2024");
    }

    #[test]
    fn test_from_env_minimal() {
        let config = from_map(&env(&[("MONTH", "1"), ("YEAR", "2024")])).unwrap();
        assert_eq!(config.month, 1);
        assert_eq!(config.year, 2024);
        assert_eq!(config.output_dir, PathBuf::from("/output"));
        assert_eq!(config.general_timeout, DEFAULT_GENERAL_TIMEOUT);
        assert!(config.headless);
    }

    #[test]
    fn test_from_env_full() {
        let config = from_map(&env(&[
            ("MONTH", "12"),
            ("YEAR", "2022"),
            ("OUTPUT_FOLDER", "/tmp/coleta"),
            ("GENERAL_TIMEOUT", "10m"),
            ("TIME_BETWEEN_STEPS", "2s"),
        ]))
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/coleta"));
        assert_eq!(config.general_timeout, Duration::from_secs(600));
        assert_eq!(config.time_between_steps, Duration::from_secs(2));
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        for month in ["13", "0", "abc", ""] {
            let result = from_map(&env(&[("MONTH", month), ("YEAR", "2024")]));
            assert!(
                matches!(result, Err(CollectorError::InvalidInput(_))),
                "month {month:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_month_rejected() {
        let result = from_map(&env(&[("YEAR", "2024")]));
        assert!(matches!(result, Err(CollectorError::InvalidInput(_))));
    }

    #[test]
    fn test_non_numeric_year_rejected() {
        let result = from_map(&env(&[("MONTH", "1"), ("YEAR", "20x4")]));
        assert!(matches!(result, Err(CollectorError::InvalidInput(_))));
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let result = from_map(&env(&[
            ("MONTH", "1"),
            ("YEAR", "2024"),
            ("GENERAL_TIMEOUT", "cinco"),
        ]));
        assert!(matches!(result, Err(CollectorError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4s"), Some(Duration::from_secs(4)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1.5m"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_parse_duration_sub_millisecond_units() {
        assert_eq!(
            parse_duration("300000000ns"),
            Some(Duration::from_millis(300))
        );
        assert_eq!(parse_duration("250us"), Some(Duration::from_micros(250)));
        assert_eq!(parse_duration("250µs"), Some(Duration::from_micros(250)));
    }

    #[test]
    fn test_parse_duration_rejects_malformed() {
        for raw in ["", "5", "5x", "s", "m5", "5ss"] {
            assert!(parse_duration(raw).is_none(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_duration_rejects_overflow() {
        // Values beyond Duration's range must come back as None, never abort.
        assert!(parse_duration("999999999999999999999h").is_none());
        // Each segment fits on its own; the sum does not.
        assert!(parse_duration("10000000000000000000s10000000000000000000s").is_none());
    }

    #[test]
    fn test_overflowing_timeout_is_invalid_input() {
        let result = from_map(&env(&[
            ("MONTH", "1"),
            ("YEAR", "2024"),
            ("GENERAL_TIMEOUT", "999999999999999999999h"),
        ]));
        assert!(matches!(result, Err(CollectorError::InvalidInput(_))));
    }
}
