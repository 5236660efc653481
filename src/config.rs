use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
}

/// Settings for the report tooling. Built once at process start and passed
/// to everything that needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub results_dir: PathBuf,
    pub report_dir: PathBuf,
    pub allure_bin: PathBuf,
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
    pub logger_name: String,
    pub log_level: String,
    pub min_message_length: usize,
    pub max_step_name_length: usize,
    pub enforce_step_window: bool,
    pub clean_old_after_minutes: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            results_dir: PathBuf::from("allure-results"),
            report_dir: PathBuf::from("allure-report"),
            allure_bin: PathBuf::from("allure"),
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "automation_".to_string(),
            logger_name: "automation_framework".to_string(),
            log_level: "info".to_string(),
            min_message_length: 10,
            max_step_name_length: 200,
            enforce_step_window: true,
            clean_old_after_minutes: 5,
        }
    }
}

impl ReportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ReportConfig::default();
        if let Some(v) = lookup("ALLURE_RESULTS_DIR") {
            config.results_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ALLURE_REPORT_DIR") {
            config.report_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ALLURE_BIN") {
            config.allure_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_DIR") {
            config.log_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_FILE_PREFIX") {
            config.log_file_prefix = v;
        }
        if let Some(v) = lookup("LOGGER_NAME") {
            config.logger_name = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v.to_lowercase();
        }
        if let Some(v) = lookup("STEP_MIN_MESSAGE_LENGTH") {
            config.min_message_length = parse_number("STEP_MIN_MESSAGE_LENGTH", &v)?;
        }
        if let Some(v) = lookup("STEP_MAX_NAME_LENGTH") {
            config.max_step_name_length = parse_number("STEP_MAX_NAME_LENGTH", &v)?;
        }
        if let Some(v) = lookup("STEP_ENFORCE_WINDOW") {
            config.enforce_step_window = parse_bool("STEP_ENFORCE_WINDOW", &v)?;
        }
        if let Some(v) = lookup("CLEAN_OLD_MINUTES") {
            config.clean_old_after_minutes = parse_number("CLEAN_OLD_MINUTES", &v)?;
        }
        Ok(config)
    }

    /// The shared log file the framework appends to on the given day.
    pub fn daily_log_file(&self, date: NaiveDate) -> PathBuf {
        self.log_dir.join(format!(
            "{}{}.log",
            self.log_file_prefix,
            date.format("%Y%m%d")
        ))
    }

    pub fn tracing_level(&self) -> Level {
        match self.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" | "critical" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
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
    fn defaults_when_nothing_is_set() {
        let config = ReportConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ReportConfig::default());
        assert_eq!(config.results_dir, PathBuf::from("allure-results"));
        assert_eq!(config.logger_name, "automation_framework");
        assert_eq!(config.enforce_step_window, true);
    }

    #[test]
    fn overrides_from_environment() {
        let config = ReportConfig::from_lookup(lookup_from(&[
            ("ALLURE_RESULTS_DIR", "/tmp/results"),
            ("LOG_LEVEL", "DEBUG"),
            ("STEP_MIN_MESSAGE_LENGTH", "4"),
            ("STEP_ENFORCE_WINDOW", "no"),
            ("CLEAN_OLD_MINUTES", "30"),
        ]))
        .unwrap();
        assert_eq!(config.results_dir, PathBuf::from("/tmp/results"));
        assert_eq!(config.tracing_level(), Level::DEBUG);
        assert_eq!(config.min_message_length, 4);
        assert_eq!(config.enforce_step_window, false);
        assert_eq!(config.clean_old_after_minutes, 30);
    }

    #[test]
    fn rejects_malformed_values() {
        let result = ReportConfig::from_lookup(lookup_from(&[("CLEAN_OLD_MINUTES", "five")]));
        assert_eq!(
            result,
            Err(ConfigError::InvalidNumber {
                var: "CLEAN_OLD_MINUTES",
                value: "five".to_string()
            })
        );
        let result = ReportConfig::from_lookup(lookup_from(&[("STEP_ENFORCE_WINDOW", "maybe")]));
        assert!(matches!(result, Err(ConfigError::InvalidBool { .. })));
    }

    #[test]
    fn daily_log_file_name() {
        let config = ReportConfig::default();
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        assert_eq!(
            config.daily_log_file(date),
            PathBuf::from("logs").join("automation_20251010.log")
        );
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let config = ReportConfig {
            log_level: "verbose".to_string(),
            ..ReportConfig::default()
        };
        assert_eq!(config.tracing_level(), Level::INFO);
    }
}
