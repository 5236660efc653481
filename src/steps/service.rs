use crate::config::ReportConfig;
use crate::report::model::{Status, Step};
use crate::steps::model::{LogEntry, Severity, StepFilter, TimeWindow};
use crate::steps::parser::{decode_log, parse_line, to_epoch_millis};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

const PLACEHOLDER_SLICE_MS: i64 = 100;

/// Turns the shared framework log into steps for a single test.
#[derive(Clone, Debug)]
pub struct StepExtractor {
    pub logger_name: String,
    pub min_message_length: usize,
    pub max_step_name_length: usize,
    pub enforce_window: bool,
}

impl StepExtractor {
    pub fn from_config(config: &ReportConfig) -> Self {
        StepExtractor {
            logger_name: config.logger_name.clone(),
            min_message_length: config.min_message_length,
            max_step_name_length: config.max_step_name_length,
            enforce_window: config.enforce_step_window,
        }
    }

    /// Steps for a result document. Falls back to placeholder steps when the
    /// log is missing, unreadable, or nothing in it belongs to the test.
    pub fn steps_for_result(
        &self,
        log_file: Option<&Path>,
        filter: &StepFilter,
        window: TimeWindow,
        test_name: &str,
        final_status: Status,
    ) -> Vec<Step> {
        let steps = match log_file {
            Some(path) => self.steps_from_file(path, filter, window),
            None => vec![],
        };
        if steps.is_empty() {
            debug!("no log steps for {}, using placeholders", test_name);
            placeholder_steps(test_name, window, final_status)
        } else {
            steps
        }
    }

    pub fn steps_from_file(&self, path: &Path, filter: &StepFilter, window: TimeWindow) -> Vec<Step> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("could not read log file {}: {}", path.display(), err);
                return vec![];
            }
        };
        match decode_log(&bytes) {
            Some((text, encoding)) => {
                debug!("decoded {} as {:?}", path.display(), encoding);
                self.extract_steps(&text, filter, window)
            }
            None => {
                warn!("could not decode log file {}", path.display());
                vec![]
            }
        }
    }

    /// Matching, de-duplicated steps in log order.
    pub fn extract_steps(&self, text: &str, filter: &StepFilter, window: TimeWindow) -> Vec<Step> {
        if filter.is_empty() {
            return vec![];
        }
        let entries: Vec<LogEntry> = text.lines().filter_map(parse_line).collect();
        let mut seen_messages: HashSet<&str> = HashSet::new();
        let mut matched: Vec<(i64, &LogEntry)> = vec![];
        for entry in &entries {
            if !self.is_relevant(entry, filter) {
                continue;
            }
            let Some(instant) = to_epoch_millis(&entry.timestamp) else {
                continue;
            };
            if self.enforce_window && !window.contains(instant) {
                continue;
            }
            if !seen_messages.insert(entry.message.as_str()) {
                continue;
            }
            matched.push((instant, entry));
        }

        let mut steps = Vec::with_capacity(matched.len());
        for (i, (instant, entry)) in matched.iter().enumerate() {
            let stop = matched
                .get(i + 1)
                .map(|(next, _)| (*next).max(*instant))
                .unwrap_or(*instant);
            steps.push(Step::new(
                self.step_name(entry),
                entry.severity.step_status(),
                *instant,
                stop,
            ));
        }
        steps
    }

    fn is_relevant(&self, entry: &LogEntry, filter: &StepFilter) -> bool {
        entry.logger == self.logger_name
            && filter.accepts_severity(entry.severity)
            && entry.message.chars().count() > self.min_message_length
            && filter.matches_message(&entry.message)
    }

    fn step_name(&self, entry: &LogEntry) -> String {
        let name = match entry.severity {
            Severity::Info => entry.message.clone(),
            other => format!("[{}] {}", other.as_str(), entry.message),
        };
        truncate(&name, self.max_step_name_length)
    }
}

pub fn placeholder_steps(test_name: &str, window: TimeWindow, final_status: Status) -> Vec<Step> {
    [
        (format!("Starting {}", test_name), Status::Passed),
        (format!("Running {}", test_name), Status::Passed),
        (format!("Completed {}", test_name), final_status),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, status))| {
        let start = window
            .start
            .saturating_add(i as i64 * PLACEHOLDER_SLICE_MS)
            .min(window.stop);
        let stop = start.saturating_add(PLACEHOLDER_SLICE_MS).min(window.stop);
        Step::new(name, status, start, stop)
    })
    .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
