use crate::report::model::Status;
use bon::Builder;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn step_status(&self) -> Status {
        match self {
            Severity::Debug | Severity::Info => Status::Passed,
            Severity::Warning => Status::Broken,
            Severity::Error | Severity::Critical => Status::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

/// One parsed line of the shared framework log.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub logger: String,
    pub severity: Severity,
    pub message: String,
}

/// Declares which log lines belong to a test.
#[derive(Clone, Eq, PartialEq, Debug, Builder)]
pub struct StepFilter {
    /// Substrings matched case-insensitively; a message must contain at least one.
    #[builder(default)]
    pub keywords: Vec<String>,
    #[builder(default = HashSet::from([Severity::Info]))]
    pub severities: HashSet<Severity>,
}

impl StepFilter {
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StepFilter::builder()
            .keywords(
                keywords
                    .into_iter()
                    .map(|k| k.as_ref().trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            )
            .build()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn accepts_severity(&self, severity: Severity) -> bool {
        self.severities.contains(&severity)
    }

    pub fn matches_message(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .any(|keyword| !keyword.is_empty() && lowered.contains(keyword.as_str()))
    }
}

/// Millisecond epoch interval a test ran in.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct TimeWindow {
    pub start: i64,
    pub stop: i64,
}

impl TimeWindow {
    pub fn new(start: i64, stop: i64) -> Self {
        TimeWindow {
            start,
            stop: stop.max(start),
        }
    }

    pub fn contains(&self, instant: i64) -> bool {
        instant >= self.start && instant <= self.stop
    }
}
