use crate::api::ReportError;
use crate::steps::model::StepFilter;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
            Status::Skipped => "skipped",
        }
    }

    pub fn has_error_details(&self) -> bool {
        matches!(self, Status::Failed | Status::Broken)
    }
}

impl FromStr for Status {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passed" => Ok(Status::Passed),
            "failed" => Ok(Status::Failed),
            "broken" => Ok(Status::Broken),
            "skipped" => Ok(Status::Skipped),
            _ => Err(ReportError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Finished,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default)]
pub struct StatusDetails {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: &str, value: &str) -> Self {
        Label {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Attachment {
    pub name: String,
    /// File name relative to the results directory.
    pub source: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Step {
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub stage: Stage,
    pub start: i64,
    pub stop: i64,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Step {
    pub fn new(name: String, status: Status, start: i64, stop: i64) -> Self {
        Step {
            name,
            status,
            stage: Stage::Finished,
            start,
            stop,
            steps: vec![],
            attachments: vec![],
            parameters: vec![],
        }
    }
}

/// One synthesized attempt of a retried test.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct RetryAttempt {
    pub name: String,
    pub status: Status,
    pub start: i64,
    pub stop: i64,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub uuid: Uuid,
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub status_details: StatusDetails,
    #[serde(default)]
    pub stage: Stage,
    pub start: i64,
    pub stop: i64,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub labels: Vec<Label>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub retries: Vec<RetryAttempt>,
}

impl TestResult {
    pub fn file_name(&self) -> String {
        format!("{}-result.json", self.uuid)
    }
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct Container {
    pub uuid: Uuid,
    pub name: String,
    pub children: Vec<Uuid>,
    #[serde(default)]
    pub befores: Vec<Step>,
    #[serde(default)]
    pub afters: Vec<Step>,
}

impl Container {
    pub fn new(name: String, children: Vec<Uuid>) -> Self {
        Container {
            uuid: Uuid::new_v4(),
            name,
            children,
            befores: vec![],
            afters: vec![],
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}-container.json", self.uuid)
    }
}

/// Everything the assembler needs to produce one result document.
#[derive(Builder, Clone, Debug)]
pub struct ResultRequest {
    #[builder(into)]
    pub name: String,
    pub status: Status,
    /// Millisecond epoch; "now" when absent.
    pub start: Option<i64>,
    pub stop: Option<i64>,
    #[builder(into)]
    pub error_message: Option<String>,
    #[builder(default)]
    pub attachments: Vec<Attachment>,
    #[builder(into)]
    pub test_class: Option<String>,
    #[builder(into)]
    pub package: Option<String>,
    #[builder(into)]
    pub suite: Option<String>,
    #[builder(into)]
    pub log_file: Option<PathBuf>,
    /// Explicit step filter declared by the test; the legacy name table is used when absent.
    pub step_filter: Option<StepFilter>,
    #[builder(default = 0)]
    pub retry_count: u32,
}
