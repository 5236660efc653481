use crate::api::ReportError;
use crate::report::labels::Classification;
use crate::report::model::{
    Attachment, Container, ResultRequest, RetryAttempt, Stage, Status, StatusDetails, TestResult,
};
use crate::report::store::ResultStore;
use crate::steps::model::{StepFilter, TimeWindow};
use crate::steps::service::StepExtractor;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const RETRY_SLICE_MS: i64 = 1_000;

/// `"<name> (Attempts: n/max)"` once a test needed more than one attempt.
pub fn attempt_annotated_name(test_name: &str, attempts: u32, max_attempts: u32) -> String {
    if attempts > 1 {
        format!("{} (Attempts: {}/{})", test_name, attempts, max_attempts)
    } else {
        test_name.to_string()
    }
}

/// One entry per attempt, each a one-second slice from `start`. Every attempt
/// but the last failed.
pub fn synthesize_retries(test_name: &str, retry_count: u32, final_status: Status, start: i64) -> Vec<RetryAttempt> {
    (1..=retry_count)
        .map(|attempt| {
            let offset = (attempt as i64 - 1).saturating_mul(RETRY_SLICE_MS);
            let slice_start = start.saturating_add(offset);
            RetryAttempt {
                name: format!("{} - Attempt {}", test_name, attempt),
                status: if attempt == retry_count {
                    final_status
                } else {
                    Status::Failed
                },
                start: slice_start,
                stop: slice_start.saturating_add(RETRY_SLICE_MS),
            }
        })
        .collect()
}

pub struct ResultAssembler {
    store: Arc<ResultStore>,
    extractor: StepExtractor,
}

impl ResultAssembler {
    pub fn new(store: Arc<ResultStore>, extractor: StepExtractor) -> Self {
        ResultAssembler { store, extractor }
    }

    /// Builds the document without touching the results directory.
    pub fn assemble(&self, request: &ResultRequest, uuid: Uuid) -> TestResult {
        let now = Utc::now().timestamp_millis();
        let start = request.start.unwrap_or(now);
        let requested_stop = request.stop.unwrap_or(now);
        if requested_stop < start {
            warn!(
                "stop {} precedes start {} for {}, clamping",
                requested_stop, start, request.name
            );
        }
        let window = TimeWindow::new(start, requested_stop);

        let filter = request
            .step_filter
            .clone()
            .unwrap_or_else(|| StepFilter::for_test_name(&request.name));
        let log_file = request.log_file.as_deref().filter(|path| path.is_file());
        let steps = self.extractor.steps_for_result(
            log_file,
            &filter,
            window,
            &request.name,
            request.status,
        );

        let classification = Classification::resolve(
            &request.name,
            request.test_class.as_deref(),
            request.package.as_deref(),
            request.suite.as_deref(),
        );

        let status_details = match &request.error_message {
            Some(message) if request.status.has_error_details() => StatusDetails {
                message: Some(message.clone()),
                trace: Some(message.clone()),
            },
            Some(_) => {
                debug!("ignoring error message for {:?} result", request.status);
                StatusDetails::default()
            }
            None => StatusDetails::default(),
        };

        TestResult {
            uuid,
            name: request.name.clone(),
            status: request.status,
            status_details,
            stage: Stage::Finished,
            start: window.start,
            stop: window.stop,
            steps,
            attachments: request.attachments.clone(),
            parameters: vec![],
            labels: classification.to_labels(&request.name),
            retries: synthesize_retries(&request.name, request.retry_count, request.status, window.start),
        }
    }

    /// Writes one result document and returns its identity. The log is
    /// attached when it can be copied; a failed copy only loses the attachment.
    pub fn generate_test_result(&self, request: &ResultRequest) -> Result<Uuid, ReportError> {
        let uuid = Uuid::new_v4();
        self.write_test_result(request, uuid)?;
        Ok(uuid)
    }

    fn write_test_result(&self, request: &ResultRequest, uuid: Uuid) -> Result<(), ReportError> {
        let mut result = self.assemble(request, uuid);
        let mut copied = None;
        if let Some(log_file) = request.log_file.as_deref().filter(|path| path.is_file()) {
            match self.store.copy_attachment(log_file, uuid) {
                Ok(source) => {
                    copied = Some(source.clone());
                    result.attachments.push(Attachment {
                        name: request.name.clone(),
                        source,
                        media_type: "text/plain".to_string(),
                    });
                }
                Err(err) => warn!("writing {} without its log: {}", request.name, err),
            }
        }
        match self.store.write_result(&result) {
            Ok(path) => {
                info!(
                    "wrote {} result for {} to {}",
                    result.status.as_str(),
                    result.name,
                    path.display()
                );
                Ok(())
            }
            Err(err) => {
                if let Some(source) = copied {
                    self.store.remove_attachment(&source);
                }
                Err(err)
            }
        }
    }

    pub fn generate_container(&self, name: &str, children: Vec<Uuid>) -> Result<Uuid, ReportError> {
        let container = Container::new(name.to_string(), children);
        self.store.write_container(&container)?;
        Ok(container.uuid)
    }

    /// Reporting must never fail the run it reports on: errors are logged and
    /// swallowed.
    pub fn report(&self, request: &ResultRequest, with_container: bool) -> Option<Uuid> {
        let outcome = self.generate_test_result(request).and_then(|uuid| {
            if with_container {
                self.generate_container(&request.name, vec![uuid])?;
            }
            Ok(uuid)
        });
        match outcome {
            Ok(uuid) => Some(uuid),
            Err(err) => {
                warn!("could not generate report for {}: {}", request.name, err);
                None
            }
        }
    }
}
