use crate::api::ReportError;
use crate::config::ReportConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Drives the external report binary. Its behavior is opaque to us; we only
/// build the command lines and surface failures.
#[derive(Clone, Debug)]
pub struct ReportRenderer {
    pub allure_bin: PathBuf,
    pub results_dir: PathBuf,
    pub report_dir: PathBuf,
}

impl ReportRenderer {
    pub fn from_config(config: &ReportConfig) -> Self {
        ReportRenderer {
            allure_bin: config.allure_bin.clone(),
            results_dir: config.results_dir.clone(),
            report_dir: config.report_dir.clone(),
        }
    }

    pub fn generate_args(&self) -> Vec<String> {
        vec![
            "generate".to_string(),
            self.results_dir.display().to_string(),
            "--clean".to_string(),
            "--output".to_string(),
            self.report_dir.display().to_string(),
        ]
    }

    pub fn serve_args(&self) -> Vec<String> {
        vec!["serve".to_string(), self.results_dir.display().to_string()]
    }

    pub fn generate(&self) -> Result<PathBuf, ReportError> {
        self.check_ready()?;
        info!("generating HTML report into {}", self.report_dir.display());
        let output = Command::new(&self.allure_bin)
            .args(self.generate_args())
            .output()
            .map_err(|err| self.spawn_error(err))?;
        if !output.status.success() {
            return Err(ReportError::Renderer {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!("report generated at {}/index.html", self.report_dir.display());
        Ok(self.report_dir.clone())
    }

    /// Blocks until the renderer's server exits.
    pub fn serve(&self) -> Result<(), ReportError> {
        self.check_ready()?;
        info!("serving report from {}", self.results_dir.display());
        let status = Command::new(&self.allure_bin)
            .args(self.serve_args())
            .status()
            .map_err(|err| self.spawn_error(err))?;
        if status.success() {
            Ok(())
        } else {
            Err(ReportError::Renderer {
                status: status.to_string(),
                stderr: String::new(),
            })
        }
    }

    fn check_ready(&self) -> Result<(), ReportError> {
        if is_explicit_path(&self.allure_bin) && !self.allure_bin.exists() {
            return Err(ReportError::RendererMissing(self.allure_bin.clone()));
        }
        if !self.results_dir.is_dir() {
            return Err(ReportError::NoResults(self.results_dir.clone()));
        }
        Ok(())
    }

    fn spawn_error(&self, err: std::io::Error) -> ReportError {
        if err.kind() == ErrorKind::NotFound {
            ReportError::RendererMissing(self.allure_bin.clone())
        } else {
            ReportError::Io {
                path: self.allure_bin.clone(),
                source: err,
            }
        }
    }
}

/// A bare program name is resolved through `PATH` by the OS.
fn is_explicit_path(bin: &Path) -> bool {
    bin.components().count() > 1
}
