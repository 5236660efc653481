use crate::api::ReportError;
use crate::report::model::{Container, TestResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use uuid::Uuid;

const RESULT_SUFFIX: &str = "-result.json";
const CONTAINER_SUFFIX: &str = "-container.json";

/// The directory result and container documents accumulate in. Assumes a
/// single writer at a time; `clean` racing a write can lose that write.
#[derive(Clone, Debug)]
pub struct ResultStore {
    results_dir: PathBuf,
}

impl ResultStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        ResultStore {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn ensure_dir(&self) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.results_dir).map_err(io_error(&self.results_dir))
    }

    /// Removes the directory with everything in it and recreates it empty.
    pub fn clean(&self) -> Result<(), ReportError> {
        match std::fs::remove_dir_all(&self.results_dir) {
            Ok(()) => info!("cleaned results from {}", self.results_dir.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_error(&self.results_dir)(err)),
        }
        self.ensure_dir()?;
        info!("created fresh results directory {}", self.results_dir.display());
        Ok(())
    }

    /// Deletes files last modified more than `older_than_minutes` ago.
    pub fn clean_old(&self, older_than_minutes: u64) -> Result<usize, ReportError> {
        if !self.results_dir.exists() {
            return Ok(0);
        }
        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(older_than_minutes.saturating_mul(60)))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut cleaned = 0;
        for entry in std::fs::read_dir(&self.results_dir).map_err(io_error(&self.results_dir))? {
            let entry = entry.map_err(io_error(&self.results_dir))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(io_error(&path))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().map_err(io_error(&path))?;
            if modified < cutoff {
                std::fs::remove_file(&path).map_err(io_error(&path))?;
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            info!(
                "cleaned {} old result files (older than {} minutes)",
                cleaned, older_than_minutes
            );
        } else {
            info!(
                "no old results to clean (all files are newer than {} minutes)",
                older_than_minutes
            );
        }
        Ok(cleaned)
    }

    pub fn write_result(&self, result: &TestResult) -> Result<PathBuf, ReportError> {
        self.write_document(&result.file_name(), result)
    }

    pub fn write_container(&self, container: &Container) -> Result<PathBuf, ReportError> {
        self.write_document(&container.file_name(), container)
    }

    /// Copies a file next to the documents as `<uuid>-attachment.<ext>` and
    /// returns the new file name.
    pub fn copy_attachment(&self, source: &Path, owner: Uuid) -> Result<String, ReportError> {
        self.ensure_dir()?;
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("txt");
        let file_name = format!("{}-attachment.{}", owner, extension);
        if let Err(err) = std::fs::copy(source, self.results_dir.join(&file_name)) {
            self.remove_attachment(&file_name);
            return Err(io_error(source)(err));
        }
        Ok(file_name)
    }

    /// Drops an attachment whose owning document never made it to disk.
    pub fn remove_attachment(&self, file_name: &str) {
        let path = self.results_dir.join(file_name);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!("could not remove attachment {}: {}", path.display(), err),
        }
    }

    pub fn read_results(&self) -> Result<Vec<TestResult>, ReportError> {
        self.read_documents(RESULT_SUFFIX)
    }

    pub fn read_containers(&self) -> Result<Vec<Container>, ReportError> {
        self.read_documents(CONTAINER_SUFFIX)
    }

    /// Writes a container for every result no existing container refers to.
    pub fn backfill_containers(&self) -> Result<usize, ReportError> {
        let results = self.read_results()?;
        let contained: HashSet<Uuid> = self
            .read_containers()?
            .into_iter()
            .flat_map(|container| container.children)
            .collect();
        let mut created = 0;
        for result in results.iter().filter(|r| !contained.contains(&r.uuid)) {
            self.write_container(&Container::new(result.name.clone(), vec![result.uuid]))?;
            created += 1;
        }
        info!("created {} containers for uncontained results", created);
        Ok(created)
    }

    fn write_document<T: Serialize>(&self, file_name: &str, document: &T) -> Result<PathBuf, ReportError> {
        self.ensure_dir()?;
        let path = self.results_dir.join(file_name);
        let json = serde_json::to_vec_pretty(document)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(io_error(&path))?;
        file.write_all(&json).map_err(io_error(&path))?;
        Ok(path)
    }

    fn read_documents<T: DeserializeOwned>(&self, suffix: &str) -> Result<Vec<T>, ReportError> {
        if !self.results_dir.exists() {
            return Ok(vec![]);
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.results_dir)
            .map_err(io_error(&self.results_dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(suffix))
            })
            .collect();
        paths.sort();
        let mut documents = vec![];
        for path in paths {
            let parsed = std::fs::read(&path)
                .map_err(io_error(&path))
                .and_then(|bytes| serde_json::from_slice::<T>(&bytes).map_err(ReportError::from));
            match parsed {
                Ok(document) => documents.push(document),
                Err(err) => warn!("skipping unreadable document {}: {}", path.display(), err),
            }
        }
        Ok(documents)
    }
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ReportError + '_ {
    move |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::{Stage, Status, StatusDetails};
    use std::fs::File;
    use tempfile::TempDir;

    fn sample_result(name: &str) -> TestResult {
        TestResult {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            status: Status::Passed,
            status_details: StatusDetails::default(),
            stage: Stage::Finished,
            start: 10,
            stop: 20,
            steps: vec![],
            attachments: vec![],
            parameters: vec![],
            labels: vec![],
            retries: vec![],
        }
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn clean_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path().join("allure-results"));
        store.write_result(&sample_result("one")).unwrap();

        store.clean().unwrap();
        assert_eq!(store.results_dir().is_dir(), true);
        assert_eq!(file_count(store.results_dir()), 0);

        store.clean().unwrap();
        assert_eq!(store.results_dir().is_dir(), true);
        assert_eq!(file_count(store.results_dir()), 0);
    }

    #[test]
    fn clean_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path().join("nested").join("results"));
        store.clean().unwrap();
        assert_eq!(store.results_dir().is_dir(), true);
    }

    #[test]
    fn clean_old_keeps_recent_files() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path());
        let fresh = store.write_result(&sample_result("fresh")).unwrap();
        let stale = store.write_result(&sample_result("stale")).unwrap();
        let an_hour_ago = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(an_hour_ago)
            .unwrap();

        let cleaned = store.clean_old(30).unwrap();
        assert_eq!(cleaned, 1);
        assert_eq!(fresh.exists(), true);
        assert_eq!(stale.exists(), false);
    }

    #[test]
    fn clean_old_on_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path().join("absent"));
        assert_eq!(store.clean_old(5).unwrap(), 0);
    }

    #[test]
    fn documents_are_never_overwritten() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path());
        let result = sample_result("once");
        store.write_result(&result).unwrap();
        assert!(matches!(store.write_result(&result), Err(ReportError::Io { .. })));
    }

    #[test]
    fn backfill_only_touches_uncontained_results() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path());
        let contained = sample_result("contained");
        let loose = sample_result("loose");
        store.write_result(&contained).unwrap();
        store.write_result(&loose).unwrap();
        store
            .write_container(&Container::new("contained".to_string(), vec![contained.uuid]))
            .unwrap();

        assert_eq!(store.backfill_containers().unwrap(), 1);
        assert_eq!(store.backfill_containers().unwrap(), 0);

        let containers = store.read_containers().unwrap();
        assert_eq!(containers.len(), 2);
        assert!(containers.iter().any(|c| c.children == vec![loose.uuid] && c.name == "loose"));
    }

    #[test]
    fn unreadable_documents_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path());
        std::fs::write(tmp.path().join("broken-result.json"), b"{not json").unwrap();
        store.write_result(&sample_result("fine")).unwrap();
        let results = store.read_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "fine");
    }

    #[test]
    fn copies_attachments() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("automation_20251010.log");
        std::fs::write(&log, "line").unwrap();
        let store = ResultStore::new(tmp.path().join("results"));
        let owner = Uuid::new_v4();
        let name = store.copy_attachment(&log, owner).unwrap();
        assert_eq!(name, format!("{}-attachment.log", owner));
        assert_eq!(
            std::fs::read_to_string(store.results_dir().join(name)).unwrap(),
            "line"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_copy_leaves_no_partial_attachment() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path().join("results"));
        let owner = Uuid::new_v4();
        let copied = store.copy_attachment(Path::new("/proc/self/mem"), owner);
        assert!(matches!(copied, Err(ReportError::Io { .. })));
        assert_eq!(std::fs::read_dir(store.results_dir()).unwrap().count(), 0);
    }

    #[test]
    fn removing_a_missing_attachment_is_quiet() {
        let tmp = TempDir::new().unwrap();
        let store = ResultStore::new(tmp.path());
        store.remove_attachment("nothing-attachment.log");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
