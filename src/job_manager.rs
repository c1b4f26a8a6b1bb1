use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use ig_checker_lib::{DisplayResults, Orchestrator, ProgressUpdate};

const MAX_LOG_LINES: usize = 50;

#[derive(Clone, Debug, serde::Serialize)]
pub struct JobStatus {
    pub id: String,
    pub status: String, // "queued", "processing", "completed", "failed"
    pub total: usize,
    pub processed: usize,
    pub current_username: String,
    pub running_text: String,
    pub logs: Vec<String>,
    pub results: Option<DisplayResults>,
    pub error: Option<String>,
    #[serde(skip)]
    pub csv_path: Option<PathBuf>,
    #[serde(skip)]
    pub text_path: Option<PathBuf>,
}

impl JobStatus {
    fn queued(id: &str) -> Self {
        JobStatus {
            id: id.to_string(),
            status: "queued".to_string(),
            total: 0,
            processed: 0,
            current_username: "Initializing...".to_string(),
            running_text: String::new(),
            logs: vec!["Job started.".to_string()],
            results: None,
            error: None,
            csv_path: None,
            text_path: None,
        }
    }

    fn log(&mut self, msg: String) {
        self.logs.push(msg);
        if self.logs.len() > MAX_LOG_LINES {
            self.logs.remove(0);
        }
    }
}

pub enum JobInput {
    Text(String),
    Upload(PathBuf),
}

pub struct JobManager {
    pub jobs: Arc<Mutex<HashMap<String, JobStatus>>>,
    orchestrator: Arc<Orchestrator>,
}

impl JobManager {
    pub fn new(orchestrator: Orchestrator) -> Self {
        JobManager {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        lock(&self.jobs).get(job_id).cloned()
    }

    pub fn start_job(&self, job_id: String, input: JobInput) -> String {
        lock(&self.jobs).insert(job_id.clone(), JobStatus::queued(&job_id));

        let jobs_arc = self.jobs.clone();
        let orchestrator = self.orchestrator.clone();
        let id_clone = job_id.clone();

        thread::spawn(move || {
            Self::run_batch(id_clone, jobs_arc, orchestrator, input);
        });

        job_id
    }

    fn run_batch(
        job_id: String,
        jobs: Arc<Mutex<HashMap<String, JobStatus>>>,
        orchestrator: Arc<Orchestrator>,
        input: JobInput,
    ) {
        let update = |f: &mut dyn FnMut(&mut JobStatus)| {
            if let Some(job) = lock(&jobs).get_mut(&job_id) {
                f(job);
            }
        };

        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                update(&mut |job: &mut JobStatus| {
                    job.status = "failed".to_string();
                    job.error = Some(format!("Failed to start runtime: {}", e));
                });
                return;
            }
        };

        update(&mut |job: &mut JobStatus| job.status = "processing".to_string());

        let on_progress = |progress: &ProgressUpdate<'_>| {
            update(&mut |job: &mut JobStatus| {
                job.total = progress.total;
                job.processed = progress.processed;
                job.current_username = progress.username.to_string();
                job.running_text = progress.running_text.to_string();
                job.log(progress.message());
            });
        };

        let result = runtime.block_on(async {
            match &input {
                JobInput::Text(text) => orchestrator.run_text(text, on_progress).await,
                JobInput::Upload(path) => orchestrator.run_upload(Some(path.as_path()), on_progress).await,
            }
        });

        match result {
            Ok(report) => update(&mut |job: &mut JobStatus| {
                job.status = "completed".to_string();
                job.current_username = "Done".to_string();
                job.log(format!("All {} usernames processed.", job.processed));
                if let Some(stats) = &report.load_stats {
                    job.log(format!(
                        "Rows: {} valid, {} empty, {} errors",
                        stats.valid_count, stats.empty_count, stats.error_count
                    ));
                }
                job.results = Some(report.results.clone());
                job.csv_path = Some(report.csv_path.clone());
                job.text_path = Some(report.text_path.clone());
            }),
            Err(e) => {
                log::error!("Job {} failed: {}", job_id, e);
                update(&mut |job: &mut JobStatus| {
                    job.status = "failed".to_string();
                    job.error = Some(e.to_string());
                    job.log(format!("Error: {}", e));
                });
            }
        }

        discard_upload(&input);
    }
}

/// Deletes the saved copy of an uploaded table once its batch is over.
fn discard_upload(input: &JobInput) {
    if let JobInput::Upload(path) = input {
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed upload {:?}", path),
            Err(e) => log::warn!("Could not remove upload {:?}: {}", path, e),
        }
    }
}

/// Recovers the job map from a poisoned lock.
fn lock(jobs: &Mutex<HashMap<String, JobStatus>>) -> MutexGuard<'_, HashMap<String, JobStatus>> {
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ig_checker_lib::CheckerConfig;

    fn manager(dir: &std::path::Path) -> JobManager {
        JobManager::new(Orchestrator::new(CheckerConfig::with_output_dir(dir.to_path_buf()), None))
    }

    #[test]
    fn upload_is_removed_after_failed_batch() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("job-1.csv");
        std::fs::write(&upload, "artist,handle\nA,alice\n").unwrap();

        let jobs = manager(dir.path());
        lock(&jobs.jobs).insert("job-1".to_string(), JobStatus::queued("job-1"));
        JobManager::run_batch(
            "job-1".to_string(),
            jobs.jobs.clone(),
            jobs.orchestrator.clone(),
            JobInput::Upload(upload.clone()),
        );

        let job = jobs.get("job-1").unwrap();
        assert_eq!(job.status, "failed");
        assert!(job.error.unwrap().contains("ig user"));
        assert!(!upload.exists());
    }

    #[test]
    fn upload_is_removed_after_completed_batch() {
        let dir = tempfile::tempdir().unwrap();
        let upload = dir.path().join("job-2.csv");
        std::fs::write(&upload, "IG User\n\n").unwrap();

        let jobs = manager(dir.path());
        lock(&jobs.jobs).insert("job-2".to_string(), JobStatus::queued("job-2"));
        JobManager::run_batch(
            "job-2".to_string(),
            jobs.jobs.clone(),
            jobs.orchestrator.clone(),
            JobInput::Upload(upload.clone()),
        );

        let job = jobs.get("job-2").unwrap();
        assert_eq!(job.status, "completed");
        assert!(job.csv_path.is_some());
        assert!(!upload.exists());
    }

    #[test]
    fn text_jobs_leave_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("keep.csv");
        std::fs::write(&other, "x").unwrap();
        discard_upload(&JobInput::Text("Artist\n@alice".to_string()));
        assert!(other.exists());
    }
}
