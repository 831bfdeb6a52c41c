//! Test doubles for the runner's collaborators

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tern_core::domain::job::{Job, JobStatus};
use tern_core::domain::log::LogLevel;
use tern_core::domain::project::Project;
use tern_core::manifest::MANIFEST_FILE_NAME;
use uuid::Uuid;

use crate::podman::{
    ContainerGateway, ContainerHandle, ContainerSpec, GatewayError, OutputStream,
};
use crate::repository::{JobRepository, LogRepository};
use crate::source::{FetchError, SourceFetcher};

/// One write made to the store, in global order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Status(Uuid, JobStatus),
    Log(Uuid, LogLevel, String),
}

/// Store that keeps every write in memory
#[derive(Default)]
pub struct InMemoryStore {
    statuses: Mutex<HashMap<Uuid, Vec<JobStatus>>>,
    writes: Mutex<Vec<StoreWrite>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Persists a new `Pending` job
    pub fn create_job(&self, project: &Project, branch: &str) -> Job {
        let job = Job {
            id: Uuid::new_v4(),
            project_id: project.id,
            branch: branch.to_string(),
            status: JobStatus::Pending,
            created_at: chrono::Utc::now(),
        };

        self.statuses
            .lock()
            .unwrap()
            .insert(job.id, vec![JobStatus::Pending]);

        job
    }

    /// Every status the job has been in, oldest first
    pub fn status_history(&self, job_id: Uuid) -> Vec<JobStatus> {
        self.statuses
            .lock()
            .unwrap()
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn status(&self, job_id: Uuid) -> Option<JobStatus> {
        self.status_history(job_id).last().copied()
    }

    /// Log messages of one job in write order
    pub fn log_lines(&self, job_id: Uuid) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|w| match w {
                StoreWrite::Log(id, _, message) if *id == job_id => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// All writes concerning one job, in write order
    pub fn writes_for(&self, job_id: Uuid) -> Vec<StoreWrite> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| match w {
                StoreWrite::Status(id, _) | StoreWrite::Log(id, _, _) => *id == job_id,
            })
            .cloned()
            .collect()
    }

    pub fn log_count(&self) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| matches!(w, StoreWrite::Log(..)))
            .count()
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn update_status(&self, job_id: Uuid, status: JobStatus) -> anyhow::Result<bool> {
        let mut statuses = self.statuses.lock().unwrap();
        let history = statuses
            .get_mut(&job_id)
            .ok_or_else(|| anyhow::anyhow!("job {} not found", job_id))?;

        let current = *history.last().expect("history starts with Pending");
        if !current.can_transition_to(status) {
            return Ok(false);
        }

        history.push(status);
        self.writes
            .lock()
            .unwrap()
            .push(StoreWrite::Status(job_id, status));
        Ok(true)
    }
}

#[async_trait]
impl LogRepository for InMemoryStore {
    async fn append(&self, job_id: Uuid, level: LogLevel, message: &str) -> anyhow::Result<()> {
        if !self.statuses.lock().unwrap().contains_key(&job_id) {
            anyhow::bail!("job {} not found", job_id);
        }

        self.writes
            .lock()
            .unwrap()
            .push(StoreWrite::Log(job_id, level, message.to_string()));
        Ok(())
    }
}

pub fn project(name: &str) -> Project {
    Project {
        id: Uuid::new_v4(),
        name: name.to_string(),
        repo: format!("https://git.example.com/{}.git", name),
        created_at: chrono::Utc::now(),
    }
}

/// Operation of the scripted gateway that should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Image,
    Start,
    Stream,
    Wait,
    Remove,
}

/// Behaviour of containers started from one image
#[derive(Debug, Clone, Default)]
pub struct ContainerScript {
    pub lines: Vec<String>,
    pub exit_code: i64,
    pub fail_at: Option<FailAt>,
}

impl ContainerScript {
    pub fn exits(code: i64) -> Self {
        Self {
            exit_code: code,
            ..Default::default()
        }
    }

    pub fn prints(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Default::default()
        }
    }
}

/// Gateway whose containers follow per-image scripts
///
/// Records every call as a short event string (`run <name>`, `remove <name>`,
/// ...), so tests can assert on lifecycle order.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, ContainerScript>>,
    events: Arc<Mutex<Vec<String>>>,
    observed_log_counts: Arc<Mutex<Vec<usize>>>,
    observe: Option<Arc<InMemoryStore>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the store's log count each time a line is handed out
    pub fn observing(store: Arc<InMemoryStore>) -> Self {
        Self {
            observe: Some(store),
            ..Default::default()
        }
    }

    pub fn script(self, image: &str, script: ContainerScript) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(image.to_string(), script);
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn started_containers(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("run ").map(str::to_string))
            .collect()
    }

    pub fn observed_log_counts(&self) -> Vec<usize> {
        self.observed_log_counts.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn script_for(&self, image: &str) -> ContainerScript {
        self.scripts
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_default()
    }

    fn image_of(handle: &ContainerHandle) -> &str {
        handle.id.strip_prefix("id:").unwrap_or(&handle.id)
    }
}

#[async_trait]
impl ContainerGateway for ScriptedGateway {
    async fn ensure_image(&self, image: &str) -> Result<(), GatewayError> {
        self.record(format!("ensure {}", image));
        if self.script_for(image).fail_at == Some(FailAt::Image) {
            return Err(GatewayError::ImageUnavailable {
                image: image.to_string(),
                reason: "manifest unknown".to_string(),
            });
        }
        Ok(())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, GatewayError> {
        if self.script_for(&spec.image).fail_at == Some(FailAt::Start) {
            self.record(format!("start-failed {}", spec.name));
            return Err(GatewayError::ContainerStartFailed(
                "no such file or directory".to_string(),
            ));
        }

        self.record(format!("run {}", spec.name));
        Ok(ContainerHandle {
            id: format!("id:{}", spec.image),
            name: spec.name.clone(),
        })
    }

    async fn stream_output(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Box<dyn OutputStream>, GatewayError> {
        self.record(format!("stream {}", handle.name));
        let script = self.script_for(Self::image_of(handle));

        Ok(Box::new(ScriptedOutput {
            lines: script.lines.into_iter().collect(),
            fail_at_end: script.fail_at == Some(FailAt::Stream),
            observe: self.observe.clone(),
            observed: Arc::clone(&self.observed_log_counts),
        }))
    }

    async fn wait_for_exit(&self, handle: &ContainerHandle) -> Result<i64, GatewayError> {
        self.record(format!("wait {}", handle.name));
        let script = self.script_for(Self::image_of(handle));
        if script.fail_at == Some(FailAt::Wait) {
            return Err(GatewayError::WaitFailed("connection reset".to_string()));
        }
        Ok(script.exit_code)
    }

    async fn remove_container(&self, handle: &ContainerHandle) -> Result<(), GatewayError> {
        self.record(format!("remove {}", handle.name));
        if self.script_for(Self::image_of(handle)).fail_at == Some(FailAt::Remove) {
            return Err(GatewayError::RemoveFailed("container is busy".to_string()));
        }
        Ok(())
    }
}

struct ScriptedOutput {
    lines: std::collections::VecDeque<String>,
    fail_at_end: bool,
    observe: Option<Arc<InMemoryStore>>,
    observed: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl OutputStream for ScriptedOutput {
    async fn next_line(&mut self) -> Result<Option<String>, GatewayError> {
        // Let concurrent runs interleave between lines
        tokio::task::yield_now().await;

        if let Some(store) = &self.observe {
            self.observed.lock().unwrap().push(store.log_count());
        }

        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.fail_at_end => Err(GatewayError::StreamFailed(
                "unexpected EOF".to_string(),
            )),
            None => Ok(None),
        }
    }
}

/// Fetcher that materializes a manifest instead of cloning
pub struct FakeFetcher {
    manifest: Option<String>,
    error: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn with_manifest(manifest: &str) -> Self {
        Self {
            manifest: Some(manifest.to_string()),
            error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fetches an empty tree (no manifest)
    pub fn empty_tree() -> Self {
        Self {
            manifest: None,
            error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            manifest: None,
            error: Some(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch_branch(
        &self,
        repo: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<String, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}@{} -> {}", repo, branch, dest.display()));

        if let Some(message) = &self.error {
            return Err(FetchError::CloneFailed {
                status: "exit status: 128".to_string(),
                output: message.clone(),
            });
        }

        assert!(!dest.exists(), "fetch destination must be fresh");
        std::fs::create_dir_all(dest).unwrap();
        if let Some(manifest) = &self.manifest {
            std::fs::write(dest.join(MANIFEST_FILE_NAME), manifest).unwrap();
        }

        Ok(format!("Cloning into '{}'...", dest.display()))
    }
}
