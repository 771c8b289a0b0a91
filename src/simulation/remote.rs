//! Remote job-queue execution backend.
//!
//! Submits the assembled request text to an HTTP simulation service, polls
//! the job on a fixed interval up to a one-hour ceiling, fetches the result
//! JSON (re-fetching the full variant when the service truncated it) and
//! demultiplexes exactly like the local backend. On job failure the remote
//! input/output transcripts are persisted locally for diagnosis.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Settings;
use crate::error::SimError;
use crate::simulation::batch::SimBatch;
use crate::simulation::executor::Executor;
use crate::simulation::profile::SimProfile;
use crate::simulation::result::SimcResult;
use crate::simulation::retry::{Attempt, RetryPolicy};

/// Grace period before the first status poll; short jobs often finish here.
const INITIAL_DELAY: Duration = Duration::from_secs(5);
/// Fixed interval between status polls.
const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Wall-clock ceiling on polling one job.
const POLL_CEILING: Duration = Duration::from_secs(3600);
/// Artifact fetches back off exponentially inside this deadline.
const FETCH_DEADLINE: Duration = Duration::from_secs(40);
const FETCH_BASE: Duration = Duration::from_secs(1);
const FETCH_CAP: Duration = Duration::from_secs(10);
/// Per-request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs simulations through a remote HTTP job queue.
pub struct RemoteExecutor {
    base_url: String,
    api_key: String,
    work_dir: PathBuf,
    keep_files: bool,
    agent: ureq::Agent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    api_key: &'a str,
    advanced_input: &'a str,
    simc_version: &'a str,
    report_name: &'a str,
    iterations: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobCreated {
    sim_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobStatus {
    job: JobState,
    #[serde(default)]
    retries_remaining: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct JobState {
    state: String,
    #[serde(default)]
    progress: Option<u32>,
}

/// What a status poll tells us to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollAction {
    /// Keep polling.
    Wait,
    /// Result is ready.
    Done,
    /// Terminal failure with no retries left on the service side.
    Failed,
}

pub(crate) fn poll_action(status: &JobStatus) -> PollAction {
    match status.job.state.as_str() {
        "complete" => PollAction::Done,
        // The service retries failed jobs itself; only a failure with zero
        // retries remaining is terminal for us.
        "failed" if status.retries_remaining.unwrap_or(0) <= 0 => PollAction::Failed,
        _ => PollAction::Wait,
    }
}

/// Whether the service flagged the payload as truncated.
pub(crate) fn is_truncated(value: &Value) -> bool {
    value
        .pointer("/simbot/hasFullJson")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

enum PollFailure {
    JobFailed,
    TimedOut,
}

impl RemoteExecutor {
    /// Fails fast when the settings carry no remote block or no API key.
    pub fn new(settings: &Settings) -> Result<Self, SimError> {
        let remote = settings
            .remote
            .as_ref()
            .ok_or_else(|| SimError::Config("remote execution requires remote settings".into()))?;
        if remote.api_key.is_empty() {
            return Err(SimError::Config(
                "remote execution requires an API key".into(),
            ));
        }
        Ok(Self {
            base_url: remote.base_url.trim_end_matches('/').to_string(),
            api_key: remote.api_key.clone(),
            work_dir: settings.temp_dir.clone(),
            keep_files: settings.keep_files,
            agent: ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build(),
        })
    }

    /// GET a URL with exponential backoff. 429 and transport errors are
    /// retried inside the fetch deadline; other HTTP errors propagate.
    fn get_with_backoff(&self, url: &str) -> Result<ureq::Response, SimError> {
        let policy = RetryPolicy::exponential(FETCH_BASE, FETCH_CAP, FETCH_DEADLINE);
        policy.run(|attempt| match self.agent.get(url).call() {
            Ok(response) => Attempt::Done(response),
            Err(ureq::Error::Status(429, response)) => {
                debug!("rate limited on {} (attempt {})", url, attempt);
                Attempt::Retry(SimError::from(ureq::Error::Status(429, response)))
            }
            Err(err @ ureq::Error::Transport(_)) => {
                debug!("transport error on {} (attempt {}): {}", url, attempt, err);
                Attempt::Retry(SimError::from(err))
            }
            Err(err) => Attempt::Abort(SimError::from(err)),
        })
    }

    /// Submit the request text as a new job; returns the job id.
    fn submit(&self, input: &str, report_name: &str, iterations: &str) -> Result<String, SimError> {
        let url = format!("{}/sim", self.base_url);
        let body = JobRequest {
            kind: "advanced",
            api_key: &self.api_key,
            advanced_input: input,
            simc_version: "nightly",
            report_name,
            iterations,
        };
        let policy = RetryPolicy::exponential(FETCH_BASE, FETCH_CAP, FETCH_DEADLINE);
        let response = policy.run(|attempt| match self.agent.post(&url).send_json(&body) {
            Ok(response) => Attempt::Done(response),
            Err(ureq::Error::Status(429, response)) => {
                debug!("rate limited on submit (attempt {})", attempt);
                Attempt::Retry(SimError::from(ureq::Error::Status(429, response)))
            }
            Err(err @ ureq::Error::Transport(_)) => Attempt::Retry(SimError::from(err)),
            Err(err) => Attempt::Abort(SimError::from(err)),
        })?;
        let created: JobCreated = response.into_json()?;
        info!("submitted '{}' as remote job {}", report_name, created.sim_id);
        Ok(created.sim_id)
    }

    /// Poll until the job completes or fails, or the ceiling passes.
    /// Transient fetch errors count as "still waiting" within the ceiling.
    fn await_job(&self, id: &str) -> Result<(), PollFailure> {
        thread::sleep(INITIAL_DELAY);
        let policy = RetryPolicy::fixed(POLL_INTERVAL, POLL_CEILING);
        policy.run(|attempt| {
            let url = format!("{}/api/job/{}", self.base_url, id);
            let response = match self.agent.get(&url).call() {
                Ok(response) => response,
                Err(err) => {
                    debug!("job {} poll {} failed: {}", id, attempt, err);
                    return Attempt::Retry(PollFailure::TimedOut);
                }
            };
            let status: JobStatus = match response.into_json() {
                Ok(status) => status,
                Err(err) => {
                    debug!("job {} poll {} returned bad body: {}", id, attempt, err);
                    return Attempt::Retry(PollFailure::TimedOut);
                }
            };
            debug!(
                "job {} state={} progress={:?}",
                id, status.job.state, status.job.progress
            );
            match poll_action(&status) {
                PollAction::Done => Attempt::Done(()),
                PollAction::Failed => Attempt::Abort(PollFailure::JobFailed),
                PollAction::Wait => Attempt::Retry(PollFailure::TimedOut),
            }
        })
    }

    /// Fetch the result document, upgrading to the full variant when the
    /// service truncated the payload.
    fn fetch_result(&self, id: &str) -> Result<SimcResult, SimError> {
        let url = format!("{}/reports/{}/data.json", self.base_url, id);
        let value: Value = self.get_with_backoff(&url)?.into_json()?;
        let value = if is_truncated(&value) {
            debug!("job {} result truncated, fetching full payload", id);
            let full_url = format!("{}/reports/{}/data.full.json", self.base_url, id);
            self.get_with_backoff(&full_url)?.into_json()?
        } else {
            value
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Best-effort fetch of a raw transcript artifact.
    fn fetch_text(&self, id: &str, artifact: &str) -> String {
        let url = format!("{}/reports/{}/{}", self.base_url, id, artifact);
        match self
            .get_with_backoff(&url)
            .and_then(|r| r.into_string().map_err(SimError::from))
        {
            Ok(text) => text,
            Err(err) => format!("<could not fetch {}: {}>", artifact, err),
        }
    }

    /// Persist the remote input/output transcripts next to our other
    /// artifacts and return the path.
    fn persist_diagnostics(&self, id: &str, stem: &str) -> Result<PathBuf, SimError> {
        let input = self.fetch_text(id, "input.txt");
        let output = self.fetch_text(id, "output.txt");
        fs::create_dir_all(&self.work_dir)?;
        let path = self.work_dir.join(format!("{}.error.txt", stem));
        fs::write(
            &path,
            format!(
                "# job {}\n# --- input ---\n{}\n# --- output ---\n{}\n",
                id, input, output
            ),
        )?;
        Ok(path)
    }

    fn run_input(
        &self,
        input: &str,
        name: &str,
        iterations: &str,
        stem: &str,
    ) -> Result<SimcResult, SimError> {
        if self.keep_files {
            fs::create_dir_all(&self.work_dir)?;
            fs::write(self.work_dir.join(format!("{}.simc", stem)), input)?;
        }
        let id = self.submit(input, name, iterations)?;
        match self.await_job(&id) {
            Ok(()) => {}
            Err(PollFailure::JobFailed) => {
                let transcript = self.persist_diagnostics(&id, stem)?;
                return Err(SimError::RemoteJobFailed { id, transcript });
            }
            Err(PollFailure::TimedOut) => {
                return Err(SimError::PollTimeout {
                    id,
                    waited_secs: POLL_CEILING.as_secs(),
                });
            }
        }
        match self.fetch_result(&id) {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!("job {} completed but result fetch failed: {}", id, err);
                let transcript = self.persist_diagnostics(&id, stem)?;
                Err(SimError::RemoteJobFailed { id, transcript })
            }
        }
    }
}

impl Executor for RemoteExecutor {
    fn run_batch(&self, batch: &mut SimBatch) -> Result<Option<String>, SimError> {
        let stem = batch.file_stem();
        let mut input = batch.request_text()?;
        // Remote workers get their own thread hint.
        if let Some(hint) = &batch.remote_threads {
            input = input.replacen(
                &format!("threads={}", batch.threads),
                &format!("threads={}", hint),
                1,
            );
        }
        let iterations = batch
            .baseline()
            .map(|p| p.iterations.clone())
            .unwrap_or_default();

        batch.mark_all_started();
        let result = self.run_input(&input, &batch.name, &iterations, &stem)?;
        batch.apply_result(&result)?;
        info!(
            "remote batch '{}' finished ({} profiles)",
            batch.name,
            batch.profiles.len()
        );
        Ok(result.git_revision)
    }

    fn run_single(&self, profile: &mut SimProfile) -> Result<Option<String>, SimError> {
        let stem = format!(
            "{}_{}",
            profile
                .name
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect::<String>(),
            uuid::Uuid::new_v4().simple()
        );
        let input = profile.command_arguments().join("\n");
        profile.mark_started();
        let result = self.run_input(&input, &profile.name, &profile.iterations, &stem)?;
        let player = result
            .sim
            .players
            .first()
            .ok_or_else(|| SimError::MalformedResult("result carries no players".to_string()))?;
        profile.set_dps(player.collected_data.dps.mean, true)?;
        profile.mark_finished();
        Ok(result.git_revision)
    }
}
