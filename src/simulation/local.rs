//! Local subprocess execution backend.
//!
//! Writes the profileset request to a uniquely-named temp file, invokes the
//! simulator binary, drains its output on a background thread and retries
//! transient failures. On terminal failure the request artifact is preserved
//! with the failure transcript appended for post-mortem.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use log::{debug, info};

use crate::config::Settings;
use crate::error::SimError;
use crate::simulation::batch::SimBatch;
use crate::simulation::executor::Executor;
use crate::simulation::profile::SimProfile;
use crate::simulation::result::SimcResult;
use crate::simulation::retry::{Attempt, RetryPolicy};

/// Non-zero exits are retried this many times in total before giving up.
const MAX_PROCESS_ATTEMPTS: u32 = 5;

/// Runs the simulator binary on this machine.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    /// Where request/result artifacts live during a run.
    pub work_dir: PathBuf,
    /// Keep artifacts after success instead of deleting them.
    pub keep_files: bool,
}

impl LocalExecutor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            work_dir: settings.temp_dir.clone(),
            keep_files: settings.keep_files,
        }
    }

    /// Spawn the binary and capture its combined output. stdout is drained
    /// line-by-line on a background thread so the wait call never blocks on a
    /// full pipe.
    fn invoke(
        &self,
        executable: &Path,
        arguments: &[String],
    ) -> Result<(ExitStatus, String), SimError> {
        let mut child = Command::new(executable)
            .args(arguments)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    SimError::ExecutableNotFound(executable.to_path_buf())
                } else {
                    SimError::Io(err)
                }
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_handle = thread::spawn(move || {
            let mut transcript = String::new();
            if let Some(stdout) = stdout {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    debug!("simc: {}", line);
                    transcript.push_str(&line);
                    transcript.push('\n');
                }
            }
            transcript
        });
        let stderr_handle = thread::spawn(move || {
            let mut buffer = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buffer);
            }
            buffer
        });

        let status = child.wait()?;
        let mut transcript = stdout_handle.join().unwrap_or_default();
        transcript.push_str(&stderr_handle.join().unwrap_or_default());
        Ok((status, transcript))
    }

    /// Invoke with bounded retries on non-zero exit. A missing executable
    /// aborts immediately. Returns the final transcript on success, the last
    /// transcript alongside the error on exhaustion.
    fn invoke_with_retries(
        &self,
        name: &str,
        executable: &Path,
        arguments: &[String],
    ) -> Result<String, (SimError, String)> {
        let mut transcript = String::new();
        let policy = RetryPolicy::attempts(MAX_PROCESS_ATTEMPTS);
        let outcome = policy.run(|attempt| {
            debug!(
                "running '{}', attempt {}/{}",
                name, attempt, MAX_PROCESS_ATTEMPTS
            );
            match self.invoke(executable, arguments) {
                Err(err) => Attempt::Abort(err),
                Ok((status, output)) => {
                    transcript = output;
                    if status.success() {
                        Attempt::Done(())
                    } else {
                        Attempt::Retry(SimError::SimulationFailed {
                            name: name.to_string(),
                            attempts: attempt,
                            transcript: PathBuf::new(),
                        })
                    }
                }
            }
        });
        match outcome {
            Ok(()) => Ok(transcript),
            Err(err) => Err((err, transcript)),
        }
    }

    fn read_result(&self, path: &Path) -> Result<SimcResult, SimError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn cleanup(&self, paths: &[&Path]) {
        if self.keep_files {
            return;
        }
        for path in paths {
            if let Err(err) = fs::remove_file(path) {
                debug!("could not remove artifact {}: {}", path.display(), err);
            }
        }
    }

    fn slug(name: &str) -> String {
        name.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl Executor for LocalExecutor {
    fn run_batch(&self, batch: &mut SimBatch) -> Result<Option<String>, SimError> {
        let stem = batch.file_stem();
        let input_path = self.work_dir.join(format!("{}.simc", stem));
        let output_path = self.work_dir.join(format!("{}.json", stem));

        fs::create_dir_all(&self.work_dir)?;
        fs::write(&input_path, batch.request_text()?)?;
        batch.mark_all_started();

        let arguments = vec![
            format!("json={}", output_path.display()),
            input_path.display().to_string(),
        ];

        let executable = batch.executable.clone();
        match self.invoke_with_retries(&batch.name, &executable, &arguments) {
            Ok(_) => {
                let result = self.read_result(&output_path)?;
                batch.apply_result(&result)?;
                info!(
                    "batch '{}' finished ({} profiles)",
                    batch.name,
                    batch.profiles.len()
                );
                self.cleanup(&[&input_path, &output_path]);
                Ok(result.git_revision)
            }
            Err((SimError::ExecutableNotFound(path), _)) => {
                self.cleanup(&[&input_path]);
                Err(SimError::ExecutableNotFound(path))
            }
            Err((_, transcript)) => {
                // Preserve the request with the failure transcript appended.
                let mut file = fs::OpenOptions::new().append(true).open(&input_path)?;
                writeln!(file, "\n# simulation failed, last transcript:")?;
                for line in transcript.lines() {
                    writeln!(file, "# {}", line)?;
                }
                Err(SimError::SimulationFailed {
                    name: batch.name.clone(),
                    attempts: MAX_PROCESS_ATTEMPTS,
                    transcript: input_path,
                })
            }
        }
    }

    fn run_single(&self, profile: &mut SimProfile) -> Result<Option<String>, SimError> {
        let stem = format!(
            "{}_{}",
            Self::slug(&profile.name),
            uuid::Uuid::new_v4().simple()
        );
        let output_path = self.work_dir.join(format!("{}.json", stem));
        fs::create_dir_all(&self.work_dir)?;

        let mut arguments = profile.command_arguments();
        arguments.push(format!("json={}", output_path.display()));

        profile.mark_started();
        let executable = profile.executable.clone();
        match self.invoke_with_retries(&profile.name, &executable, &arguments) {
            Ok(transcript) => {
                let result = self.read_result(&output_path)?;
                let player = result.sim.players.first().ok_or_else(|| {
                    SimError::MalformedResult("result carries no players".to_string())
                })?;
                profile.set_dps(player.collected_data.dps.mean, false)?;
                profile.set_raw_output(transcript);
                profile.mark_finished();
                self.cleanup(&[&output_path]);
                Ok(result.git_revision)
            }
            Err((err @ SimError::ExecutableNotFound(_), _)) => Err(err),
            Err((_, transcript)) => {
                let error_path = self.work_dir.join(format!("{}.error.txt", stem));
                fs::write(&error_path, transcript)?;
                Err(SimError::SimulationFailed {
                    name: profile.name.clone(),
                    attempts: MAX_PROCESS_ATTEMPTS,
                    transcript: error_path,
                })
            }
        }
    }
}
