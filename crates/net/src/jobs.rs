//! Background downloads. A download moved to the background is handed to
//! an independent worker process that owns the rest of the transfer and
//! the destination file; we only keep its pid and reap it, non blocking,
//! when the user asks for a status report.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

pub use core_types::JobId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    InProgress,
    Complete,
    Failed,
}

struct ActiveJob {
    id: JobId,
    child: Child,
    url: String,
    dest: PathBuf,
    expected_chunks: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct JobReport {
    pub id: JobId,
    pub url: String,
    pub dest: PathBuf,
    pub expected_chunks: Option<u64>,
    pub state: JobState,
}

#[derive(Default)]
pub struct BackgroundJobs {
    next_id: JobId,
    active: Vec<ActiveJob>,
    finished: Vec<JobReport>,
}

impl BackgroundJobs {
    /// Start a worker that downloads `url` to `dest` with the system
    /// curl. The worker resumes whatever was already written.
    pub fn download(
        &mut self,
        url: &str,
        dest: &Path,
        expected_chunks: Option<u64>,
    ) -> io::Result<JobId> {
        let mut cmd = Command::new("curl");
        cmd.arg("-q")
            .arg("--globoff")
            .arg("--silent")
            .arg("--fail")
            .arg("--continue-at")
            .arg("-")
            .arg("--output")
            .arg(dest)
            .arg("--")
            .arg(url);
        self.spawn(cmd, url, dest, expected_chunks)
    }

    /// Track an arbitrary worker command. The download path goes through
    /// [`BackgroundJobs::download`]; this is the seam tests use.
    pub fn spawn(
        &mut self,
        mut cmd: Command,
        url: &str,
        dest: &Path,
        expected_chunks: Option<u64>,
    ) -> io::Result<JobId> {
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        let child = cmd.spawn()?;
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("background job {id} pid {} for {url}", child.id());
        self.active.push(ActiveJob {
            id,
            child,
            url: url.to_string(),
            dest: dest.to_path_buf(),
            expected_chunks,
        });
        Ok(id)
    }

    /// Reap any workers that have exited, without blocking on the rest.
    pub fn poll(&mut self) {
        let mut still_running = Vec::with_capacity(self.active.len());
        for mut job in self.active.drain(..) {
            match job.child.try_wait() {
                Ok(Some(status)) => {
                    let state = if status.success() {
                        JobState::Complete
                    } else {
                        JobState::Failed
                    };
                    log::debug!("background job {} done, {state:?}", job.id);
                    self.finished.push(JobReport {
                        id: job.id,
                        url: job.url,
                        dest: job.dest,
                        expected_chunks: job.expected_chunks,
                        state,
                    });
                }
                Ok(None) => still_running.push(job),
                Err(e) => {
                    log::warn!("cannot poll background job {}: {e}", job.id);
                    self.finished.push(JobReport {
                        id: job.id,
                        url: job.url,
                        dest: job.dest,
                        expected_chunks: job.expected_chunks,
                        state: JobState::Failed,
                    });
                }
            }
        }
        self.active = still_running;
    }

    /// Current status of every job, in-progress first, after a reap.
    pub fn summarize(&mut self) -> Vec<JobReport> {
        self.poll();
        let mut out: Vec<JobReport> = self
            .active
            .iter()
            .map(|job| JobReport {
                id: job.id,
                url: job.url.clone(),
                dest: job.dest.clone(),
                expected_chunks: job.expected_chunks,
                state: JobState::InProgress,
            })
            .collect();
        out.extend(self.finished.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for_exit(jobs: &mut BackgroundJobs, id: JobId) -> JobState {
        for _ in 0..100 {
            jobs.poll();
            if let Some(r) = jobs.finished.iter().find(|r| r.id == id) {
                return r.state;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("job never finished");
    }

    #[test]
    fn successful_workers_are_reaped_as_complete() {
        let mut jobs = BackgroundJobs::default();
        let id = jobs
            .spawn(Command::new("true"), "http://x/f", Path::new("/tmp/f"), Some(3))
            .unwrap();
        assert_eq!(wait_for_exit(&mut jobs, id), JobState::Complete);
        let reports = jobs.summarize();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].expected_chunks, Some(3));
    }

    #[test]
    fn failing_workers_are_reaped_as_failed() {
        let mut jobs = BackgroundJobs::default();
        let id = jobs
            .spawn(Command::new("false"), "http://x/f", Path::new("/tmp/f"), None)
            .unwrap();
        assert_eq!(wait_for_exit(&mut jobs, id), JobState::Failed);
    }

    #[test]
    fn polling_does_not_block_on_running_jobs() {
        let mut jobs = BackgroundJobs::default();
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let id = jobs.spawn(cmd, "http://x/slow", Path::new("/tmp/slow"), None).unwrap();
        let reports = jobs.summarize();
        assert_eq!(reports[0].state, JobState::InProgress);
        // clean up
        if let Some(job) = jobs.active.iter_mut().find(|j| j.id == id) {
            let _ = job.child.kill();
        }
        jobs.poll();
    }
}
