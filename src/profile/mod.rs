//! CPU and memory profiling.
//!
//! # Data Flow
//! ```text
//! Profiler::start
//!     → cpu path set: create file, spawn sampling task
//!         → one JSON line per sample (cpu %, rss) at the configured cadence
//!     → mem path set: create file, session recorded
//!
//! Profiler::stop
//!     → cpu: signal task, await it, file flushed and closed
//!     → mem: one memory snapshot written, file closed
//! ```
//!
//! # Design Decisions
//! - Owned by the Server instance, never process-global, so multiple
//!   servers in one process profile independently
//! - File-creation failure is a returned error; the embedder decides
//!   whether it is fatal
//! - At most one active session of each kind
//! - Memory content is captured lazily at stop time, not streamed

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sysinfo::System;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ProfileConfig;

/// Error type for profiler operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("creating {kind} profile {path:?}: {source}")]
    Create {
        kind: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{kind} profile already active")]
    AlreadyActive { kind: &'static str },

    #[error("writing memory snapshot: {0}")]
    Snapshot(#[source] std::io::Error),
}

/// One CPU sample, serialized as a JSON line.
#[derive(Debug, Serialize)]
struct CpuSample {
    unix_ms: u128,
    cpu_percent: f32,
    rss_bytes: u64,
}

/// Memory snapshot written when a memory session stops.
#[derive(Debug, Serialize)]
struct MemorySnapshot {
    unix_ms: u128,
    total_memory: u64,
    used_memory: u64,
    available_memory: u64,
    process_rss: u64,
    process_virtual: u64,
}

fn unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

struct CpuSession {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct MemSession {
    file: std::fs::File,
}

/// Profiles the current process into configured file sinks.
///
/// Holds at most one CPU session and one memory session. Both halves are
/// independent; stopping with neither active is a no-op.
pub struct Profiler {
    cpu: Option<CpuSession>,
    mem: Option<MemSession>,
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            cpu: None,
            mem: None,
        }
    }

    /// Start the sessions configured in `config`. Unset paths are no-ops.
    pub fn start(&mut self, config: &ProfileConfig) -> Result<(), ProfileError> {
        if let Some(path) = &config.cpu_profile {
            self.start_cpu(path, Duration::from_millis(config.cpu_sample_interval_ms))?;
        }
        if let Some(path) = &config.mem_profile {
            self.start_mem(path)?;
        }
        Ok(())
    }

    fn start_cpu(&mut self, path: &Path, interval: Duration) -> Result<(), ProfileError> {
        if self.cpu.is_some() {
            return Err(ProfileError::AlreadyActive { kind: "cpu" });
        }

        let file = std::fs::File::create(path).map_err(|source| ProfileError::Create {
            kind: "cpu",
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "writing CPU profile");

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(sample_cpu(tokio::fs::File::from_std(file), interval, stop_rx));
        self.cpu = Some(CpuSession { stop, task });
        Ok(())
    }

    fn start_mem(&mut self, path: &Path) -> Result<(), ProfileError> {
        if self.mem.is_some() {
            return Err(ProfileError::AlreadyActive { kind: "mem" });
        }

        let file = std::fs::File::create(path).map_err(|source| ProfileError::Create {
            kind: "mem",
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "writing mem profile");

        self.mem = Some(MemSession { file });
        Ok(())
    }

    /// Stop any active sessions. Both halves are attempted; the first
    /// error is returned.
    pub async fn stop(&mut self) -> Result<(), ProfileError> {
        let mut first_err = None;

        if let Some(session) = self.cpu.take() {
            let _ = session.stop.send(());
            let _ = session.task.await;
            tracing::info!("CPU profile stopped");
        }

        if let Some(mut session) = self.mem.take() {
            if let Err(e) = write_memory_snapshot(&mut session.file) {
                first_err = Some(e);
            }
            tracing::info!("mem profile stopped");
        }

        first_err.map_or(Ok(()), Err)
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampling loop for a CPU session. Runs until the stop signal fires,
/// then flushes and closes the file.
async fn sample_cpu(mut file: tokio::fs::File, interval: Duration, mut stop: oneshot::Receiver<()>) {
    let pid = match sysinfo::get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            tracing::warn!(error = e, "cpu profile disabled: cannot resolve pid");
            return;
        }
    };
    let mut system = System::new();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                system.refresh_process(pid);
                let Some(process) = system.process(pid) else { continue };
                let sample = CpuSample {
                    unix_ms: unix_ms(),
                    cpu_percent: process.cpu_usage(),
                    rss_bytes: process.memory(),
                };
                let mut line = match serde_json::to_vec(&sample) {
                    Ok(line) => line,
                    Err(_) => continue,
                };
                line.push(b'\n');
                if let Err(e) = file.write_all(&line).await {
                    tracing::warn!(error = %e, "cpu profile write failed, sampling stopped");
                    return;
                }
            }
        }
    }

    let _ = file.flush().await;
}

fn write_memory_snapshot(file: &mut std::fs::File) -> Result<(), ProfileError> {
    let mut system = System::new();
    system.refresh_memory();

    let (process_rss, process_virtual) = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| {
            system.refresh_process(pid);
            system
                .process(pid)
                .map(|p| (p.memory(), p.virtual_memory()))
        })
        .unwrap_or((0, 0));

    let snapshot = MemorySnapshot {
        unix_ms: unix_ms(),
        total_memory: system.total_memory(),
        used_memory: system.used_memory(),
        available_memory: system.available_memory(),
        process_rss,
        process_virtual,
    };

    let raw =
        serde_json::to_vec_pretty(&snapshot).map_err(|e| ProfileError::Snapshot(e.into()))?;
    file.write_all(&raw).map_err(ProfileError::Snapshot)?;
    file.flush().map_err(ProfileError::Snapshot)
}
