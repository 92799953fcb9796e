use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    process,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::Serialize;

const LOCK_FILENAME: &str = ".calm-mail.lock";

/// Exclusive lock keeping a single triage worker per data directory.
#[derive(Debug)]
pub struct InstanceGuard {
    file: File,
    path: PathBuf,
}

#[derive(Debug, Serialize)]
struct LockInfo {
    pid: u32,
    started_at: i64,
}

impl InstanceGuard {
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(LOCK_FILENAME);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open lock file {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(anyhow!(
                    "another calm-mail worker holds {} ({})",
                    path.display(),
                    holder.trim()
                ));
            }
            Err(err) => return Err(err.into()),
        }

        let info = LockInfo {
            pid: process::id(),
            started_at: Utc::now().timestamp_millis(),
        };
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&serde_json::to_vec(&info)?)?;
        file.sync_all()?;

        tracing::info!(
            target: "lifecycle",
            pid = info.pid,
            path = %path.display(),
            "acquired instance lock"
        );
        Ok(Self { file, path })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    target: "lifecycle",
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove lock file"
                );
            }
        }
    }
}
