//! Per-channel run lock
//!
//! Two runs on the same channel must never compute versions from the same
//! tag history. The lock is a file in the git directory created atomically;
//! it is removed when the guard is dropped. A lock whose recorded process no
//! longer exists is taken over.

use crate::domain::Channel;
use crate::error::{ReleaseError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Holds the lock for one channel until dropped
#[derive(Debug)]
pub struct ChannelLock {
    path: PathBuf,
}

impl ChannelLock {
    /// Lock file for a channel inside `git_dir`
    pub fn path_for(git_dir: &Path, channel: &Channel) -> PathBuf {
        git_dir.join(format!("release-{}.lock", channel.key()))
    }

    /// Take the lock, failing immediately if another run holds it
    pub fn acquire(git_dir: &Path, channel: &Channel) -> Result<Self> {
        let path = Self::path_for(git_dir, channel);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                if holder_exited(&holder) {
                    log::warn!("Removing stale lock {} ({})", path.display(), holder.trim());
                    fs::remove_file(&path)?;
                    return Self::acquire(git_dir, channel);
                }
                return Err(ReleaseError::Locked(format!(
                    "another release run holds {} ({}); remove the file if no run is active",
                    path.display(),
                    holder.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let acquired_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let lock_data = serde_json::json!({
            "pid": std::process::id(),
            "acquired_at": acquired_at,
            "channel": channel.key(),
        });
        if let Err(e) = file.write_all(lock_data.to_string().as_bytes()) {
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        log::debug!("Acquired {}", path.display());
        Ok(ChannelLock { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether the lock body names a process that no longer exists
#[cfg(unix)]
fn holder_exited(holder: &str) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let pid = serde_json::from_str::<serde_json::Value>(holder)
        .ok()
        .and_then(|v| v.get("pid").and_then(|p| p.as_u64()))
        .and_then(|p| i32::try_from(p).ok());
    match pid {
        Some(pid) if pid > 0 => kill(Pid::from_raw(pid), None) == Err(Errno::ESRCH),
        _ => false,
    }
}

#[cfg(not(unix))]
fn holder_exited(_holder: &str) -> bool {
    false
}

impl Drop for ChannelLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}
