//! Single instance lock per MQTT client id, using a Unix socket.
//!
//! Two processes connecting with the same client id make the broker drop
//! each session in turn. The socket is cleaned up by the OS when the process
//! dies, avoiding stale lock files.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for instance lock operations.
#[derive(Debug, Error)]
pub enum InstanceLockError {
    /// Another process already uses this client id.
    #[error("another endpoint is already running as client id '{0}'")]
    AlreadyRunning(String),

    /// I/O error during lock acquisition.
    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Lock held for as long as this value lives.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Acquire the lock for `client_id` in the runtime directory.
    pub fn acquire(client_id: &str) -> Result<Self, InstanceLockError> {
        Self::acquire_at(Self::socket_path(client_id), client_id)
    }

    fn acquire_at(path: PathBuf, client_id: &str) -> Result<Self, InstanceLockError> {
        // A socket nobody listens on was left by a killed process
        if path.exists() {
            match UnixStream::connect(&path) {
                Ok(_) => return Err(InstanceLockError::AlreadyRunning(client_id.to_string())),
                Err(_) => {
                    let _ = std::fs::remove_file(&path);
                }
            }
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(client_id.to_string()))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    /// Socket path for `client_id` (XDG runtime dir, falling back to /tmp).
    pub fn socket_path(client_id: &str) -> PathBuf {
        let dir = dirs::runtime_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        socket_path_in(&dir, client_id)
    }
}

fn socket_path_in(dir: &Path, client_id: &str) -> PathBuf {
    let safe: String = client_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("door-shadow-sync-{}.sock", safe))
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
