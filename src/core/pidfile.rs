//! # Pid file and the external stop command.
//!
//! The running supervisor writes its process id (decimal, no newline) to the
//! configured pid file at STARTING and removes it at STOPPED. `-stop` reads the
//! file and sends `SIGINT` to that pid; it does not wait for the target to exit.

use std::fs;
use std::path::Path;

use crate::error::RuntimeError;

/// Writes the current process id to `path`, replacing any previous content.
pub fn write(path: &Path) -> Result<(), RuntimeError> {
    fs::write(path, std::process::id().to_string()).map_err(|source| RuntimeError::PidFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Removes the pid file; a missing file is not an error.
pub fn remove(path: &Path) -> Result<(), RuntimeError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RuntimeError::PidFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads the pid recorded in `path`.
pub fn read(path: &Path) -> Result<u32, RuntimeError> {
    let raw = fs::read_to_string(path).map_err(|source| RuntimeError::PidFile {
        path: path.to_path_buf(),
        source,
    })?;
    raw.trim().parse().map_err(|_| RuntimeError::Stop {
        reason: format!("{} does not contain a pid: {:?}", path.display(), raw.trim()),
    })
}

/// Asks the process recorded in `path` to shut down (`SIGINT`).
#[cfg(unix)]
pub fn send_stop(path: &Path) -> Result<u32, RuntimeError> {
    let pid = read(path)?;
    let target = libc::pid_t::try_from(pid).map_err(|_| RuntimeError::Stop {
        reason: format!("pid {pid} out of range"),
    })?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(target, libc::SIGINT) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        return Err(RuntimeError::Stop {
            reason: format!("signal pid {pid}: {err}"),
        });
    }
    tracing::info!(pid, "stop signal sent");
    Ok(pid)
}

/// Asks the process recorded in `path` to shut down.
#[cfg(not(unix))]
pub fn send_stop(path: &Path) -> Result<u32, RuntimeError> {
    let pid = read(path)?;
    Err(RuntimeError::Stop {
        reason: format!("cannot signal pid {pid}: unsupported platform"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pid");

        write(&path).unwrap();
        assert_eq!(read(&path).unwrap(), std::process::id());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            std::process::id().to_string()
        );

        remove(&path).unwrap();
        assert!(!path.exists());
        remove(&path).unwrap();
    }

    #[test]
    fn test_stop_without_pid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = send_stop(&dir.path().join("pid")).unwrap_err();
        assert_eq!(err.as_label(), "runtime_pid_file");
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_garbage_pid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pid");
        fs::write(&path, "not-a-pid").unwrap();
        assert_eq!(read(&path).unwrap_err().as_label(), "runtime_stop");
    }
}
