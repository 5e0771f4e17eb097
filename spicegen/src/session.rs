use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub const CIRCUIT_FILE: &str = "circuit.cir";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session directory already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {}: file missing after write", .0.display())]
    WriteVerificationFailed(PathBuf),
    #[error("Failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SessionError + '_ {
    move |source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A per-run artifact directory: `<root>/sessions/<YYYYmmdd_HHMMSS>`.
#[derive(Debug, Clone)]
pub struct Session {
    dir: PathBuf,
}

impl Session {
    /// Create a new session directory named after the current local time.
    pub fn create(root: &Path) -> Result<Self, SessionError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::create_named(root, &timestamp)
    }

    pub fn create_named(root: &Path, name: &str) -> Result<Self, SessionError> {
        let sessions = root.join("sessions");
        std::fs::create_dir_all(&sessions).map_err(io_error(&sessions))?;

        let dir = sessions.join(name);
        match std::fs::create_dir(&dir) {
            Ok(()) => Ok(Self { dir }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(SessionError::AlreadyExists(dir))
            }
            Err(e) => Err(io_error(&dir)(e)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn circuit_path(&self) -> PathBuf {
        self.dir.join(CIRCUIT_FILE)
    }

    /// Write the netlist with a trailing newline and confirm it landed.
    pub fn write_netlist(&self, netlist: &str) -> Result<PathBuf, SessionError> {
        let path = self.circuit_path();
        std::fs::write(&path, format!("{}\n", netlist)).map_err(io_error(&path))?;
        if !path.exists() {
            return Err(SessionError::WriteVerificationFailed(path));
        }
        Ok(path)
    }

    pub fn write_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf, SessionError> {
        let path = self.dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json).map_err(io_error(&path))?;
        Ok(path)
    }
}
