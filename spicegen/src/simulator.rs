//! LTspice batch-mode integration.
//!
//! LTspice is run headless (`-b`) from the directory holding the netlist and
//! writes `<stem>.raw` and `<stem>.log` next to it.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Circuit file does not exist: {}", .0.display())]
    CircuitNotFound(PathBuf),
    #[error("Failed to launch LTspice at {}: {source}", .executable.display())]
    Launch {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("LTspice command failed.\nReturn code: {code}\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    ExecutionFailed {
        code: String,
        stdout: String,
        stderr: String,
    },
    #[error(
        "LTspice completed but expected outputs were missing.\nExpected raw: {} (exists={raw_exists})\nExpected log: {} (exists={log_exists})",
        .raw.display(),
        .log.display()
    )]
    MissingOutputs {
        raw: PathBuf,
        raw_exists: bool,
        log: PathBuf,
        log_exists: bool,
    },
}

/// Files produced by one simulator run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SimulationArtifacts {
    pub raw_path: PathBuf,
    pub log_path: PathBuf,
}

impl SimulationArtifacts {
    /// The deterministic sibling paths for a circuit file.
    pub fn expected_for(circuit_file: &Path) -> Self {
        Self {
            raw_path: circuit_file.with_extension("raw"),
            log_path: circuit_file.with_extension("log"),
        }
    }
}

/// Runner for headless LTspice simulations.
#[derive(Debug, Clone)]
pub struct SimulatorRunner {
    executable: PathBuf,
}

impl SimulatorRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run a simulation of `circuit_file` and return the produced artifacts.
    pub fn run(&self, circuit_file: &Path) -> Result<SimulationArtifacts, SimulatorError> {
        if !circuit_file.exists() {
            return Err(SimulatorError::CircuitNotFound(circuit_file.to_path_buf()));
        }

        let file_name = circuit_file
            .file_name()
            .ok_or_else(|| SimulatorError::CircuitNotFound(circuit_file.to_path_buf()))?;
        let work_dir = circuit_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        tracing::info!("Running LTspice headless on {}", circuit_file.display());
        let output = Command::new(&self.executable)
            .arg("-b")
            .arg(file_name)
            .current_dir(work_dir)
            .output()
            .map_err(|source| SimulatorError::Launch {
                executable: self.executable.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SimulatorError::ExecutionFailed {
                code: output
                    .status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "terminated by signal".to_string()),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let artifacts = SimulationArtifacts::expected_for(circuit_file);
        let raw_exists = artifacts.raw_path.exists();
        let log_exists = artifacts.log_path.exists();
        if !raw_exists || !log_exists {
            return Err(SimulatorError::MissingOutputs {
                raw: artifacts.raw_path,
                raw_exists,
                log: artifacts.log_path,
                log_exists,
            });
        }

        tracing::info!(
            "LTspice run completed: raw={} log={}",
            artifacts.raw_path.display(),
            artifacts.log_path.display()
        );
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_artifacts() {
        let artifacts = SimulationArtifacts::expected_for(Path::new("/tmp/s/circuit.cir"));
        assert_eq!(artifacts.raw_path, PathBuf::from("/tmp/s/circuit.raw"));
        assert_eq!(artifacts.log_path, PathBuf::from("/tmp/s/circuit.log"));
    }

    #[test]
    fn test_missing_circuit() {
        let runner = SimulatorRunner::new("/bin/true");
        let err = runner.run(Path::new("/no/such/circuit.cir")).unwrap_err();
        assert!(matches!(err, SimulatorError::CircuitNotFound(_)));
        assert!(err.to_string().contains("Circuit file does not exist"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_ltspice(dir: &Path, script: &str) -> PathBuf {
            let exe = dir.join("fake-ltspice");
            std::fs::write(&exe, format!("#!/bin/sh\n{}\n", script)).unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
            exe
        }

        #[test]
        fn test_successful_run() {
            let dir = tempfile::tempdir().unwrap();
            let exe = fake_ltspice(
                dir.path(),
                r#"base="${2%.*}"; echo raw > "$base.raw"; echo log > "$base.log""#,
            );
            let circuit = dir.path().join("circuit.cir");
            std::fs::write(&circuit, "* t\n.end\n").unwrap();

            let artifacts = SimulatorRunner::new(exe).run(&circuit).unwrap();
            assert_eq!(artifacts, SimulationArtifacts::expected_for(&circuit));
            assert!(artifacts.raw_path.exists());
        }

        #[test]
        fn test_failed_run_reports_output() {
            let dir = tempfile::tempdir().unwrap();
            let exe = fake_ltspice(dir.path(), "echo boom >&2; exit 3");
            let circuit = dir.path().join("circuit.cir");
            std::fs::write(&circuit, "* t\n.end\n").unwrap();

            let err = SimulatorRunner::new(exe).run(&circuit).unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("Return code: 3"), "{msg}");
            assert!(msg.contains("boom"), "{msg}");
        }

        #[test]
        fn test_missing_outputs() {
            let dir = tempfile::tempdir().unwrap();
            let exe = fake_ltspice(dir.path(), r#"base="${2%.*}"; echo log > "$base.log""#);
            let circuit = dir.path().join("circuit.cir");
            std::fs::write(&circuit, "* t\n.end\n").unwrap();

            let err = SimulatorRunner::new(exe).run(&circuit).unwrap_err();
            match err {
                SimulatorError::MissingOutputs {
                    raw_exists,
                    log_exists,
                    ..
                } => {
                    assert!(!raw_exists);
                    assert!(log_exists);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
