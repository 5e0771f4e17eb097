//! Prerequisite diagnostics.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::{Provider, SimulatorLocator, LTSPICE_PATH_VAR};

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Prerequisite check failed:\n- {}", .problems.join("\n- "))]
    PrerequisitesFailed { problems: Vec<String> },
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub provider: Provider,
    pub api_key_var: &'static str,
    pub api_key_present: bool,
    pub ltspice_path_set: bool,
    pub resolved_ltspice_path: Option<PathBuf>,
    pub errors: Vec<String>,
}

impl DoctorReport {
    /// Inspect the process environment. Loads `.env` first.
    pub fn from_env(provider: Provider) -> Self {
        crate::config::load_environment();
        Self::collect(provider, |key| std::env::var(key).ok())
    }

    /// Collect the report through `lookup`. `PATH` is read through the same
    /// lookup so tests stay hermetic.
    pub fn collect<F>(provider: Provider, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key_var = provider.key_var();
        let api_key_present = lookup(api_key_var).is_some_and(|k| !k.trim().is_empty());
        let ltspice_path_set = lookup(LTSPICE_PATH_VAR).is_some_and(|p| !p.trim().is_empty());

        let mut errors = Vec::new();
        if !api_key_present {
            errors.push(format!(
                "Missing {}. Add it to your shell or .env file.",
                api_key_var
            ));
        }

        let resolved_ltspice_path = match SimulatorLocator::from_lookup(&lookup).resolve() {
            Ok(path) => Some(path),
            Err(e) => {
                errors.push(e.to_string());
                None
            }
        };

        Self {
            provider,
            api_key_var,
            api_key_present,
            ltspice_path_set,
            resolved_ltspice_path,
            errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn a failing report into an error listing every problem.
    pub fn into_result(self) -> Result<Self, DoctorError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(DoctorError::PrerequisitesFailed {
                problems: self.errors,
            })
        }
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        writeln!(f, "spicegen doctor")?;
        writeln!(f, "Provider: {}", self.provider)?;
        writeln!(f, "{} present: {}", self.api_key_var, yes_no(self.api_key_present))?;
        writeln!(f, "{} set: {}", LTSPICE_PATH_VAR, yes_no(self.ltspice_path_set))?;
        match self.resolved_ltspice_path {
            Some(ref p) => write!(f, "Resolved LTspice path: {}", p.display()),
            None => write!(f, "Resolved LTspice path: (not found)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_report_lists_every_problem() {
        let report = DoctorReport::collect(
            Provider::OpenAI,
            lookup(&[("LTSPICE_PATH", "/no/such/LTspice")]),
        );
        assert!(!report.api_key_present);
        assert!(report.ltspice_path_set);
        assert!(report.resolved_ltspice_path.is_none());
        assert_eq!(report.errors.len(), 2);

        let err = report.into_result().unwrap_err();
        let DoctorError::PrerequisitesFailed { ref problems } = err;
        assert_eq!(problems.len(), 2);
        let err = err.to_string();
        assert!(err.starts_with("Prerequisite check failed:\n- Missing OPENAI_API_KEY"));
        assert!(err.contains("Missing OPENAI_API_KEY"));
        assert!(err.contains("LTSPICE_PATH is set but does not exist"));
    }

    #[test]
    fn test_display() {
        let report = DoctorReport::collect(
            Provider::Claude,
            lookup(&[("ANTHROPIC_API_KEY", "k"), ("LTSPICE_PATH", "/no/such/LTspice")]),
        );
        let text = report.to_string();
        assert!(text.contains("ANTHROPIC_API_KEY present: yes"));
        assert!(text.contains("LTSPICE_PATH set: yes"));
        assert!(text.contains("Resolved LTspice path: (not found)"));
    }

    #[cfg(unix)]
    #[test]
    fn test_healthy_report() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("LTspice");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path = dir.path().to_str().unwrap().to_string();
        let report = DoctorReport::collect(
            Provider::OpenAI,
            lookup(&[("OPENAI_API_KEY", "k"), ("PATH", path.as_str())]),
        );
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.resolved_ltspice_path, Some(exe));
    }
}
