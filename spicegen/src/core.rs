//! End-to-end pipeline shared by the CLI and library users.
//!
//! description -> duration token -> validated netlist -> session directory ->
//! LTspice batch run -> raw waveforms -> signal summary.

use std::path::PathBuf;

use serde::Serialize;

use crate::ai::TextBackend;
use crate::config::ConfigError;
use crate::doctor::DoctorError;
use crate::generate::{GeneratedNetlist, GenerationError, NetlistGenerator, DEFAULT_MAX_ATTEMPTS};
use crate::netlist::{extract_duration, DurationToken};
use crate::raw::{summarize, RawError, RawFile, SignalSummary, WaveformSource};
use crate::session::{Session, SessionError};
use crate::simulator::{SimulationArtifacts, SimulatorError, SimulatorRunner};

/// Sample description used by `--demo`.
pub const DEMO_SPEC: &str = "A voltage source V1 from node in to 0. Make it a pulse that goes from 0 V to 12 V. \
The pulse should begin at 0.8 ms, use 2 us rise and fall times, stay high for 0.8 ms, and repeat every 4 ms.\n\
A 220 ohm resistor R1 from node in to out.\n\
A 3.3 mH inductor L1 from node out to mid.\n\
A 47 uF capacitor C1 from node mid to 0.\n\
Run transient analysis for 6 ms.";

pub const DEFAULT_SIGNALS: &[&str] = &["V(in)", "V(out)"];
pub const DEFAULT_ARTIFACTS_ROOT: &str = "artifacts";

#[derive(Debug, thiserror::Error)]
pub enum SpiceGenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Simulation error: {0}")]
    Simulator(#[from] SimulatorError),
    #[error("Waveform error: {0}")]
    Raw(#[from] RawError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error(transparent)]
    Doctor(#[from] DoctorError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub spec_text: String,
    pub max_attempts: u32,
    pub signals: Vec<String>,
    pub artifacts_root: PathBuf,
}

impl PipelineRequest {
    pub fn new(spec_text: impl Into<String>) -> Self {
        Self {
            spec_text: spec_text.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            signals: DEFAULT_SIGNALS.iter().map(|s| s.to_string()).collect(),
            artifacts_root: PathBuf::from(DEFAULT_ARTIFACTS_ROOT),
        }
    }
}

/// What the simulator output contained for the requested signals.
#[derive(Debug, Clone, Serialize)]
pub struct WaveformReport {
    pub available_signals: Vec<String>,
    pub time_points: usize,
    pub stop_time: Option<f64>,
    pub summaries: Vec<SignalSummary>,
    pub missing_signals: Vec<String>,
}

impl WaveformReport {
    /// Summarize requested signals. Signals absent from the output are listed
    /// in `missing_signals` instead of failing the run.
    pub fn collect<W: WaveformSource + ?Sized>(source: &W, signals: &[String]) -> Result<Self, RawError> {
        let time = source.time_axis()?;
        let mut summaries = Vec::new();
        let mut missing_signals = Vec::new();
        for name in signals {
            match summarize(source, name) {
                Ok(summary) => summaries.push(summary),
                Err(RawError::UnknownSignal(_)) => {
                    tracing::warn!("Signal {} not present in simulation output", name);
                    missing_signals.push(name.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            available_signals: source.signal_names().into_iter().map(String::from).collect(),
            time_points: time.len(),
            stop_time: time.last().copied(),
            summaries,
            missing_signals,
        })
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub session_dir: PathBuf,
    pub circuit_file: PathBuf,
    pub tran_stop: Option<DurationToken>,
    pub attempts: u32,
    pub artifacts: SimulationArtifacts,
    pub waveforms: WaveformReport,
}

pub struct SpiceGenCore;

impl SpiceGenCore {
    /// Extract the duration once and run the generation loop.
    pub async fn generate<B: TextBackend>(
        generator: &NetlistGenerator<B>,
        spec_text: &str,
        max_attempts: u32,
    ) -> Result<(Option<DurationToken>, GeneratedNetlist), SpiceGenError> {
        let tran_stop = extract_duration(spec_text);
        match tran_stop {
            Some(ref token) => tracing::info!("Required transient stop time: {}", token),
            None => tracing::info!("No transient stop time in description; any .tran is accepted"),
        }
        let generated = generator
            .generate_detailed(spec_text, tran_stop.as_ref(), max_attempts)
            .await?;
        Ok((tran_stop, generated))
    }

    /// Generate, simulate and summarize.
    pub async fn run_pipeline<B: TextBackend>(
        request: &PipelineRequest,
        generator: &NetlistGenerator<B>,
        runner: &SimulatorRunner,
    ) -> Result<PipelineReport, SpiceGenError> {
        let (tran_stop, generated) =
            Self::generate(generator, &request.spec_text, request.max_attempts).await?;

        let session = Session::create(&request.artifacts_root)?;
        let circuit_file = session.write_netlist(&generated.text)?;
        tracing::info!("Netlist written to {}", circuit_file.display());

        let artifacts = runner.run(&circuit_file)?;
        let raw = RawFile::open(&artifacts.raw_path)?;

        let waveforms = WaveformReport::collect(&raw, &request.signals)?;

        let report = PipelineReport {
            session_dir: session.dir().to_path_buf(),
            circuit_file,
            tran_stop,
            attempts: generated.attempts,
            artifacts,
            waveforms,
        };
        let summary_file = session.write_summary(&report)?;
        tracing::info!("Summary written to {}", summary_file.display());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_spec_duration() {
        assert_eq!(extract_duration(DEMO_SPEC).unwrap().as_str(), "6ms");
    }

    #[test]
    fn test_request_defaults() {
        let request = PipelineRequest::new("spec");
        assert_eq!(request.max_attempts, 3);
        assert_eq!(request.signals, vec!["V(in)".to_string(), "V(out)".to_string()]);
        assert_eq!(request.artifacts_root, PathBuf::from("artifacts"));
    }
}
