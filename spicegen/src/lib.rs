//! SpiceGen - natural-language to LTspice netlist generation
//!
//! This library turns a plain-English circuit description into an LTspice
//! netlist using a text-generation backend, checks the generated text
//! before it ever reaches the simulator, retries a bounded number of times
//! when the backend does not follow instructions, and then runs LTspice and
//! reads back the waveforms.
//!
//! # Quick Start
//!
//! ```no_run
//! use spicegen::prelude::*;
//!
//! # async fn demo() -> Result<(), SpiceGenError> {
//! let config = BackendConfig::from_env(None)?;
//! let generator = NetlistGenerator::new(build_backend(&config));
//!
//! let spec = "A 1k resistor R1 from node in to out. Run transient analysis for 5 ms.";
//! let tran_stop = extract_duration(spec);
//! let netlist = generator
//!     .generate(spec, tran_stop.as_ref(), DEFAULT_MAX_ATTEMPTS)
//!     .await?;
//! println!("{}", netlist);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Duration extraction**: finds "run for 6 ms" style phrases
//! - **Netlist validation**: ordered textual rules with a human-readable verdict
//! - **Bounded retry**: identical prompt re-sent until a candidate validates
//! - **Backends**: OpenAI-compatible chat completions and Claude
//! - **Simulation**: LTspice batch runs and raw waveform reading

pub mod ai;
pub mod config;
pub mod core;
pub mod doctor;
pub mod generate;
pub mod netlist;
pub mod raw;
pub mod session;
pub mod simulator;

// Re-export main types
pub use ai::{build_backend, BackendError, TextBackend};
pub use config::{BackendConfig, ConfigError, Provider, RuntimeConfig, SimulatorLocator};
pub use core::{PipelineReport, PipelineRequest, SpiceGenCore, SpiceGenError, WaveformReport};
pub use doctor::{DoctorError, DoctorReport};
pub use generate::{GeneratedNetlist, GenerationError, NetlistGenerator, DEFAULT_MAX_ATTEMPTS};
pub use netlist::{build_system_prompt, extract_duration, validate, DurationToken, NetlistValidator, Verdict};
pub use raw::{RawError, RawFile, WaveformSource};
pub use session::Session;
pub use simulator::{SimulationArtifacts, SimulatorError, SimulatorRunner};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        build_backend, extract_duration, validate, BackendConfig, DurationToken, NetlistGenerator,
        NetlistValidator, SpiceGenError, TextBackend, Verdict, DEFAULT_MAX_ATTEMPTS,
    };
}
