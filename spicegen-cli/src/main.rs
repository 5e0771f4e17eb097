//! SpiceGen CLI - natural-language LTspice netlist generation from the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use spicegen::config::{self, Provider, RuntimeConfig};
use spicegen::core::{DEMO_SPEC, DEFAULT_ARTIFACTS_ROOT};
use spicegen::raw::summarize;
use spicegen::{
    build_backend, extract_duration, BackendConfig, DoctorReport, DurationToken, GeneratedNetlist,
    NetlistGenerator, NetlistValidator, PipelineReport, PipelineRequest, RawFile, SimulatorRunner,
    SpiceGenCore, SpiceGenError, WaveformSource, DEFAULT_MAX_ATTEMPTS,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spicegen")]
#[command(about = "Generate, validate and simulate LTspice netlists from plain-English descriptions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a validated netlist from a circuit description
    Generate {
        #[command(flatten)]
        source: SpecSource,

        #[command(flatten)]
        backend: BackendArgs,

        /// Write the netlist to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Generate a netlist, simulate it with LTspice and summarize the waveforms
    Run {
        #[command(flatten)]
        source: SpecSource,

        #[command(flatten)]
        backend: BackendArgs,

        /// Signals to summarize (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "V(in),V(out)")]
        signals: Vec<String>,

        /// Root directory for session artifacts
        #[arg(long, value_name = "DIR", default_value = DEFAULT_ARTIFACTS_ROOT)]
        artifacts_dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Validate an existing netlist file
    Validate {
        /// Path to the netlist
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Require a `.tran` directive with this stop time (e.g. 6ms)
        #[arg(short, long)]
        duration: Option<String>,

        /// Replace the default prose keyword set (comma separated)
        #[arg(long, value_delimiter = ',')]
        prose_words: Option<Vec<String>>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Show the transient stop time found in a description
    Duration {
        /// Circuit description text
        #[arg(value_name = "TEXT")]
        text: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List the signals stored in a raw waveform file
    Signals {
        /// Path to the .raw file
        #[arg(value_name = "RAWFILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Check API key and LTspice prerequisites
    Doctor {
        /// Provider whose API key is checked
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SpecSource {
    /// Circuit description text
    #[arg(long, value_name = "TEXT")]
    spec: Option<String>,

    /// Read the circuit description from a file
    #[arg(long, value_name = "FILE")]
    spec_file: Option<PathBuf>,

    /// Use the built-in RLC pulse demo description
    #[arg(long)]
    demo: bool,
}

#[derive(Args)]
struct BackendArgs {
    /// Maximum number of generation attempts
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Text-generation provider (overrides SPICEGEN_PROVIDER)
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Model name (overrides SPICEGEN_MODEL)
    #[arg(long)]
    model: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripting
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openai,
    Claude,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openai => Provider::OpenAI,
            ProviderArg::Claude => Provider::Claude,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let exit_code = match cli.command {
        Commands::Generate {
            source,
            backend,
            output,
            format,
        } => handle_generate(&source, &backend, output.as_deref(), format).await,
        Commands::Run {
            source,
            backend,
            signals,
            artifacts_dir,
            format,
        } => handle_run(&source, &backend, signals, artifacts_dir, format).await,
        Commands::Validate {
            file,
            duration,
            prose_words,
            format,
        } => handle_validate(&file, duration.as_deref(), prose_words, format),
        Commands::Duration { text, format } => handle_duration(&text, format),
        Commands::Signals { file, format } => handle_signals(&file, format),
        Commands::Doctor { provider, format } => handle_doctor(provider, format),
    };

    process::exit(exit_code);
}

fn read_spec(source: &SpecSource) -> Result<String, SpiceGenError> {
    if source.demo {
        return Ok(DEMO_SPEC.to_string());
    }
    if let Some(ref path) = source.spec_file {
        return Ok(std::fs::read_to_string(path)?);
    }
    Ok(source.spec.clone().unwrap_or_default())
}

fn backend_config(args: &BackendArgs) -> Result<BackendConfig, SpiceGenError> {
    config::load_environment();
    let mut config = BackendConfig::from_env(args.provider.map(Provider::from))?;
    if args.model.is_some() {
        config.model = args.model.clone();
    }
    tracing::debug!(
        "Using provider {} (model override: {})",
        config.provider,
        config.model.as_deref().unwrap_or("none")
    );
    Ok(config)
}

async fn generate_netlist(
    source: &SpecSource,
    args: &BackendArgs,
    output: Option<&Path>,
) -> Result<(Option<DurationToken>, GeneratedNetlist), SpiceGenError> {
    let spec = read_spec(source)?;
    let config = backend_config(args)?;
    let generator = NetlistGenerator::new(build_backend(&config));
    let (tran_stop, generated) = SpiceGenCore::generate(&generator, &spec, args.max_attempts).await?;
    if let Some(path) = output {
        std::fs::write(path, format!("{}\n", generated.text))?;
    }
    Ok((tran_stop, generated))
}

async fn simulate(
    source: &SpecSource,
    args: &BackendArgs,
    signals: Vec<String>,
    artifacts_dir: PathBuf,
) -> Result<PipelineReport, SpiceGenError> {
    let spec = read_spec(source)?;
    let mut runtime = RuntimeConfig::load(args.provider.map(Provider::from))?;
    if args.model.is_some() {
        runtime.backend.model = args.model.clone();
    }
    tracing::debug!(
        "Using provider {} with LTspice at {}",
        runtime.backend.provider,
        runtime.ltspice_executable.display()
    );

    let generator = NetlistGenerator::new(build_backend(&runtime.backend));
    let runner = SimulatorRunner::new(runtime.ltspice_executable);
    let mut request = PipelineRequest::new(spec);
    request.max_attempts = args.max_attempts;
    request.artifacts_root = artifacts_dir;
    if !signals.is_empty() {
        request.signals = signals;
    }

    SpiceGenCore::run_pipeline(&request, &generator, &runner).await
}

async fn handle_generate(
    source: &SpecSource,
    args: &BackendArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> i32 {
    let result = generate_netlist(source, args, output).await;

    match result {
        Ok((tran_stop, generated)) => {
            match format {
                OutputFormat::Human => output_generated_human(&generated, output),
                OutputFormat::Json => output_generated_json(tran_stop.as_ref(), &generated, output),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn handle_run(
    source: &SpecSource,
    args: &BackendArgs,
    signals: Vec<String>,
    artifacts_dir: PathBuf,
    format: OutputFormat,
) -> i32 {
    let result = simulate(source, args, signals, artifacts_dir).await;

    match result {
        Ok(report) => {
            match format {
                OutputFormat::Human => output_run_human(&report),
                OutputFormat::Json => print_json(&serde_json::json!(report)),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_validate(
    file: &Path,
    duration: Option<&str>,
    prose_words: Option<Vec<String>>,
    format: OutputFormat,
) -> i32 {
    let tran_stop = match duration.map(DurationToken::parse).transpose() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let validator = match prose_words {
        Some(words) => match NetlistValidator::with_prose_words(words) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error: Invalid prose word list: {}", e);
                return 1;
            }
        },
        None => NetlistValidator::new(),
    };

    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: Failed to read {}: {}", file.display(), e);
            return 1;
        }
    };

    let verdict = validator.validate(&text, tran_stop.as_ref());
    match format {
        OutputFormat::Human => {
            let status = if verdict.accepted { "VALID" } else { "INVALID" };
            println!("{}: {}", file.display(), status);
            println!("  {}", verdict.reason);
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "file": file.display().to_string(),
            "tran_stop": tran_stop,
            "accepted": verdict.accepted,
            "reason": verdict.reason,
        })),
    }

    if verdict.accepted {
        0
    } else {
        1
    }
}

fn handle_duration(text: &str, format: OutputFormat) -> i32 {
    let token = extract_duration(text);
    match format {
        OutputFormat::Human => match token {
            Some(ref t) => println!("{}", t.directive()),
            None => println!("No transient stop time found"),
        },
        OutputFormat::Json => print_json(&serde_json::json!({
            "tran_stop": token,
            "directive": token.as_ref().map(DurationToken::directive),
        })),
    }
    0
}

fn handle_signals(file: &Path, format: OutputFormat) -> i32 {
    let raw = match RawFile::open(file) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let summaries: Vec<_> = raw
        .variables
        .iter()
        .skip(1)
        .filter_map(|v| summarize(&raw, &v.name).ok())
        .collect();

    match format {
        OutputFormat::Human => {
            println!("Plot: {}", raw.plotname);
            println!("Points: {}", raw.point_count());
            println!("Signals:");
            for variable in &raw.variables {
                println!("  {:>3}  {:<20} {}", variable.index, variable.name, variable.kind);
            }
            if let Ok(time) = raw.time_axis() {
                if let Some(stop) = time.last() {
                    println!("Stop time: {:e} s", stop);
                }
            }
            for summary in &summaries {
                println!(
                    "  {:<12} min {:>12.6}  max {:>12.6}  final {:>12.6}",
                    summary.name, summary.min, summary.max, summary.final_value
                );
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "plotname": raw.plotname,
            "points": raw.point_count(),
            "variables": raw.variables,
            "summaries": summaries,
        })),
    }
    0
}

fn handle_doctor(provider: Option<ProviderArg>, format: OutputFormat) -> i32 {
    config::load_environment();
    let provider = match Provider::from_env(provider.map(Provider::from)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let report = DoctorReport::from_env(provider);
    match format {
        OutputFormat::Human => println!("{}", report),
        OutputFormat::Json => print_json(&serde_json::json!(report)),
    }

    match report.into_result() {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn output_generated_human(generated: &GeneratedNetlist, output: Option<&Path>) {
    match output {
        Some(path) => println!(
            "Netlist written to {} (attempt {})",
            path.display(),
            generated.attempts
        ),
        None => println!("{}", generated.text),
    }
}

fn output_generated_json(
    tran_stop: Option<&DurationToken>,
    generated: &GeneratedNetlist,
    output: Option<&Path>,
) {
    print_json(&serde_json::json!({
        "tran_stop": tran_stop,
        "attempts": generated.attempts,
        "rejections": generated.rejections,
        "output": output.map(|p| p.display().to_string()),
        "netlist": generated.text,
    }));
}

fn output_run_human(report: &PipelineReport) {
    println!("Session: {}", report.session_dir.display());
    println!("Netlist: {}", report.circuit_file.display());
    if let Some(ref token) = report.tran_stop {
        println!("Required: {}", token.directive());
    }
    println!("Attempts: {}", report.attempts);
    println!("RAW: {}", report.artifacts.raw_path.display());
    println!("LOG: {}", report.artifacts.log_path.display());
    println!("{}", "─".repeat(60));

    let waveforms = &report.waveforms;
    println!("Signals: {}", waveforms.available_signals.join(", "));
    println!("Points: {}", waveforms.time_points);
    if let Some(stop) = waveforms.stop_time {
        println!("Stop time: {:e} s", stop);
    }
    for summary in &waveforms.summaries {
        println!(
            "  {:<12} min {:>12.6}  max {:>12.6}  final {:>12.6}",
            summary.name, summary.min, summary.max, summary.final_value
        );
    }
    for name in &waveforms.missing_signals {
        println!("  {:<12} not present in simulation output", name);
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: Failed to serialize output: {}", e),
    }
}
