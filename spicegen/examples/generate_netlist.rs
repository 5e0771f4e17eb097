//! Example: generate one validated netlist from a description.
//! Run with: cargo run --example generate_netlist ["description text"]
//!
//! Reads OPENAI_API_KEY (or ANTHROPIC_API_KEY with SPICEGEN_PROVIDER=claude)
//! from the environment or a .env file.

use spicegen::core::DEMO_SPEC;
use spicegen::{build_backend, BackendConfig, NetlistGenerator, SpiceGenCore, DEFAULT_MAX_ATTEMPTS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let spec = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEMO_SPEC.to_string());

    let config = BackendConfig::from_env(None)?;
    let generator = NetlistGenerator::new(build_backend(&config));

    let (tran_stop, generated) =
        SpiceGenCore::generate(&generator, &spec, DEFAULT_MAX_ATTEMPTS).await?;

    match tran_stop {
        Some(token) => println!("* required: {}", token.directive()),
        None => println!("* no stop time in description"),
    }
    println!("* accepted on attempt {}", generated.attempts);
    for reason in &generated.rejections {
        println!("* rejected earlier: {}", reason);
    }
    println!("{}", generated.text);
    Ok(())
}
