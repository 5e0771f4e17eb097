//! Example: check a netlist file with a custom prose-word policy.
//! Run with: cargo run --example custom_policy path/to/file.cir [duration] [word...]

use spicegen::netlist::{NetlistValidator, RULES};
use spicegen::DurationToken;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: cargo run --example custom_policy path/to/file.cir [duration] [word...]");
        std::process::exit(1);
    };
    let tran_stop = args.next().map(|s| DurationToken::parse(&s)).transpose()?;
    let words: Vec<String> = args.collect();

    let validator = if words.is_empty() {
        NetlistValidator::new()
    } else {
        NetlistValidator::with_prose_words(words)?
    };

    println!("Rules:");
    for rule in RULES {
        println!("  {:<20} {}", rule.id, rule.description);
    }
    println!("Prose words: {}", validator.prose_words().join(", "));

    let text = std::fs::read_to_string(&path)?;
    let verdict = validator.validate(&text, tran_stop.as_ref());
    println!("{}: {}", path, verdict.reason);
    if !verdict.accepted {
        std::process::exit(1);
    }
    Ok(())
}
