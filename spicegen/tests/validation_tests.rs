//! Validation of fixture netlists

use spicegen::netlist::{NetlistValidator, RULES};
use spicegen::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("Should read fixture")
}

fn six_ms() -> DurationToken {
    DurationToken::parse("6ms").unwrap()
}

#[test]
fn test_valid_netlist_with_required_duration() {
    let verdict = validate(&fixture("valid_rlc.cir"), Some(&six_ms()));
    assert!(verdict.accepted, "{}", verdict.reason);
    assert_eq!(verdict.reason, "Netlist is valid.");
}

#[test]
fn test_prose_leak_names_offending_line() {
    let verdict = validate(&fixture("prose_leak.cir"), None);
    assert!(!verdict.accepted);
    assert!(verdict.reason.starts_with("Line appears to contain English prose"));
    assert!(verdict.reason.contains("Here is the netlist"), "{}", verdict.reason);
}

#[test]
fn test_fences_win_over_other_problems() {
    let verdict = validate(&fixture("fenced.cir"), Some(&six_ms()));
    assert!(!verdict.accepted);
    assert_eq!(verdict.reason, "Netlist contains markdown fences.");
}

#[test]
fn test_wrong_duration() {
    let text = fixture("wrong_duration.cir");
    assert!(validate(&text, None).accepted);

    let verdict = validate(&text, Some(&six_ms()));
    assert!(!verdict.accepted);
    assert_eq!(verdict.reason, "Netlist does not include required '.tran 6ms'.");

    let five = DurationToken::parse("5ms").unwrap();
    assert!(validate(&text, Some(&five)).accepted);
}

#[test]
fn test_duration_from_description_drives_validation() {
    let spec = "RLC network driven by a pulse. Run for 6 ms.";
    let token = extract_duration(spec).expect("Should find duration");
    assert!(validate(&fixture("valid_rlc.cir"), Some(&token)).accepted);
    assert!(!validate(&fixture("wrong_duration.cir"), Some(&token)).accepted);
}

#[test]
fn test_relaxed_prose_policy_accepts_prose_leak() {
    let validator = NetlistValidator::with_prose_words(Vec::<String>::new()).unwrap();
    let verdict = validator.validate(&fixture("prose_leak.cir"), Some(&six_ms()));
    assert!(verdict.accepted, "{}", verdict.reason);
}

#[test]
fn test_rule_order_is_stable() {
    let ids: Vec<_> = RULES.iter().map(|r| r.id).collect();
    assert_eq!(
        ids,
        vec![
            "no_markdown_fences",
            "not_empty",
            "has_end",
            "has_tran",
            "has_lines",
            "no_prose",
            "required_tran_stop",
        ]
    );
}
