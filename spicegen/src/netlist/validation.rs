//! Textual validation of generated LTspice netlists.
//!
//! Validation never simulates anything. It catches the ways a text backend
//! fails to follow instructions: markdown fences, prose leaking into netlist
//! lines, missing mandatory directives and a wrong transient stop time.
//!
//! Rules run in a fixed order and the first failing rule decides the verdict.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::netlist::duration::{normalize_token, DurationToken};

/// Default prose keywords. A non-comment line containing any of these as a
/// whole word is treated as leaked explanation text.
pub const DEFAULT_PROSE_WORDS: &[&str] = &[
    "the", "and", "from", "to", "make", "should", "run", "analysis",
];

const FENCE: &str = "```";
const TRAN: &str = ".tran";
const END: &str = ".end";

/// Outcome of validating one candidate text. The reason is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub reason: String,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: "Netlist is valid.".to_string(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// Candidate text with its non-blank trimmed lines precomputed.
pub struct Candidate<'a> {
    pub text: &'a str,
    pub lines: Vec<&'a str>,
    pub tran_stop: Option<&'a DurationToken>,
}

impl<'a> Candidate<'a> {
    pub fn new(text: &'a str, tran_stop: Option<&'a DurationToken>) -> Self {
        let lines = text
            .split(is_line_break)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self {
            text,
            lines,
            tran_stop,
        }
    }

    /// Lines that are not `*` or `;` comments.
    pub fn statements(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines.iter().copied().filter(|line| !is_comment(line))
    }
}

/// Line boundaries: `\n`, `\r` and the other Unicode line separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_comment(line: &str) -> bool {
    line.starts_with('*') || line.starts_with(';')
}

type RuleCheck = fn(&NetlistValidator, &Candidate<'_>) -> Result<(), String>;

/// A single validation rule.
pub struct Rule {
    pub id: &'static str,
    pub description: &'static str,
    check: RuleCheck,
}

impl Rule {
    pub fn check(&self, validator: &NetlistValidator, candidate: &Candidate<'_>) -> Result<(), String> {
        (self.check)(validator, candidate)
    }
}

/// Rules in evaluation order.
pub static RULES: &[Rule] = &[
    Rule {
        id: "no_markdown_fences",
        description: "Text must not contain ``` anywhere",
        check: check_no_fences,
    },
    Rule {
        id: "not_empty",
        description: "Text must not be empty or whitespace-only",
        check: check_not_empty,
    },
    Rule {
        id: "has_end",
        description: "An .end directive must appear",
        check: check_has_end,
    },
    Rule {
        id: "has_tran",
        description: "A .tran directive must appear",
        check: check_has_tran,
    },
    Rule {
        id: "has_lines",
        description: "At least one non-blank line",
        check: check_has_lines,
    },
    Rule {
        id: "no_prose",
        description: "Non-comment lines must not contain English prose keywords",
        check: check_no_prose,
    },
    Rule {
        id: "required_tran_stop",
        description: "When a duration is required, a .tran line must use exactly that stop time",
        check: check_required_tran_stop,
    },
];

fn check_no_fences(_: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    if c.text.contains(FENCE) {
        return Err("Netlist contains markdown fences.".to_string());
    }
    Ok(())
}

fn check_not_empty(_: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    if c.text.trim().is_empty() {
        return Err("Netlist is empty.".to_string());
    }
    Ok(())
}

fn check_has_end(_: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    if !c.text.to_lowercase().contains(END) {
        return Err("Netlist does not include .end.".to_string());
    }
    Ok(())
}

fn check_has_tran(_: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    if !c.text.to_lowercase().contains(TRAN) {
        return Err("Netlist does not include .tran.".to_string());
    }
    Ok(())
}

fn check_has_lines(_: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    if c.lines.is_empty() {
        return Err("Netlist has no lines.".to_string());
    }
    Ok(())
}

fn check_no_prose(v: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    let Some(pattern) = &v.prose_pattern else {
        return Ok(());
    };
    match c.statements().find(|line| pattern.is_match(line)) {
        Some(line) => Err(format!("Line appears to contain English prose: {:?}", line)),
        None => Ok(()),
    }
}

fn check_required_tran_stop(_: &NetlistValidator, c: &Candidate<'_>) -> Result<(), String> {
    let Some(token) = c.tran_stop else {
        return Ok(());
    };
    let required = normalize_token(token.as_str());

    let mut tran_lines = c.statements().filter_map(tran_remainder).peekable();
    if tran_lines.peek().is_none() {
        return Err("Netlist does not include .tran.".to_string());
    }
    if tran_lines.any(|rest| normalize_token(rest) == required) {
        Ok(())
    } else {
        Err(format!(
            "Netlist does not include required '{}'.",
            token.directive()
        ))
    }
}

/// Everything after a leading, case-insensitive `.tran` keyword.
fn tran_remainder(line: &str) -> Option<&str> {
    let head = line.get(..TRAN.len())?;
    head.eq_ignore_ascii_case(TRAN).then(|| &line[TRAN.len()..])
}

/// Validator holding the prose-word policy.
#[derive(Debug, Clone)]
pub struct NetlistValidator {
    prose_words: Vec<String>,
    prose_pattern: Option<Regex>,
}

impl NetlistValidator {
    /// Validator with [`DEFAULT_PROSE_WORDS`].
    pub fn new() -> Self {
        Self::with_prose_words(DEFAULT_PROSE_WORDS.iter().copied())
            .expect("default prose words form a valid pattern")
    }

    /// Validator with a custom prose keyword set. An empty set disables the
    /// prose check entirely.
    pub fn with_prose_words<I, S>(words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prose_words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let prose_pattern = if prose_words.is_empty() {
            None
        } else {
            let alternation = prose_words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        Ok(Self {
            prose_words,
            prose_pattern,
        })
    }

    pub fn prose_words(&self) -> &[String] {
        &self.prose_words
    }

    pub fn rules(&self) -> &'static [Rule] {
        RULES
    }

    /// Run every rule in order and stop at the first failure.
    pub fn validate(&self, text: &str, tran_stop: Option<&DurationToken>) -> Verdict {
        let candidate = Candidate::new(text, tran_stop);
        for rule in RULES {
            if let Err(reason) = rule.check(self, &candidate) {
                tracing::debug!("Rule {} rejected netlist: {}", rule.id, reason);
                return Verdict::reject(reason);
            }
        }
        Verdict::accept()
    }
}

impl Default for NetlistValidator {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_VALIDATOR: LazyLock<NetlistValidator> = LazyLock::new(NetlistValidator::new);

/// Validate with the default prose-word policy.
pub fn validate(text: &str, tran_stop: Option<&DurationToken>) -> Verdict {
    DEFAULT_VALIDATOR.validate(text, tran_stop)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "* RLC netlist\n\
        V1 in 0 PULSE(0 12 0.8m 2u 2u 0.8m 4m)\n\
        R1 in out 220\n\
        L1 out mid 3.3m\n\
        C1 mid 0 47u\n\
        .tran 6 ms\n\
        .end\n";

    fn token(raw: &str) -> DurationToken {
        DurationToken::parse(raw).unwrap()
    }

    fn rule(id: &str) -> &'static Rule {
        RULES.iter().find(|r| r.id == id).unwrap()
    }

    #[test]
    fn test_valid_netlist_accepted() {
        let verdict = validate(VALID, None);
        assert!(verdict.accepted);
        assert_eq!(verdict.reason, "Netlist is valid.");
    }

    #[test]
    fn test_fences_rejected_regardless_of_content() {
        let fenced = format!("```spice\n{}```", VALID);
        let verdict = validate(&fenced, Some(&token("6ms")));
        assert!(!verdict.accepted);
        assert!(verdict.reason.contains("markdown fences"));

        let verdict = validate("```", None);
        assert!(verdict.reason.contains("markdown fences"));
    }

    #[test]
    fn test_empty_and_whitespace_rejected() {
        assert_eq!(validate("", None).reason, "Netlist is empty.");
        assert_eq!(validate("  \n\t \n", None).reason, "Netlist is empty.");
    }

    #[test]
    fn test_missing_end_and_tran() {
        let no_end = "* t\nR1 a 0 1k\n.tran 1ms\n";
        assert_eq!(validate(no_end, None).reason, "Netlist does not include .end.");

        let no_tran = "* t\nR1 a 0 1k\n.END\n";
        assert_eq!(validate(no_tran, None).reason, "Netlist does not include .tran.");
    }

    #[test]
    fn test_directives_are_case_insensitive() {
        let upper = "* t\nR1 a 0 1k\n.TRAN 6MS\n.END\n";
        assert!(validate(upper, Some(&token("6ms"))).accepted);
    }

    #[test]
    fn test_comment_lines_may_contain_prose() {
        let text = "* The filter should run from the source\nR1 a 0 1k\n.tran 1ms\n.end\n";
        assert!(validate(text, None).accepted);

        let text = "; make the analysis run\nR1 a 0 1k\n.tran 1ms\n.end\n";
        assert!(validate(text, None).accepted);
    }

    #[test]
    fn test_prose_in_statement_line_rejected() {
        let text = "* title\nR1 a 0 1k and the rest\n.tran 1ms\n.end\n";
        let verdict = validate(text, None);
        assert!(!verdict.accepted);
        assert!(verdict.reason.contains("\"R1 a 0 1k and the rest\""));
    }

    #[test]
    fn test_carriage_return_line_endings() {
        let text = "* title\rthe prose leaked here\rR1 a 0 1k\r.tran 1ms\r.end\r";
        let verdict = validate(text, None);
        assert!(!verdict.accepted);
        assert_eq!(
            verdict.reason,
            "Line appears to contain English prose: \"the prose leaked here\""
        );

        let crlf = "* title\r\nR1 a 0 1k\r\n.tran 6 ms\r\n.end\r\n";
        let candidate = Candidate::new(crlf, None);
        assert_eq!(candidate.lines, vec!["* title", "R1 a 0 1k", ".tran 6 ms", ".end"]);
        assert!(validate(crlf, Some(&token("6ms"))).accepted);
    }

    #[test]
    fn test_default_validator_is_shared() {
        let first: *const NetlistValidator = &*DEFAULT_VALIDATOR;
        assert!(validate(VALID, None).accepted);
        assert!(std::ptr::eq(first, &*DEFAULT_VALIDATOR));
        assert_eq!(DEFAULT_VALIDATOR.prose_words().len(), DEFAULT_PROSE_WORDS.len());
    }

    #[test]
    fn test_prose_words_match_whole_words_only() {
        let text = "* title\nRtheta a 0 1k\nVrun1 b 0 5\nXandy c 0 sub\n.tran 1ms\n.end\n";
        assert!(validate(text, None).accepted);
    }

    #[test]
    fn test_required_duration_tolerates_whitespace() {
        let verdict = validate(VALID, Some(&token("6ms")));
        assert!(verdict.accepted, "{}", verdict.reason);
    }

    #[test]
    fn test_required_duration_mismatch_names_directive() {
        let text = VALID.replace(".tran 6 ms", ".tran 5ms");
        let verdict = validate(&text, Some(&token("6ms")));
        assert!(!verdict.accepted);
        assert!(verdict.reason.contains(".tran 6ms"), "{}", verdict.reason);
    }

    #[test]
    fn test_required_duration_ignores_commented_tran() {
        let text = "* title\n* .tran 6ms\nR1 a 0 1k\n.end\n";
        let verdict = validate(text, Some(&token("6ms")));
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, "Netlist does not include .tran.");
    }

    #[test]
    fn test_any_matching_tran_line_is_enough() {
        let text = "* title\nR1 a 0 1k\n.tran 2ms\n.tran 6ms\n.end\n";
        assert!(validate(text, Some(&token("6ms"))).accepted);
    }

    #[test]
    fn test_rule_order_fence_before_empty() {
        assert_eq!(RULES[0].id, "no_markdown_fences");
        assert_eq!(RULES[1].id, "not_empty");
        let verdict = validate("```\n", None);
        assert!(verdict.reason.contains("markdown fences"));
    }

    #[test]
    fn test_rules_individually() {
        let v = NetlistValidator::new();
        let c = Candidate::new("R1 a 0 1k", None);
        assert!(rule("no_markdown_fences").check(&v, &c).is_ok());
        assert!(rule("not_empty").check(&v, &c).is_ok());
        assert!(rule("has_end").check(&v, &c).is_err());
        assert!(rule("has_tran").check(&v, &c).is_err());
        assert!(rule("has_lines").check(&v, &c).is_ok());
        assert!(rule("no_prose").check(&v, &c).is_ok());
        assert!(rule("required_tran_stop").check(&v, &c).is_ok());

        let blank = Candidate::new("\n   \n", None);
        assert!(rule("has_lines").check(&v, &blank).is_err());
    }

    #[test]
    fn test_custom_prose_policy() {
        let text = "* title\nR1 a 0 1k\nXamp the out opamp\n.tran 1ms\n.end\n";
        let strict = NetlistValidator::new();
        assert!(!strict.validate(text, None).accepted);

        let relaxed = NetlistValidator::with_prose_words(["please", "explanation"]).unwrap();
        assert!(relaxed.validate(text, None).accepted);
        assert_eq!(relaxed.prose_words(), &["please".to_string(), "explanation".to_string()]);

        let disabled = NetlistValidator::with_prose_words(Vec::<String>::new()).unwrap();
        assert!(disabled.validate("this is prose .tran .end", None).accepted);
    }
}
