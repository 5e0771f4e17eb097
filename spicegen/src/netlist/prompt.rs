use crate::netlist::duration::DurationToken;

const BASE_PROMPT: &str = r#"You are an expert LTspice netlist generator.
Return ONLY pure LTspice netlist text.
Do not include markdown fences.
Do not include explanations.
Always include a title comment line at the top.
Always include .end as the final directive.
"#;

/// System instruction sent with every generation request.
///
/// With a required duration the model is told the exact `.tran` directive to
/// emit; without one any `.tran` directive is accepted.
pub fn build_system_prompt(tran_stop: Option<&DurationToken>) -> String {
    match tran_stop {
        Some(token) => format!(
            "{}You must include exactly this directive: {}",
            BASE_PROMPT,
            token.directive()
        ),
        None => format!("{}A .tran directive must be present.", BASE_PROMPT),
    }
}
