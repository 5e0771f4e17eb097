pub mod duration;
pub mod prompt;
pub mod validation;

pub use duration::{extract_duration, DurationToken, InvalidDurationToken};
pub use prompt::build_system_prompt;
pub use validation::{validate, NetlistValidator, Rule, Verdict, DEFAULT_PROSE_WORDS, RULES};
