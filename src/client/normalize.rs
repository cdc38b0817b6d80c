//! Response text normalization
//!
//! The decomposition service decorates its output with markdown-style
//! artifacts: heading prefixes on step text and emphasis markers around
//! expressions. This pass strips them uniformly so formatting noise never
//! enters the tree or the persisted history. Underscore emphasis is only
//! stripped when the pair delimits whole words; an underscore inside a
//! token (`x_1`) is a subscript and stays.

use std::sync::LazyLock;

use regex::Regex;

use crate::tree::StepContent;

use super::types::RawStep;

/// Heading-style prefixes at the start of any line (`# `, `### `, ...)
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s*").unwrap());

/// Emphasis markers: `**` and `*`
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*{1,2}").unwrap());

/// Double-underscore emphasis pairs (`__bold__`)
static BOLD_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__([^_]+)__").unwrap());

/// Single-underscore emphasis pairs delimiting whole words; subscripts like
/// `x_1` have a word character before the underscore and never match
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])_([^_]+)_($|[^\w])").unwrap());

/// Strip service-generated markup artifacts from one text field
pub fn scrub_markup(text: &str) -> String {
    let text = HEADING.replace_all(text, "");
    let text = BOLD_UNDERSCORE.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "${1}${2}${3}");
    let text = EMPHASIS.replace_all(&text, "");
    text.trim().to_string()
}

/// Clean a batch of raw service steps into tree-ready content
pub fn scrub_steps(raw: Vec<RawStep>) -> Vec<StepContent> {
    raw.into_iter()
        .map(|step| StepContent::new(scrub_markup(&step.math), scrub_markup(&step.explanation)))
        .collect()
}
