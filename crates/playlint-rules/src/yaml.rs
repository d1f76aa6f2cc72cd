//! Line-level YAML formatting checks.
//!
//! Sub-tags:
//!
//! - `yaml[trailing-spaces]`: whitespace at the end of a line (fixable)
//! - `yaml[truthy]`: boolean spelled other than `true`/`false` (fixable)
//! - `yaml[line-length]`: line longer than `max_line_length` characters
//!
//! Runs on every line, including lines of documents that failed to parse.
//!
//! # Configuration
//!
//! ```toml
//! [rules.yaml]
//! max_line_length = 160
//! ```

use playlint_core::outline::strip_comment;
use playlint_core::{Edit, Finding, Fix, LineContext, LineRule, Rule, SourceDocument};
use regex::Regex;
use std::sync::LazyLock;

/// Rule id for yaml.
pub const NAME: &str = "yaml";

/// Legacy numeric id.
pub const ALIAS: &str = "201";

/// Default maximum line length.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 160;

#[allow(clippy::expect_used)]
static TRUTHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:-\s+)*(?:[^\s#'\x22\-{\[][^#]*?:\s+)?(yes|Yes|YES|no|No|NO|True|TRUE|False|FALSE|on|On|ON|off|Off|OFF)$",
    )
    .expect("valid truthy regex")
});

#[allow(clippy::expect_used)]
static BLOCK_SCALAR_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s:])[|>][0-9+-]*$").expect("valid block scalar regex")
});

/// Line-level YAML formatting checks.
#[derive(Debug, Clone)]
pub struct Yaml {
    /// Longest allowed line, in characters.
    pub max_line_length: usize,
}

impl Default for Yaml {
    fn default() -> Self {
        Self::new()
    }
}

impl Yaml {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Sets the longest allowed line.
    #[must_use]
    pub fn max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    fn trailing_spaces(ctx: &LineContext<'_>) -> Option<Finding> {
        let kept = ctx.text.trim_end().len();
        if kept == ctx.text.len() {
            return None;
        }
        let range = ctx.range.start + kept..ctx.range.end;
        Some(
            Finding::new("trailing spaces")
                .sub_tag("trailing-spaces")
                .at(range.clone())
                .with_fix(Fix::new("remove trailing spaces", Edit::delete(range))),
        )
    }

    fn truthy(ctx: &LineContext<'_>) -> Option<Finding> {
        let code = strip_comment(ctx.text);
        let value = TRUTHY.captures(code)?.get(1)?;
        if in_block_scalar(ctx.document, ctx.line) {
            return None;
        }
        let replacement = match value.as_str().to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" => "true",
            _ => "false",
        };
        let range = ctx.range.start + value.start()..ctx.range.start + value.end();
        Some(
            Finding::new(format!(
                "truthy value should be one of [false, true], found '{}'",
                value.as_str()
            ))
            .sub_tag("truthy")
            .at(range.clone())
            .with_fix(Fix::new(
                format!("use '{replacement}'"),
                Edit::replace(range, replacement),
            )),
        )
    }

    fn line_length(&self, ctx: &LineContext<'_>) -> Option<Finding> {
        let length = ctx.text.chars().count();
        if length <= self.max_line_length {
            return None;
        }
        // Long unbreakable words such as URLs cannot be wrapped.
        let content = ctx.text.trim_start().trim_start_matches("- ").trim_end();
        let value = match content.split_once(": ") {
            Some((key, value)) if !key.contains(char::is_whitespace) => value.trim_start(),
            _ => content,
        };
        if !value.contains(char::is_whitespace) {
            return None;
        }
        let start = ctx
            .text
            .char_indices()
            .nth(self.max_line_length)
            .map_or(ctx.range.end, |(i, _)| ctx.range.start + i);
        Some(
            Finding::new(format!(
                "line too long ({length} > {} characters)",
                self.max_line_length
            ))
            .sub_tag("line-length")
            .at(start..ctx.range.end),
        )
    }
}

impl Rule for Yaml {
    fn id(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Violations reported by YAML formatting checks"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &[ALIAS]
    }

    fn tags(&self) -> &'static [&'static str] {
        &["formatting", "yaml"]
    }

    fn profile(&self) -> Option<&'static str> {
        Some("basic")
    }

    fn fixable(&self) -> bool {
        true
    }
}

impl LineRule for Yaml {
    fn check_line(&self, ctx: &LineContext<'_>) -> Vec<Finding> {
        [
            Self::trailing_spaces(ctx),
            Self::truthy(ctx),
            self.line_length(ctx),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Column of the first character after indentation and `- ` markers.
fn key_indent(text: &str) -> usize {
    let mut rest = text;
    loop {
        let trimmed = rest.trim_start_matches(' ');
        match trimmed.strip_prefix("- ") {
            Some(after) => rest = after,
            None => return text.len() - trimmed.len(),
        }
    }
}

/// Returns true if `line` is content of a `|` or `>` block scalar.
fn in_block_scalar(document: &SourceDocument, line: usize) -> bool {
    let text = document.line_text(line);
    if text.trim().is_empty() {
        return false;
    }
    let mut limit = text.len() - text.trim_start_matches(' ').len();
    for above in (1..line).rev() {
        let candidate = document.line_text(above);
        if candidate.trim().is_empty() {
            continue;
        }
        let depth = key_indent(candidate);
        if depth >= limit {
            continue;
        }
        if BLOCK_SCALAR_HEADER.is_match(strip_comment(candidate)) {
            return true;
        }
        if depth == 0 {
            return false;
        }
        limit = depth;
    }
    false
}
