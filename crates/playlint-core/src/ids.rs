//! Ids of the rules the engine reports on its own.

/// Document could not be parsed.
pub const PARSER_ERROR: &str = "parser-error";
/// An included document or role could not be loaded, or inclusion cycles.
pub const LOAD_FAILURE: &str = "load-failure";
/// A rule panicked.
pub const INTERNAL_ERROR: &str = "internal-error";
/// A suppression directive is malformed or names an unknown rule.
pub const SUPPRESSION_SYNTAX: &str = "suppression-syntax";
/// A fix did not resolve its finding and was reverted.
pub const FIX_FAILED: &str = "fix-failed";

/// Tag carried by engine rules; every profile keeps them.
pub const CORE_TAG: &str = "core";
/// Tag of rules that only run when named in `enable_list`.
pub const OPT_IN_TAG: &str = "opt-in";
