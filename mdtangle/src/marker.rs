//! Placeholder marker syntax
//!
//! Inside block text, `_"label"` requests substitution with the content of
//! the block named `label`. The same marker doubles as a reversible escape
//! for characters the Markdown engines would otherwise mangle: the reserved
//! labels [`TAB_LABEL`] and [`BACKTICKS_LABEL`] are pre-seeded in the block
//! registry with a literal tab and a literal triple backtick.

/// Reserved label carrying a literal tab character through the parser.
pub const TAB_LABEL: &str = "_tab";

/// Reserved label carrying a literal ``` sequence through the parser.
pub const BACKTICKS_LABEL: &str = "_backticks";

/// Render the placeholder marker for `label`.
pub fn placeholder(label: &str) -> String {
    format!("_\"{}\"", label)
}

/// Substitute raw tabs with the `_"_tab"` placeholder.
///
/// Applied to source text before every parse pass; some engines do not
/// preserve raw tabs verbatim. [`restore_escapes`] undoes it after the
/// final HTML is assembled, and the template resolver undoes it in
/// extracted file contents.
pub fn escape_tabs(source: &str) -> String {
    source.replace('\t', "_\"_tab\"")
}

/// Substitute literal ``` sequences with the `_"_backticks"` placeholder.
///
/// Used when packing files into fenced code blocks so the fences stay
/// unambiguous; extraction restores the sequence exactly.
pub fn escape_backticks(text: &str) -> String {
    text.replace("```", "_\"_backticks\"")
}

/// Restore tab and backtick placeholders in assembled HTML.
///
/// Handles both the raw marker and the form produced when a renderer has
/// entity-escaped the double quotes.
pub fn restore_escapes(html: &str) -> String {
    html.replace("_&quot;_tab&quot;", "\t")
        .replace("_&quot;_backticks&quot;", "```")
        .replace("_\"_tab\"", "\t")
        .replace("_\"_backticks\"", "```")
}
