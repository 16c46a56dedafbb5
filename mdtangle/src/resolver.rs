//! Template resolution over the file registry
//!
//! Each declared file starts from the block content matching its slug and
//! has its `_"label"` placeholders substituted with the content of the
//! named blocks. Expansion works over a sequence of typed text/placeholder
//! segments rather than by re-scanning a mutated string, so unresolved
//! labels round-trip to their literal text without any escape-token dance.
//!
//! The active expansion path is tracked as it grows: a label that is
//! already being expanded is a circular reference and aborts the run. This
//! catches both direct self-reference and indirect cycles (A uses B uses
//! A). A label used twice is re-expanded independently each time.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::marker;
use crate::slug::normalize;
use crate::state::DocumentState;

/// The inline directive requesting another block's content.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_\"([^\"]+)\"").expect("placeholder pattern"));

/// Errors raised during template resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("circular template label \"{label}\" detected in \"{path}\" file at index {offset}")]
    CircularReference {
        /// Declared path of the file being resolved
        path: String,
        /// Normalized label that closed the cycle
        label: String,
        /// Character offset of the placeholder in the text being scanned
        offset: usize,
    },
}

/// One lexed piece of block text.
enum Segment {
    Text(String),
    Placeholder { raw: String, offset: usize },
}

/// Split block text into literal runs and placeholder directives.
fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in PLACEHOLDER.find_iter(text) {
        if found.start() > last {
            segments.push(Segment::Text(text[last..found.start()].to_string()));
        }
        // the match is `_"` + label + `"`
        let raw = text[found.start() + 2..found.end() - 1].to_string();
        segments.push(Segment::Placeholder {
            raw,
            offset: found.start(),
        });
        last = found.end();
    }

    if last < text.len() {
        segments.push(Segment::Text(text[last..].to_string()));
    }

    segments
}

/// Expand `text` into `out`, substituting placeholders recursively.
///
/// `active` is the chain of labels currently being expanded, rooted at the
/// file's own slug; meeting any of them again is a cycle.
fn expand(
    text: &str,
    path: &str,
    active: &mut Vec<String>,
    state: &DocumentState,
    out: &mut String,
) -> Result<(), ResolveError> {
    for segment in split_segments(text) {
        match segment {
            Segment::Text(literal) => out.push_str(&literal),
            Segment::Placeholder { raw, offset } => {
                let label = normalize(&raw);

                if active.iter().any(|seen| *seen == label) {
                    return Err(ResolveError::CircularReference {
                        path: path.to_string(),
                        label,
                        offset,
                    });
                }

                match state.blocks.lookup(&label).map(str::to_string) {
                    Some(replacement) => {
                        active.push(label);
                        expand(&replacement, path, active, state, out)?;
                        active.pop();
                    }
                    // unknown labels stay literal; not an error
                    None => out.push_str(&marker::placeholder(&raw)),
                }
            }
        }
    }

    Ok(())
}

/// Resolve every file entry, in discovery order.
///
/// Each file's content is seeded from the block matching its normalized
/// path (empty if no such block was captured), expanded, terminated with a
/// trailing newline, and stored back; the entry is immutable afterwards.
///
/// # Parameters
/// * `state` - Document state after the engine's parse pass
///
/// # Returns
/// * `Ok(DocumentState)` - State with all file contents resolved
/// * `Err(ResolveError)` - A circular label reference was detected
pub fn resolve(mut state: DocumentState) -> Result<DocumentState, ResolveError> {
    let order: Vec<String> = state.files.order().to_vec();

    for path in order {
        let slug = normalize(&path);
        let seed = state.blocks.lookup(&slug).unwrap_or("").to_string();

        let mut resolved = String::new();
        let mut active = vec![slug];
        expand(&seed, &path, &mut active, &state, &mut resolved)?;

        resolved.push('\n');
        log::debug!("resolved \"{}\" ({} bytes)", path, resolved.len());
        state.files.set_content(&path, resolved);
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TocConfig;
    use crate::state::{code_state, header_state, link_state};

    /// Build a state with the given (heading, fence) pairs and one `save:`
    /// file declaration per path.
    fn state_with(blocks: &[(&str, &str)], files: &[&str]) -> DocumentState {
        let toc = TocConfig::default();
        let mut state = DocumentState::new("", &toc.header);
        for (heading, code) in blocks {
            state = header_state(2, heading, &toc, state);
            if !code.is_empty() {
                state = code_state(code, state);
            }
        }
        for path in files {
            let target = format!("#{}", path);
            state = link_state(path, &target, Some("save:"), state).unwrap();
        }
        state
    }

    fn content(state: &DocumentState, path: &str) -> String {
        state.files.get(path).unwrap().content.clone()
    }

    #[test]
    fn test_plain_file_gets_trailing_newline() {
        let state = state_with(&[("f", "hello")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "hello\n");
    }

    #[test]
    fn test_file_without_block_is_empty() {
        let state = state_with(&[], &["ghost"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "ghost"), "\n");
    }

    #[test]
    fn test_label_substitution() {
        let state = state_with(&[("f", "before _\"other\" after"), ("other", "X")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "before X after\n");
    }

    #[test]
    fn test_unknown_label_stays_literal() {
        let state = state_with(&[("f", "insert _\"other\" here")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "insert _\"other\" here\n");
    }

    #[test]
    fn test_empty_block_stays_literal() {
        // `other` has a heading but no fence; its empty slot must not
        // swallow the placeholder
        let state = state_with(&[("f", "x _\"other\" y"), ("other", "")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "x _\"other\" y\n");
    }

    #[test]
    fn test_label_display_text_is_normalized() {
        let state = state_with(&[("f", "_\"My Header\""), ("My Header", "body")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "body\n");
    }

    #[test]
    fn test_nested_expansion() {
        let state = state_with(
            &[("f", "a _\"mid\" z"), ("mid", "[_\"leaf\"]"), ("leaf", "L")],
            &["f"],
        );
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "a [L] z\n");
    }

    #[test]
    fn test_label_used_twice_expands_twice() {
        let state = state_with(&[("f", "_\"leaf\" and _\"leaf\""), ("leaf", "L")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "L and L\n");
    }

    #[test]
    fn test_reserved_labels_resolve_to_literals() {
        let state = state_with(&[("f", "a_\"_tab\"b _\"_backticks\"")], &["f"]);
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "f"), "a\tb ```\n");
    }

    #[test]
    fn test_direct_self_reference_fails() {
        let state = state_with(&[("f", "prefix _\"f\" suffix")], &["f"]);
        let err = resolve(state).unwrap_err();

        let ResolveError::CircularReference {
            path,
            label,
            offset,
        } = err;
        assert_eq!(path, "f");
        assert_eq!(label, "f");
        assert_eq!(offset, 7);
    }

    #[test]
    fn test_self_reference_fails_at_any_position() {
        let state = state_with(&[("f", "_\"f\"")], &["f"]);
        assert!(resolve(state).is_err());

        let state = state_with(&[("f", "lots of text then _\"f\"")], &["f"]);
        assert!(resolve(state).is_err());
    }

    #[test]
    fn test_indirect_cycle_fails() {
        let state = state_with(&[("a", "_\"b\""), ("b", "_\"a\"")], &["a"]);
        let err = resolve(state).unwrap_err();

        let ResolveError::CircularReference { path, label, .. } = err;
        assert_eq!(path, "a");
        assert_eq!(label, "a");
    }

    #[test]
    fn test_sibling_files_resolve_independently() {
        // `shared` is used by two files; neither run poisons the other
        let state = state_with(
            &[("a", "_\"shared\""), ("b", "_\"shared\"!"), ("shared", "S")],
            &["a", "b"],
        );
        let state = resolve(state).unwrap();
        assert_eq!(content(&state, "a"), "S\n");
        assert_eq!(content(&state, "b"), "S!\n");
    }

    #[test]
    fn test_split_segments_offsets() {
        let segments = split_segments("ab _\"x\" cd");
        assert_eq!(segments.len(), 3);
        match &segments[1] {
            Segment::Placeholder { raw, offset } => {
                assert_eq!(raw, "x");
                assert_eq!(*offset, 3);
            }
            Segment::Text(_) => panic!("expected placeholder"),
        }
    }
}
