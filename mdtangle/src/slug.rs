//! Anchor slug normalization
//!
//! Every place the pipeline compares anchor identity (headings, link
//! targets, block and file keys) goes through [`normalize`] first, so two
//! display strings that collapse to the same slug refer to the same thing.

/// Compute the canonical slug for heading or link-target text.
///
/// Lowercases the input, then replaces every character that is not an
/// ASCII word character or `+` with `-`.
///
/// # Parameters
/// * `text` - Display text of a heading or the de-hashed target of a link
///
/// # Returns
/// * `String` - The canonical slug; idempotent under re-normalization
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '+' => c,
            _ => '-',
        })
        .collect()
}
