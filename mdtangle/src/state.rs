//! Document state and the shared state-building hooks
//!
//! [`DocumentState`] is the single mutable structure threaded through the
//! whole extraction pipeline: the engine adapters call the hooks defined
//! here while parsing, the template resolver rewrites the file registry,
//! and the assembler fills in the final HTML. The state is exclusively
//! owned by one extraction run; each stage takes it by value and returns
//! the updated value.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::TocConfig;
use crate::marker;
use crate::slug::normalize;

/// Marker that turns an in-document link into a file declaration when it
/// prefixes the link's title attribute.
pub const SAVE_PREFIX: &str = "save:";

/// One rendered table-of-contents entry.
#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    /// Heading level (1 = `#`)
    pub level: u32,
    /// Original display text
    pub text: String,
    /// Normalized anchor name
    pub slug: String,
}

/// Table of contents in all three of its forms: the structured entries,
/// the incrementally built Markdown list, and the rendered HTML.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableOfContents {
    /// Headings at or above the configured depth, in document order
    pub entries: Vec<TocEntry>,
    /// Markdown source for the list, seeded with the ToC header
    pub markdown: String,
    /// HTML produced by the engine's second pass
    pub html: String,
}

/// Registry mapping block slugs to their captured code content.
///
/// Keys are unique and a slot's content is set at most once: the block
/// nearest the most recently seen heading absorbs only the first code
/// fence that follows it. The insertion order of slugs is retained for
/// deterministic iteration and for fence-to-heading association.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRegistry {
    contents: HashMap<String, String>,
    order: Vec<String>,
}

impl BlockRegistry {
    /// Create a registry pre-seeded with the reserved escape labels.
    ///
    /// The reserved labels carry content but do not participate in fence
    /// capture, so they are absent from the order list.
    fn seeded() -> Self {
        let mut contents = HashMap::new();
        contents.insert(marker::BACKTICKS_LABEL.to_string(), "```".to_string());
        contents.insert(marker::TAB_LABEL.to_string(), "\t".to_string());
        Self {
            contents,
            order: Vec::new(),
        }
    }

    /// Reserve an identity for `slug` if it is not yet known.
    pub fn reserve(&mut self, slug: &str) {
        if !self.contents.contains_key(slug) {
            self.contents.insert(slug.to_string(), String::new());
            self.order.push(slug.to_string());
        }
    }

    /// Look up a block's content. Registered-but-empty blocks count as
    /// absent; callers treat them the same as unknown labels.
    pub fn lookup(&self, slug: &str) -> Option<&str> {
        self.contents
            .get(slug)
            .map(String::as_str)
            .filter(|content| !content.is_empty())
    }

    /// The most recently reserved slug, if any.
    pub fn last_reserved(&self) -> Option<&str> {
        self.order.last().map(String::as_str)
    }

    /// Fill `slug` with `code` only if its slot is still empty.
    ///
    /// # Returns
    /// * `true` - The content was stored
    /// * `false` - The slot was already filled or never reserved
    pub fn fill(&mut self, slug: &str, code: &str) -> bool {
        match self.contents.get_mut(slug) {
            Some(slot) if slot.is_empty() => {
                slot.push_str(code);
                true
            }
            _ => false,
        }
    }

    /// Reserved slugs in insertion order.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}

/// A declared file: its (possibly still unresolved) content and the
/// optional octal permission string from the `save:` directive.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    /// File content; contains unresolved labels until the resolver runs
    pub content: String,
    /// Three octal digits, or `None` for the default permissions
    pub mode: Option<String>,
}

/// Registry of declared files, keyed by their in-document path.
///
/// Discovery order equals link order in the source and is preserved for
/// resolution and materialization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileRegistry {
    contents: HashMap<String, FileEntry>,
    order: Vec<String>,
}

impl FileRegistry {
    /// Register a file path; the first occurrence wins.
    pub fn register(&mut self, path: &str, mode: Option<String>) {
        if !self.contents.contains_key(path) {
            self.contents.insert(
                path.to_string(),
                FileEntry {
                    content: String::new(),
                    mode,
                },
            );
            self.order.push(path.to_string());
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.contents.get(path)
    }

    /// Store a file's resolved content. Called exactly once per entry by
    /// the template resolver; the entry is immutable afterwards.
    pub fn set_content(&mut self, path: &str, content: String) {
        if let Some(entry) = self.contents.get_mut(path) {
            entry.content = content;
        }
    }

    /// Declared paths in discovery order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate entries in discovery order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.order
            .iter()
            .filter_map(|path| self.contents.get(path).map(|entry| (path.as_str(), entry)))
    }
}

/// The document model for one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentState {
    /// Original input text, immutable after load
    pub source: String,
    /// ToC-prefixed copy of the source, materialized as README.md
    pub readme: String,
    /// Table of contents in its three forms
    pub toc: TableOfContents,
    /// Slug to first display text; the first heading using a slug owns it
    pub anchors: HashMap<String, String>,
    /// Block registry (anchor slug to code content)
    pub blocks: BlockRegistry,
    /// File registry (declared path to pending content and mode)
    pub files: FileRegistry,
    /// Rendered document body (no ToC, no boilerplate)
    pub body_html: String,
    /// Final assembled output, populated last
    pub html: String,
}

impl DocumentState {
    /// Create the initial state for `source`.
    ///
    /// # Parameters
    /// * `source` - The full Markdown input
    /// * `toc_header` - Display text of the table-of-contents heading
    pub fn new(source: &str, toc_header: &str) -> Self {
        Self {
            source: source.to_string(),
            readme: source.to_string(),
            toc: TableOfContents {
                entries: Vec::new(),
                markdown: format!("# {}\n\n", toc_header),
                html: String::new(),
            },
            anchors: HashMap::new(),
            blocks: BlockRegistry::seeded(),
            files: FileRegistry::default(),
            body_html: String::new(),
            html: String::new(),
        }
    }

    /// Record `text` as the display label owning `slug`, unless a prior
    /// heading already claimed it.
    pub fn register_anchor(&mut self, slug: &str, text: &str) {
        self.anchors
            .entry(slug.to_string())
            .or_insert_with(|| text.to_string());
    }

    /// Display text owning `slug`, if any heading registered one.
    pub fn anchor_text(&self, slug: &str) -> Option<&str> {
        self.anchors.get(slug).map(String::as_str)
    }
}

/// Errors raised while building document state from parser callbacks.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("invalid file mode \"{mode}\" for \"{path}\": must be three octal digits")]
    InvalidMode { path: String, mode: String },
}

/// Heading hook: reserve the block identity, claim the anchor label, and
/// append a ToC entry when the heading is shallow enough.
pub fn header_state(
    level: u32,
    text: &str,
    toc: &TocConfig,
    mut state: DocumentState,
) -> DocumentState {
    let slug = normalize(text);
    state.blocks.reserve(&slug);
    state.register_anchor(&slug, text);

    if level <= toc.max_level {
        for _ in 1..level {
            state.toc.markdown.push_str("    ");
        }
        state
            .toc
            .markdown
            .push_str(&format!("* [{}](#{})\n", text, slug));
        state.toc.entries.push(TocEntry {
            level,
            text: text.to_string(),
            slug,
        });
    }

    state
}

/// Link hook: register a file entry for in-document links carrying a
/// `save:` directive in their title attribute.
///
/// The mode string is validated eagerly: it must be empty (default
/// permissions) or exactly three octal digits.
pub fn link_state(
    _text: &str,
    target: &str,
    title: Option<&str>,
    mut state: DocumentState,
) -> Result<DocumentState, StateError> {
    let Some(path) = target.strip_prefix('#') else {
        return Ok(state);
    };
    let Some(title) = title else {
        return Ok(state);
    };
    let Some(mode) = title.strip_prefix(SAVE_PREFIX) else {
        return Ok(state);
    };

    let mode = if mode.is_empty() {
        None
    } else {
        if mode.len() != 3 || !mode.bytes().all(|b| b.is_ascii_digit() && b < b'8') {
            return Err(StateError::InvalidMode {
                path: path.to_string(),
                mode: mode.to_string(),
            });
        }
        Some(mode.to_string())
    };

    state.files.register(path, mode);
    Ok(state)
}

/// Code hook: associate fence content with the most recently reserved
/// block, only if that slot is still empty.
pub fn code_state(code: &str, mut state: DocumentState) -> DocumentState {
    match state.blocks.last_reserved().map(str::to_string) {
        Some(slug) => {
            if !state.blocks.fill(&slug, code) {
                log::debug!("block \"{}\" already filled; fence ignored", slug);
            }
        }
        None => log::debug!("code fence before any heading; ignored"),
    }
    state
}
