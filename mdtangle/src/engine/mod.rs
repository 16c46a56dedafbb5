//! Markdown engine adapters
//!
//! Three third-party Markdown libraries with incompatible extension models
//! are wrapped behind one two-pass contract. The parse pass walks the
//! source, drives the shared state-building hooks, and produces the body
//! HTML; the render pass runs the same heading-anchoring path over the
//! assembled table-of-contents fragment without touching any registry.
//! Downstream components never know which engine is active.

pub mod pulldown;

#[cfg(feature = "engine-comrak")]
pub mod comrak;

#[cfg(feature = "engine-markdown")]
pub mod markdown_rs;

use thiserror::Error;

use crate::config::TocConfig;
use crate::slug::normalize;
use crate::state::{self, DocumentState, StateError};

/// Errors raised by an engine adapter.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("{engine} engine failed: {message}")]
    Backend {
        engine: &'static str,
        message: String,
    },
}

/// The shared state-building callbacks handed to whichever adapter is
/// active. Each hook takes the current state and returns the next one.
///
/// Defaults to the Document State Builder hooks; tests may substitute
/// their own observers.
pub struct Hooks {
    pub header: fn(u32, &str, &TocConfig, DocumentState) -> DocumentState,
    pub link: fn(&str, &str, Option<&str>, DocumentState) -> Result<DocumentState, StateError>,
    pub code: fn(&str, DocumentState) -> DocumentState,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            header: state::header_state,
            link: state::link_state,
            code: state::code_state,
        }
    }
}

/// Options carried into both engine passes: the hook table, the
/// language-class prefix for code blocks, and the ToC configuration.
pub struct EngineOptions {
    pub hooks: Hooks,
    pub lang_prefix: String,
    pub toc: TocConfig,
}

impl EngineOptions {
    pub fn new(toc: TocConfig, lang_prefix: String) -> Self {
        Self {
            hooks: Hooks::default(),
            lang_prefix,
            toc,
        }
    }
}

/// The capability contract every Markdown engine adapter satisfies.
///
/// Ownership of the state transfers forward through each call and is
/// returned updated, never shared.
pub trait Engine {
    /// Engine name as used in configuration and diagnostics.
    fn name(&self) -> &'static str;

    /// Pass 1: parse `source`, drive the hooks, and fill in
    /// `state.body_html`.
    fn parse(
        &self,
        source: &str,
        state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError>;

    /// Pass 2: render `state.toc.markdown` into `state.toc.html` through
    /// the heading-anchoring path, without mutating any registry.
    fn render_toc(
        &self,
        state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError>;
}

/// Engine names this build knows about, in default preference order.
pub const SUPPORTED: &[&str] = &["pulldown", "comrak", "markdown"];

/// Engine names compiled into this build.
pub fn installed() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut names = vec!["pulldown"];
    #[cfg(feature = "engine-comrak")]
    names.push("comrak");
    #[cfg(feature = "engine-markdown")]
    names.push("markdown");
    names
}

/// The cargo feature gating a non-default engine, if any.
pub fn feature(name: &str) -> Option<&'static str> {
    match name {
        "comrak" => Some("engine-comrak"),
        "markdown" => Some("engine-markdown"),
        _ => None,
    }
}

/// Instantiate an engine by name; `None` when unknown or compiled out.
pub fn by_name(name: &str) -> Option<Box<dyn Engine>> {
    match name {
        "pulldown" => Some(Box::new(pulldown::PulldownEngine)),
        #[cfg(feature = "engine-comrak")]
        "comrak" => Some(Box::new(comrak::ComrakEngine)),
        #[cfg(feature = "engine-markdown")]
        "markdown" => Some(Box::new(markdown_rs::MarkdownRsEngine)),
        _ => None,
    }
}

/// Inner fragment of an anchored heading: the named anchor around the
/// display text, plus a jump link back to the ToC during the parse pass.
pub(crate) fn heading_anchor(text: &str, toc: Option<&TocConfig>) -> String {
    let slug = normalize(text);
    let mut fragment = format!("<a name=\"{}\">{}</a>", slug, text);
    if let Some(toc) = toc {
        fragment.push_str(&format!(
            " <a href=\"#{}\">{}</a>",
            normalize(&toc.header),
            toc.top
        ));
    }
    fragment
}

/// A fully rendered heading element with its anchor fragment.
pub(crate) fn heading_html(level: u32, text: &str, toc: Option<&TocConfig>) -> String {
    format!(
        "<h{}>{}</h{}>\n",
        level,
        heading_anchor(text, toc),
        level
    )
}

/// A rendered link; in-document targets are normalized.
pub(crate) fn link_html(text: &str, href: &str, title: Option<&str>) -> String {
    let href = match href.strip_prefix('#') {
        Some(rest) => format!("#{}", normalize(rest)),
        None => href.to_string(),
    };
    let mut out = format!("<a href=\"{}\"", href);
    if let Some(title) = title {
        out.push_str(&format!(" title=\"{}\"", title));
    }
    out.push('>');
    out.push_str(text);
    out.push_str("</a>");
    out
}

/// A rendered code block. The class attribute is emitted only when both a
/// language and a prefix are configured.
pub(crate) fn code_html(code: &str, lang: Option<&str>, prefix: &str) -> String {
    let mut out = String::from("<pre><code");
    if let Some(lang) = lang.filter(|l| !l.is_empty()) {
        if !prefix.is_empty() {
            out.push_str(&format!(" class=\"{}{}\"", prefix, lang));
        }
    }
    out.push('>');
    out.push_str(&html_escape::encode_safe(code));
    out.push_str("\n</code></pre>\n");
    out
}
