//! Adapter over the `markdown` crate
//!
//! The `markdown` crate offers a render function and a separate mdast
//! parse, with no way to hook the renderer itself. The adapter therefore
//! runs two phases: an mdast walk that drives the shared hooks, and a
//! string-level post-pass over the rendered HTML that wraps headings in
//! named anchors, normalizes in-document link targets, and applies the
//! language-class prefix.

use markdown::mdast::Node;
use markdown::{to_html_with_options, to_mdast, CompileOptions, Options, ParseOptions};
use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::{Engine, EngineError, EngineOptions};
use crate::config::TocConfig;
use crate::marker;
use crate::slug::normalize;
use crate::state::DocumentState;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(?s)<h([1-6])>(.*?)</h[1-6]>").expect("heading pattern"));
static HASH_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("href=\"#([^\"]*)\"").expect("href pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]+>").expect("tag pattern"));

pub struct MarkdownRsEngine;

impl Engine for MarkdownRsEngine {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn parse(
        &self,
        source: &str,
        mut state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError> {
        let source = marker::escape_tabs(source);

        let tree = to_mdast(&source, &ParseOptions::default()).map_err(backend_error)?;
        state = walk(&tree, state, opts)?;

        let html = render_html(&source)?;
        state.body_html = post_process(&html, &opts.lang_prefix, Some(&opts.toc));
        Ok(state)
    }

    fn render_toc(
        &self,
        mut state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError> {
        let html = render_html(&state.toc.markdown)?;
        state.toc.html = post_process(&html, &opts.lang_prefix, None);
        Ok(state)
    }
}

fn backend_error(message: impl ToString) -> EngineError {
    EngineError::Backend {
        engine: "markdown",
        message: message.to_string(),
    }
}

/// Drive the hooks from an mdast subtree, in document order.
fn walk(
    node: &Node,
    mut state: DocumentState,
    opts: &EngineOptions,
) -> Result<DocumentState, EngineError> {
    match node {
        Node::Heading(heading) => {
            let text = inline_text(&heading.children);
            if !text.is_empty() {
                state = (opts.hooks.header)(u32::from(heading.depth), &text, &opts.toc, state);
            }
        }
        Node::Link(link) => {
            let text = inline_text(&link.children);
            state = (opts.hooks.link)(&text, &link.url, link.title.as_deref(), state)?;
        }
        Node::Code(code) => {
            state = (opts.hooks.code)(code.value.trim_end_matches('\n'), state);
        }
        _ => {}
    }

    if let Some(children) = node.children() {
        for child in children {
            state = walk(child, state, opts)?;
        }
    }

    Ok(state)
}

/// Concatenate the literal text of inline children.
fn inline_text(children: &[Node]) -> String {
    let mut text = String::new();
    for child in children {
        match child {
            Node::Text(t) => text.push_str(&t.value),
            Node::InlineCode(c) => text.push_str(&c.value),
            other => {
                if let Some(nested) = other.children() {
                    text.push_str(&inline_text(nested));
                }
            }
        }
    }
    text
}

fn render_html(source: &str) -> Result<String, EngineError> {
    let options = Options {
        compile: CompileOptions {
            allow_dangerous_html: true,
            ..CompileOptions::default()
        },
        ..Options::default()
    };
    to_html_with_options(source, &options).map_err(backend_error)
}

/// Anchor headings, normalize in-document targets, apply the class prefix.
fn post_process(html: &str, prefix: &str, toc: Option<&TocConfig>) -> String {
    let html = HEADING.replace_all(html, |caps: &Captures| {
        let level = &caps[1];
        let inner = &caps[2];
        let slug = normalize(&visible_text(inner));
        let mut fragment = format!("<a name=\"{}\">{}</a>", slug, inner);
        if let Some(toc) = toc {
            fragment.push_str(&format!(
                " <a href=\"#{}\">{}</a>",
                normalize(&toc.header),
                toc.top
            ));
        }
        format!("<h{}>{}</h{}>", level, fragment, level)
    });

    let html = HASH_HREF.replace_all(&html, |caps: &Captures| {
        format!("href=\"#{}\"", normalize(&caps[1]))
    });

    html.replace(
        "<code class=\"language-",
        &format!("<code class=\"{}", prefix),
    )
}

/// Plain text of a rendered HTML fragment: tags stripped, entities decoded.
fn visible_text(inner_html: &str) -> String {
    let stripped = TAG.replace_all(inner_html, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}
