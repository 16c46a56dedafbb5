//! Tree-walking adapter over comrak's arena AST
//!
//! comrak parses into an arena-allocated CommonMark AST. The adapter walks
//! the tree, drives the shared hooks from heading/link/code nodes, rewrites
//! the nodes in place (anchor fragments for headings, normalized targets
//! for links, trimmed literals for code), and then lets comrak render the
//! mutated tree. The language-class prefix is applied with a post-pass over
//! the rendered HTML.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{format_html, parse_document, Arena, ComrakOptions};

use super::{heading_anchor, Engine, EngineError, EngineOptions};
use crate::marker;
use crate::slug::normalize;
use crate::state::DocumentState;

pub struct ComrakEngine;

impl Engine for ComrakEngine {
    fn name(&self) -> &'static str {
        "comrak"
    }

    fn parse(
        &self,
        source: &str,
        state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError> {
        let source = marker::escape_tabs(source);
        let (html, mut state) = transform(&source, state, opts, true)?;
        state.body_html = html;
        Ok(state)
    }

    fn render_toc(
        &self,
        state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError> {
        let source = state.toc.markdown.clone();
        let (html, mut state) = transform(&source, state, opts, false)?;
        state.toc.html = html;
        Ok(state)
    }
}

fn render_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    // the adapter injects its own anchor fragments as raw inline HTML
    options.render.unsafe_ = true;
    options
}

/// Run one pass over `source`. With `collect` set the hooks fire and the
/// registries are built; without it only anchor wrapping applies.
fn transform(
    source: &str,
    mut state: DocumentState,
    opts: &EngineOptions,
    collect: bool,
) -> Result<(String, DocumentState), EngineError> {
    let arena = Arena::new();
    let options = render_options();
    let root = parse_document(&arena, source, &options);

    // snapshot the traversal before mutating the tree
    let nodes: Vec<&AstNode> = root.descendants().collect();

    for node in nodes {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Heading(heading) => {
                let text = collect_text(node);
                if text.is_empty() {
                    continue;
                }
                if collect {
                    state = (opts.hooks.header)(u32::from(heading.level), &text, &opts.toc, state);
                }
                let toc = if collect { Some(&opts.toc) } else { None };
                replace_children_with_html(node, heading_anchor(&text, toc));
            }

            NodeValue::Link(link) => {
                if collect {
                    let text = collect_text(node);
                    let title = if link.title.is_empty() {
                        None
                    } else {
                        Some(link.title.as_str())
                    };
                    state = (opts.hooks.link)(&text, &link.url, title, state)?;
                }
                if let Some(rest) = link.url.strip_prefix('#') {
                    let normalized = format!("#{}", normalize(rest));
                    if let NodeValue::Link(target) = &mut node.data.borrow_mut().value {
                        target.url = normalized;
                    }
                }
            }

            NodeValue::CodeBlock(block) => {
                let code = block.literal.trim_end_matches('\n').to_string();
                if collect {
                    state = (opts.hooks.code)(&code, state);
                }
                if let NodeValue::CodeBlock(target) = &mut node.data.borrow_mut().value {
                    target.literal = format!("{}\n", code);
                }
            }

            _ => {}
        }
    }

    let mut rendered = Vec::new();
    format_html(root, &options, &mut rendered).map_err(|e| EngineError::Backend {
        engine: "comrak",
        message: e.to_string(),
    })?;
    let html = String::from_utf8_lossy(&rendered).into_owned();

    // comrak emits `language-*` classes; rewrite to the configured prefix
    let html = html.replace(
        "<code class=\"language-",
        &format!("<code class=\"{}", opts.lang_prefix),
    );

    Ok((html, state))
}

/// Concatenate the literal text under `node`.
fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(literal) => text.push_str(literal),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Replace a node's children with a single raw inline-HTML node.
///
/// The first child is reused as the carrier so no new arena allocation is
/// needed; the rest are detached.
fn replace_children_with_html<'a>(node: &'a AstNode<'a>, html: String) {
    let children: Vec<&AstNode> = node.children().collect();
    let mut children = children.into_iter();
    let Some(first) = children.next() else {
        return;
    };
    for extra in children {
        extra.detach();
    }
    let grandchildren: Vec<&AstNode> = first.children().collect();
    for grandchild in grandchildren {
        grandchild.detach();
    }
    first.data.borrow_mut().value = NodeValue::HtmlInline(html);
}
