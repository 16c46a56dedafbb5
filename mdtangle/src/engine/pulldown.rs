//! Event-stream adapter over pulldown-cmark
//!
//! pulldown-cmark exposes the document as an iterator of events. The
//! adapter intercepts heading, link, and fenced-code spans, drives the
//! shared hooks with their captured text, and re-emits each span as a
//! pre-rendered HTML event before handing the stream to `push_html`.

use pulldown_cmark::{html, CodeBlockKind, Event, Parser, Tag, TagEnd};

use super::{code_html, heading_html, link_html, Engine, EngineError, EngineOptions};
use crate::marker;
use crate::state::DocumentState;

pub struct PulldownEngine;

impl Engine for PulldownEngine {
    fn name(&self) -> &'static str {
        "pulldown"
    }

    fn parse(
        &self,
        source: &str,
        state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError> {
        let source = marker::escape_tabs(source);
        let (html, mut state) = transform(&source, state, opts, Pass::Document)?;
        state.body_html = html;
        Ok(state)
    }

    fn render_toc(
        &self,
        state: DocumentState,
        opts: &EngineOptions,
    ) -> Result<DocumentState, EngineError> {
        let source = state.toc.markdown.clone();
        let (html, mut state) = transform(&source, state, opts, Pass::Toc)?;
        state.toc.html = html;
        Ok(state)
    }
}

/// Which of the two invocation modes is running.
#[derive(Clone, Copy, PartialEq)]
enum Pass {
    /// Full document: hooks fire and registries are built
    Document,
    /// ToC fragment: anchor wrapping only
    Toc,
}

/// A span currently being captured out of the event stream.
enum Capture {
    Heading { level: u32, text: String },
    Code { lang: Option<String>, text: String },
    Link {
        href: String,
        title: Option<String>,
        text: String,
    },
}

impl Capture {
    fn push_text(&mut self, piece: &str) {
        match self {
            Capture::Heading { text, .. }
            | Capture::Code { text, .. }
            | Capture::Link { text, .. } => text.push_str(piece),
        }
    }
}

/// Run one pass over `source`, returning the rendered HTML and the
/// (possibly updated) state.
fn transform(
    source: &str,
    mut state: DocumentState,
    opts: &EngineOptions,
    pass: Pass,
) -> Result<(String, DocumentState), EngineError> {
    let mut out: Vec<Event> = Vec::new();
    let mut capture: Option<Capture> = None;

    for event in Parser::new(source) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                capture = Some(Capture::Heading {
                    level: level as u32,
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(Capture::Heading { level, text }) = capture.take() {
                    if pass == Pass::Document {
                        state = (opts.hooks.header)(level, &text, &opts.toc, state);
                    }
                    let toc = match pass {
                        Pass::Document => Some(&opts.toc),
                        Pass::Toc => None,
                    };
                    out.push(Event::Html(heading_html(level, &text, toc).into()));
                }
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.to_string()),
                    _ => None,
                };
                capture = Some(Capture::Code {
                    lang,
                    text: String::new(),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(Capture::Code { lang, text }) = capture.take() {
                    let code = text.trim_end_matches('\n');
                    if pass == Pass::Document {
                        state = (opts.hooks.code)(code, state);
                    }
                    out.push(Event::Html(
                        code_html(code, lang.as_deref(), &opts.lang_prefix).into(),
                    ));
                }
            }

            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                // a link nested inside a captured heading contributes only
                // its text to the heading label
                if capture.is_none() {
                    capture = Some(Capture::Link {
                        href: dest_url.to_string(),
                        title: if title.is_empty() {
                            None
                        } else {
                            Some(title.to_string())
                        },
                        text: String::new(),
                    });
                }
            }
            Event::End(TagEnd::Link) => match capture.take() {
                Some(Capture::Link { href, title, text }) => {
                    if pass == Pass::Document {
                        state = (opts.hooks.link)(&text, &href, title.as_deref(), state)?;
                    }
                    out.push(Event::Html(
                        link_html(&text, &href, title.as_deref()).into(),
                    ));
                }
                other => capture = other,
            },

            Event::Text(text) => match capture.as_mut() {
                Some(span) => span.push_text(&text),
                None => out.push(Event::Text(text)),
            },
            Event::Code(code) => match capture.as_mut() {
                Some(span) => span.push_text(&code),
                None => out.push(Event::Code(code)),
            },
            Event::SoftBreak | Event::HardBreak if capture.is_some() => {
                if let Some(span) = capture.as_mut() {
                    span.push_text(" ");
                }
            }

            other => {
                // markup events inside a captured span are dropped; their
                // text already reached the capture above
                if capture.is_none() {
                    out.push(other);
                }
            }
        }
    }

    let mut rendered = String::new();
    html::push_html(&mut rendered, out.into_iter());
    Ok((rendered, state))
}
