//! Syntax-highlighter post-processors
//!
//! A highlighter is a pure text-to-text transform applied once to the
//! fully assembled HTML document.

/// The highlighter contract.
pub trait Highlighter {
    /// Highlighter name as used in configuration and diagnostics.
    fn name(&self) -> &'static str;

    /// Transform the assembled document.
    fn highlight(&self, html: String) -> String;
}

/// Highlighter names this build knows about, in default preference order.
pub const SUPPORTED: &[&str] = &["highlightjs-cdn", "none"];

/// Instantiate a highlighter by name.
pub fn by_name(name: &str) -> Option<Box<dyn Highlighter>> {
    match name {
        "highlightjs-cdn" => Some(Box::new(HighlightJsCdn)),
        "none" => Some(Box::new(NoHighlight)),
        _ => None,
    }
}

/// Injects the highlight.js CDN stylesheet, script, and init call before
/// the closing head tag.
pub struct HighlightJsCdn;

const CDN_BASE: &str = "https://cdnjs.cloudflare.com/ajax/libs/highlight.js/8.4/";

impl Highlighter for HighlightJsCdn {
    fn name(&self) -> &'static str {
        "highlightjs-cdn"
    }

    fn highlight(&self, html: String) -> String {
        let snippet = format!(
            "<link rel=\"stylesheet\" href=\"{base}styles/default.min.css\">\n\
             <script src=\"{base}highlight.min.js\"></script>\n\
             <script>hljs.initHighlightingOnLoad();</script>\n\
             </head>",
            base = CDN_BASE
        );
        html.replacen("</head>", &snippet, 1)
    }
}

/// Identity transform.
pub struct NoHighlight;

impl Highlighter for NoHighlight {
    fn name(&self) -> &'static str {
        "none"
    }

    fn highlight(&self, html: String) -> String {
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdn_snippet_lands_before_head_close() {
        let html = "<html>\n<head>\n</head>\n<body></body>\n</html>\n".to_string();
        let out = HighlightJsCdn.highlight(html);

        let link = out.find("<link rel=\"stylesheet\"").unwrap();
        let script = out.find("hljs.initHighlightingOnLoad").unwrap();
        let head_end = out.find("</head>").unwrap();
        assert!(link < head_end);
        assert!(script < head_end);
        assert!(out.contains("highlight.min.js"));
        // body untouched
        assert!(out.contains("<body></body>"));
    }

    #[test]
    fn test_none_is_identity() {
        let html = "<p>x</p>".to_string();
        assert_eq!(NoHighlight.highlight(html.clone()), html);
    }

    #[test]
    fn test_by_name() {
        assert!(by_name("highlightjs-cdn").is_some());
        assert!(by_name("none").is_some());
        assert!(by_name("pygments").is_none());
    }
}
