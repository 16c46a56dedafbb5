//! The extraction pipeline
//!
//! Orchestrates one run over a source document: engine parse pass,
//! template resolution over the file registry, engine ToC render pass,
//! HTML assembly with the fixed boilerplate, escape restoration, and the
//! highlighter post-process. Any failure aborts the run; with the
//! explicit lenient opt-in the error degrades to an HTML notice instead.
//!
//! The whole pipeline is single-threaded and synchronous: exactly one
//! writer owns the [`DocumentState`] at a time, and ownership moves
//! forward stage by stage.

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::engine::{EngineError, EngineOptions};
use crate::marker;
use crate::resolver::{self, ResolveError};
use crate::state::DocumentState;

/// Fixed boilerplate wrapped around the assembled body.
pub const HTML_HEADER: &str = "<!DOCTYPE html>\n<html>\n<head>\n<style>\n\
\tcode{\n\
\t\tbackground-color: #f0f0f0;\n\
\t\tpadding: 0px 2px;\n\
\t\tborder: 1px solid #c0c0c0;\n\
\t}\n\
\tpre code{\n\
\t\tdisplay: block;\n\
\t}\n\
\tpre{\n\
\t\ttab-size: 4;\n\
\t\twhite-space: pre-wrap;\n\
\t}\n\
\ta{\n\
\t\ttext-decoration: none;\n\
\t}\n\
</style>\n</head>\n<body>\n";

/// Closing boilerplate.
pub const HTML_FOOTER: &str = "\t</body>\n</html>\n";

/// Errors raised by the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Run the full extraction pipeline over `source`.
///
/// # Parameters
/// * `source` - The literate Markdown document
/// * `config` - The merged invocation configuration
///
/// # Returns
/// * `Ok(DocumentState)` - Fully resolved state: file registry final,
///   `html` and `readme` assembled
/// * `Err(PipelineError)` - Any stage failed (unless `config.lenient`)
pub fn extract(source: &str, config: &Config) -> Result<DocumentState, PipelineError> {
    match run(source, config) {
        Ok(state) => Ok(state),
        Err(error) if config.lenient => Ok(degraded(source, config, &error)),
        Err(error) => Err(error),
    }
}

fn run(source: &str, config: &Config) -> Result<DocumentState, PipelineError> {
    let engine = config.select_engine()?;
    let highlighter = config.select_highlighter()?;
    let opts = EngineOptions::new(config.toc.clone(), config.lang_prefix.clone());

    log::info!("parsing with the {} engine", engine.name());
    let state = DocumentState::new(source, &config.toc.header);
    let mut state = engine.parse(source, state, &opts)?;

    // prepend the finished ToC to the README payload
    state.toc.markdown.push('\n');
    state.readme = format!("{}{}", state.toc.markdown, state.readme);

    log::info!("resolving {} file entries", state.files.len());
    let state = resolver::resolve(state)?;

    let mut state = engine.render_toc(state, &opts)?;

    let mut html = String::with_capacity(
        HTML_HEADER.len() + state.toc.html.len() + state.body_html.len() + HTML_FOOTER.len(),
    );
    html.push_str(HTML_HEADER);
    html.push_str(&state.toc.html);
    html.push_str(&state.body_html);
    html.push_str(HTML_FOOTER);

    let html = marker::restore_escapes(&html);
    // blocks marked nohighlight must not carry the language prefix
    let html = html.replace(
        &format!("<code class=\"{}nohighlight\">", config.lang_prefix),
        "<code class=\"nohighlight\">",
    );

    state.html = highlighter.highlight(html);
    Ok(state)
}

/// Lenient mode: convert a fatal pipeline error into an error-notice
/// document with empty registries.
fn degraded(source: &str, config: &Config, error: &PipelineError) -> DocumentState {
    log::warn!("continuing after error: {}", error);
    let mut state = DocumentState::new(source, &config.toc.header);
    state.html = format!(
        "<p>ERROR:</p><pre>{}</pre>",
        html_escape::encode_safe(&error.to_string())
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            engines: vec!["pulldown".to_string()],
            highlighters: vec!["none".to_string()],
            ..Config::default()
        }
    }

    const SCENARIO: &str = "# Title\n\n[f](#f \"save:\")\n\n## f\n\n```\nhello\n```\n";

    #[test]
    fn test_scenario_extracts_file_and_toc() {
        let state = extract(SCENARIO, &config()).unwrap();

        let entry = state.files.get("f").unwrap();
        assert_eq!(entry.content, "hello\n");
        assert_eq!(entry.mode, None);

        let titles: Vec<&str> = state.toc.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(titles, ["Title", "f"]);
        assert!(state.toc.html.contains("<a href=\"#f\">f</a>"));
    }

    #[test]
    fn test_readme_is_toc_prefixed_source() {
        let state = extract(SCENARIO, &config()).unwrap();
        assert!(state.readme.starts_with("# Contents\n\n"));
        assert!(state.readme.contains("* [Title](#title)\n"));
        assert!(state.readme.ends_with(SCENARIO));
    }

    #[test]
    fn test_html_is_wrapped_in_boilerplate() {
        let state = extract(SCENARIO, &config()).unwrap();
        assert!(state.html.starts_with("<!DOCTYPE html>"));
        assert!(state.html.ends_with(HTML_FOOTER));
        assert!(state.html.contains("<a name=\"title\">Title</a>"));
    }

    #[test]
    fn test_highlighter_injection() {
        let mut cfg = config();
        cfg.highlighters = vec!["highlightjs-cdn".to_string()];
        let state = extract(SCENARIO, &cfg).unwrap();
        assert!(state.html.contains("highlight.min.js"));
    }

    #[test]
    fn test_tabs_restored_in_html_and_files() {
        let source = "# f\n\n[f](#f \"save:\")\n\n```\na\tb\n```\n";
        let state = extract(source, &config()).unwrap();

        assert_eq!(state.files.get("f").unwrap().content, "a\tb\n");
        assert!(state.html.contains("a\tb"));
        assert!(!state.html.contains("_tab"));
    }

    #[test]
    fn test_circular_reference_aborts() {
        let source = "# f\n\n[f](#f \"save:\")\n\n```\nx _\"f\" y\n```\n";
        assert!(extract(source, &config()).is_err());
    }

    #[test]
    fn test_lenient_mode_degrades_to_error_notice() {
        let source = "# f\n\n[f](#f \"save:\")\n\n```\n_\"f\"\n```\n";
        let mut cfg = config();
        cfg.lenient = true;

        let state = extract(source, &cfg).unwrap();
        assert!(state.html.starts_with("<p>ERROR:</p><pre>"));
        assert!(state.files.is_empty());
    }

    #[test]
    fn test_unresolved_label_is_not_an_error() {
        let source = "# f\n\n[f](#f \"save:\")\n\n```\ninsert _\"other\" here\n```\n";
        let state = extract(source, &config()).unwrap();
        assert_eq!(
            state.files.get("f").unwrap().content,
            "insert _\"other\" here\n"
        );
    }

    #[test]
    fn test_nohighlight_class_loses_prefix() {
        let source = "# f\n\n```nohighlight\nraw\n```\n";
        let state = extract(source, &config()).unwrap();
        assert!(state.html.contains("<code class=\"nohighlight\">"));
        assert!(!state.html.contains("lang-nohighlight"));
    }
}
