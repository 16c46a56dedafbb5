//! Materialize an extraction run onto the filesystem
//!
//! The persisted layout is a directory named after the source file (minus
//! its extension) containing the original source, the rendered HTML, a
//! ToC-prefixed README, one file per registry entry at its declared
//! relative path and mode, and optionally a JSON dump of the full state.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::state::DocumentState;

/// Errors raised while writing the output layout.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("output directory {path} already exists", path = .0.display())]
    OutputExists(PathBuf),

    #[error("cannot derive an output name from {path}", path = .0.display())]
    InvalidInput(PathBuf),

    #[error("error writing {path}: {source}", path = .0.display(), source = .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("error serializing state dump: {0}")]
    Dump(#[from] serde_json::Error),
}

/// Write the persisted layout for `state`.
///
/// The output directory is a sibling of `source_path`, named after it
/// minus the extension. A pre-existing directory is a conflict and aborts
/// before any write.
///
/// # Parameters
/// * `state` - Fully resolved document state
/// * `source_path` - Path of the extracted Markdown file
/// * `dump_state` - Also write the state as `mdtangle.json`
///
/// # Returns
/// * `Ok(PathBuf)` - The created output directory
/// * `Err(ExtractError)` - Conflict or I/O failure
pub fn materialize(
    state: &DocumentState,
    source_path: &Path,
    dump_state: bool,
) -> Result<PathBuf, ExtractError> {
    let name = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ExtractError::InvalidInput(source_path.to_path_buf()))?
        .to_string();

    let out_dir = source_path.with_file_name(&name);
    if out_dir.exists() {
        return Err(ExtractError::OutputExists(out_dir));
    }
    fs::create_dir(&out_dir).map_err(|e| ExtractError::Io(out_dir.clone(), e))?;

    write_file(&out_dir, &format!("{}.md", name), &state.source, None)?;
    write_file(&out_dir, &format!("{}.html", name), &state.html, None)?;
    write_file(&out_dir, "README.md", &state.readme, None)?;

    for (path, entry) in state.files.iter_ordered() {
        write_file(&out_dir, path, &entry.content, entry.mode.as_deref())?;
    }

    if dump_state {
        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');
        write_file(&out_dir, "mdtangle.json", &json, None)?;
    }

    Ok(out_dir)
}

/// Write one file under the output directory, creating parent directories
/// and applying the declared permission mode.
fn write_file(
    out_dir: &Path,
    relative: &str,
    content: &str,
    mode: Option<&str>,
) -> Result<(), ExtractError> {
    let path = out_dir.join(relative);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ExtractError::Io(parent.to_path_buf(), e))?;
    }

    fs::write(&path, content).map_err(|e| ExtractError::Io(path.clone(), e))?;

    if let Some(mode) = mode {
        set_mode(&path, mode)?;
    }

    log::info!("  {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: &str) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;

    // the mode string was validated at link registration
    let bits = u32::from_str_radix(mode, 8)
        .map_err(|e| ExtractError::Io(path.to_path_buf(), std::io::Error::other(e)))?;
    fs::set_permissions(path, fs::Permissions::from_mode(bits))
        .map_err(|e| ExtractError::Io(path.to_path_buf(), e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: &str) -> Result<(), ExtractError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline;

    fn extract_to(dir: &Path, source: &str, file_name: &str) -> PathBuf {
        let source_path = dir.join(file_name);
        fs::write(&source_path, source).unwrap();

        let config = Config {
            engines: vec!["pulldown".to_string()],
            highlighters: vec!["none".to_string()],
            ..Config::default()
        };
        let state = pipeline::extract(source, &config).unwrap();
        materialize(&state, &source_path, false).unwrap()
    }

    #[test]
    fn test_layout_contains_source_html_and_readme() {
        let tmp = tempfile::tempdir().unwrap();
        let source = "# Title\n\n[f](#f \"save:\")\n\n## f\n\n```\nhello\n```\n";
        let out = extract_to(tmp.path(), source, "demo.md");

        assert_eq!(out, tmp.path().join("demo"));
        assert_eq!(fs::read_to_string(out.join("demo.md")).unwrap(), source);
        assert!(fs::read_to_string(out.join("demo.html"))
            .unwrap()
            .starts_with("<!DOCTYPE html>"));
        assert!(fs::read_to_string(out.join("README.md"))
            .unwrap()
            .starts_with("# Contents\n"));
        assert_eq!(fs::read_to_string(out.join("f")).unwrap(), "hello\n");
    }

    #[test]
    fn test_nested_file_paths_are_created() {
        let tmp = tempfile::tempdir().unwrap();
        let source = "# h\n\n[s](#src/deep/x.txt \"save:\")\n\n## src/deep/x.txt\n\n```\nbody\n```\n";
        let out = extract_to(tmp.path(), source, "demo.md");

        assert_eq!(
            fs::read_to_string(out.join("src/deep/x.txt")).unwrap(),
            "body\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_declared_mode_is_applied() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let source = "# h\n\n[r](#run.sh \"save:755\")\n\n## run.sh\n\n```\necho hi\n```\n";
        let out = extract_to(tmp.path(), source, "demo.md");

        let mode = fs::metadata(out.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_existing_output_directory_is_a_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let source_path = tmp.path().join("demo.md");
        fs::write(&source_path, "# h\n").unwrap();
        fs::create_dir(tmp.path().join("demo")).unwrap();

        let state = DocumentState::new("# h\n", "Contents");
        let err = materialize(&state, &source_path, false).unwrap_err();
        assert!(matches!(err, ExtractError::OutputExists(_)));
    }

    #[test]
    fn test_state_dump_is_written_on_request() {
        let tmp = tempfile::tempdir().unwrap();
        let source_path = tmp.path().join("demo.md");
        fs::write(&source_path, "# h\n").unwrap();

        let state = DocumentState::new("# h\n", "Contents");
        let out = materialize(&state, &source_path, true).unwrap();

        let dump = fs::read_to_string(out.join("mdtangle.json")).unwrap();
        assert!(dump.contains("\"source\""));
        assert!(dump.contains("\"blocks\""));
    }
}
