//! Pack a directory tree into one extractable Markdown document
//!
//! The inverse of extraction: walks a directory (hidden entries excluded),
//! emits a `# Files` listing whose links carry the original paths and
//! permission bits, then one section per file whose body is a fenced code
//! block of its literal contents. Triple backticks inside a file are
//! escaped to the shared placeholder marker so extraction restores them
//! exactly.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::marker;

/// Errors raised while packing.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("output file {path} already exists", path = .0.display())]
    OutputExists(PathBuf),

    #[error("cannot derive an output name from {path}", path = .0.display())]
    InvalidInput(PathBuf),

    #[error("error walking {path}: {source}", path = .0.display(), source = .1)]
    Walk(PathBuf, #[source] walkdir::Error),

    #[error("error reading {path}: {source}", path = .0.display(), source = .1)]
    Read(PathBuf, #[source] std::io::Error),

    #[error("error writing {path}: {source}", path = .0.display(), source = .1)]
    Write(PathBuf, #[source] std::io::Error),
}

/// Pack `dir` into a sibling `{basename}.md` document.
///
/// # Parameters
/// * `dir` - Root directory to pack
///
/// # Returns
/// * `Ok(PathBuf)` - Path of the written document
/// * `Err(PackError)` - Conflict, traversal, or I/O failure
pub fn pack(dir: &Path) -> Result<PathBuf, PackError> {
    let name = dir
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PackError::InvalidInput(dir.to_path_buf()))?
        .to_string();

    let output = dir.with_file_name(format!("{}.md", name));
    if output.exists() {
        return Err(PackError::OutputExists(output));
    }

    let files = collect_files(dir)?;

    let mut document = String::from("# Files\n\n");
    for (relative, absolute) in &files {
        let mode = file_mode(absolute)?;
        document.push_str(&format!(
            "* [{rel}](#{rel} \"save:{mode}\")\n",
            rel = relative,
            mode = mode
        ));
    }

    for (relative, absolute) in &files {
        let content =
            fs::read_to_string(absolute).map_err(|e| PackError::Read(absolute.clone(), e))?;
        let escaped = marker::escape_backticks(&content);
        let body = escaped.strip_suffix('\n').unwrap_or(&escaped);

        document.push_str(&format!("\n## {}\n\n```\n", relative));
        document.push_str(body);
        document.push_str("\n```\n");
        log::info!("  {}", absolute.display());
    }
    document.push('\n');

    fs::write(&output, document).map_err(|e| PackError::Write(output.clone(), e))?;
    Ok(output)
}

/// Collect `(relative, absolute)` file paths under `dir`, sorted by file
/// name, hidden entries excluded.
fn collect_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, PackError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| PackError::Walk(dir.to_path_buf(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        files.push((relative, entry.path().to_path_buf()));
    }

    Ok(files)
}

fn is_hidden(file_name: &std::ffi::OsStr) -> bool {
    file_name
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Permission bits of `path` as the `save:` mode string; empty for the
/// default 644.
#[cfg(unix)]
fn file_mode(path: &Path) -> Result<String, PackError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| PackError::Read(path.to_path_buf(), e))?;
    let bits = metadata.permissions().mode() & 0o777;
    if bits == 0o644 {
        Ok(String::new())
    } else {
        Ok(format!("{:03o}", bits))
    }
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<String, PackError> {
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        }
    }

    #[test]
    fn test_pack_lists_and_embeds_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "a.txt", "alpha\n");
        write(&root, "src/b.txt", "beta\n");

        let output = pack(&root).unwrap();
        let document = fs::read_to_string(&output).unwrap();

        assert!(document.starts_with("# Files\n\n"));
        assert!(document.contains("* [a.txt](#a.txt \"save:\")\n"));
        assert!(document.contains("* [src/b.txt](#src/b.txt \"save:\")\n"));
        assert!(document.contains("\n## a.txt\n\n```\nalpha\n```\n"));
        assert!(document.contains("\n## src/b.txt\n\n```\nbeta\n```\n"));
    }

    #[test]
    fn test_pack_skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "visible.txt", "v\n");
        write(&root, ".hidden", "h\n");
        write(&root, ".git/config", "g\n");

        let document = fs::read_to_string(pack(&root).unwrap()).unwrap();
        assert!(document.contains("visible.txt"));
        assert!(!document.contains("hidden"));
        assert!(!document.contains(".git"));
    }

    #[test]
    fn test_pack_escapes_backticks() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "doc.md", "fence:\n```\ninner\n```\n");

        let document = fs::read_to_string(pack(&root).unwrap()).unwrap();
        assert!(document.contains("_\"_backticks\"\ninner\n_\"_backticks\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_pack_records_nondefault_modes() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "run.sh", "echo hi\n");
        write(&root, "plain.txt", "p\n");
        fs::set_permissions(root.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(root.join("plain.txt"), fs::Permissions::from_mode(0o644)).unwrap();

        let document = fs::read_to_string(pack(&root).unwrap()).unwrap();
        assert!(document.contains("* [run.sh](#run.sh \"save:755\")\n"));
        assert!(document.contains("* [plain.txt](#plain.txt \"save:\")\n"));
    }

    #[test]
    fn test_existing_output_is_a_conflict() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "a.txt", "a\n");
        fs::write(tmp.path().join("proj.md"), "existing").unwrap();

        assert!(matches!(pack(&root), Err(PackError::OutputExists(_))));
    }
}
