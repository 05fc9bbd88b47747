use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, bail};

/// Map a file chunk name to its path under `out_dir`.
/// Absolute names and names that climb out with `..` are refused.
pub fn output_path(out_dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
    let relative = Path::new(name);
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("refusing to write chunk `{}` outside the output directory", name),
        }
    }
    Ok(out_dir.join(relative))
}

/// File contents on disk: the resolved body plus a final newline.
pub fn file_contents(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!("{}\n", body)
    }
}

/// Write every selected file under `out_dir`, creating directories as needed.
/// Returns the written paths in name order.
///
/// Every name is checked before anything touches the disk, so a refused name
/// leaves no partial output behind.
pub fn write_files(out_dir: &Path, files: &BTreeMap<String, String>) -> anyhow::Result<Vec<PathBuf>> {
    let planned = files
        .iter()
        .map(|(name, body)| Ok((output_path(out_dir, name)?, body)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if !out_dir.is_dir() {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("cannot create output directory '{}'", out_dir.display()))?;
    }

    let mut written = Vec::with_capacity(planned.len());
    for (path, body) in planned {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create directory '{}'", parent.display()))?;
        }
        std::fs::write(&path, file_contents(body))
            .with_context(|| format!("cannot write '{}'", path.display()))?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_names_stay_under_out_dir() {
        let path = output_path(Path::new("out"), "src/main.rs").unwrap();
        assert_eq!(path, Path::new("out").join("src").join("main.rs"));
    }

    #[test]
    fn escaping_names_are_refused() {
        assert!(output_path(Path::new("out"), "../evil.sh").is_err());
        assert!(output_path(Path::new("out"), "/etc/passwd.d").is_err());
    }

    #[test]
    fn contents_end_with_newline() {
        assert_eq!(file_contents("a\nb"), "a\nb\n");
        assert_eq!(file_contents(""), "");
    }

    #[test]
    fn writes_files_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut files = BTreeMap::new();
        files.insert("hello.py".to_string(), "print('hi')".to_string());
        files.insert("pkg/mod.py".to_string(), "x = 1".to_string());

        let written = write_files(&out, &files).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read_to_string(out.join("hello.py")).unwrap(), "print('hi')\n");
        assert_eq!(std::fs::read_to_string(out.join("pkg/mod.py")).unwrap(), "x = 1\n");
    }

    #[test]
    fn refused_name_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut files = BTreeMap::new();
        files.insert("a.py".to_string(), "ok = True".to_string());
        files.insert("b/../../c.py".to_string(), "escaped = True".to_string());

        let err = write_files(&out, &files).unwrap_err();
        assert!(err.to_string().contains("b/../../c.py"));
        assert!(!out.exists());
        assert!(!dir.path().join("c.py").exists());
    }
}
