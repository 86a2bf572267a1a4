use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const INDEX_HTML: &str = "index.html";

/// Check the frontend build before serving it.
///
/// Returns the path of the entry point; fails when the directory or
/// `index.html` is missing so the server never starts half-configured.
pub fn check_dist(dist_dir: &Path) -> Result<PathBuf> {
    if !dist_dir.is_dir() {
        bail!(
            "dist folder not found at '{}', build the frontend first",
            dist_dir.display()
        );
    }

    let files = fs::read_dir(dist_dir)
        .context(format!("Failed to read dist folder '{}'", dist_dir.display()))?
        .count();

    let index_html = dist_dir.join(INDEX_HTML);
    if !index_html.is_file() {
        bail!("{} not found in '{}'", INDEX_HTML, dist_dir.display());
    }

    info!(dist_dir = %dist_dir.display(), files, "dist folder is ready");

    Ok(index_html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dist_dir() {
        let dir = TempDir::new().unwrap();
        let err = check_dist(&dir.path().join("dist")).unwrap_err();
        assert!(err.to_string().contains("dist folder not found"));
    }

    #[test]
    fn test_missing_index_html() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

        let err = check_dist(dir.path()).unwrap_err();
        assert!(err.to_string().contains("index.html not found"));
    }

    #[test]
    fn test_ready_dist_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INDEX_HTML), "<html></html>").unwrap();

        assert_eq!(check_dist(dir.path()).unwrap(), dir.path().join(INDEX_HTML));
    }
}
