use crate::Result;
use std::path::{Path, PathBuf};
use url::Url;

/// File sink for fetched media bodies.
///
/// Writes are idempotent: a destination that already exists is left alone,
/// so re-running a crawl never rewrites or errors on previously saved files.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Creates the sink, ensuring the destination directory exists.
    pub fn new(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `body` to `<root>/<name>`.
    ///
    /// Returns the number of bytes written, or `None` without touching the
    /// filesystem when the destination already exists.
    pub fn save(&self, name: &str, body: &[u8]) -> Result<Option<u64>> {
        let path = self.root.join(name);
        if path.exists() {
            return Ok(None);
        }
        std::fs::write(&path, body)?;
        Ok(Some(body.len() as u64))
    }
}

/// Destination file name for a media URL: its last non-empty path segment.
pub fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "download".to_string())
}
