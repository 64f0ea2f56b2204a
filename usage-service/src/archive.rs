use std::fs;
use std::path::PathBuf;

/// Archives raw uploaded CSV text under a content-hash name.
///
/// The blake3 hash doubles as the upload id, so re-uploading the same
/// payload is idempotent.
pub struct CsvArchive {
    dir: PathBuf,
}

impl CsvArchive {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `content` to the archive directory and returns the
    /// upload id it was stored under.
    pub fn store(&self, content: &str) -> anyhow::Result<String> {
        fs::create_dir_all(&self.dir)?;

        let digest = blake3::hash(content.as_bytes());
        let id = digest.to_hex()[..16].to_string();
        fs::write(self.dir.join(format!("{id}.csv")), content)?;
        Ok(id)
    }
}
