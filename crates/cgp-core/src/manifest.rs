#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub sha256: String,
    pub file_name: String,
}

/// Parsed `checksums.txt`: ordered `(digest, filename)` pairs looked up by
/// exact filename. Older releases ship no manifest at all, so an empty
/// manifest means "nothing to verify", never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: Vec<ChecksumEntry>,
}

impl ChecksumManifest {
    /// Parse the standard `sha256sum` output shape: digest, whitespace,
    /// filename. Comments and malformed rows are skipped rather than
    /// rejected; a digest shorter than 32 hex chars is treated as noise.
    pub fn parse(raw: &str) -> Self {
        let mut entries = Vec::new();
        for line in raw.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(digest) = parts.next() else {
                continue;
            };
            let Some(file_name) = parts.last() else {
                continue;
            };
            if digest.len() < 32 || file_name.is_empty() {
                continue;
            }
            entries.push(ChecksumEntry {
                sha256: digest.to_ascii_lowercase(),
                file_name: file_name.to_string(),
            });
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    /// Expected digest for an asset, or `None` when there is nothing to
    /// verify. First match wins on duplicate filenames.
    pub fn digest_for(&self, file_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.file_name == file_name)
            .map(|entry| entry.sha256.as_str())
    }
}
