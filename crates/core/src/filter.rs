use crate::naming::normalized_extension;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Set of accepted extensions; empty accepts every regular file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    extensions: BTreeSet<String>,
}

impl FileFilter {
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Parses free text such as `"*.jpg, PNG, .gif"`.
    ///
    /// Each comma separated entry is trimmed, lower-cased, stripped of a
    /// leading `*` and given a leading `.`; entries that end up as a bare `.`
    /// are dropped.
    pub fn parse(input: &str) -> Self {
        let extensions = input
            .split(',')
            .filter_map(normalize_entry)
            .collect::<BTreeSet<_>>();
        Self { extensions }
    }

    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_entry(ext.as_ref()))
            .collect();
        Self { extensions }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        normalized_extension(path)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }
}

impl fmt::Display for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .extensions
            .iter()
            .map(|ext| format!("*{}", ext))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&rendered)
    }
}

fn normalize_entry(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let stripped = lowered.strip_prefix('*').unwrap_or(&lowered);
    let ext = if stripped.starts_with('.') {
        stripped.to_string()
    } else {
        format!(".{}", stripped)
    };
    (ext.len() > 1).then_some(ext)
}
