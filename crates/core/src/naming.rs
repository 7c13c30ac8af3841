use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Splits a file name into `(stem, suffix)`.
///
/// The suffix starts at the last `.` unless that dot is the first or the last
/// character of the name, so `.bashrc` and `notes.` have no suffix.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => name.split_at(pos),
        _ => (name, ""),
    }
}

/// Lower-cased, dot-prefixed extension of a path, if it has one.
pub fn normalized_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let (_, suffix) = split_name(&name);
    if suffix.is_empty() {
        None
    } else {
        Some(suffix.to_lowercase())
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{}B", bytes)
    } else if bytes < MIB {
        format!("{:.2}KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.2}MB", bytes as f64 / MIB as f64)
    }
}

/// Size label for a file, `"N/A"` when it has disappeared.
///
/// Other stat failures (permissions, broken media) are returned to the caller.
pub fn file_size_label(path: &Path) -> io::Result<String> {
    match fs::metadata(path) {
        Ok(meta) => Ok(format_size(meta.len())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok("N/A".to_string()),
        Err(err) => Err(err),
    }
}

pub fn format_file_size(path: &Path) -> String {
    file_size_label(path).unwrap_or_else(|_| "N/A".to_string())
}

/// Replaces the first case-insensitive occurrence of `target` in `original`.
///
/// Text outside the match keeps its casing. Returns `original` unchanged when
/// there is no match or `target` is empty.
pub fn case_insensitive_replace(original: &str, target: &str, replacement: &str) -> String {
    let needle: Vec<char> = target.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return original.to_string();
    }

    for (start, _) in original.char_indices() {
        if let Some(len) = lowercase_prefix_len(&original[start..], &needle) {
            let mut out = String::with_capacity(original.len() + replacement.len());
            out.push_str(&original[..start]);
            out.push_str(replacement);
            out.push_str(&original[start + len..]);
            return out;
        }
    }

    original.to_string()
}

// Byte length of the prefix of `haystack` whose lowercase form equals `needle`.
fn lowercase_prefix_len(haystack: &str, needle: &[char]) -> Option<usize> {
    let mut matched = 0usize;
    for (offset, ch) in haystack.char_indices() {
        if matched == needle.len() {
            return Some(offset);
        }
        for lower in ch.to_lowercase() {
            if needle.get(matched) != Some(&lower) {
                return None;
            }
            matched += 1;
        }
    }
    (matched == needle.len()).then_some(haystack.len())
}

/// Returns `candidate` if nothing occupies it, otherwise the first free
/// `{stem}_{n}{suffix}` sibling counting up from 1.
pub fn unique_path(candidate: &Path) -> PathBuf {
    if !is_occupied(candidate) {
        return candidate.to_path_buf();
    }

    let parent = candidate.parent().unwrap_or_else(|| Path::new("."));
    let name = candidate
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let (stem, suffix) = split_name(&name);

    let mut n = 1usize;
    loop {
        let next = parent.join(format!("{}_{}{}", stem, n, suffix));
        if !is_occupied(&next) {
            return next;
        }
        n += 1;
    }
}

// Dangling symlinks count as occupied so a move never clobbers them.
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Extensions present among the regular files directly inside `dir`.
///
/// A path that is not a directory has no extensions.
pub fn list_available_extensions(dir: &Path) -> Result<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(out);
    }

    for entry in
        fs::read_dir(dir).with_context(|| format!("cannot read directory: {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("cannot read entry in: {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = normalized_extension(&path) {
            out.insert(ext);
        }
    }

    Ok(out)
}

pub fn digit_count(mut value: u64) -> usize {
    let mut digits = 1usize;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}
