use crate::error::ConfigError;
use crate::naming::{case_insensitive_replace, digit_count, file_size_label};
use crate::processor::FileEntry;
use std::io;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditScope {
    Stem,
    Suffix,
    Both,
}

impl EditScope {
    fn covers_stem(self) -> bool {
        matches!(self, EditScope::Stem | EditScope::Both)
    }

    fn covers_suffix(self) -> bool {
        matches!(self, EditScope::Suffix | EditScope::Both)
    }
}

impl FromStr for EditScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stem" | "1" => Ok(EditScope::Stem),
            "suffix" | "2" => Ok(EditScope::Suffix),
            "both" | "3" => Ok(EditScope::Both),
            _ => Err(ConfigError::UnknownScope(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResequenceStrategy {
    /// Stem replaced by the formatted file size.
    BySize,
    /// Stem prefixed with a zero-padded running number.
    BySequence { start_number: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameMode {
    CharEdit {
        target: String,
        replacement: String,
        scope: EditScope,
    },
    Resequence(ResequenceStrategy),
}

impl RenameMode {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            RenameMode::CharEdit { target, .. } if target.is_empty() => {
                Err(ConfigError::EmptyTarget)
            }
            RenameMode::CharEdit { replacement, .. } if !is_safe_replacement(replacement) => {
                Err(ConfigError::UnsafeReplacement(replacement.clone()))
            }
            RenameMode::Resequence(ResequenceStrategy::BySequence { start_number: 0 }) => {
                Err(ConfigError::StartNumberNotPositive(0))
            }
            _ => Ok(()),
        }
    }

    /// Computes the new file name for the entry at `index` of a run over
    /// `total` files. Only the size strategy touches the filesystem.
    pub(crate) fn new_name(
        &self,
        entry: &FileEntry,
        index: usize,
        total: usize,
    ) -> io::Result<String> {
        match self {
            RenameMode::CharEdit {
                target,
                replacement,
                scope,
            } => {
                let stem = if scope.covers_stem() {
                    case_insensitive_replace(&entry.stem, target, replacement)
                } else {
                    entry.stem.clone()
                };
                let suffix = if scope.covers_suffix() {
                    case_insensitive_replace(&entry.suffix, target, replacement)
                } else {
                    entry.suffix.clone()
                };
                Ok(format!("{}{}", stem, suffix))
            }
            RenameMode::Resequence(ResequenceStrategy::BySize) => {
                let size = file_size_label(&entry.path)?;
                Ok(format!("{}{}", size, entry.suffix))
            }
            RenameMode::Resequence(ResequenceStrategy::BySequence { start_number }) => Ok(
                sequence_name(*start_number, index, total, &entry.stem, &entry.suffix),
            ),
        }
    }
}

// An empty replacement deletes the match; anything that could name another
// directory is refused.
fn is_safe_replacement(replacement: &str) -> bool {
    replacement != "." && replacement != ".." && !replacement.contains(['/', '\\', '\0'])
}

fn sequence_name(
    start_number: u64,
    index: usize,
    total: usize,
    stem: &str,
    suffix: &str,
) -> String {
    let current = start_number.saturating_add(index as u64);
    let last = start_number.saturating_add(total as u64).saturating_sub(1);
    let width = digit_count(last);
    format!("{:0width$}_{}{}", current, stem, suffix, width = width)
}

/// Free-text mode settings as a front end collects them.
///
/// Built once per run and turned into a validated [`RenameMode`] with
/// [`ModeOptions::to_mode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeOptions {
    /// `edit` (alias `a`), `size`, `sequence`, or `resequence` (alias `b`)
    /// combined with `strategy`.
    pub mode: String,
    pub strategy: String,
    pub target: String,
    pub replacement: String,
    pub scope: String,
    pub start_number: String,
}

impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            mode: "edit".to_string(),
            strategy: "sequence".to_string(),
            target: String::new(),
            replacement: String::new(),
            scope: "stem".to_string(),
            start_number: "1".to_string(),
        }
    }
}

impl ModeOptions {
    pub fn to_mode(&self) -> Result<RenameMode, ConfigError> {
        let mode = match self.mode.trim().to_ascii_lowercase().as_str() {
            "edit" | "a" => RenameMode::CharEdit {
                target: self.target.clone(),
                replacement: self.replacement.clone(),
                scope: self.scope.parse()?,
            },
            "size" => RenameMode::Resequence(ResequenceStrategy::BySize),
            "sequence" => RenameMode::Resequence(self.sequence_strategy()?),
            "resequence" | "b" => match self.strategy.trim().to_ascii_lowercase().as_str() {
                "size" => RenameMode::Resequence(ResequenceStrategy::BySize),
                "sequence" => RenameMode::Resequence(self.sequence_strategy()?),
                _ => return Err(ConfigError::UnknownStrategy(self.strategy.clone())),
            },
            _ => return Err(ConfigError::UnknownMode(self.mode.clone())),
        };
        mode.validate()?;
        Ok(mode)
    }

    fn sequence_strategy(&self) -> Result<ResequenceStrategy, ConfigError> {
        Ok(ResequenceStrategy::BySequence {
            start_number: parse_start_number(&self.start_number)?,
        })
    }
}

pub fn parse_start_number(input: &str) -> Result<u64, ConfigError> {
    let value = input
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::StartNumberNotInteger(input.to_string()))?;
    if value <= 0 {
        return Err(ConfigError::StartNumberNotPositive(value));
    }
    Ok(value as u64)
}
