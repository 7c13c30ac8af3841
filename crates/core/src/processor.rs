use crate::error::ProcessError;
use crate::filter::FileFilter;
use crate::mode::RenameMode;
use crate::naming::{split_name, unique_path};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Receives one human-readable line per processed file, in processing order.
pub trait LogSink {
    fn log(&mut self, line: &str);
}

impl<F> LogSink for F
where
    F: FnMut(&str),
{
    fn log(&mut self, line: &str) {
        self(line)
    }
}

/// Snapshot of a source file taken when the processor is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub stem: String,
    pub suffix: String,
}

impl FileEntry {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let (stem, suffix) = split_name(&name);
        Self {
            stem: stem.to_string(),
            suffix: suffix.to_string(),
            name,
            path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub original_name: String,
    pub final_name: Option<String>,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.final_name.is_some()
    }

    pub fn renamed(&self) -> bool {
        self.final_name
            .as_deref()
            .is_some_and(|name| name != self.original_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub outcomes: Vec<FileOutcome>,
    pub success_count: usize,
}

impl ProcessingResult {
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.success_count
    }
}

#[derive(Debug, Clone)]
pub struct BatchProcessor {
    output_dir: PathBuf,
    files: Vec<FileEntry>,
}

impl BatchProcessor {
    /// Validates the source, creates the output directory and captures the
    /// name-sorted list of matching files.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        filter: &FileFilter,
    ) -> Result<Self, ProcessError> {
        let source_dir = source_dir.into();
        let output_dir = output_dir.into();

        if !source_dir.is_dir() {
            return Err(ProcessError::InvalidSource { path: source_dir });
        }

        ensure_output_dir(&output_dir)?;
        let files = collect_files(&source_dir, filter)?;
        log::info!(
            "found {} file(s) in {} (filter: {})",
            files.len(),
            source_dir.display(),
            if filter.is_empty() {
                "all".to_string()
            } else {
                filter.to_string()
            }
        );

        Ok(Self {
            output_dir,
            files,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    /// Renames and moves every captured file into the output directory.
    ///
    /// The mode is validated first; an invalid mode returns an error with no
    /// file touched. Per-file failures are reported to `sink` and recorded in
    /// the result, and the run carries on with the next file.
    pub fn process_files(
        &self,
        mode: &RenameMode,
        sink: &mut dyn LogSink,
    ) -> Result<ProcessingResult, ProcessError> {
        mode.validate()?;

        let total = self.files.len();
        let mut result = ProcessingResult::default();
        for (index, entry) in self.files.iter().enumerate() {
            let outcome = match self.process_entry(mode, entry, index) {
                Ok(final_name) => {
                    let line = if final_name != entry.name {
                        format!(
                            "[{}/{}] renamed: {} -> {}",
                            index + 1,
                            total,
                            entry.name,
                            final_name
                        )
                    } else {
                        format!("[{}/{}] archived unchanged: {}", index + 1, total, entry.name)
                    };
                    sink.log(&line);
                    result.success_count += 1;
                    FileOutcome {
                        original_name: entry.name.clone(),
                        final_name: Some(final_name),
                        error: None,
                    }
                }
                Err(err) => {
                    let message = format!("{:#}", err);
                    log::warn!("{}: {}", entry.path.display(), message);
                    sink.log(&format!(
                        "[{}/{}] failed: {} ({})",
                        index + 1,
                        total,
                        entry.name,
                        message
                    ));
                    FileOutcome {
                        original_name: entry.name.clone(),
                        final_name: None,
                        error: Some(message),
                    }
                }
            };
            result.outcomes.push(outcome);
        }

        log::info!(
            "processed {} of {} file(s) into {}",
            result.success_count,
            total,
            self.output_dir.display()
        );
        Ok(result)
    }

    fn process_entry(&self, mode: &RenameMode, entry: &FileEntry, index: usize) -> Result<String> {
        let new_name = mode
            .new_name(entry, index, self.files.len())
            .with_context(|| format!("cannot compute new name for {}", entry.name))?;
        if !is_plain_file_name(&new_name) {
            bail!("new name {:?} for {} is not a usable file name", new_name, entry.name);
        }
        let destination = unique_path(&self.output_dir.join(&new_name));
        log::debug!(
            "{} -> {} (resolved {})",
            entry.name,
            new_name,
            destination.display()
        );

        move_file(&entry.path, &destination)?;

        Ok(destination
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or(new_name))
    }
}

// The name must resolve to a direct child of the output directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn ensure_output_dir(output_dir: &Path) -> Result<(), ProcessError> {
    if output_dir.is_dir() {
        return Ok(());
    }
    if output_dir.exists() {
        return Err(ProcessError::DirectoryCreation {
            path: output_dir.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        });
    }
    fs::create_dir_all(output_dir).map_err(|source| ProcessError::DirectoryCreation {
        path: output_dir.to_path_buf(),
        source,
    })
}

fn collect_files(source_dir: &Path, filter: &FileFilter) -> Result<Vec<FileEntry>, ProcessError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            // dangling symlinks and unreadable children are not regular files
            Err(err) if err.depth() > 0 => {
                log::warn!("skipping unreadable entry: {}", err);
                continue;
            }
            Err(source) => {
                return Err(ProcessError::Enumeration {
                    path: source_dir.to_path_buf(),
                    source,
                })
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if filter.matches(entry.path()) {
            out.push(FileEntry::from_path(entry.into_path()));
        }
    }
    Ok(out)
}

/// Moves `from` to `to`, falling back to copy and delete when a plain rename
/// fails (for example across filesystems). On success the source is gone.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    if !from.is_file() {
        return Err(anyhow::Error::from(rename_err)
            .context(format!("move failed: {} -> {}", from.display(), to.display())));
    }
    copy_then_remove(from, to, rename_err)
}

/// Copies `from` to `to` and removes `from`. If the source cannot be removed
/// the copy is deleted again, so the file only ever exists in one place.
fn copy_then_remove(from: &Path, to: &Path, rename_err: io::Error) -> Result<()> {
    log::debug!(
        "rename failed ({}), copying instead: {} -> {}",
        rename_err,
        from.display(),
        to.display()
    );
    fs::copy(from, to).with_context(|| {
        format!(
            "move failed: {} -> {} (rename: {})",
            from.display(),
            to.display(),
            rename_err
        )
    })?;
    if let Err(err) = fs::remove_file(from) {
        if let Err(cleanup_err) = fs::remove_file(to) {
            log::warn!("cannot remove copy {}: {}", to.display(), cleanup_err);
        }
        return Err(anyhow::Error::from(err).context(format!(
            "cannot remove source after copy: {}",
            from.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::mode::{EditScope, ResequenceStrategy};
    use tempfile::tempdir;

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    fn write_files(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).expect("create dir");
        for name in names {
            fs::write(dir.join(name), name.as_bytes()).expect("write file");
        }
    }

    fn run(processor: &BatchProcessor, mode: &RenameMode) -> (ProcessingResult, Vec<String>) {
        let mut lines = Vec::new();
        let result = processor
            .process_files(mode, &mut |line: &str| lines.push(line.to_string()))
            .expect("process files");
        (result, lines)
    }

    #[test]
    fn new_rejects_missing_or_file_source() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        let err = BatchProcessor::new(&missing, temp.path().join("out"), &FileFilter::accept_all())
            .expect_err("missing source");
        assert!(matches!(err, ProcessError::InvalidSource { .. }));
        assert!(!temp.path().join("out").exists(), "output must not be created");

        let file = temp.path().join("plain.txt");
        fs::write(&file, b"x").expect("write file");
        let err = BatchProcessor::new(&file, temp.path().join("out"), &FileFilter::accept_all())
            .expect_err("file source");
        assert!(matches!(err, ProcessError::InvalidSource { .. }));
    }

    #[test]
    fn new_creates_nested_output_dir() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt"]);
        let output = temp.path().join("deep").join("er").join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        assert!(output.is_dir());
        assert_eq!(processor.total_files(), 1);
    }

    #[test]
    fn new_fails_when_output_is_a_file() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt"]);
        let output = temp.path().join("out");
        fs::write(&output, b"not a dir").expect("write blocker");

        let err = BatchProcessor::new(&source, &output, &FileFilter::accept_all())
            .expect_err("output collides with file");
        assert!(matches!(err, ProcessError::DirectoryCreation { .. }));
    }

    #[test]
    fn files_are_filtered_and_sorted_by_name() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["c.JPG", "a.png", "b.jpg", "notes.txt", "README"]);
        fs::create_dir(source.join("sub.jpg")).expect("create dir");

        let processor = BatchProcessor::new(
            &source,
            temp.path().join("out"),
            &FileFilter::parse("*.jpg, png"),
        )
        .expect("processor");
        let names: Vec<&str> = processor.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.jpg", "c.JPG"]);
        assert_eq!(processor.total_files(), 3);
    }

    #[test]
    fn char_edit_resolves_collisions_in_sorted_order() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt", "b.txt", "A.txt"]);
        if names_in(&source).len() < 3 {
            // case-insensitive filesystem
            return;
        }
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let order: Vec<&str> = processor.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["A.txt", "a.txt", "b.txt"]);

        let mode = RenameMode::CharEdit {
            target: "a".to_string(),
            replacement: "x".to_string(),
            scope: EditScope::Both,
        };
        let (result, lines) = run(&processor, &mode);

        assert_eq!(result.success_count, 3);
        let finals: Vec<Option<&str>> = result
            .outcomes
            .iter()
            .map(|o| o.final_name.as_deref())
            .collect();
        assert_eq!(finals, vec![Some("x.txt"), Some("x_1.txt"), Some("b.txt")]);
        assert_eq!(names_in(&output), vec!["b.txt", "x.txt", "x_1.txt"]);
        assert!(names_in(&source).is_empty());

        assert_eq!(fs::read(output.join("x.txt")).expect("read x"), b"A.txt");
        assert_eq!(fs::read(output.join("x_1.txt")).expect("read x_1"), b"a.txt");

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[1/3] renamed: A.txt -> x.txt");
        assert_eq!(lines[1], "[2/3] renamed: a.txt -> x_1.txt");
        assert_eq!(lines[2], "[3/3] archived unchanged: b.txt");
        assert!(!result.outcomes[2].renamed());
    }

    #[test]
    fn sequence_mode_numbers_in_snapshot_order() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        let names: Vec<String> = (0..12).map(|i| format!("f{:02}.dat", 11 - i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_files(&source, &refs);
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let mode = RenameMode::Resequence(ResequenceStrategy::BySequence { start_number: 1 });
        let (result, _) = run(&processor, &mode);

        assert_eq!(result.success_count, 12);
        assert_eq!(result.outcomes[0].final_name.as_deref(), Some("01_f00.dat"));
        assert_eq!(result.outcomes[11].final_name.as_deref(), Some("12_f11.dat"));
    }

    #[test]
    fn size_mode_collides_equal_sizes() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        fs::create_dir_all(&source).expect("create src");
        fs::write(source.join("one.log"), vec![b'a'; 10]).expect("write one");
        fs::write(source.join("two.log"), vec![b'b'; 10]).expect("write two");
        fs::write(source.join("big.log"), vec![b'c'; 2048]).expect("write big");
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let (result, _) = run(&processor, &RenameMode::Resequence(ResequenceStrategy::BySize));

        assert_eq!(result.success_count, 3);
        assert_eq!(names_in(&output), vec!["10B.log", "10B_1.log", "2.00KB.log"]);
    }

    #[test]
    fn existing_output_files_are_not_overwritten() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["report.txt"]);
        let output = temp.path().join("out");
        write_files(&output, &["report.txt"]);

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let mode = RenameMode::CharEdit {
            target: "zzz".to_string(),
            replacement: String::new(),
            scope: EditScope::Stem,
        };
        let (result, lines) = run(&processor, &mode);

        assert_eq!(result.outcomes[0].final_name.as_deref(), Some("report_1.txt"));
        assert_eq!(lines[0], "[1/1] renamed: report.txt -> report_1.txt");
        assert_eq!(names_in(&output), vec!["report.txt", "report_1.txt"]);
    }

    #[test]
    fn invalid_mode_touches_nothing() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt", "b.txt"]);
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let mode = RenameMode::CharEdit {
            target: String::new(),
            replacement: "x".to_string(),
            scope: EditScope::Both,
        };
        let mut lines = Vec::new();
        let err = processor
            .process_files(&mode, &mut |line: &str| lines.push(line.to_string()))
            .expect_err("empty target");

        assert!(matches!(err, ProcessError::Config(ConfigError::EmptyTarget)));
        assert!(lines.is_empty());
        assert_eq!(names_in(&source), vec!["a.txt", "b.txt"]);
        assert!(names_in(&output).is_empty());
    }

    #[test]
    fn edit_that_empties_the_name_fails_only_that_file() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["README", "b.txt"]);
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let mode = RenameMode::CharEdit {
            target: "readme".to_string(),
            replacement: String::new(),
            scope: EditScope::Stem,
        };
        let (result, lines) = run(&processor, &mode);

        assert_eq!(result.success_count, 1);
        assert!(result.outcomes[0].error.is_some());
        assert!(lines[0].starts_with("[1/2] failed: README"));
        assert_eq!(lines[1], "[2/2] archived unchanged: b.txt");
        assert!(source.join("README").exists());
        assert!(!temp.path().join("out_1").exists());
        assert_eq!(names_in(&output), vec!["b.txt"]);
    }

    #[test]
    fn replacement_with_path_parts_is_rejected_up_front() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt"]);
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        let mode = RenameMode::CharEdit {
            target: "a".to_string(),
            replacement: "../escaped".to_string(),
            scope: EditScope::Stem,
        };
        let err = processor
            .process_files(&mode, &mut |_: &str| {})
            .expect_err("unsafe replacement");

        assert!(matches!(
            err,
            ProcessError::Config(ConfigError::UnsafeReplacement(_))
        ));
        assert!(source.join("a.txt").exists());
        assert!(!temp.path().join("escaped.txt").exists());
        assert!(names_in(&output).is_empty());
    }

    #[test]
    fn empty_selection_returns_zero() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt"]);

        let processor = BatchProcessor::new(
            &source,
            temp.path().join("out"),
            &FileFilter::parse("*.jpg"),
        )
        .expect("processor");
        let mode = RenameMode::Resequence(ResequenceStrategy::BySize);
        let (result, lines) = run(&processor, &mode);

        assert_eq!(result.success_count, 0);
        assert!(result.outcomes.is_empty());
        assert!(lines.is_empty());
        assert!(source.join("a.txt").exists());
    }

    #[test]
    fn vanished_file_is_reported_and_run_continues() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["a.txt", "b.txt", "c.txt"]);
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        fs::remove_file(source.join("b.txt")).expect("remove b");

        let mode = RenameMode::Resequence(ResequenceStrategy::BySequence { start_number: 1 });
        let (result, lines) = run(&processor, &mode);

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failed_count(), 1);
        assert!(result.outcomes[1].error.is_some());
        assert!(!result.outcomes[1].succeeded());
        assert!(lines[1].starts_with("[2/3] failed: b.txt"));
        assert_eq!(names_in(&output), vec!["1_a.txt", "3_c.txt"]);
    }

    #[test]
    fn size_label_for_vanished_file_still_fails_the_move() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("src");
        write_files(&source, &["gone.bin"]);
        let output = temp.path().join("out");

        let processor =
            BatchProcessor::new(&source, &output, &FileFilter::accept_all()).expect("processor");
        fs::remove_file(source.join("gone.bin")).expect("remove file");

        let (result, _) = run(&processor, &RenameMode::Resequence(ResequenceStrategy::BySize));
        assert_eq!(result.success_count, 0);
        assert!(names_in(&output).is_empty());
    }

    #[test]
    fn move_file_removes_source() {
        let temp = tempdir().expect("tempdir");
        let from = temp.path().join("from.txt");
        let to = temp.path().join("to.txt");
        fs::write(&from, b"payload").expect("write source");

        move_file(&from, &to).expect("move");
        assert!(!from.exists());
        assert_eq!(fs::read(&to).expect("read target"), b"payload");
    }

    #[test]
    fn move_file_reports_missing_source() {
        let temp = tempdir().expect("tempdir");
        let err = move_file(&temp.path().join("nope"), &temp.path().join("dest"))
            .expect_err("missing source");
        assert!(err.to_string().contains("move failed"));
    }

    #[test]
    fn copy_then_remove_moves_content() {
        let temp = tempdir().expect("tempdir");
        let from = temp.path().join("from.txt");
        let to = temp.path().join("to.txt");
        fs::write(&from, b"payload").expect("write source");

        let rename_err = io::Error::new(io::ErrorKind::Other, "cross-device link");
        copy_then_remove(&from, &to, rename_err).expect("copy fallback");
        assert!(!from.exists());
        assert_eq!(fs::read(&to).expect("read target"), b"payload");
    }

    #[cfg(unix)]
    #[test]
    fn copy_then_remove_deletes_copy_when_source_is_stuck() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).expect("create locked dir");
        let from = locked.join("from.txt");
        fs::write(&from, b"payload").expect("write source");
        let to = temp.path().join("to.txt");

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).expect("lock dir");
        let writable = fs::write(locked.join("check"), b"x").is_ok();
        if writable {
            // running as root, permissions are not enforced
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("unlock dir");
            return;
        }

        let rename_err = io::Error::new(io::ErrorKind::Other, "cross-device link");
        let err = copy_then_remove(&from, &to, rename_err).expect_err("source cannot be removed");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("unlock dir");

        assert!(err.to_string().contains("cannot remove source after copy"));
        assert!(from.exists(), "source stays in place");
        assert!(!to.exists(), "copy is cleaned up");
    }
}
