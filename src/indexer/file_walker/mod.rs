//! Repository traversal for full indexing passes

use super::language::Language;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A source file the parser has a grammar for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated
    pub relative_path: String,
    pub language: Language,
}

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    excludes: GlobSet,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, max_file_size: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size,
            excludes: GlobSet::empty(),
        }
    }

    /// Skip files whose root-relative path matches any of these globs
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("Invalid exclude pattern '{}'", pattern))?;
            builder.add(glob);
        }
        self.excludes = builder.build().context("Failed to build exclude set")?;
        Ok(self)
    }

    /// Walk the directory and collect every parseable source file, sorted by
    /// relative path. Honors `.gitignore` even outside a git checkout.
    pub fn walk(&self) -> Result<Vec<SourceFile>> {
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {:?}", self.root);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {:?}", self.root);
        }

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true)
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .git_global(true)
            .require_git(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            let Some(language) = Language::from_path(path) else {
                continue;
            };

            let relative_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if self.excludes.is_match(&relative_path) {
                tracing::debug!("Skipping excluded file: {}", relative_path);
                continue;
            }

            if let Ok(metadata) = fs::metadata(path)
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {:?}", path);
                continue;
            }

            if !self.is_text_file(path)? {
                tracing::debug!("Skipping binary file: {:?}", path);
                continue;
            }

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative_path,
                language,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        tracing::info!("Found {} source files under {:?}", files.len(), self.root);
        Ok(files)
    }

    /// Heuristic on the first 8 KiB: NUL bytes or more than 30% control
    /// characters mean binary
    pub(crate) fn is_text_file(&self, path: &Path) -> Result<bool> {
        let mut head = Vec::with_capacity(8192);
        fs::File::open(path)
            .context("Failed to open file")?
            .take(8192)
            .read_to_end(&mut head)
            .context("Failed to read file")?;

        if head.is_empty() {
            return Ok(true);
        }
        if head.contains(&0) {
            return Ok(false);
        }

        let control = head
            .iter()
            .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
            .count();
        Ok((control as f64 / head.len() as f64) < 0.3)
    }
}
