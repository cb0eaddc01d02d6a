//! Throwaway source trees for extraction tests.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tempfile::TempDir;

/// A temporary directory populated with source files.
///
/// The directory is removed when the project is dropped.
#[derive(Debug)]
pub struct FixtureProject {
    dir: TempDir,
    root: Utf8PathBuf,
}

impl FixtureProject {
    /// Create an empty project.
    ///
    /// # Errors
    ///
    /// Fails when the temporary directory cannot be created or its path is
    /// not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create fixture directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir {}", path.display()))?;
        Ok(Self { dir, root })
    }

    /// Write `contents` to `relative`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub fn write(&self, relative: impl AsRef<Utf8Path>, contents: &str) -> Result<&Self> {
        let relative = relative.as_ref();
        let dir = self.open()?;
        if let Some(parent) = relative.parent().filter(|p| !p.as_str().is_empty()) {
            dir.create_dir_all(parent)
                .with_context(|| format!("create {parent}"))?;
        }
        dir.write(relative, contents)
            .with_context(|| format!("write {relative}"))?;
        Ok(self)
    }

    /// Builder form of [`Self::write`].
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub fn with_file(self, relative: impl AsRef<Utf8Path>, contents: &str) -> Result<Self> {
        self.write(relative, contents)?;
        Ok(self)
    }

    /// Read `relative` as UTF-8.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing or unreadable.
    pub fn read(&self, relative: impl AsRef<Utf8Path>) -> Result<String> {
        let relative = relative.as_ref();
        self.open()?
            .read_to_string(relative)
            .with_context(|| format!("read {relative}"))
    }

    /// Return `true` when `relative` exists.
    pub fn exists(&self, relative: impl AsRef<Utf8Path>) -> bool {
        self.root.join(relative).exists()
    }

    /// Absolute path of the project root.
    pub fn path(&self) -> &Utf8Path {
        &self.root
    }

    /// The underlying temporary directory.
    pub const fn temp_dir(&self) -> &TempDir {
        &self.dir
    }

    fn open(&self) -> Result<Dir> {
        Dir::open_ambient_dir(&self.root, ambient_authority())
            .with_context(|| format!("open {}", self.root))
    }
}
