//! Filesystem access mediated by capability checks, per spec.md §4.4/§6.
//!
//! Paths inside the sandbox are always forward-slash, relative to whatever
//! root the backend defines; [`InMemoryFs`] is the default for sandboxed
//! runs (no host filesystem touched at all), while [`LocalFs`] lets an
//! embedder opt a session into real disk access alongside
//! [`crate::capability::Capability::Filesystem`].

use std::{
    collections::BTreeMap,
    io::{Read as _, Write as _},
    path::{Path, PathBuf},
};

use crate::exception::{ExcType, Exception};

/// Mediates output from the `print()` builtin, per spec.md §6.
///
/// Called once per formatted argument (`write`) and once per separator or
/// trailing terminator (`push`), so an implementation that joins buffered
/// output never has to guess where CPython would have placed a space.
pub trait PrintWriter {
    fn write(&mut self, text: &str) -> Result<(), Exception>;
    fn push(&mut self, end: char) -> Result<(), Exception>;
}

/// Writes `print()` output straight to the process's stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write(&mut self, text: &str) -> Result<(), Exception> {
        print!("{text}");
        Ok(())
    }

    fn push(&mut self, end: char) -> Result<(), Exception> {
        print!("{end}");
        Ok(())
    }
}

/// Captures `print()` output into an in-memory buffer instead of stdout —
/// the writer the Core API's `run` uses to build its joined output string.
#[derive(Debug, Default, Clone)]
pub struct CapturingPrint {
    pub buffer: String,
}

impl PrintWriter for CapturingPrint {
    fn write(&mut self, text: &str) -> Result<(), Exception> {
        self.buffer.push_str(text);
        Ok(())
    }

    fn push(&mut self, end: char) -> Result<(), Exception> {
        self.buffer.push(end);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Truncate,
    Append,
}

/// Host-side filesystem operations a sandboxed program can perform once
/// granted [`crate::capability::Capability::Filesystem`].
///
/// Implementors own path-normalisation; all paths received here are already
/// forward-slash as produced by the evaluator's `open`/`os.listdir` builtins.
pub trait FilesystemBackend {
    fn read(&self, path: &str) -> Result<Vec<u8>, Exception>;
    fn write(&mut self, path: &str, data: &[u8], mode: WriteMode) -> Result<(), Exception>;
    fn exists(&self, path: &str) -> bool;
    fn list_dir(&self, path: &str) -> Result<Vec<String>, Exception>;
    fn delete(&mut self, path: &str) -> Result<(), Exception>;
}

fn not_found(path: &str) -> Exception {
    Exception::new(ExcType::FileNotFoundError, format!("[Errno 2] No such file or directory: '{path}'"))
}

/// A purely in-memory filesystem, the default sandbox backend: nothing a
/// guest program writes ever reaches the host disk.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl InMemoryFs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seeded(files: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self { files: files.into_iter().collect() }
    }
}

impl FilesystemBackend for InMemoryFs {
    fn read(&self, path: &str) -> Result<Vec<u8>, Exception> {
        self.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn write(&mut self, path: &str, data: &[u8], mode: WriteMode) -> Result<(), Exception> {
        match mode {
            WriteMode::Truncate => {
                self.files.insert(path.to_owned(), data.to_vec());
            }
            WriteMode::Append => {
                self.files.entry(path.to_owned()).or_default().extend_from_slice(data);
            }
        }
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.files.keys().any(|k| k.starts_with(&format!("{path}/")))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, Exception> {
        let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
        let mut names: Vec<String> = self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_owned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn delete(&mut self, path: &str) -> Result<(), Exception> {
        self.files.remove(path).map(|_| ()).ok_or_else(|| not_found(path))
    }
}

/// A real-disk filesystem backend, rooted at a fixed directory so sandboxed
/// paths cannot escape above it via `..`.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, Exception> {
        if path.contains("..") {
            return Err(Exception::new(ExcType::PermissionError, "path traversal is not permitted"));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

impl FilesystemBackend for LocalFs {
    fn read(&self, path: &str) -> Result<Vec<u8>, Exception> {
        let full = self.resolve(path)?;
        let mut file = std::fs::File::open(&full).map_err(|_| not_found(path))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| Exception::new(ExcType::IOError, e.to_string()))?;
        Ok(buf)
    }

    fn write(&mut self, path: &str, data: &[u8], mode: WriteMode) -> Result<(), Exception> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Exception::new(ExcType::IOError, e.to_string()))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(mode == WriteMode::Append)
            .truncate(mode == WriteMode::Truncate)
            .open(&full)
            .map_err(|e| Exception::new(ExcType::IOError, e.to_string()))?;
        file.write_all(data).map_err(|e| Exception::new(ExcType::IOError, e.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, Exception> {
        let full = self.resolve(path)?;
        let entries = std::fs::read_dir(&full).map_err(|_| not_found(path))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Exception::new(ExcType::IOError, e.to_string()))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn delete(&mut self, path: &str) -> Result<(), Exception> {
        let full = self.resolve(path)?;
        if Path::new(&full).is_dir() {
            std::fs::remove_dir_all(&full)
        } else {
            std::fs::remove_file(&full)
        }
        .map_err(|_| not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trips_a_write() {
        let mut fs = InMemoryFs::new();
        fs.write("a.txt", b"hi", WriteMode::Truncate).unwrap();
        assert_eq!(fs.read("a.txt").unwrap(), b"hi");
    }

    #[test]
    fn append_mode_extends_existing_content() {
        let mut fs = InMemoryFs::new();
        fs.write("a.txt", b"hi", WriteMode::Truncate).unwrap();
        fs.write("a.txt", b"!", WriteMode::Append).unwrap();
        assert_eq!(fs.read("a.txt").unwrap(), b"hi!");
    }

    #[test]
    fn missing_file_raises_file_not_found() {
        let fs = InMemoryFs::new();
        let err = fs.read("nope.txt").unwrap_err();
        assert_eq!(err.exc_type, ExcType::FileNotFoundError);
    }

    #[test]
    fn list_dir_returns_immediate_children_only() {
        let fs = InMemoryFs::seeded([("dir/a.txt".to_owned(), vec![]), ("dir/sub/b.txt".to_owned(), vec![])]);
        let names = fs.list_dir("dir").unwrap();
        assert_eq!(names, vec!["a.txt".to_owned(), "sub".to_owned()]);
    }
}
