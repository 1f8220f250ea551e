use crate::api::{LineIter, LineSource};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path.as_ref()).with_context(|| format!("create_dir_all {}", path.as_ref().display()))
}

pub fn list_files_recursive(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path.as_ref()).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", path.as_ref().display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// One source per input: directories expand to the files under them, sorted
/// by name; anything else is kept as given so a missing path still gets its own
/// (failing) map worker.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            sources.append(&mut list_files_recursive(input)?);
        } else {
            sources.push(input.to_path_buf());
        }
    }
    Ok(sources)
}

/// `file1.txt` .. `fileN.txt`, the default input names for `n` map workers.
pub fn default_inputs(n: usize) -> Vec<PathBuf> {
    (1..=n).map(|i| PathBuf::from(format!("file{}.txt", i))).collect()
}

pub fn open_writer(path: impl AsRef<Path>) -> Result<BufWriter<File>> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_dir(parent)?;
    }
    let file = File::create(path.as_ref()).with_context(|| format!("create {}", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}

// ========== Line sources ==========

/// Lines of a file on disk. Invalid UTF-8 is replaced rather than ending the source.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    id: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path.display().to_string();
        Self { path, id }
    }
}

impl LineSource for FileSource {
    fn id(&self) -> &str { &self.id }

    fn open(&self) -> Result<LineIter<'_>> {
        let file = File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let reader = BufReader::new(file);
        Ok(Box::new(reader.split(b'\n').map(|line| {
            line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()).map_err(anyhow::Error::from)
        })))
    }
}

#[derive(Clone, Debug)]
pub struct MemorySource {
    id: String,
    lines: Vec<String>,
}

impl MemorySource {
    pub fn new<I, L>(id: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self { id: id.into(), lines: lines.into_iter().map(Into::into).collect() }
    }

    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}

impl LineSource for MemorySource {
    fn id(&self) -> &str { &self.id }

    fn open(&self) -> Result<LineIter<'_>> {
        Ok(Box::new(self.lines.iter().cloned().map(Ok)))
    }
}
