//! Line sources the trace reader pulls from.
//!
//! A source can be opened any number of times; every open yields a fresh
//! reader positioned at the first line. This lets the start-marker scan run
//! without touching a parse in progress.

use crate::utils::error::TraceError;
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Something that can be opened as a sequence of text lines
pub trait LineSource {
    type Reader: BufRead;

    /// Open a new reader positioned at the first line
    fn open(&self) -> Result<Self::Reader, TraceError>;

    /// Human-readable name for diagnostics
    fn describe(&self) -> String;
}

/// A trace report on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for FileSource {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl LineSource for FileSource {
    type Reader = BufReader<File>;

    fn open(&self) -> Result<Self::Reader, TraceError> {
        debug!("Opening trace file: {}", self.path.display());

        let file = File::open(&self.path).map_err(|source| TraceError::Open {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(BufReader::new(file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A trace report held in memory
#[derive(Debug, Clone)]
pub struct TextSource {
    text: Arc<[u8]>,
}

impl TextSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into().into_bytes()),
        }
    }
}

impl From<&str> for TextSource {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TextSource {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl LineSource for TextSource {
    type Reader = Cursor<Arc<[u8]>>;

    fn open(&self) -> Result<Self::Reader, TraceError> {
        Ok(Cursor::new(Arc::clone(&self.text)))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.text.len())
    }
}

/// Line iterator that tolerates invalid UTF-8
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the read,
/// so a corrupted line becomes an unrecognized line instead of an I/O error.
/// Trailing `\n` and `\r\n` are stripped.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// 1-based number of the line most recently returned
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
