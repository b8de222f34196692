//! Packaging of rendered reports: suggested filename plus a transient file
//! that is removed when the report is dropped.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::Error;

/// Longest file name most filesystems accept, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// `SOW-<title>.pdf`. The title is kept as given except that characters
/// that cannot appear in a file name become `_`, and it is cut on a char
/// boundary so the whole name fits in [`MAX_FILENAME_BYTES`].
pub fn report_filename(title: &str) -> String {
    const PREFIX: &str = "SOW-";
    const SUFFIX: &str = ".pdf";
    if title.trim().is_empty() {
        return format!("{PREFIX}untitled{SUFFIX}");
    }
    let budget = MAX_FILENAME_BYTES - PREFIX.len() - SUFFIX.len();
    let mut safe = String::with_capacity(title.len().min(budget));
    for c in title.chars() {
        let c = match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        if safe.len() + c.len_utf8() > budget {
            break;
        }
        safe.push(c);
    }
    format!("{PREFIX}{safe}{SUFFIX}")
}

/// A uniquely named file that is deleted on drop. Deletion failures are
/// logged and never surface as errors.
pub struct TransientFile {
    inner: Option<NamedTempFile>,
}

impl TransientFile {
    pub fn create_in(dir: &Path) -> Result<Self, Error> {
        let prefix = format!("sow-{}-", Uuid::new_v4().simple());
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".pdf")
            .tempfile_in(dir)
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", e, dir.display()),
                ))
            })?;
        log::debug!("Created transient file {}", file.path().display());
        Ok(Self { inner: Some(file) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.as_ref().map(|f| f.path())
    }

    fn file(&mut self) -> Result<&mut File, Error> {
        self.inner
            .as_mut()
            .map(|f| f.as_file_mut())
            .ok_or_else(|| Error::Render("transient file already released".into()))
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Some(file) = self.inner.take() {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => log::debug!("Removed transient file {}", path.display()),
                Err(e) => log::warn!("Failed to remove transient file {}: {e}", path.display()),
            }
        }
    }
}

/// A finished report. Reading it streams the document bytes; the backing
/// transient file lives exactly as long as this value.
pub struct PackagedReport {
    filename: String,
    len: u64,
    file: TransientFile,
}

impl std::fmt::Debug for PackagedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackagedReport")
            .field("filename", &self.filename)
            .field("len", &self.len)
            .field("path", &self.file.path())
            .finish()
    }
}

impl PackagedReport {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn transient_path(&self) -> Option<&Path> {
        self.file.path()
    }

    /// Copy the whole document into `writer`, releasing the transient file
    /// afterwards.
    pub fn stream_to<W: Write>(mut self, writer: &mut W) -> Result<u64, Error> {
        let copied = std::io::copy(&mut self, writer)?;
        writer.flush()?;
        Ok(copied)
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(self.len as usize);
        self.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Read for PackagedReport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file
            .file()
            .map_err(|e| std::io::Error::other(e.to_string()))?
            .read(buf)
    }
}

pub struct OutputPackager {
    transient_dir: PathBuf,
}

impl OutputPackager {
    pub fn new(transient_dir: impl Into<PathBuf>) -> Self {
        Self {
            transient_dir: transient_dir.into(),
        }
    }

    /// Run `render` with a transient file held open, write its output there
    /// and hand back a readable package. Any failure drops the file.
    pub fn package<F>(&self, title: &str, render: F) -> Result<PackagedReport, Error>
    where
        F: FnOnce() -> Result<Vec<u8>, Error>,
    {
        let mut transient = TransientFile::create_in(&self.transient_dir)?;
        let bytes = render()?;

        let file = transient.file()?;
        file.write_all(&bytes)?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;

        Ok(PackagedReport {
            filename: report_filename(title),
            len: bytes.len() as u64,
            file: transient,
        })
    }
}
