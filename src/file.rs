//! Path-based track files: the primary embedding surface.
//!
//! ```no_run
//! use trkio::file::{TrackFileReader, TrackFileWriter};
//!
//! let mut reader = TrackFileReader::new("in.trk");
//! reader.open()?;
//!
//! let mut writer = TrackFileWriter::new("out.trk");
//! writer.copy_header(reader.header()?);
//! writer.create()?;
//! for i in 0..reader.track_count() {
//!     let points = reader.read_track(i)?;
//!     writer.append_track(&points)?;
//! }
//! writer.close()?;
//! reader.close();
//! # Ok::<(), trkio::TrkError>(())
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::check::ValidationReport;
use crate::error::{Result, TrkError};
use crate::header::TrkHeader;
use crate::io_stream::{copy_for_writing, TrkReader, TrkWriter, WriteOptions};

// ── TrackFileReader ───────────────────────────────────────────────────────────

/// Closed → Open → Closed.  The file handle and the index live only while open.
pub struct TrackFileReader {
    path:   PathBuf,
    reader: Option<TrkReader<File>>,
}

impl TrackFileReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_owned(), reader: None }
    }

    /// Construct and open in one step.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut r = Self::new(path);
        r.open()?;
        Ok(r)
    }

    /// Open the file, read the header and build the index.  A reader that
    /// was already open is closed first.  On failure nothing is retained.
    pub fn open(&mut self) -> Result<()> {
        self.close();
        let file = File::open(&self.path)
            .map_err(|source| TrkError::Open { path: self.path.clone(), source })?;
        self.reader = Some(TrkReader::new(file)?);
        Ok(())
    }

    /// Release the handle and drop the index.  Idempotent.
    pub fn close(&mut self) {
        self.reader = None;
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Result<&TrkHeader> {
        self.opened().map(|r| r.header())
    }

    /// Number of indexed tracks; 0 while closed.
    pub fn track_count(&self) -> usize {
        self.reader.as_ref().map_or(0, |r| r.track_count())
    }

    pub fn point_count(&self, track: usize) -> Option<u32> {
        self.reader.as_ref().and_then(|r| r.point_count(track))
    }

    pub fn read_track(&mut self, track: usize) -> Result<Vec<f32>> {
        self.opened_mut()?.read_track(track)
    }

    pub fn read_point(&mut self, track: usize, point: u32) -> Result<[f32; 3]> {
        self.opened_mut()?.read_point(track, point)
    }

    pub fn validate(&mut self) -> Result<ValidationReport> {
        self.opened_mut()?.validate()
    }

    fn opened(&self) -> Result<&TrkReader<File>> {
        self.reader.as_ref().ok_or(TrkError::NotOpen)
    }

    fn opened_mut(&mut self) -> Result<&mut TrkReader<File>> {
        self.reader.as_mut().ok_or(TrkError::NotOpen)
    }
}

// ── TrackFileWriter ───────────────────────────────────────────────────────────

/// Closed → Created → Closed, with `save()` as a flush point while created.
/// Dropping a created writer closes it.
pub struct TrackFileWriter {
    path:    PathBuf,
    header:  TrkHeader,
    options: WriteOptions,
    writer:  Option<TrkWriter<File>>,
}

impl TrackFileWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_options(path, WriteOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: WriteOptions) -> Self {
        Self {
            path:   path.as_ref().to_owned(),
            header: TrkHeader::new(),
            options,
            writer: None,
        }
    }

    /// Adopt `source` with `n_count`, `n_scalars` and `n_properties` zeroed.
    /// Valid before or after `create()`; reaches disk at the next header write.
    pub fn copy_header(&mut self, source: &TrkHeader) {
        match &mut self.writer {
            Some(w) => w.copy_header(source),
            None    => self.header = copy_for_writing(source),
        }
    }

    /// Create (or truncate) the file and write the placeholder header.
    pub fn create(&mut self) -> Result<()> {
        self.close()?;
        let file = File::create(&self.path)
            .map_err(|source| TrkError::Open { path: self.path.clone(), source })?;
        self.writer = Some(TrkWriter::with_options(file, self.header.clone(), self.options)?);
        Ok(())
    }

    pub fn append_track(&mut self, points: &[f32]) -> Result<()> {
        self.created_mut()?.append_track(points)
    }

    pub fn save(&mut self) -> Result<()> {
        self.created_mut()?.save()
    }

    /// Rewrite the header and release the handle.  Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.save()?;
            self.header = w.header().clone();
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &TrkHeader {
        self.writer.as_ref().map_or(&self.header, |w| w.header())
    }

    /// Tracks appended since the last `create()`; 0 while closed.
    pub fn tracks_written(&self) -> u64 {
        self.writer.as_ref().map_or(0, |w| w.tracks_written())
    }

    fn created_mut(&mut self) -> Result<&mut TrkWriter<File>> {
        self.writer.as_mut().ok_or(TrkError::NotOpen)
    }
}

impl Drop for TrackFileWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to finalize track file");
        }
    }
}
