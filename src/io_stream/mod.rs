//! Streaming track engine: reader and writer over any seekable stream.
//!
//! # Reader
//! [`TrkReader`] reads the 1000-byte header, then scans the records once to
//! build a [`TrackIndex`].  Every later read seeks straight to the indexed
//! offset; scalars stored after each point's xyz are stepped over and never
//! returned.
//!
//! # Writer
//! [`TrkWriter`] writes a placeholder header at offset 0, appends records at
//! the end of the stream, and patches the header in place on `save()` /
//! `finish()`.  Scalars and properties are never written with data: after
//! [`TrkWriter::copy_header`] both counts are zero.
//!
//! # Endianness
//! All binary I/O is little-endian; see `header.rs` and `track.rs`.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::warn;

use crate::check::{self, ValidationReport};
use crate::error::{Result, TrkError};
use crate::header::TrkHeader;
use crate::index::TrackIndex;
use crate::track::{TrackEntry, TrackLayout, COORDS, FIELD_SIZE};

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct TrkReader<R: Read + Seek> {
    reader:     R,
    header:     TrkHeader,
    layout:     TrackLayout,
    index:      TrackIndex,
    stream_len: u64,
}

impl<R: Read + Seek> TrkReader<R> {
    /// Parse the header and build the track index.  Runs to completion or fails.
    pub fn new(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = TrkHeader::read(&mut reader)?;

        if header.n_properties != 0 {
            warn!(n_properties = header.n_properties, "track file stores per-track properties");
        }
        if header.n_scalars != 0 {
            warn!(n_scalars = header.n_scalars, "track file stores per-point scalars");
        }

        let layout     = header.layout()?;
        let index      = TrackIndex::scan(&mut reader, &layout)?;
        let stream_len = reader.seek(SeekFrom::End(0))?;

        Ok(Self { reader, header, layout, index, stream_len })
    }

    pub fn header(&self) -> &TrkHeader {
        &self.header
    }

    pub fn layout(&self) -> TrackLayout {
        self.layout
    }

    pub fn index(&self) -> &TrackIndex {
        &self.index
    }

    pub fn track_count(&self) -> usize {
        self.index.len()
    }

    pub fn point_count(&self, track: usize) -> Option<u32> {
        self.index.get(track).map(|e| e.point_count)
    }

    pub fn entry(&self, track: usize) -> Result<TrackEntry> {
        self.index.get(track).copied().ok_or(TrkError::TrackNotFound {
            index: track,
            total: self.index.len(),
        })
    }

    /// Read the xyz coordinates of every point of `track`, 3 floats per point.
    pub fn read_track(&mut self, track: usize) -> Result<Vec<f32>> {
        let entry  = self.entry(track)?;
        let stride = self.layout.point_stride() as usize;
        let len    = stride as u64 * entry.point_count as u64;

        if entry.offset + len > self.stream_len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, format!(
                "track {track} needs {len} bytes at offset {} but the file ends at {}",
                entry.offset, self.stream_len,
            )).into());
        }

        let mut raw = vec![0u8; len as usize];
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        self.reader.read_exact(&mut raw)?;

        let xyz_len = COORDS * FIELD_SIZE as usize;
        let mut points = Vec::with_capacity(entry.point_count as usize * COORDS);
        for point in raw.chunks_exact(stride) {
            points.extend(point[..xyz_len].chunks_exact(FIELD_SIZE as usize).map(LittleEndian::read_f32));
        }
        Ok(points)
    }

    /// Read the xyz coordinates of one point.
    pub fn read_point(&mut self, track: usize, point: u32) -> Result<[f32; 3]> {
        let entry = self.entry(track)?;
        if point >= entry.point_count {
            return Err(TrkError::PointOutOfRange { track, point, point_count: entry.point_count });
        }

        let mut xyz = [0f32; COORDS];
        self.reader.seek(SeekFrom::Start(entry.point_offset(&self.layout, point)))?;
        self.reader.read_f32_into::<LittleEndian>(&mut xyz)?;
        Ok(xyz)
    }

    /// Walk the whole file again and check every record.  See [`check::validate`].
    pub fn validate(&mut self) -> Result<ValidationReport> {
        check::validate(&mut self.reader)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

/// Configuration for [`TrkWriter::with_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Store the number of appended tracks in `n_count` on every header
    /// rewrite.  Off by default: `n_count` stays 0 ("not recorded").
    pub record_track_count: bool,
}

pub struct TrkWriter<W: Write + Seek> {
    writer:         W,
    header:         TrkHeader,
    layout:         TrackLayout,
    options:        WriteOptions,
    tracks_written: u64,
}

impl<W: Write + Seek> TrkWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        Self::with_options(writer, TrkHeader::new(), WriteOptions::default())
    }

    /// Start a file whose header is copied from `source` (see [`copy_header`](Self::copy_header)).
    pub fn with_header(writer: W, source: &TrkHeader, options: WriteOptions) -> Result<Self> {
        let mut w = Self::with_options(writer, TrkHeader::new(), options)?;
        w.copy_header(source);
        w.save()?;
        Ok(w)
    }

    /// Write `header` at offset 0 as a placeholder; it is rewritten on `save()`.
    pub fn with_options(mut writer: W, header: TrkHeader, options: WriteOptions) -> Result<Self> {
        let layout = header.layout()?;
        writer.seek(SeekFrom::Start(0))?;
        header.write(&mut writer)?;
        Ok(Self { writer, header, layout, options, tracks_written: 0 })
    }

    /// Replace the header with a copy of `source`, zeroing `n_count`,
    /// `n_scalars` and `n_properties`.  Takes effect on disk at the next
    /// `save()`.
    ///
    /// Scalars and properties of the source file are not carried over; tracks
    /// appended here hold xyz only.
    pub fn copy_header(&mut self, source: &TrkHeader) {
        self.header = copy_for_writing(source);
        self.layout = TrackLayout::default();
    }

    pub fn header(&self) -> &TrkHeader {
        &self.header
    }

    pub fn tracks_written(&self) -> u64 {
        self.tracks_written
    }

    /// Append one track.  `points` holds 3 floats per point.
    ///
    /// Rejected before any byte is written if the length is not a multiple of
    /// 3 or the point count does not fit the on-disk `i32`.
    pub fn append_track(&mut self, points: &[f32]) -> Result<()> {
        if points.len() % COORDS != 0 || points.len() / COORDS > i32::MAX as usize {
            return Err(TrkError::InvalidPointCount { len: points.len() });
        }
        self.writer.seek(SeekFrom::End(0))?;
        self.layout.write_record(&mut self.writer, points)?;
        self.tracks_written += 1;
        Ok(())
    }

    /// Rewrite the header at offset 0 and flush, leaving the stream open.
    pub fn save(&mut self) -> Result<()> {
        if self.options.record_track_count {
            self.header.n_count = i32::try_from(self.tracks_written).unwrap_or(0);
        }
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Final header rewrite; returns the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        self.save()?;
        Ok(self.writer)
    }
}

/// The header a writer adopts from `source`: everything verbatim except
/// `n_count`, `n_scalars` and `n_properties`, which are zeroed.
pub fn copy_for_writing(source: &TrkHeader) -> TrkHeader {
    TrkHeader {
        n_count:      0,
        n_scalars:    0,
        n_properties: 0,
        ..source.clone()
    }
}
