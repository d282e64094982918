//! Random-access track index, rebuilt by one forward scan on every open.
//!
//! Keys are contiguous positions `0..N` assigned in file order, so a plain
//! `Vec<TrackEntry>` is the whole index.  Memory is O(tracks) regardless of
//! how many points the file holds: the scan reads only the 4-byte count of
//! each record and seeks over the rest.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

use crate::error::{Result, TrkError};
use crate::header::HEADER_SIZE;
use crate::track::{TrackEntry, TrackLayout, FIELD_SIZE};

#[derive(Debug, Clone, Default)]
pub struct TrackIndex {
    entries: Vec<TrackEntry>,
}

impl TrackIndex {
    /// Scan every record from the end of the header to the end of the stream.
    ///
    /// A final record that claims more bytes than remain is kept as-is (reads
    /// of it fail later with `UnexpectedEof`).  Fewer than four trailing bytes
    /// cannot hold a count and are ignored.
    pub fn scan<R: Read + Seek>(reader: &mut R, layout: &TrackLayout) -> Result<Self> {
        let end = reader.seek(SeekFrom::End(0))?;
        let mut pos = HEADER_SIZE as u64;
        let mut entries = Vec::new();

        while pos < end {
            if end - pos < FIELD_SIZE {
                warn!(offset = pos, trailing = end - pos, "ignoring trailing bytes after last track");
                break;
            }

            reader.seek(SeekFrom::Start(pos))?;
            let count = reader.read_i32::<LittleEndian>()?;
            if count < 0 {
                return Err(TrkError::CorruptTrack { index: entries.len(), offset: pos, count });
            }

            let point_count = count as u32;
            let entry = TrackEntry {
                offset:      pos + FIELD_SIZE,
                point_count,
                byte_length: layout.byte_length(point_count),
            };
            if entry.end() > end {
                warn!(
                    track = entries.len(),
                    declared = entry.byte_length,
                    available = end - entry.offset,
                    "last track is truncated"
                );
            }
            entries.push(entry);
            pos = entry.end();
        }

        debug!(tracks = entries.len(), bytes = end, "built track index");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    pub fn total_points(&self) -> u64 {
        self.entries.iter().map(|e| e.point_count as u64).sum()
    }
}
