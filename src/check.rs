//! Offline integrity checker.
//!
//! Walks the file from the header to EOF and reads every point, independent
//! of any index a [`TrkReader`](crate::io_stream::TrkReader) built.  Damage is
//! reported in the [`ValidationReport`]; only genuine I/O failures and an
//! unreadable header propagate as errors.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::header::{TrkHeader, HEADER_SIZE};
use crate::track::{TrackEntry, COORDS, FIELD_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackHealth {
    Intact,
    /// The record ends before its declared length; `points_read` points were complete.
    Truncated { points_read: u32 },
    /// The count field is negative; nothing after it can be located.
    NegativeCount(i32),
}

#[derive(Debug, Clone)]
pub struct TrackCheck {
    pub index:       usize,
    /// Offset of the record's count field.
    pub offset:      u64,
    pub point_count: i32,
    pub health:      TrackHealth,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// `n_count` from the header, when recorded.
    pub header_count:   Option<u32>,
    pub tracks:         Vec<TrackCheck>,
    pub total_points:   u64,
    /// Bytes after the last record too short to hold a count.
    pub trailing_bytes: u64,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.tracks.iter().all(|t| t.health == TrackHealth::Intact)
            && self.trailing_bytes == 0
            && self.count_matches()
    }

    /// True when the header records no count or records the scanned one.
    pub fn count_matches(&self) -> bool {
        self.header_count.map_or(true, |n| n as usize == self.tracks.len())
    }

    pub fn summary(&self) -> String {
        let damaged = self.tracks.iter().filter(|t| t.health != TrackHealth::Intact).count();
        let recorded = match self.header_count {
            Some(n) => n.to_string(),
            None    => "not recorded".into(),
        };
        format!(
            "{} track(s), {} point(s), {} damaged, {} trailing byte(s), header n_count {}",
            self.tracks.len(), self.total_points, damaged, self.trailing_bytes, recorded,
        )
    }
}

/// Re-read the header and every point of every track.
pub fn validate<R: Read + Seek>(reader: &mut R) -> Result<ValidationReport> {
    reader.seek(SeekFrom::Start(0))?;
    let header = TrkHeader::read(&mut *reader)?;
    let layout = header.layout()?;
    debug!(
        n_count = header.n_count,
        n_scalars = header.n_scalars,
        n_properties = header.n_properties,
        "checking track file"
    );

    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;

    let mut tracks = Vec::new();
    let mut total_points = 0u64;
    let mut trailing_bytes = 0u64;
    let mut pos = HEADER_SIZE as u64;
    let scalar_skip = layout.n_scalars as i64 * FIELD_SIZE as i64;
    let mut xyz = [0f32; COORDS];

    while pos < end {
        if end - pos < FIELD_SIZE {
            trailing_bytes = end - pos;
            warn!(offset = pos, trailing = trailing_bytes, "trailing bytes after last track");
            break;
        }

        let index = tracks.len();
        let count = reader.read_i32::<LittleEndian>()?;
        if count < 0 {
            warn!(track = index, count, "negative point count");
            tracks.push(TrackCheck { index, offset: pos, point_count: count, health: TrackHealth::NegativeCount(count) });
            break;
        }

        let entry = TrackEntry {
            offset:      pos + FIELD_SIZE,
            point_count: count as u32,
            byte_length: layout.byte_length(count as u32),
        };

        let mut points_read = 0u32;
        while points_read < entry.point_count {
            match reader.read_f32_into::<LittleEndian>(&mut xyz) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            if scalar_skip > 0 {
                reader.seek(SeekFrom::Current(scalar_skip))?;
            }
            points_read += 1;
        }
        total_points += points_read as u64;

        let health = if entry.end() > end {
            warn!(track = index, declared = entry.point_count, points_read, "track is truncated");
            TrackHealth::Truncated { points_read }
        } else {
            TrackHealth::Intact
        };
        debug!(track = index, points = count, "track checked");

        let truncated = health != TrackHealth::Intact;
        tracks.push(TrackCheck { index, offset: pos, point_count: count, health });
        if truncated {
            break;
        }

        pos = entry.end();
        reader.seek(SeekFrom::Start(pos))?;
    }

    let report = ValidationReport {
        header_count: header.track_count(),
        tracks,
        total_points,
        trailing_bytes,
    };
    if !report.count_matches() {
        warn!(recorded = header.n_count, scanned = report.tracks.len(), "header n_count disagrees with file");
    }
    info!("{}", report.summary());
    Ok(report)
}
