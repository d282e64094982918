use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::header::HeaderError;

#[derive(Error, Debug)]
pub enum TrkError {
    #[error("Cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("Header error: {0}")]
    Header(#[from] HeaderError),
    #[error("Track {index} not found ({total} tracks)")]
    TrackNotFound { index: usize, total: usize },
    #[error("Point {point} out of range for track {track} ({point_count} points)")]
    PointOutOfRange { track: usize, point: u32, point_count: u32 },
    #[error("Point list length {len} is not a whole number of xyz triples")]
    InvalidPointCount { len: usize },
    #[error("Corrupt track {index} at offset {offset}: point count {count}")]
    CorruptTrack { index: usize, offset: u64, count: i32 },
    #[error("Sample rate {0} is outside 0.0..=1.0")]
    InvalidSampleRate(f64),
    #[error("Track file is not open")]
    NotOpen,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TrkError>;
