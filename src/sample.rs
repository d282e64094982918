//! Track sampling: copy a selected subset of tracks into a new file.
//!
//! The selection policy is an arbitrary predicate over track positions;
//! [`sample_file`] plugs in a Bernoulli draw at a fixed rate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

use crate::error::{Result, TrkError};
use crate::file::{TrackFileReader, TrackFileWriter};
use crate::io_stream::WriteOptions;

/// Keep 2 tracks in 1000.
pub const DEFAULT_SAMPLE_RATE: f64 = 0.002;

/// Configuration for [`sample_file`].
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Probability in `0.0..=1.0` that any one track is kept.
    pub rate:  f64,
    /// Fixed seed for a reproducible selection; `None` seeds from the OS.
    pub seed:  Option<u64>,
    pub write: WriteOptions,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            rate:  DEFAULT_SAMPLE_RATE,
            seed:  None,
            write: WriteOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleReport {
    pub tracks_scanned: usize,
    pub tracks_written: usize,
    pub points_written: u64,
}

/// Copy every track of `reader` for which `select(index)` holds, in file order.
pub fn copy_tracks<F>(
    reader:     &mut TrackFileReader,
    writer:     &mut TrackFileWriter,
    mut select: F,
) -> Result<SampleReport>
where
    F: FnMut(usize) -> bool,
{
    let mut report = SampleReport { tracks_scanned: reader.track_count(), ..Default::default() };
    for i in 0..report.tracks_scanned {
        if !select(i) {
            continue;
        }
        let points = reader.read_track(i)?;
        writer.append_track(&points)?;
        report.tracks_written += 1;
        report.points_written += (points.len() / 3) as u64;
    }
    Ok(report)
}

/// Open `input`, create `output` with the input's header, and copy a random
/// sample of tracks.  The writer is closed before the reader so the output
/// header reflects the final state.
pub fn sample_file<P, Q>(input: P, output: Q, opts: &SampleOptions) -> Result<SampleReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    if !(0.0..=1.0).contains(&opts.rate) {
        return Err(TrkError::InvalidSampleRate(opts.rate));
    }

    let mut reader = TrackFileReader::open_path(input)?;
    let mut writer = TrackFileWriter::with_options(output, opts.write);
    writer.copy_header(reader.header()?);
    writer.create()?;

    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_os_rng(),
    };
    let report = copy_tracks(&mut reader, &mut writer, |_| rng.random_bool(opts.rate))?;

    writer.close()?;
    reader.close();

    info!(
        scanned = report.tracks_scanned,
        written = report.tracks_written,
        points = report.points_written,
        "sampling finished"
    );
    Ok(report)
}
