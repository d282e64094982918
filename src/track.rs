use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// Size of one on-disk float and of the leading point-count field.
pub const FIELD_SIZE: u64 = 4;
/// Coordinates per point (x, y, z).
pub const COORDS: usize = 3;

/// Record shape implied by the header's `n_scalars` / `n_properties`.
///
/// On-disk record:
/// `[i32 point_count][point_count × (3 + n_scalars) × f32][n_properties × f32]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackLayout {
    pub n_scalars:    u32,
    pub n_properties: u32,
}

impl TrackLayout {
    pub fn new(n_scalars: u32, n_properties: u32) -> Self {
        Self { n_scalars, n_properties }
    }

    /// Bytes occupied by one point (xyz plus its scalars).
    pub fn point_stride(&self) -> u64 {
        (COORDS as u64 + self.n_scalars as u64) * FIELD_SIZE
    }

    /// Bytes following the count field for a track of `point_count` points.
    pub fn byte_length(&self, point_count: u32) -> u64 {
        self.point_stride() * point_count as u64 + self.n_properties as u64 * FIELD_SIZE
    }

    /// Encode one complete record.  Scalars and properties are written as zeros.
    ///
    /// `points` must hold `3 × point_count` floats; callers validate that.
    pub fn encode_record(&self, points: &[f32]) -> io::Result<Vec<u8>> {
        let point_count = (points.len() / COORDS) as u32;
        let mut buf = Vec::with_capacity(FIELD_SIZE as usize + self.byte_length(point_count) as usize);
        buf.write_i32::<LittleEndian>(point_count as i32)?;
        for xyz in points.chunks_exact(COORDS) {
            for &v in xyz { buf.write_f32::<LittleEndian>(v)?; }
            for _ in 0..self.n_scalars { buf.write_f32::<LittleEndian>(0.0)?; }
        }
        for _ in 0..self.n_properties { buf.write_f32::<LittleEndian>(0.0)?; }
        Ok(buf)
    }

    /// Write one record via [`encode_record`](Self::encode_record).
    pub fn write_record<W: Write>(&self, mut writer: W, points: &[f32]) -> io::Result<u64> {
        let buf = self.encode_record(points)?;
        writer.write_all(&buf)?;
        Ok(buf.len() as u64)
    }
}

/// Position of one track's point data, produced by the index scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackEntry {
    /// Absolute file offset of the first point's x coordinate.
    pub offset:      u64,
    pub point_count: u32,
    /// Bytes of point data plus properties (count field excluded).
    pub byte_length: u64,
}

impl TrackEntry {
    /// Absolute offset of point `point_index` within this track.
    pub fn point_offset(&self, layout: &TrackLayout, point_index: u32) -> u64 {
        self.offset + layout.point_stride() * point_index as u64
    }

    /// First byte after this record.
    pub fn end(&self) -> u64 {
        self.offset + self.byte_length
    }
}
