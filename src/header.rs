//! TrackVis header: the fixed 1000-byte record at offset 0 of every `.trk` file.
//!
//! # Layout (all multi-byte fields little-endian, no padding between fields)
//!
//! | Offset | Size | Field                       |
//! |--------|------|-----------------------------|
//! |    0   |    6 | id_string (`"TRACK\0"`)     |
//! |    6   |    6 | dim: i16 × 3                |
//! |   12   |   12 | voxel_size: f32 × 3         |
//! |   24   |   12 | origin: f32 × 3             |
//! |   36   |    2 | n_scalars: i16              |
//! |   38   |  200 | scalar_name: 10 × 20 bytes  |
//! |  238   |    2 | n_properties: i16           |
//! |  240   |  200 | property_name: 10 × 20 bytes|
//! |  440   |   64 | vox_to_ras: f32 × 4 × 4     |
//! |  504   |  444 | reserved                    |
//! |  948   |    4 | voxel_order                 |
//! |  952   |    4 | pad2                        |
//! |  956   |   24 | image_orientation_patient   |
//! |  980   |    2 | pad1                        |
//! |  982   |    6 | invert_x/y/z, swap_xy/yz/zx |
//! |  988   |    4 | n_count: i32                |
//! |  992   |    4 | version: i32                |
//! |  996   |    4 | hdr_size: i32               |
//!
//! The header is encoded field by field; its size never depends on how the
//! compiler lays out [`TrkHeader`] in memory.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

use crate::track::TrackLayout;

pub const HEADER_SIZE: usize = 1000;
pub const MAGIC: &[u8; 5] = b"TRACK";
pub const VERSION: i32 = 2;

/// Width of one scalar/property name slot.
pub const NAME_LEN: usize = 20;
/// Number of scalar/property name slots.
pub const MAX_NAMES: usize = 10;
pub const RESERVED_LEN: usize = 444;

const HDR_SIZE_OFFSET: usize = 996;

const LAYOUT_SIZE: usize = 6                 // id_string
    + 3 * 2                                  // dim
    + 3 * 4                                  // voxel_size
    + 3 * 4                                  // origin
    + 2                                      // n_scalars
    + MAX_NAMES * NAME_LEN                   // scalar_name
    + 2                                      // n_properties
    + MAX_NAMES * NAME_LEN                   // property_name
    + 16 * 4                                 // vox_to_ras
    + RESERVED_LEN                           // reserved
    + 4                                      // voxel_order
    + 4                                      // pad2
    + 6 * 4                                  // image_orientation_patient
    + 2                                      // pad1
    + 6                                      // invert/swap flags
    + 4                                      // n_count
    + 4                                      // version
    + 4;                                     // hdr_size

const _: () = assert!(LAYOUT_SIZE == HEADER_SIZE, "trk header layout must encode to 1000 bytes");

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Truncated header: read {read} of {} bytes", HEADER_SIZE)]
    Truncated { read: usize },
    #[error("Invalid magic: expected \"TRACK\", found {0:?}")]
    InvalidMagic([u8; 6]),
    #[error("Big-endian track files are not supported")]
    BigEndian,
    #[error("Invalid hdr_size: {0} (expected 1000)")]
    InvalidHeaderSize(i32),
    #[error("Negative {field} in header: {value}")]
    NegativeCount { field: &'static str, value: i16 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct TrkHeader {
    pub id_string:                 [u8; 6],
    pub dim:                       [i16; 3],
    pub voxel_size:                [f32; 3],
    /// Not used by TrackVis; always (0, 0, 0) by convention.
    pub origin:                    [f32; 3],
    pub n_scalars:                 i16,
    pub scalar_name:               [[u8; NAME_LEN]; MAX_NAMES],
    pub n_properties:              i16,
    pub property_name:             [[u8; NAME_LEN]; MAX_NAMES],
    /// `vox_to_ras[3][3] == 0` means the matrix was not recorded.
    pub vox_to_ras:                [[f32; 4]; 4],
    pub reserved:                  [u8; RESERVED_LEN],
    pub voxel_order:               [u8; 4],
    pub pad2:                      [u8; 4],
    pub image_orientation_patient: [f32; 6],
    pub pad1:                      [u8; 2],
    pub invert_x:                  u8,
    pub invert_y:                  u8,
    pub invert_z:                  u8,
    pub swap_xy:                   u8,
    pub swap_yz:                   u8,
    pub swap_zx:                   u8,
    /// Number of tracks in the file; 0 means "not recorded".
    pub n_count:                   i32,
    pub version:                   i32,
    pub hdr_size:                  i32,
}

impl TrkHeader {
    pub fn new() -> Self {
        let mut id_string = [0u8; 6];
        id_string[..MAGIC.len()].copy_from_slice(MAGIC);
        Self {
            id_string,
            dim:                       [0; 3],
            voxel_size:                [0.0; 3],
            origin:                    [0.0; 3],
            n_scalars:                 0,
            scalar_name:               [[0; NAME_LEN]; MAX_NAMES],
            n_properties:              0,
            property_name:             [[0; NAME_LEN]; MAX_NAMES],
            vox_to_ras:                [[0.0; 4]; 4],
            reserved:                  [0; RESERVED_LEN],
            voxel_order:               *b"LAS\0",
            pad2:                      [0; 4],
            image_orientation_patient: [0.0; 6],
            pad1:                      [0; 2],
            invert_x:                  0,
            invert_y:                  0,
            invert_z:                  0,
            swap_xy:                   0,
            swap_yz:                   0,
            swap_zx:                   0,
            n_count:                   0,
            version:                   VERSION,
            hdr_size:                  HEADER_SIZE as i32,
        }
    }

    // ── Encoding ─────────────────────────────────────────────────────────────

    /// Write exactly [`HEADER_SIZE`] bytes.
    ///
    /// Panics if the encoded length differs from [`HEADER_SIZE`]; every track
    /// offset in the file is computed from that constant.
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        self.encode(&mut buf)?;
        assert_eq!(buf.len(), HEADER_SIZE, "trk header encoded to {} bytes", buf.len());
        writer.write_all(&buf)
    }

    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.id_string)?;
        for v in self.dim { w.write_i16::<LittleEndian>(v)?; }
        for v in self.voxel_size { w.write_f32::<LittleEndian>(v)?; }
        for v in self.origin { w.write_f32::<LittleEndian>(v)?; }
        w.write_i16::<LittleEndian>(self.n_scalars)?;
        for name in &self.scalar_name { w.write_all(name)?; }
        w.write_i16::<LittleEndian>(self.n_properties)?;
        for name in &self.property_name { w.write_all(name)?; }
        for row in &self.vox_to_ras {
            for &v in row { w.write_f32::<LittleEndian>(v)?; }
        }
        w.write_all(&self.reserved)?;
        w.write_all(&self.voxel_order)?;
        w.write_all(&self.pad2)?;
        for v in self.image_orientation_patient { w.write_f32::<LittleEndian>(v)?; }
        w.write_all(&self.pad1)?;
        w.write_all(&[
            self.invert_x, self.invert_y, self.invert_z,
            self.swap_xy,  self.swap_yz,  self.swap_zx,
        ])?;
        w.write_i32::<LittleEndian>(self.n_count)?;
        w.write_i32::<LittleEndian>(self.version)?;
        w.write_i32::<LittleEndian>(self.hdr_size)?;
        Ok(())
    }

    // ── Decoding ─────────────────────────────────────────────────────────────

    /// Read and validate exactly [`HEADER_SIZE`] bytes.
    ///
    /// A short read is reported as [`HeaderError::Truncated`] rather than a
    /// bare `UnexpectedEof`, so callers can tell a damaged file from an I/O
    /// failure.
    pub fn read<R: Read>(reader: R) -> Result<Self, HeaderError> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        reader.take(HEADER_SIZE as u64).read_to_end(&mut buf)?;
        if buf.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated { read: buf.len() });
        }

        let header = Self::decode(&mut Cursor::new(&buf))?;

        if &header.id_string[..MAGIC.len()] != MAGIC {
            return Err(HeaderError::InvalidMagic(header.id_string));
        }
        if header.hdr_size != HEADER_SIZE as i32 {
            let swapped = BigEndian::read_i32(&buf[HDR_SIZE_OFFSET..HDR_SIZE_OFFSET + 4]);
            if swapped == HEADER_SIZE as i32 {
                return Err(HeaderError::BigEndian);
            }
            return Err(HeaderError::InvalidHeaderSize(header.hdr_size));
        }
        header.layout()?;
        Ok(header)
    }

    fn decode<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut h = Self::new();
        r.read_exact(&mut h.id_string)?;
        r.read_i16_into::<LittleEndian>(&mut h.dim)?;
        r.read_f32_into::<LittleEndian>(&mut h.voxel_size)?;
        r.read_f32_into::<LittleEndian>(&mut h.origin)?;
        h.n_scalars = r.read_i16::<LittleEndian>()?;
        for name in h.scalar_name.iter_mut() { r.read_exact(name)?; }
        h.n_properties = r.read_i16::<LittleEndian>()?;
        for name in h.property_name.iter_mut() { r.read_exact(name)?; }
        for row in h.vox_to_ras.iter_mut() {
            r.read_f32_into::<LittleEndian>(row)?;
        }
        r.read_exact(&mut h.reserved)?;
        r.read_exact(&mut h.voxel_order)?;
        r.read_exact(&mut h.pad2)?;
        r.read_f32_into::<LittleEndian>(&mut h.image_orientation_patient)?;
        r.read_exact(&mut h.pad1)?;
        let mut flags = [0u8; 6];
        r.read_exact(&mut flags)?;
        [h.invert_x, h.invert_y, h.invert_z, h.swap_xy, h.swap_yz, h.swap_zx] = flags;
        h.n_count  = r.read_i32::<LittleEndian>()?;
        h.version  = r.read_i32::<LittleEndian>()?;
        h.hdr_size = r.read_i32::<LittleEndian>()?;
        Ok(h)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Record stride arithmetic derived from `n_scalars` / `n_properties`.
    pub fn layout(&self) -> Result<TrackLayout, HeaderError> {
        if self.n_scalars < 0 {
            return Err(HeaderError::NegativeCount { field: "n_scalars", value: self.n_scalars });
        }
        if self.n_properties < 0 {
            return Err(HeaderError::NegativeCount { field: "n_properties", value: self.n_properties });
        }
        Ok(TrackLayout::new(self.n_scalars as u32, self.n_properties as u32))
    }

    /// Track count recorded in the header, if any.
    pub fn track_count(&self) -> Option<u32> {
        (self.n_count > 0).then_some(self.n_count as u32)
    }

    pub fn has_vox_to_ras(&self) -> bool {
        self.vox_to_ras[3][3] != 0.0
    }

    pub fn voxel_order_str(&self) -> String {
        c_str(&self.voxel_order)
    }

    pub fn scalar_names(&self) -> Vec<String> {
        names(&self.scalar_name, self.n_scalars)
    }

    pub fn property_names(&self) -> Vec<String> {
        names(&self.property_name, self.n_properties)
    }

    pub fn summary(&self) -> HeaderSummary {
        HeaderSummary {
            id_string:                 c_str(&self.id_string),
            dim:                       self.dim,
            voxel_size:                self.voxel_size,
            origin:                    self.origin,
            n_scalars:                 self.n_scalars,
            scalar_names:              self.scalar_names(),
            n_properties:              self.n_properties,
            property_names:            self.property_names(),
            vox_to_ras:                self.has_vox_to_ras().then_some(self.vox_to_ras),
            voxel_order:               self.voxel_order_str(),
            image_orientation_patient: self.image_orientation_patient,
            invert:                    [self.invert_x, self.invert_y, self.invert_z],
            swap:                      [self.swap_xy, self.swap_yz, self.swap_zx],
            n_count:                   self.n_count,
            version:                   self.version,
            hdr_size:                  self.hdr_size,
        }
    }
}

impl Default for TrkHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable view of a [`TrkHeader`], used by `trk info`.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderSummary {
    pub id_string:                 String,
    pub dim:                       [i16; 3],
    pub voxel_size:                [f32; 3],
    pub origin:                    [f32; 3],
    pub n_scalars:                 i16,
    pub scalar_names:              Vec<String>,
    pub n_properties:              i16,
    pub property_names:            Vec<String>,
    pub vox_to_ras:                Option<[[f32; 4]; 4]>,
    pub voxel_order:               String,
    pub image_orientation_patient: [f32; 6],
    pub invert:                    [u8; 3],
    pub swap:                      [u8; 3],
    pub n_count:                   i32,
    pub version:                   i32,
    pub hdr_size:                  i32,
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn c_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn names(slots: &[[u8; NAME_LEN]; MAX_NAMES], count: i16) -> Vec<String> {
    let n = (count.max(0) as usize).min(MAX_NAMES);
    slots[..n].iter().map(|s| c_str(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encoded(h: &TrkHeader) -> Vec<u8> {
        let mut buf = Vec::new();
        h.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn default_header_is_1000_bytes_with_defaults() {
        let buf = encoded(&TrkHeader::default());
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[0..6], b"TRACK\0");
        assert_eq!(&buf[948..952], b"LAS\0");
        assert_eq!(LittleEndian::read_i32(&buf[988..992]), 0);
        assert_eq!(LittleEndian::read_i32(&buf[992..996]), 2);
        assert_eq!(LittleEndian::read_i32(&buf[996..1000]), 1000);
    }

    #[test]
    fn fields_land_at_fixed_offsets() {
        let mut h = TrkHeader::new();
        h.dim = [10, 20, 30];
        h.n_scalars = 3;
        h.n_properties = 2;
        h.vox_to_ras[0][0] = 1.5;
        h.vox_to_ras[3][3] = 1.0;
        h.swap_zx = 7;
        h.n_count = 42;

        let buf = encoded(&h);
        assert_eq!(LittleEndian::read_i16(&buf[6..8]), 10);
        assert_eq!(LittleEndian::read_i16(&buf[10..12]), 30);
        assert_eq!(LittleEndian::read_i16(&buf[36..38]), 3);
        assert_eq!(LittleEndian::read_i16(&buf[238..240]), 2);
        assert_eq!(LittleEndian::read_f32(&buf[440..444]), 1.5);
        assert_eq!(LittleEndian::read_f32(&buf[500..504]), 1.0);
        assert_eq!(buf[987], 7);
        assert_eq!(LittleEndian::read_i32(&buf[988..992]), 42);
    }

    #[test]
    fn roundtrip_preserves_every_byte() {
        let mut h = TrkHeader::new();
        h.voxel_size = [1.0, 1.25, 2.0];
        h.scalar_name[0][..2].copy_from_slice(b"fa");
        h.n_scalars = 1;
        h.reserved[100] = 0xAB;
        h.image_orientation_patient = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        h.invert_y = 1;

        let buf = encoded(&h);
        let back = TrkHeader::read(&buf[..]).unwrap();
        assert_eq!(encoded(&back), buf);
        assert_eq!(back.scalar_names(), vec!["fa".to_string()]);
        assert_eq!(back.voxel_order_str(), "LAS");
    }

    #[test]
    fn short_header_is_truncated() {
        let buf = encoded(&TrkHeader::new());
        match TrkHeader::read(&buf[..999]) {
            Err(HeaderError::Truncated { read }) => assert_eq!(read, 999),
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = encoded(&TrkHeader::new());
        buf[0] = b'X';
        assert!(matches!(TrkHeader::read(&buf[..]), Err(HeaderError::InvalidMagic(_))));
    }

    #[test]
    fn big_endian_file_is_detected() {
        let mut buf = encoded(&TrkHeader::new());
        BigEndian::write_i32(&mut buf[996..1000], 1000);
        assert!(matches!(TrkHeader::read(&buf[..]), Err(HeaderError::BigEndian)));

        LittleEndian::write_i32(&mut buf[996..1000], 348);
        assert!(matches!(TrkHeader::read(&buf[..]), Err(HeaderError::InvalidHeaderSize(348))));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut h = TrkHeader::new();
        h.n_properties = -1;
        let buf = encoded(&h);
        assert!(matches!(
            TrkHeader::read(&buf[..]),
            Err(HeaderError::NegativeCount { field: "n_properties", value: -1 })
        ));
    }

    #[test]
    fn vox_to_ras_recorded_flag() {
        let mut h = TrkHeader::new();
        assert!(!h.has_vox_to_ras());
        assert!(h.summary().vox_to_ras.is_none());
        h.vox_to_ras[3][3] = 1.0;
        assert!(h.has_vox_to_ras());
        assert!(h.summary().vox_to_ras.is_some());
    }

    proptest! {
        #[test]
        fn any_header_roundtrips(
            dim in prop::array::uniform3(any::<i16>()),
            voxel_size in prop::array::uniform3(any::<f32>()),
            n_scalars in 0i16..=10,
            n_properties in 0i16..=10,
            n_count in any::<i32>(),
            flags in prop::array::uniform6(any::<u8>()),
            diag in any::<f32>(),
        ) {
            let mut h = TrkHeader::new();
            h.dim = dim;
            h.voxel_size = voxel_size;
            h.n_scalars = n_scalars;
            h.n_properties = n_properties;
            h.n_count = n_count;
            [h.invert_x, h.invert_y, h.invert_z, h.swap_xy, h.swap_yz, h.swap_zx] = flags;
            h.vox_to_ras[3][3] = diag;

            let buf = encoded(&h);
            prop_assert_eq!(buf.len(), HEADER_SIZE);
            let back = TrkHeader::read(&buf[..]).unwrap();
            prop_assert_eq!(encoded(&back), buf);
            prop_assert_eq!(back.n_count, n_count);
            prop_assert_eq!(back.dim, dim);
        }
    }
}
