use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::{self, File};
use std::io::Write;
use tempfile::NamedTempFile;
use trkio::check::TrackHealth;
use trkio::{TrackFileReader, TrackFileWriter, TrkError, TrkHeader, HEADER_SIZE};

/// Header with zero scalars/properties, then
/// track 0 = (0,0,0) (1,0,0) (2,0,0) and track 1 = (0,1,0) (1,1,1).
fn write_scenario(path: &std::path::Path) {
    let mut f = File::create(path).unwrap();
    TrkHeader::new().write(&mut f).unwrap();
    let tracks: [&[f32]; 2] = [
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0],
        &[0.0, 1.0, 0.0, 1.0, 1.0, 1.0],
    ];
    for t in tracks {
        f.write_i32::<LittleEndian>((t.len() / 3) as i32).unwrap();
        for &v in t {
            f.write_f32::<LittleEndian>(v).unwrap();
        }
    }
}

#[test]
fn test_scenario_reads() {
    let tmp = NamedTempFile::new().unwrap();
    write_scenario(tmp.path());

    let mut reader = TrackFileReader::new(tmp.path());
    reader.open().unwrap();
    assert_eq!(reader.track_count(), 2);
    assert_eq!(reader.read_track(0).unwrap(), vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    assert_eq!(reader.read_point(1, 1).unwrap(), [1.0, 1.0, 1.0]);
    reader.close();
}

#[test]
fn test_scenario_copy_and_append() {
    let src = NamedTempFile::new().unwrap();
    let dst = NamedTempFile::new().unwrap();
    write_scenario(src.path());

    {
        let mut reader = TrackFileReader::open_path(src.path()).unwrap();
        let mut writer = TrackFileWriter::new(dst.path());
        writer.copy_header(reader.header().unwrap());
        writer.create().unwrap();
        for i in 0..reader.track_count() {
            let t = reader.read_track(i).unwrap();
            writer.append_track(&t).unwrap();
        }
        writer.append_track(&[9.0, 9.0, 9.0]).unwrap();
        writer.close().unwrap();
        reader.close();
    }

    let mut fresh = TrackFileReader::open_path(dst.path()).unwrap();
    assert_eq!(fresh.track_count(), 3);
    assert_eq!(fresh.read_track(2).unwrap(), vec![9.0, 9.0, 9.0]);
    assert_eq!(fresh.read_track(1).unwrap(), vec![0.0, 1.0, 0.0, 1.0, 1.0, 1.0]);
    assert_eq!(fresh.header().unwrap().n_count, 0);
}

#[test]
fn test_open_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = TrackFileReader::new(dir.path().join("absent.trk"));
    assert!(matches!(reader.open(), Err(TrkError::Open { .. })));
    assert!(!reader.is_open());
    assert_eq!(reader.track_count(), 0);
}

#[test]
fn test_create_in_missing_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = TrackFileWriter::new(dir.path().join("no/such/dir/out.trk"));
    assert!(matches!(writer.create(), Err(TrkError::Open { .. })));
    assert!(!writer.is_open());
}

#[test]
fn test_truncated_header_is_fatal_for_open() {
    let tmp = NamedTempFile::new().unwrap();
    let mut buf = Vec::new();
    TrkHeader::new().write(&mut buf).unwrap();
    fs::write(tmp.path(), &buf[..600]).unwrap();

    let mut reader = TrackFileReader::new(tmp.path());
    assert!(matches!(
        reader.open(),
        Err(TrkError::Header(trkio::HeaderError::Truncated { read: 600 }))
    ));
    assert!(!reader.is_open());
}

#[test]
fn test_closed_reader_and_writer() {
    let tmp = NamedTempFile::new().unwrap();
    write_scenario(tmp.path());

    let mut reader = TrackFileReader::open_path(tmp.path()).unwrap();
    reader.close();
    reader.close();
    assert!(matches!(reader.read_track(0), Err(TrkError::NotOpen)));
    assert_eq!(reader.point_count(0), None);

    let out = NamedTempFile::new().unwrap();
    let mut writer = TrackFileWriter::new(out.path());
    assert!(matches!(writer.append_track(&[0.0; 3]), Err(TrkError::NotOpen)));
    writer.create().unwrap();
    writer.close().unwrap();
    writer.close().unwrap();
    assert_eq!(fs::metadata(out.path()).unwrap().len(), HEADER_SIZE as u64);
}

#[test]
fn test_invalid_append_leaves_file_unchanged() {
    let tmp = NamedTempFile::new().unwrap();
    let mut writer = TrackFileWriter::new(tmp.path());
    writer.create().unwrap();
    writer.append_track(&[1.0, 2.0, 3.0]).unwrap();
    writer.save().unwrap();
    let before = fs::metadata(tmp.path()).unwrap().len();

    assert!(matches!(
        writer.append_track(&[1.0, 2.0, 3.0, 4.0]),
        Err(TrkError::InvalidPointCount { len: 4 })
    ));
    writer.save().unwrap();
    assert_eq!(fs::metadata(tmp.path()).unwrap().len(), before);
}

#[test]
fn test_save_makes_appends_visible() {
    let tmp = NamedTempFile::new().unwrap();
    let mut writer = TrackFileWriter::new(tmp.path());
    writer.create().unwrap();
    writer.append_track(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    writer.save().unwrap();

    let mut reader = TrackFileReader::open_path(tmp.path()).unwrap();
    assert_eq!(reader.track_count(), 1);
    assert_eq!(reader.read_point(0, 1).unwrap(), [4.0, 5.0, 6.0]);

    writer.append_track(&[7.0, 8.0, 9.0]).unwrap();
    writer.close().unwrap();
    reader.open().unwrap();
    assert_eq!(reader.track_count(), 2);
}

#[test]
fn test_drop_finalizes_writer() {
    let tmp = NamedTempFile::new().unwrap();
    let mut src = TrkHeader::new();
    src.dim = [64, 64, 32];
    src.n_scalars = 2;
    {
        let mut writer = TrackFileWriter::new(tmp.path());
        writer.create().unwrap();
        writer.copy_header(&src);
        writer.append_track(&[1.0, 1.0, 1.0]).unwrap();
    }

    let mut reader = TrackFileReader::open_path(tmp.path()).unwrap();
    let h = reader.header().unwrap();
    assert_eq!(h.dim, [64, 64, 32]);
    assert_eq!(h.n_scalars, 0);
    assert_eq!(reader.read_track(0).unwrap(), vec![1.0, 1.0, 1.0]);
}

#[test]
fn test_scalars_and_properties_are_stripped_on_copy() {
    let src = NamedTempFile::new().unwrap();
    {
        let mut h = TrkHeader::new();
        h.n_scalars = 1;
        h.n_properties = 2;
        let mut f = File::create(src.path()).unwrap();
        h.write(&mut f).unwrap();
        f.write_i32::<LittleEndian>(2).unwrap();
        for v in [1.0f32, 2.0, 3.0, 0.25, 4.0, 5.0, 6.0, 0.75, 10.0, 20.0] {
            f.write_f32::<LittleEndian>(v).unwrap();
        }
    }

    let dst = NamedTempFile::new().unwrap();
    let opts = trkio::sample::SampleOptions { rate: 1.0, ..Default::default() };
    trkio::sample::sample_file(src.path(), dst.path(), &opts).unwrap();

    let mut reader = TrackFileReader::open_path(dst.path()).unwrap();
    let h = reader.header().unwrap();
    assert_eq!((h.n_scalars, h.n_properties), (0, 0));
    assert_eq!(reader.read_track(0).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(fs::metadata(dst.path()).unwrap().len(), HEADER_SIZE as u64 + 4 + 24);
}

#[test]
fn test_validate_reports_truncation() {
    let tmp = NamedTempFile::new().unwrap();
    write_scenario(tmp.path());
    let len = fs::metadata(tmp.path()).unwrap().len();
    let f = fs::OpenOptions::new().write(true).open(tmp.path()).unwrap();
    f.set_len(len - 6).unwrap();
    drop(f);

    let mut reader = TrackFileReader::open_path(tmp.path()).unwrap();
    assert_eq!(reader.track_count(), 2);
    assert!(reader.read_track(1).is_err());

    let report = reader.validate().unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.tracks[1].health, TrackHealth::Truncated { points_read: 1 });
}

#[test]
fn test_header_write_is_exact() {
    let mut sink = Vec::new();
    let mut h = TrkHeader::new();
    h.voxel_size = [2.0, 2.0, 2.0];
    h.write(&mut sink).unwrap();
    sink.flush().unwrap();
    assert_eq!(sink.len(), HEADER_SIZE);
    assert_eq!(&sink[..5], b"TRACK");
}
