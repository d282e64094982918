pub mod header;
pub mod track;
pub mod index;
pub mod io_stream;
pub mod file;
pub mod check;
pub mod sample;
pub mod error;

pub use header::{TrkHeader, HeaderError, HEADER_SIZE};
pub use track::{TrackEntry, TrackLayout};
pub use index::TrackIndex;
pub use io_stream::{TrkReader, TrkWriter, WriteOptions};
pub use file::{TrackFileReader, TrackFileWriter};
pub use error::{TrkError, Result};
