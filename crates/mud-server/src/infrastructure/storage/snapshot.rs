//! Snapshot files: a `WorldSnapshot` encoded with bincode and gzip-compressed.
//!
//! The format version travels inside the encoded record and is checked on
//! load, so a file written by an incompatible build is refused with a clear
//! error instead of being misread.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::application::snapshot::{
    SnapshotError, SnapshotStore, WorldSnapshot, SNAPSHOT_FORMAT_VERSION,
};

#[derive(Debug, Clone, Default)]
pub struct GzipSnapshotStore {
    level: Compression,
}

impl GzipSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SnapshotError {
    SnapshotError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl SnapshotStore for GzipSnapshotStore {
    fn save(&self, path: &Path, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        let file = File::create(path).map_err(|e| io_error(path, e))?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), self.level);
        bincode::serialize_into(&mut encoder, snapshot)
            .map_err(|e| SnapshotError::Encode(e.to_string()))?;
        let mut writer = encoder.finish().map_err(|e| io_error(path, e))?;
        writer.flush().map_err(|e| io_error(path, e))?;
        debug!(path = %path.display(), places = snapshot.places.len(), "snapshot saved");
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<WorldSnapshot, SnapshotError> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        let decoder = GzDecoder::new(BufReader::new(file));
        let snapshot: WorldSnapshot = bincode::deserialize_from(decoder)
            .map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(snapshot)
    }
}
