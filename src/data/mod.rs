use std::fs;
use std::io::Cursor;
use std::path::Path;

use bincode::ErrorKind;
use thiserror::Error;

use crate::catalog::catalog::StarCatalog;

/// Compression level for catalog snapshots. Snapshots are written once by
/// the dataset builder and read at service startup, so the slow, dense end
/// of zstd is the right trade.
const SNAPSHOT_COMPRESSION_LEVEL: i32 = 19;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] Box<ErrorKind>),
    #[error("Compression error: {0}")]
    Compression(#[source] std::io::Error),
}

pub fn serialize_catalog(catalog: &StarCatalog) -> Result<Vec<u8>, DataError> {
    let encoded = bincode::serialize(catalog)?;
    let mut cursor = Cursor::new(encoded);
    zstd::stream::encode_all(&mut cursor, SNAPSHOT_COMPRESSION_LEVEL).map_err(DataError::Compression)
}

/// Decode a snapshot and rebuild the lookup indices, which are not part of
/// the serialized form.
pub fn deserialize_catalog(bytes: &[u8]) -> Result<StarCatalog, DataError> {
    let mut cursor = Cursor::new(bytes);
    let decoded = zstd::stream::decode_all(&mut cursor).map_err(DataError::Compression)?;
    let mut catalog: StarCatalog = bincode::deserialize(&decoded)?;
    catalog.rebuild_indices();
    Ok(catalog)
}

pub fn write_catalog_to_file<P: AsRef<Path>>(
    catalog: &StarCatalog,
    path: P,
) -> Result<(), DataError> {
    let bytes = serialize_catalog(catalog)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_catalog_from_file<P: AsRef<Path>>(path: P) -> Result<StarCatalog, DataError> {
    let bytes = fs::read(path)?;
    deserialize_catalog(&bytes)
}
