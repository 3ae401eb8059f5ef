//! Archive manager: packs named UTF-8 entries into a compressed container.
//!
//! The container is a tar stream, zstd-compressed by default. Unpacking sniffs
//! the zstd magic so both outputs of the compression toggle are accepted.

use crate::client::FileSaver;
use crate::error::{EngineError, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use tar::{Archive, Builder, Header};

/// File extension of packed archives.
pub const ARCHIVE_EXT: &str = "tar.zst";

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const DEFAULT_ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct PackOptions {
    pub compress: bool,
    pub level: i32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            compress: true,
            level: DEFAULT_ZSTD_LEVEL,
        }
    }
}

/// Collect `(logical path, content)` pairs into an entry map, rejecting
/// duplicate logical paths.
pub fn into_entry_map(entries: Vec<(String, String)>) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for (path, content) in entries {
        if map.insert(path.clone(), content).is_some() {
            return Err(EngineError::Archive(format!(
                "duplicate logical path '{path}'"
            )));
        }
    }
    Ok(map)
}

/// Pack entries into a single blob. Returns the blob and its size in bytes.
pub fn pack(entries: &BTreeMap<String, String>, options: &PackOptions) -> Result<(Vec<u8>, u64)> {
    if entries.is_empty() {
        return Err(EngineError::Archive("no entries to pack".to_string()));
    }

    let mut builder = Builder::new(Vec::new());
    let mtime = chrono::Utc::now().timestamp().max(0) as u64;
    for (path, content) in entries {
        let data = content.as_bytes();
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder
            .append_data(&mut header, path, data)
            .map_err(|e| EngineError::Archive(format!("tar append failed for '{path}': {e}")))?;
    }
    let tar_bytes = builder
        .into_inner()
        .map_err(|e| EngineError::Archive(format!("tar finalize failed: {e}")))?;

    let blob = if options.compress {
        zstd::encode_all(Cursor::new(tar_bytes), options.level)
            .map_err(|e| EngineError::Archive(format!("zstd compression failed: {e}")))?
    } else {
        tar_bytes
    };

    let size = blob.len() as u64;
    Ok((blob, size))
}

/// Unpack a blob into its full entry map.
///
/// All-or-nothing: an archive that cannot be parsed, or whose entries are not
/// valid UTF-8, yields an error and never a partial map.
pub fn unpack(blob: &[u8]) -> Result<BTreeMap<String, String>> {
    let tar_bytes = decompress_if_needed(blob)?;
    let mut archive = Archive::new(Cursor::new(tar_bytes));
    let mut map = BTreeMap::new();

    let entries = archive
        .entries()
        .map_err(|e| EngineError::UnrecognizedArchive(format!("not a valid container: {e}")))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| EngineError::UnrecognizedArchive(format!("corrupt entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| EngineError::UnrecognizedArchive(format!("invalid entry path: {e}")))?
            .to_string_lossy()
            .to_string();
        let mut content = String::new();
        entry.read_to_string(&mut content).map_err(|e| {
            EngineError::UnrecognizedArchive(format!("entry '{path}' is not UTF-8 text: {e}"))
        })?;
        map.insert(path, content);
    }

    if map.is_empty() {
        return Err(EngineError::UnrecognizedArchive(
            "archive contains no entries".to_string(),
        ));
    }
    Ok(map)
}

/// List `(logical path, content size)` without extracting contents.
pub fn list_entries(blob: &[u8]) -> Result<Vec<(String, u64)>> {
    let tar_bytes = decompress_if_needed(blob)?;
    let mut archive = Archive::new(Cursor::new(tar_bytes));
    let mut listing = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| EngineError::UnrecognizedArchive(format!("not a valid container: {e}")))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| EngineError::UnrecognizedArchive(format!("corrupt entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| EngineError::UnrecognizedArchive(format!("invalid entry path: {e}")))?
            .to_string_lossy()
            .to_string();
        listing.push((path, entry.size()));
    }

    if listing.is_empty() {
        return Err(EngineError::UnrecognizedArchive(
            "archive contains no entries".to_string(),
        ));
    }
    Ok(listing)
}

/// Hand a finished blob to the host file-save primitive. The one place the
/// engine touches presentation.
pub fn save(saver: &dyn FileSaver, filename: &str, blob: &[u8]) -> Result<()> {
    tracing::info!(filename, bytes = blob.len(), "Handing archive to host for download");
    saver.save(filename, blob)
}

fn decompress_if_needed(blob: &[u8]) -> Result<Vec<u8>> {
    if blob.is_empty() {
        return Err(EngineError::UnrecognizedArchive("empty blob".to_string()));
    }
    if blob.len() >= ZSTD_MAGIC.len() && blob[..ZSTD_MAGIC.len()] == ZSTD_MAGIC {
        return zstd::decode_all(Cursor::new(blob))
            .map_err(|e| EngineError::UnrecognizedArchive(format!("zstd decompression failed: {e}")));
    }
    Ok(blob.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> BTreeMap<String, String> {
        into_entry_map(vec![
            ("data/staff".to_string(), "name,role\nAlice,admin\n".to_string()),
            ("data/metadata".to_string(), "{\"collections\":1}".to_string()),
        ])
        .unwrap()
    }

    #[test]
    fn pack_unpack_round_trips_compressed() {
        let entries = sample_entries();
        let (blob, size) = pack(&entries, &PackOptions::default()).unwrap();
        assert_eq!(size, blob.len() as u64);
        assert_eq!(blob[..4], ZSTD_MAGIC);
        assert_eq!(unpack(&blob).unwrap(), entries);
    }

    #[test]
    fn pack_unpack_round_trips_uncompressed() {
        let entries = sample_entries();
        let options = PackOptions { compress: false, ..Default::default() };
        let (blob, _) = pack(&entries, &options).unwrap();
        assert_ne!(blob[..4], ZSTD_MAGIC);
        assert_eq!(unpack(&blob).unwrap(), entries);
    }

    #[test]
    fn list_entries_reports_paths_and_sizes() {
        let entries = sample_entries();
        let (blob, _) = pack(&entries, &PackOptions::default()).unwrap();
        let listing = list_entries(&blob).unwrap();
        assert_eq!(listing.len(), 2);
        let staff = listing.iter().find(|(p, _)| p == "data/staff").unwrap();
        assert_eq!(staff.1, "name,role\nAlice,admin\n".len() as u64);
    }

    #[test]
    fn duplicate_logical_paths_rejected() {
        let err = into_entry_map(vec![
            ("data/staff".to_string(), "a".to_string()),
            ("data/staff".to_string(), "b".to_string()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn empty_entry_map_rejected() {
        let err = pack(&BTreeMap::new(), &PackOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Archive(_)));
    }

    #[test]
    fn garbage_blob_rejected_wholesale() {
        assert!(unpack(b"definitely not a tar stream").is_err());
        assert!(unpack(&[]).is_err());
        assert!(list_entries(b"\x28\xB5\x2F\xFDgarbage").is_err());
    }
}
