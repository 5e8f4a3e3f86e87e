//! Deterministic zip archives.
//!
//! Entries are written in sorted order with a fixed 1980-01-01 timestamp and
//! fixed permissions, so the same contents always produce the same bytes.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const ENTRY_PERMISSIONS: u32 = 0o644;

fn entry_options() -> SimpleFileOptions {
  SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .last_modified_time(DateTime::default())
    .unix_permissions(ENTRY_PERMISSIONS)
}

/// Build a zip archive from `files`, keyed by path inside the archive.
pub fn write_archive(files: &BTreeMap<String, Vec<u8>>) -> io::Result<Vec<u8>> {
  let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
  for (name, bytes) in files {
    writer.start_file(name.as_str(), entry_options()).map_err(io::Error::from)?;
    writer.write_all(bytes)?;
  }
  let cursor = writer.finish().map_err(io::Error::from)?;
  Ok(cursor.into_inner())
}

/// Read one entry out of an archive, or `None` when it is absent.
pub fn read_entry(archive: &[u8], name: &str) -> io::Result<Option<Vec<u8>>> {
  let mut archive = ZipArchive::new(Cursor::new(archive)).map_err(io::Error::from)?;
  let mut entry = match archive.by_name(name) {
    Ok(entry) => entry,
    Err(zip::result::ZipError::FileNotFound) => return Ok(None),
    Err(e) => return Err(io::Error::from(e)),
  };
  let mut bytes = Vec::new();
  entry.read_to_end(&mut bytes)?;
  Ok(Some(bytes))
}

/// Names of every entry in an archive, in stored order.
pub fn entry_names(archive: &[u8]) -> io::Result<Vec<String>> {
  let archive = ZipArchive::new(Cursor::new(archive)).map_err(io::Error::from)?;
  Ok(archive.file_names().map(str::to_string).collect())
}
