use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

/// One file decoded from a deployment archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("not a readable zip archive: {0}")]
    Format(#[source] ZipError),
    #[error("failed to read archive entry at index {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: ZipError,
    },
    #[error("archive entry '{name}' declares {declared} bytes but holds {actual}")]
    SizeMismatch {
        name: String,
        declared: u64,
        actual: u64,
    },
    #[error("failed to inflate archive entry '{name}': {source}")]
    Inflate {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decodes every file entry of a fully buffered zip archive.
///
/// Directory entries are skipped; everything else is returned in central
/// directory order. Header sizes are untrusted: a payload is read up to one
/// byte past its declared size and must then match it exactly.
pub fn decode_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(ArchiveError::Format)?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|source| ArchiveError::Entry { index, source })?;

        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let declared = file.size();
        let mut payload = Vec::new();
        file.by_ref()
            .take(declared.saturating_add(1))
            .read_to_end(&mut payload)
            .map_err(|source| ArchiveError::Inflate {
                name: name.clone(),
                source,
            })?;

        let actual = u64::try_from(payload.len()).unwrap_or(u64::MAX);
        if actual != declared {
            return Err(ArchiveError::SizeMismatch {
                name,
                declared,
                actual,
            });
        }

        entries.push(ArchiveEntry { name, payload });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use super::*;

    fn build_zip(files: &[(&str, &[u8])], directories: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for directory in directories {
            writer
                .add_directory(*directory, options)
                .expect("directory should be added");
        }
        for (name, body) in files {
            writer.start_file(*name, options).expect("file should start");
            writer.write_all(body).expect("file body should write");
        }
        writer.finish().expect("zip should finish").into_inner()
    }

    #[test]
    fn decodes_file_entries_and_skips_directories() {
        let bytes = build_zip(
            &[
                ("unit/public/index.html", b"<html></html>"),
                ("unit/public/app.js", b"console.log(1)"),
            ],
            &["unit/", "unit/public/"],
        );

        let entries = decode_archive(&bytes).expect("archive should decode");
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();

        assert_eq!(names, vec!["unit/public/index.html", "unit/public/app.js"]);
        assert_eq!(entries[0].payload, b"<html></html>");
    }

    #[test]
    fn empty_archive_has_no_entries() {
        let bytes = build_zip(&[], &[]);
        assert!(decode_archive(&bytes).expect("archive should decode").is_empty());
    }

    fn stored_zip(name: &str, body: &[u8]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(name, options).expect("file should start");
        writer.write_all(body).expect("file body should write");
        writer.finish().expect("zip should finish").into_inner()
    }

    #[test]
    fn oversized_header_is_rejected_without_allocating_it() {
        let mut bytes = stored_zip("unit/public/index.html", b"hello");
        let central = bytes
            .windows(4)
            .position(|window| window == [0x50, 0x4b, 0x01, 0x02])
            .expect("central directory header should exist");
        // Uncompressed size lives 24 bytes into the central directory header.
        bytes[central + 24..central + 28].copy_from_slice(&[0xff; 4]);

        assert!(decode_archive(&bytes).is_err());
    }

    #[test]
    fn undersized_header_is_a_size_mismatch() {
        let mut bytes = stored_zip("unit/public/index.html", b"hello");
        let central = bytes
            .windows(4)
            .position(|window| window == [0x50, 0x4b, 0x01, 0x02])
            .expect("central directory header should exist");
        bytes[central + 24..central + 28].copy_from_slice(&2u32.to_le_bytes());

        let error = decode_archive(&bytes).expect_err("decode should fail");
        assert!(matches!(
            error,
            ArchiveError::SizeMismatch {
                declared: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_archive_bytes() {
        let error = decode_archive(b"definitely not a zip").expect_err("decode should fail");
        assert!(matches!(error, ArchiveError::Format(_)));
    }
}
