//! Durable, versioned persistence of a Catalogue.
//!
//! The current container format is a gzip-compressed SQLite database holding
//! one `files` table (`path`, `content_hash`, `attributes_hash`) with the
//! schema version recorded in `PRAGMA user_version`. Readers refuse anything
//! newer than [`MAX_DB_SCHEMA_VERSION`]; older versions share the same table
//! layout and read fine.
//!
//! The first-generation format was a flat CSV export with no version marker.
//! Once a project has been written in the current format, the legacy object
//! is overwritten with [`LEGACY_POISON`] so that old clients fail loudly
//! instead of syncing against a stale catalogue.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::Connection;
use tempfile::NamedTempFile;

use crate::catalogue::Catalogue;
use crate::error::{Error, Result};

/// Highest container schema version this build reads and the version it
/// always writes. Bumped whenever the table layout changes.
pub const MAX_DB_SCHEMA_VERSION: u32 = 2;

/// Well-known object key of the current versioned container, relative to the
/// project's remote prefix.
pub const CURRENT_CATALOGUE_KEY: &str = ".sitesync.cat";

/// Well-known object key of the first-generation flat-text catalogue.
pub const LEGACY_CATALOGUE_KEY: &str = ".sitesync.catalogue.csv";

/// Fixed byte sequence written over the legacy object after every successful
/// sync. Deliberately invalid UTF-8 so any text-mode CSV reader fails at
/// decode time rather than parsing garbage.
pub const LEGACY_POISON: &[u8] =
    b"\xff\xfesitesync: catalogue moved to versioned container\xff\xfe\n";

const LEGACY_HEADER: [&str; 3] = ["path", "content_hash", "attributes_hash"];

/// Encode a catalogue into the current container format.
///
/// # Errors
/// Returns an error if staging or compression fails.
pub fn encode(catalogue: &Catalogue) -> Result<Vec<u8>> {
    let staging = NamedTempFile::new()?;
    {
        let mut conn = Connection::open(staging.path())?;
        conn.pragma_update(None, "user_version", MAX_DB_SCHEMA_VERSION)?;
        conn.execute(
            "CREATE TABLE files (
                path TEXT,
                content_hash TEXT,
                attributes_hash TEXT
            )",
            [],
        )?;
        let tx = conn.transaction()?;
        for (path, entry) in catalogue.entries() {
            tx.execute(
                "INSERT INTO files (path, content_hash, attributes_hash)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![path, entry.content_hash, entry.attributes_hash],
            )?;
        }
        tx.commit()?;
    }

    let raw = std::fs::read(staging.path())?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Decode a catalogue from the current container format.
///
/// # Errors
/// Returns [`Error::UnsupportedCatalogueVersion`] when the stored schema
/// version is newer than this build understands, or [`Error::Catalogue`]
/// when decompression or the table read fails.
pub fn decode(bytes: &[u8]) -> Result<Catalogue> {
    let mut decoder = GzDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| Error::Catalogue(format!("gzip decompression failed: {e}")))?;

    let staging = NamedTempFile::new()?;
    std::fs::write(staging.path(), &raw)?;
    let conn = Connection::open(staging.path())?;

    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > MAX_DB_SCHEMA_VERSION {
        return Err(Error::UnsupportedCatalogueVersion {
            found: version,
            max: MAX_DB_SCHEMA_VERSION,
        });
    }

    let mut catalogue = Catalogue::new();
    let mut stmt = conn.prepare("SELECT path, content_hash, attributes_hash FROM files")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    for row in rows {
        let (path, content_hash, attributes_hash) = row?;
        catalogue.add(path, content_hash, attributes_hash);
    }
    Ok(catalogue)
}

/// Encode a catalogue into the legacy flat-text format: a header row then
/// one fully-quoted row per entry.
///
/// # Errors
/// Returns an error if CSV serialization fails.
pub fn encode_legacy(catalogue: &Catalogue) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());
    writer
        .write_record(LEGACY_HEADER)
        .map_err(|e| Error::Catalogue(e.to_string()))?;
    for (path, entry) in catalogue.entries() {
        writer
            .write_record([
                path.as_str(),
                entry.content_hash.as_str(),
                entry.attributes_hash.as_str(),
            ])
            .map_err(|e| Error::Catalogue(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Catalogue(e.to_string()))
}

/// Decode a catalogue from the legacy flat-text format.
///
/// Any failure — invalid UTF-8 (the poison pill), a missing or unexpected
/// header, malformed rows — is fatal: it signals a catalogue from an
/// incompatible generation and must never be treated as empty.
///
/// # Errors
/// Returns [`Error::LegacyCatalogueUndecodable`] on any decode failure.
pub fn decode_legacy(bytes: &[u8]) -> Result<Catalogue> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::LegacyCatalogueUndecodable(format!("not valid UTF-8: {e}")))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::LegacyCatalogueUndecodable(e.to_string()))?
        .clone();
    if !headers.iter().eq(LEGACY_HEADER) {
        return Err(Error::LegacyCatalogueUndecodable(format!(
            "unexpected header row: {headers:?}"
        )));
    }

    let mut catalogue = Catalogue::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::LegacyCatalogueUndecodable(e.to_string()))?;
        if record.len() != 3 {
            return Err(Error::LegacyCatalogueUndecodable(format!(
                "expected 3 fields per row, found {}",
                record.len()
            )));
        }
        catalogue.add(&record[0], &record[1], &record[2]);
    }
    Ok(catalogue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edgecase_catalogue() -> Catalogue {
        let mut cat = Catalogue::new();
        cat.add("test/blah.img", "AABBCC", "XXYYZZ")
            .add("test/blah.img", "AABBCC", "112233")
            .add("fest_\u{042c}\u{2113}\u{03c3}\u{0411}: &8>", "FS FSFS", "7A9 ")
            .add("\u{266c} /music.fav.mp3", 200_010, "7A9 ")
            .add("test/I think, \"great.img", "AABBCC", "11,2233");
        cat
    }

    #[test]
    fn test_container_roundtrip() {
        let cat = edgecase_catalogue();
        let bytes = encode(&cat).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.entries(), cat.entries());
    }

    #[test]
    fn test_container_roundtrip_empty() {
        let bytes = encode(&Catalogue::new()).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_container_is_gzip_compressed() {
        let mut cat = Catalogue::new();
        cat.add("a.txt", "1", "2");
        let bytes = encode(&cat).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b], "gzip magic expected");
    }

    fn gzipped_sqlite(version: u32, create_files_table: bool) -> Vec<u8> {
        let staging = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(staging.path()).unwrap();
            conn.pragma_update(None, "user_version", version).unwrap();
            if create_files_table {
                conn.execute(
                    "CREATE TABLE files (
                        path TEXT,
                        content_hash TEXT,
                        attributes_hash TEXT
                    )",
                    [],
                )
                .unwrap();
                conn.execute("INSERT INTO files VALUES ('old.txt', 'C1', 'A1')", [])
                    .unwrap();
            } else {
                conn.execute("CREATE TABLE dummy (path TEXT)", []).unwrap();
            }
        }
        let raw = std::fs::read(staging.path()).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_older_schema_version_reads_fine() {
        let bytes = gzipped_sqlite(MAX_DB_SCHEMA_VERSION - 1, true);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded.get("old.txt").is_some());
    }

    #[test]
    fn test_newer_schema_version_rejected() {
        let bytes = gzipped_sqlite(MAX_DB_SCHEMA_VERSION + 1, false);
        match decode(&bytes) {
            Err(Error::UnsupportedCatalogueVersion { found, max }) => {
                assert_eq!(found, MAX_DB_SCHEMA_VERSION + 1);
                assert_eq!(max, MAX_DB_SCHEMA_VERSION);
            }
            other => panic!("expected UnsupportedCatalogueVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_non_gzip() {
        assert!(matches!(
            decode(b"definitely not gzip"),
            Err(Error::Catalogue(_))
        ));
    }

    #[test]
    fn test_legacy_roundtrip() {
        let cat = edgecase_catalogue();
        let bytes = encode_legacy(&cat).unwrap();
        let decoded = decode_legacy(&bytes).unwrap();
        assert_eq!(decoded.entries(), cat.entries());
    }

    #[test]
    fn test_legacy_rows_fully_quoted() {
        let mut cat = Catalogue::new();
        cat.add("a.txt", "C1", "A1");
        let text = String::from_utf8(encode_legacy(&cat).unwrap()).unwrap();
        assert!(text.contains("\"a.txt\",\"C1\",\"A1\""), "{text}");
    }

    #[test]
    fn test_legacy_embedded_quotes_doubled() {
        let mut cat = Catalogue::new();
        cat.add("test/I think, \"great.img", "AABBCC", "11,2233");
        let text = String::from_utf8(encode_legacy(&cat).unwrap()).unwrap();
        assert!(text.contains("\"test/I think, \"\"great.img\""), "{text}");
    }

    #[test]
    fn test_legacy_decode_rejects_poison_pill() {
        assert!(matches!(
            decode_legacy(LEGACY_POISON),
            Err(Error::LegacyCatalogueUndecodable(_))
        ));
    }

    #[test]
    fn test_legacy_decode_rejects_wrong_header() {
        let bytes = b"foo,bar,baz\n\"a\",\"b\",\"c\"\n";
        assert!(matches!(
            decode_legacy(bytes),
            Err(Error::LegacyCatalogueUndecodable(_))
        ));
    }
}
