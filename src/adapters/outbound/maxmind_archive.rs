//! MaxMind Archive Extraction
//!
//! The GeoLite2 download is a gzip-compressed tarball holding the database
//! next to license and readme files.

use crate::error::{RadarError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;

const DATABASE_SUFFIX: &str = ".mmdb";

/// Pull the single database file out of a `.tar.gz` archive.
///
/// Directories, hidden files (base name starting with `.`) and files with
/// another suffix are ignored. Exactly one candidate must remain.
pub fn extract_database(archive: &[u8]) -> Result<Vec<u8>> {
    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    let mut found: Option<(String, Vec<u8>)> = None;

    for entry in tar.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.into_owned();
        if !is_database(&path) {
            continue;
        }

        let name = path.display().to_string();
        if let Some((first, _)) = &found {
            return Err(RadarError::format(format!(
                "multiple databases in archive: {} and {}",
                first, name
            )));
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        found = Some((name, data));
    }

    match found {
        Some((name, data)) => {
            tracing::debug!("extracted {} ({} bytes)", name, data.len());
            Ok(data)
        }
        None => Err(RadarError::format("no database file in archive")),
    }
}

fn is_database(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => !name.starts_with('.') && name.ends_with(DATABASE_SUFFIX),
        None => false,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_extract_single_database() {
        let archive = tarball(&[
            ("GeoLite2-City_20240101/LICENSE.txt", "license"),
            ("GeoLite2-City_20240101/GeoLite2-City.mmdb", "database"),
            ("GeoLite2-City_20240101/README.txt", "readme"),
        ]);

        assert_eq!(extract_database(&archive).unwrap(), b"database");
    }

    #[test]
    fn test_hidden_files_are_ignored() {
        let archive = tarball(&[
            ("db/._GeoLite2-City.mmdb", "resource fork"),
            ("db/GeoLite2-City.mmdb", "database"),
        ]);

        assert_eq!(extract_database(&archive).unwrap(), b"database");
    }

    #[test]
    fn test_two_databases_is_format_error() {
        let archive = tarball(&[("a/City.mmdb", "one"), ("b/Country.mmdb", "two")]);
        let err = extract_database(&archive).unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
    }

    #[test]
    fn test_missing_database_is_format_error() {
        let archive = tarball(&[("LICENSE.txt", "license")]);
        let err = extract_database(&archive).unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
    }

    #[test]
    fn test_not_gzip_is_format_error() {
        let err = extract_database(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
    }

    #[test]
    fn test_is_database() {
        assert!(is_database(Path::new("x/GeoLite2-City.mmdb")));
        assert!(!is_database(Path::new("x/.GeoLite2-City.mmdb")));
        assert!(!is_database(Path::new("x/GeoLite2-City.mmdb.sha256")));
        assert!(!is_database(Path::new("x/")));
    }
}
