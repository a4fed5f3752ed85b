//! GeoNames Postal Loader
//!
//! Decodes the GeoNames postal code dump: a zip archive holding a single
//! tab-separated table with twelve columns per row.

use crate::domain::entities::{Coordinate, Location};
use crate::domain::services::LocationIndex;
use crate::error::{RadarError, Result};
use bytes::Bytes;
use std::collections::HashSet;
use std::io::Cursor;

const COLUMNS: usize = 12;

const COL_COUNTRY: usize = 0;
const COL_POSTAL: usize = 1;
const COL_PLACE: usize = 2;
const COL_SUBDIVISION1: usize = 4;
const COL_SUBDIVISION2: usize = 5;
const COL_LATITUDE: usize = 9;
const COL_LONGITUDE: usize = 10;

const PROGRESS_EVERY: usize = 50_000;

/// Builds a `LocationIndex` from a postal archive.
///
/// Loading is all-or-nothing: the first malformed row aborts with
/// `RadarError::Format` and no index is produced.
#[derive(Debug, Clone, Default)]
pub struct GeonamesLoader {
    /// Lower-cased country allow-list; empty admits every country
    countries: HashSet<String>,
}

impl GeonamesLoader {
    pub fn new<S: AsRef<str>>(countries: &[S]) -> Self {
        Self {
            countries: countries
                .iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    fn admits(&self, country: &str) -> bool {
        self.countries.is_empty() || self.countries.contains(&country.to_lowercase())
    }

    /// Decode `archive` into a fresh index.
    pub fn load(&self, archive: Bytes) -> Result<LocationIndex> {
        let records = self.parse(archive.clone())?;
        Ok(LocationIndex::build(records, archive))
    }

    fn parse(&self, archive: Bytes) -> Result<Vec<Location>> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
        if zip.len() != 1 {
            return Err(RadarError::format(format!(
                "expected one file in postal archive, found {}",
                zip.len()
            )));
        }

        let member = zip.by_index(0)?;
        tracing::debug!("reading postal table {}", member.name());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(member);

        let mut records = Vec::new();
        let mut rows = 0usize;

        for row in reader.records() {
            let row = row?;
            rows += 1;
            if rows % PROGRESS_EVERY == 0 {
                tracing::debug!("parsed {} postal rows", rows);
            }

            let line = row.position().map_or(rows as u64, |p| p.line());
            if row.len() != COLUMNS {
                return Err(RadarError::format(format!(
                    "line {}: expected {} columns, found {}",
                    line,
                    COLUMNS,
                    row.len()
                )));
            }

            if !self.admits(&row[COL_COUNTRY]) {
                continue;
            }

            let latitude = parse_degrees(&row[COL_LATITUDE], "latitude", line)?;
            let longitude = parse_degrees(&row[COL_LONGITUDE], "longitude", line)?;

            records.push(Location::new(
                &row[COL_COUNTRY],
                &row[COL_POSTAL],
                &row[COL_PLACE],
                &row[COL_SUBDIVISION1],
                &row[COL_SUBDIVISION2],
                Coordinate::new(latitude, longitude),
            ));
        }

        tracing::debug!("kept {} of {} postal rows", records.len(), rows);
        Ok(records)
    }
}

fn parse_degrees(field: &str, name: &str, line: u64) -> Result<f64> {
    field.trim().parse::<f64>().map_err(|e| {
        RadarError::format(format!("line {}: bad {} {:?}: {}", line, name, field, e))
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::value_objects::LocationId;
    use std::io::Write;
    use zip::write::FileOptions;

    const WASHINGTON: &str =
        "US\t20017\tWashington\tDistrict of Columbia\tDC\tDistrict of Columbia\t001\t\t\t38.9367\t-76.994\t4";
    const BROOKLYN: &str = "US\t11201\tBrooklyn\tNew York\tNY\tKings\t047\t\t\t40.6944\t-73.9906\t4";
    const PARIS: &str = "FR\t75001\tParis 01\tÎle-de-France\t11\tParis\t75\tParis\t751\t48.8592\t2.3417\t5";

    fn archive(files: &[(&str, String)]) -> Bytes {
        let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in files {
            w.start_file(*name, FileOptions::default()).unwrap();
            w.write_all(body.as_bytes()).unwrap();
        }
        Bytes::from(w.finish().unwrap().into_inner())
    }

    fn table(rows: &[&str]) -> Bytes {
        archive(&[("allCountries.txt", rows.join("\n") + "\n")])
    }

    #[test]
    fn test_load_postal_row() {
        let index = GeonamesLoader::default().load(table(&[WASHINGTON])).unwrap();

        let hit = index.postal(&LocationId::postal("US", "20017")).unwrap();
        assert_eq!(hit.coordinate, Coordinate::new(38.9367, -76.994));
        assert_eq!(hit.city, "washington");
        assert_eq!(hit.subdivision1, "dc");
        assert_eq!(hit.subdivision2, "district of columbia");
    }

    #[test]
    fn test_load_keeps_source() {
        let bytes = table(&[WASHINGTON, BROOKLYN]);
        let index = GeonamesLoader::default().load(bytes.clone()).unwrap();
        assert_eq!(index.source(), &bytes);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_country_allow_list() {
        let loader = GeonamesLoader::new(&["us"]);
        let index = loader.load(table(&[WASHINGTON, PARIS, BROOKLYN])).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.lookup(&LocationId::country("fr")).unwrap_err(),
            RadarError::NotFound
        );
    }

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let loader = GeonamesLoader::new(&["Fr", " "]);
        let index = loader.load(table(&[WASHINGTON, PARIS])).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.postal(&LocationId::postal("fr", "75001")).is_ok());
    }

    #[test]
    fn test_filtered_rows_skip_numeric_parse() {
        let bad_lat = "FR\t75002\tParis\tÎle-de-France\t11\tParis\t75\t\t\tnorth\t2.34\t5";
        let index = GeonamesLoader::new(&["US"])
            .load(table(&[WASHINGTON, bad_lat]))
            .unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_two_members_is_format_error() {
        let bytes = archive(&[
            ("US.txt", WASHINGTON.to_string()),
            ("readme.txt", "hello".to_string()),
        ]);
        let err = GeonamesLoader::default().load(bytes).unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
    }

    #[test]
    fn test_empty_archive_is_format_error() {
        let err = GeonamesLoader::default().load(archive(&[])).unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
    }

    #[test]
    fn test_eleven_columns_is_format_error() {
        let short = "US\t20017\tWashington\tDistrict of Columbia\tDC\tDistrict of Columbia\t001\t\t\t38.9367\t-76.994";
        let err = GeonamesLoader::default()
            .load(table(&[WASHINGTON, short]))
            .unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
        assert!(err.to_string().contains("11"));
    }

    #[test]
    fn test_bad_latitude_is_format_error() {
        let bad = "US\t20017\tWashington\tDistrict of Columbia\tDC\tDistrict of Columbia\t001\t\t\tabc\t-76.994\t4";
        let err = GeonamesLoader::default().load(table(&[bad])).unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_bad_longitude_is_format_error() {
        let bad = "US\t20017\tWashington\tDistrict of Columbia\tDC\tDistrict of Columbia\t001\t\t\t38.9\t\t4";
        let err = GeonamesLoader::default().load(table(&[bad])).unwrap_err();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_not_a_zip_is_format_error() {
        let err = GeonamesLoader::default()
            .load(Bytes::from_static(b"plain text"))
            .unwrap_err();
        assert!(matches!(err, RadarError::Format(_)));
    }

    #[test]
    fn test_quotes_are_literal() {
        let quoted = "US\t99999\t\"Quoted\" Place\tState\tST\t\t\t\t\t10.0\t20.0\t1";
        let index = GeonamesLoader::default().load(table(&[quoted])).unwrap();
        let hit = index.postal(&LocationId::postal("us", "99999")).unwrap();
        assert_eq!(hit.city, "\"quoted\" place");
    }
}
