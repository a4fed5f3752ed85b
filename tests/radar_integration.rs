//! End-to-end refresh tests against archives served over HTTP.

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use geo_radar::adapters::outbound::{HttpFetcher, USER_AGENT};
use geo_radar::{
    Coordinate, IpLocation, IpReader, IpReaderFactory, LocationId, Radar, RadarError,
    RadarOptions, Result,
};
use std::io::{Cursor, Write};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DC: &str = "District of Columbia";

fn row(postal: &str, city: &str, s1: &str, s2: &str, lat: &str, lng: &str) -> String {
    format!("US\t{postal}\t{city}\tState\t{s1}\t{s2}\t001\t\t\t{lat}\t{lng}\t4")
}

fn washington_rows() -> Vec<String> {
    vec![
        row("20017", "Washington", "DC", DC, "38.9367", "-76.994"),
        row("20011", "Washington", "DC", DC, "38.9756", "-77.0282"),
        row("20032", "Washington", "DC", DC, "38.8263", "-77.0077"),
        row("20016", "Washington", "DC", DC, "38.9381", "-77.086"),
        row("20019", "Washington", "DC", DC, "38.8901", "-76.9376"),
        row("20001", "Washington", "DC", DC, "38.9122", "-77.0177"),
    ]
}

fn zip_archive(files: &[(&str, String)]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in files {
        w.start_file(*name, zip::write::FileOptions::default()).unwrap();
        w.write_all(body.as_bytes()).unwrap();
    }
    w.finish().unwrap().into_inner()
}

fn postal_archive(rows: &[String]) -> Vec<u8> {
    zip_archive(&[("allCountries.txt", rows.join("\n"))])
}

fn ip_archive(database: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(database.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "GeoLite2-City_20240101/GeoLite2-City.mmdb", database)
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

/// Reader that knows a single address, tagged with the database contents.
struct FixedReader {
    city: String,
}

impl IpReader for FixedReader {
    fn lookup(&self, ip: IpAddr) -> Result<Option<IpLocation>> {
        if ip.to_string() != "2.125.160.216" {
            return Ok(None);
        }
        Ok(Some(IpLocation {
            geoname_id: 2655045,
            country: "GB".to_string(),
            subdivision1: "ENG".to_string(),
            city: self.city.clone(),
            postal_code: Some("OX1".to_string()),
            coordinate: Coordinate::new(51.75, -1.25),
        }))
    }

    fn node_count(&self) -> u64 {
        1024
    }
}

struct FixedFactory;

impl IpReaderFactory for FixedFactory {
    fn open(&self, database: Vec<u8>) -> Result<Arc<dyn IpReader>> {
        let city = String::from_utf8(database).map_err(|e| RadarError::format(e.to_string()))?;
        Ok(Arc::new(FixedReader { city }))
    }
}

async fn mount(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn radar_for(server: &MockServer, with_ip: bool) -> Radar {
    let options = RadarOptions {
        geonames_uri: format!("{}/export/zip/allCountries.zip", server.uri()),
        maxmind_uri: with_ip.then(|| format!("{}/geoip_download", server.uri())),
        refresh_timeout: Duration::from_secs(10),
        ..Default::default()
    };
    Radar::with_ports(options, Arc::new(HttpFetcher::new().unwrap()), Arc::new(FixedFactory))
}

#[tokio::test]
async fn test_postal_and_city_queries() {
    let server = MockServer::start().await;
    mount(&server, "/export/zip/allCountries.zip", postal_archive(&washington_rows())).await;

    let radar = radar_for(&server, false);
    radar.wait().await;
    assert!(radar.take_error().is_none());

    let loc = radar.postal("US", "20017").unwrap();
    assert_eq!(loc.coordinate, Coordinate::new(38.9367, -76.994));
    assert_eq!(loc.city, "washington");

    let env = radar.city("US", "dc", "washington").unwrap();
    assert!((env.center().latitude - 38.90095).abs() < 1e-6);
    assert!((env.center().longitude - -77.0118).abs() < 1e-6);
    assert!((env.radius() - 10.505).abs() < 0.05);

    let same = radar
        .get(&"city:us,dc,washington".parse::<LocationId>().unwrap())
        .unwrap();
    assert_eq!(same.radius(), env.radius());
}

#[tokio::test]
async fn test_ip_query_through_archive() {
    let server = MockServer::start().await;
    mount(&server, "/export/zip/allCountries.zip", postal_archive(&washington_rows())).await;
    mount(&server, "/geoip_download", ip_archive(b"Boxford")).await;

    let radar = radar_for(&server, true);
    radar.wait().await;
    assert!(radar.take_error().is_none());

    let loc = radar.ip("2.125.160.216").unwrap();
    assert_eq!(loc.city, "boxford");
    assert_eq!(loc.postal_code, "ox1");
    assert_eq!(radar.ip("192.168.1.1").unwrap_err(), RadarError::NotFound);
    assert!(matches!(radar.ip("999.1.1.1"), Err(RadarError::InvalidInput(_))));
    assert_eq!(radar.stats().ip_nodes, 1024);
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/zip/allCountries.zip"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(postal_archive(&washington_rows())))
        .expect(1)
        .mount(&server)
        .await;

    let radar = radar_for(&server, false);
    radar.wait().await;
    assert!(radar.take_error().is_none());
}

#[tokio::test]
async fn test_not_ready_until_first_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let radar = radar_for(&server, true);
    radar.wait().await;

    assert!(matches!(radar.take_error(), Some(RadarError::Transport(_))));
    assert_eq!(radar.postal("us", "20017").unwrap_err(), RadarError::NotReady);
    assert_eq!(radar.city("us", "dc", "washington").unwrap_err(), RadarError::NotReady);
    assert_eq!(radar.ip("2.125.160.216").unwrap_err(), RadarError::NotReady);
}

#[tokio::test]
async fn test_failed_refresh_is_reported_once_and_keeps_data() {
    let server = MockServer::start().await;
    let good = postal_archive(&washington_rows());
    Mock::given(method("GET"))
        .and(path("/export/zip/allCountries.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(good.clone()))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let radar = radar_for(&server, false);
    radar.wait().await;
    assert!(radar.take_error().is_none());

    let mut short = washington_rows();
    short.push("US\t20500\tWashington\tState\tDC\tDC\t001\t\t\t38.89".to_string());
    mount(&server, "/export/zip/allCountries.zip", postal_archive(&short)).await;

    assert!(radar.refresh());
    radar.wait().await;

    assert!(matches!(radar.take_error(), Some(RadarError::Format(_))));
    assert!(radar.take_error().is_none());
    assert!(radar.postal("us", "20017").is_ok());
    assert_eq!(radar.postal("us", "20500").unwrap_err(), RadarError::NotFound);
    assert_eq!(radar.export().unwrap(), Bytes::from(good));
}

#[tokio::test]
async fn test_malformed_archives_are_format_errors() {
    let two_members = zip_archive(&[
        ("US.txt", washington_rows().join("\n")),
        ("readme.txt", "GeoNames postal codes".to_string()),
    ]);
    let mut bad_latitude = washington_rows();
    bad_latitude[2] = row("20032", "Washington", "DC", DC, "north", "-77.0077");
    let eleven_columns = vec!["US\t20017\tWashington\tState\tDC\tDC\t001\t\t\t38.9\t-76.9".to_string()];

    for body in [two_members, postal_archive(&bad_latitude), postal_archive(&eleven_columns)] {
        let server = MockServer::start().await;
        mount(&server, "/export/zip/allCountries.zip", body).await;

        let radar = radar_for(&server, false);
        radar.wait().await;

        assert!(matches!(radar.take_error(), Some(RadarError::Format(_))));
        assert_eq!(radar.postal("us", "20017").unwrap_err(), RadarError::NotReady);
    }
}

#[tokio::test]
async fn test_new_generation_replaces_old() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geoip_download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(ip_archive(b"Boxford")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(&server, "/export/zip/allCountries.zip", postal_archive(&washington_rows())).await;

    let radar = radar_for(&server, true);
    radar.wait().await;
    assert_eq!(radar.ip("2.125.160.216").unwrap().city, "boxford");

    mount(&server, "/geoip_download", ip_archive(b"Oxford")).await;
    radar.refresh();
    radar.wait().await;

    assert!(radar.take_error().is_none());
    assert_eq!(radar.ip("2.125.160.216").unwrap().city, "oxford");
    let stats = radar.stats();
    assert_eq!(stats.ip_generation, 2);
    assert_eq!(stats.postal_generation, 2);
    assert!(!stats.refreshing);
}
