mod geonames_loader;
mod http_fetcher;
mod maxmind_archive;
mod maxmind_ip_reader;

pub use geonames_loader::GeonamesLoader;
pub use http_fetcher::{HttpFetcher, USER_AGENT};
pub use maxmind_archive::extract_database;
pub use maxmind_ip_reader::{MaxMindIpReader, MaxMindReaderFactory};
