mod dataset_fetcher;
mod ip_reader;

pub use dataset_fetcher::DatasetFetcher;
pub use ip_reader::{IpReader, IpReaderFactory};
