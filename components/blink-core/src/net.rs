pub mod fetcher;
pub mod http;
