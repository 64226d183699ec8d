pub mod fetcher;
pub mod paginator;
