//! HTTP clients for the dashboard data providers

pub mod dart;
pub mod google_news;
pub mod krx;
pub mod yahoo;

pub use dart::DartClient;
pub use google_news::GoogleNewsClient;
pub use krx::KrxListingClient;
pub use yahoo::YahooPriceClient;
