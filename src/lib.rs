pub mod config;
pub mod diff;
pub mod notifier;
pub mod parser;
pub mod scraper;
pub mod store;
pub mod tracker;
pub mod types;

pub use scraper::WebScraper;
pub use tracker::Tracker;

pub const EVENTS_URL: &str = "https://omswami.org/events";
