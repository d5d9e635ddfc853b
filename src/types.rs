use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DATE_NOT_SPECIFIED: &str = "Date not specified";
pub const NO_DESCRIPTION: &str = "No description available";

/// Derives the event identifier from its title.
///
/// Titles are the dedup key: two listings with the same title share an id
/// and are treated as one event.
pub fn event_id(title: &str) -> String {
    hex::encode(Sha256::digest(title.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub date: String,
    pub description: String,
    pub url: String,
    pub discovered_at: NaiveDateTime,
}

impl Event {
    pub fn new(title: String, date: String, description: String, url: String) -> Self {
        Self {
            id: event_id(&title),
            title,
            date,
            description,
            url,
            discovered_at: Local::now().naive_local(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.date)
    }
}
