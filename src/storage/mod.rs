//! SQLite full-text index of URLs and their link text.
mod types;
mod url_index;

pub use types::{IndexError, SearchLink};
pub use url_index::UrlIndex;
