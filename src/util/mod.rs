//! Utility functions for common operations.
//!
//! - **Text processing**: whitespace collapsing, ASCII folding and
//!   normalization for the full-text index
//! - **Dates**: lenient parsing of sitemap, feed and meta tag dates
//! - **XML**: small helpers shared by the quick-xml readers

mod dates;
mod text;
pub(crate) mod xml;

pub use dates::{days_between, days_since, parse_datetime, parse_naive_ignoring_tz};
pub use text::{ascii_fold, collapse_whitespace, norm_words};
