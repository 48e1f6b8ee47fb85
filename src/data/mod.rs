pub mod loader;
pub mod types;

pub use loader::{load, load_from_str, save, LoaderError, REQUIRED_FIELDS};
pub use types::{format_timestamp, parse_timestamp, ResultRecord, ResultSeries};
