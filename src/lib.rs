pub mod browser_pool;
pub mod cli;
pub mod config;
pub mod export;
pub mod exposer;
pub mod extractor;
pub mod field;
pub mod logger;
pub mod page;
pub mod record;
pub mod scrape;

pub use extractor::{AlignmentStrategy, Extractor};
pub use exposer::{Exposer, ExposureState, Pause, ScrollTarget, ThreadPause};
pub use field::FieldSpec;
pub use page::{HtmlSnapshot, PageContext};
pub use record::{Record, ResultSet};
pub use scrape::{run_scrape, ScrapeError, ScrapeOutcome};
