pub mod cli;
pub mod error;
pub mod export;
pub mod model;
pub mod parse;
pub mod stats;
pub mod util;

pub use error::{AuthorstatError, Result};
pub use model::{Author, Commit, DataContainer, File, FileChange, TimeWindow};
pub use parse::LogParser;
pub use stats::{AuthorStats, ProjectStats, StatsEngine, StatsOutput, WindowReport};
