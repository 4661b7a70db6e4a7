pub mod repository;
pub mod status;
pub mod utils;

pub use repository::{CommitSummary, GitRepo};
pub use status::ChangedFile;
