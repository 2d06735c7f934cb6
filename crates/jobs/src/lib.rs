pub mod filter_refresh;
pub mod runner;

pub use filter_refresh::FilterRefreshJob;
pub use runner::JobRunner;
