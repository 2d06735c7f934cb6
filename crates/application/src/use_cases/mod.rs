mod process_query;
mod refresh_filters;

pub use process_query::{IncomingQuery, ProcessQueryUseCase};
pub use refresh_filters::RefreshFiltersUseCase;
