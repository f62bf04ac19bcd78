mod dialog;
mod ingestion;
mod query;

pub use dialog::{DialogService, DialogStep};
pub use ingestion::IngestionService;
pub use query::QueryService;
