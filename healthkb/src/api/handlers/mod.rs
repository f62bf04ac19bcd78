pub mod dialog;
pub mod health;
pub mod ingestion;
pub mod query;

pub use dialog::dialog_hook;
pub use health::health_check;
pub use ingestion::{get_ingestion_job, storage_event};
pub use query::{get_chat, query};
