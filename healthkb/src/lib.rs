//! Health knowledge-base service.
//!
//! Three flows share one process: HTTP questions answered by
//! retrieve-and-generate and recorded in a chat table, a conversational-bot
//! dialog hook over the same query path, and storage-triggered
//! re-ingestion of the knowledge base's data source.

pub mod api;
pub mod aws;
pub mod bedrock;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
