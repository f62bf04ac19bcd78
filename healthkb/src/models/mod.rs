mod chat;
mod dialog;
mod ingestion;

pub use chat::{ChatRecord, Citation, Generation, QueryRequest, QueryResult, RetrieveAndGenerateRequest};
pub use dialog::{
    DialogAction, DialogActionType, DialogEvent, DialogResponse, Intent, IntentState,
    InvocationSource, Message, SessionState, Slot, SlotValue, QUESTION_SLOT,
};
pub use ingestion::{
    ClientToken, IngestionAck, IngestionJob, IngestionJobRequest, S3Bucket, S3Entity, S3Object,
    StorageEvent, StorageRecord,
};
