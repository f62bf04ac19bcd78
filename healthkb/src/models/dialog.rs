//! Dialog-hook event and response shapes of the conversational-bot
//! platform (Lex V2 code hooks).
//!
//! Fields this service never reads are carried in `extra` maps so that
//! intents and slots are echoed back exactly as received.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HealthKbError, Result};

pub const QUESTION_SLOT: &str = "question";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum InvocationSource {
    DialogCodeHook,
    FulfillmentCodeHook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialogEvent {
    pub invocation_source: InvocationSource,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub input_transcript: String,
    pub session_state: SessionState,
}

impl DialogEvent {
    /// Parse and validate a raw event body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| HealthKbError::MalformedEvent(e.to_string()))
    }

    /// The validated `question` slot: interpreted value first, then what the
    /// user typed. `None` when absent or blank.
    pub fn question(&self) -> Option<&str> {
        let value = self
            .session_state
            .intent
            .slots
            .get(QUESTION_SLOT)?
            .as_ref()?
            .value
            .as_ref()?;

        [value.interpreted_value.as_deref(), value.original_value.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_action: Option<DialogAction>,
    pub intent: Intent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    /// Unfilled slots arrive as `null` and must go back as `null`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub slots: HashMap<String, Option<Slot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub state: Option<IntentState>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SlotValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreted_value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// States newer than this list are kept verbatim in `Other` and echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentState {
    Failed,
    Fulfilled,
    FulfillmentInProgress,
    InProgress,
    ReadyForFulfillment,
    Waiting,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum DialogActionType {
    Close,
    ConfirmIntent,
    Delegate,
    ElicitIntent,
    ElicitSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub action_type: DialogActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_to_elicit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: String,
    pub content: String,
}

impl Message {
    pub fn plain_text(content: impl Into<String>) -> Self {
        Self {
            content_type: "PlainText".to_string(),
            content: content.into(),
        }
    }
}

/// Directive returned to the dialog engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub session_state: SessionState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl DialogResponse {
    fn with_action(
        event: &DialogEvent,
        action: DialogAction,
        state: Option<IntentState>,
        messages: Vec<Message>,
    ) -> Self {
        let mut intent = event.session_state.intent.clone();
        if state.is_some() {
            intent.state = state;
        }
        Self {
            session_state: SessionState {
                session_attributes: event.session_state.session_attributes.clone(),
                dialog_action: Some(action),
                intent,
            },
            messages,
        }
    }

    /// Re-prompt for `slot`, echoing the intent unchanged.
    pub fn elicit_slot(event: &DialogEvent, slot: &str) -> Self {
        Self::with_action(
            event,
            DialogAction {
                action_type: DialogActionType::ElicitSlot,
                slot_to_elicit: Some(slot.to_string()),
            },
            None,
            Vec::new(),
        )
    }

    /// End the intent with `state` and a single plain-text message.
    pub fn close(event: &DialogEvent, state: IntentState, content: impl Into<String>) -> Self {
        Self::with_action(
            event,
            DialogAction {
                action_type: DialogActionType::Close,
                slot_to_elicit: None,
            },
            Some(state),
            vec![Message::plain_text(content)],
        )
    }

    /// Hand control back to the dialog engine.
    pub fn delegate(event: &DialogEvent) -> Self {
        Self::with_action(
            event,
            DialogAction {
                action_type: DialogActionType::Delegate,
                slot_to_elicit: None,
            },
            None,
            Vec::new(),
        )
    }

    pub fn action_type(&self) -> Option<DialogActionType> {
        self.session_state.dialog_action.as_ref().map(|a| a.action_type)
    }
}
