use crate::models::{DialogEvent, DialogResponse, IntentState, InvocationSource, QUESTION_SLOT};

use super::QueryService;

const APOLOGY: &str =
    "Sorry, I couldn't find an answer to that right now. Please try again in a moment.";

/// What a dialog turn will do, decided from the event alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogStep {
    /// Fulfillment hook: hand control back to the dialog engine.
    Delegate,
    /// The question slot is missing or blank.
    Elicit,
    /// Answer this question and close the intent.
    Generate(String),
}

impl DialogStep {
    pub fn plan(event: &DialogEvent) -> Self {
        match event.invocation_source {
            InvocationSource::FulfillmentCodeHook => DialogStep::Delegate,
            InvocationSource::DialogCodeHook => match event.question() {
                Some(question) => DialogStep::Generate(question.to_string()),
                None => DialogStep::Elicit,
            },
        }
    }
}

/// Dialog-hook handler for the conversational bot.
///
/// Each turn is independent; all state travels in the event.
#[derive(Clone)]
pub struct DialogService {
    query: QueryService,
}

impl DialogService {
    pub fn new(query: QueryService) -> Self {
        Self { query }
    }

    /// Produce the directive for one turn. Upstream failures become a
    /// closing apology instead of an error.
    pub async fn handle(&self, event: &DialogEvent) -> DialogResponse {
        let step = DialogStep::plan(event);
        tracing::info!(
            session_id = %event.session_id,
            intent = %event.session_state.intent.name,
            source = ?event.invocation_source,
            step = step_name(&step),
            "Dialog turn"
        );

        match step {
            DialogStep::Delegate => DialogResponse::delegate(event),
            DialogStep::Elicit => DialogResponse::elicit_slot(event, QUESTION_SLOT),
            DialogStep::Generate(question) => match self.query.answer(&question).await {
                Ok(result) => DialogResponse::close(event, IntentState::Fulfilled, result.response),
                Err(e) => {
                    tracing::error!(session_id = %event.session_id, error = %e, "Dialog answer failed");
                    DialogResponse::close(event, IntentState::Failed, APOLOGY)
                }
            },
        }
    }
}

fn step_name(step: &DialogStep) -> &'static str {
    match step {
        DialogStep::Delegate => "delegate",
        DialogStep::Elicit => "elicit",
        DialogStep::Generate(_) => "generate",
    }
}
