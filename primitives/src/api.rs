//! Response bodies of the Ad Spots REST API, other than the [`AdSpot`](crate::AdSpot) itself.
use serde::{Deserialize, Serialize};

/// The body of every failed request.
///
/// `what` is always present, the rest only when they add information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub what: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorContext {
    Single(String),
    List(Vec<String>),
}

impl ErrorResponse {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            context: None,
            id: None,
            message: None,
        }
    }

    pub fn with_context(mut self, context: impl ToString) -> Self {
        self.context = Some(ErrorContext::Single(context.to_string()));
        self
    }

    pub fn with_context_list(mut self, context: Vec<String>) -> Self {
        self.context = Some(ErrorContext::List(context));
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateResponse {
    pub message: String,
    pub id: String,
}

impl DeactivateResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            message: "Ad spot deactivated successfully".to_string(),
            id: id.into(),
        }
    }
}
