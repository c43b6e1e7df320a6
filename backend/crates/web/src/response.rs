//! Response
//!
//! Controller actions return one of these; the front controller turns it
//! into HTTP.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Render `template` with `context`
    View {
        template: String,
        context: Map<String, Value>,
        status: StatusCode,
    },
    /// 303 See Other to `location`
    Redirect(String),
    /// The generic 404 page
    NotFound,
}

impl Response {
    pub fn view(template: impl Into<String>) -> Self {
        Response::View {
            template: template.into(),
            context: Map::new(),
            status: StatusCode::OK,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Response::Redirect(location.into())
    }

    /// Add a context entry to a view; other variants are returned as is
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        if let Response::View { context, .. } = &mut self {
            match serde_json::to_value(value) {
                Ok(value) => {
                    context.insert(key.to_string(), value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "View context value could not be serialized");
                }
            }
        }
        self
    }

    pub fn with_status(mut self, new_status: StatusCode) -> Self {
        if let Response::View { status, .. } = &mut self {
            *status = new_status;
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Response::View { status, .. } => *status,
            Response::Redirect(_) => StatusCode::SEE_OTHER,
            Response::NotFound => StatusCode::NOT_FOUND,
        }
    }
}
