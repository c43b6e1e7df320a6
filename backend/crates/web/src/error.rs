//! Web Error Types
//!
//! Everything that can end a request early. Visitors only ever see a
//! generic page; details go to the log.

use auth::AuthError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use kernel::error::kind::ErrorKind;
use thiserror::Error;

use crate::session::SessionError;
use crate::view::{ViewError, fallback_page};

pub type WebResult<T> = Result<T, WebError>;

#[derive(Debug, Error)]
pub enum WebError {
    /// Unknown controller or action; deliberately carries no detail
    #[error("Route not found")]
    RouteNotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    View(#[from] ViewError),
}

impl WebError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebError::RouteNotFound => ErrorKind::NotFound,
            WebError::Auth(e) => match e.kind() {
                ErrorKind::ServiceUnavailable => ErrorKind::ServiceUnavailable,
                _ => ErrorKind::InternalServerError,
            },
            WebError::Session(_) => ErrorKind::ServiceUnavailable,
            WebError::View(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Template for the error page
    pub fn template(&self) -> &'static str {
        match self {
            WebError::RouteNotFound => "errors/404",
            _ => "errors/500",
        }
    }

    /// Title safe to show to visitors
    pub fn public_title(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "Page not found",
            ErrorKind::ServiceUnavailable => "Service temporarily unavailable",
            _ => "Something went wrong",
        }
    }

    pub fn log(&self) {
        match self {
            WebError::RouteNotFound => {
                tracing::debug!("Route not found");
            }
            WebError::Auth(e) => e.log(),
            WebError::Session(e) => {
                tracing::error!(error = %e, "Session store error");
            }
            WebError::View(e) => {
                tracing::error!(error = %e, "View rendering error");
            }
        }
    }
}

/// Bare page without templates; the front controller prefers the
/// `errors/*` templates when they exist
impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        (
            status,
            Html(fallback_page(status.as_u16(), self.public_title())),
        )
            .into_response()
    }
}
