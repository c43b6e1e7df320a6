//! Web (MVC) Module
//!
//! A small front-controller framework on top of axum:
//! - `router` - `/{controller}/{action}/{params...}` dispatch
//! - `controller` - controller trait, action tables, request context
//! - `controllers` - the application's home, auth and dashboard pages
//! - `session` - signed-cookie sessions with flash messages and CSRF tokens
//! - `view` - preloaded HTML templates
//! - `front` - the axum handler tying it together
//!
//! ## Request Flow
//! 1. Every request reaches [`front::front_controller`]
//! 2. The session and signed-in user are restored
//! 3. The [`router::Router`] picks a controller and action
//! 4. The action's [`response::Response`] is rendered, the session saved

pub mod config;
pub mod controller;
pub mod controllers;
pub mod error;
pub mod front;
pub mod mail;
pub mod request;
pub mod response;
pub mod router;
pub mod session;
pub mod validation;
pub mod view;

// Re-exports for convenience
pub use config::WebConfig;
pub use controller::{ActionTable, Context, Controller};
pub use error::{WebError, WebResult};
pub use front::{AppState, app_router};
pub use mail::{LogMailer, Mail, Mailer, MemoryMailer};
pub use request::Request;
pub use response::Response;
pub use router::{Route, RouteNotFound, Router};
pub use session::{MemorySessionStore, PgSessionStore, Session, SessionStore, spawn_cleanup};
pub use view::{TemplateRenderer, ViewRenderer};
