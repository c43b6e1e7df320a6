//! Controllers
//!
//! A controller is built once per request by [`Controller::construct`],
//! which may refuse with a response (a guard redirect). Its dispatchable
//! surface is the explicit [`ActionTable`] returned by
//! [`Controller::actions`]; nothing else is reachable from a URL.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use auth::AuthService;
use auth::domain::repository::UserRepository;

use crate::config::WebConfig;
use crate::error::WebResult;
use crate::mail::{Mail, Mailer};
use crate::request::Request;
use crate::response::Response;
use crate::session::{FlashValue, Session};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An action: controller, request context, positional parameters
pub type Action<C, R> =
    for<'a> fn(&'a C, &'a mut Context<R>, Vec<String>) -> BoxFuture<'a, WebResult<Response>>;

/// Everything an action may touch during one request
pub struct Context<R>
where
    R: UserRepository,
{
    pub request: Request,
    pub session: Session,
    pub auth: AuthService<R>,
    pub users: Arc<R>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<WebConfig>,
}

impl<R> Context<R>
where
    R: UserRepository + Send + Sync,
{
    pub fn new(
        request: Request,
        session: Session,
        auth: AuthService<R>,
        users: Arc<R>,
        mailer: Arc<dyn Mailer>,
        config: Arc<WebConfig>,
    ) -> Self {
        Self {
            request,
            session,
            auth,
            users,
            mailer,
            config,
        }
    }

    /// Flash `value` under `key` and redirect to `location`
    pub fn redirect_with(
        &mut self,
        location: &str,
        key: &str,
        value: impl Into<FlashValue>,
    ) -> Response {
        self.session.flash(key, value);
        Response::redirect(location)
    }

    /// Send mail; a delivery failure is logged, never surfaced
    pub fn send_mail(&self, mail: Mail) {
        if let Err(e) = self.mailer.send(&mail) {
            tracing::error!(template = %mail.template, error = %e, "Failed to send mail");
        }
    }
}

/// Action names in registration order
pub struct ActionTable<C, R>
where
    R: UserRepository,
{
    actions: Vec<(&'static str, Action<C, R>)>,
}

impl<C, R> Default for ActionTable<C, R>
where
    R: UserRepository,
{
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<C, R> ActionTable<C, R>
where
    R: UserRepository,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under its camelCase `name`
    pub fn action(mut self, name: &'static str, action: Action<C, R>) -> Self {
        self.actions.push((name, action));
        self
    }

    /// Look up by name, ignoring ASCII case
    pub fn get(&self, name: &str) -> Option<(&'static str, Action<C, R>)> {
        self.actions
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
            .copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().map(|(name, _)| *name)
    }
}

pub trait Controller<R>: Sized + Send + Sync + 'static
where
    R: UserRepository + Send + Sync + 'static,
{
    /// Build the controller for this request
    ///
    /// `Err(response)` ends dispatch before any action is resolved.
    fn construct(ctx: &mut Context<R>) -> Result<Self, Response>;

    /// The complete set of dispatchable actions
    fn actions() -> ActionTable<Self, R>;
}
