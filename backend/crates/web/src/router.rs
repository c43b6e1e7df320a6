//! Dispatcher
//!
//! Maps `/{controller}/{action}/{p1}/{p2}...` onto a registered
//! controller:
//!
//! 1. The path is percent-decoded, stripped of characters that cannot
//!    appear in a URL, trimmed of slashes and split on `/`.
//! 2. An empty path is `home` / `index`.
//! 3. Segment 0 must name a registered controller, or the route is not
//!    found. It is never reinterpreted as a parameter.
//! 4. The controller is constructed; it may answer right away (guards).
//! 5. Segment 1, converted `do-login` -> `doLogin`, is the action when the
//!    controller has one by that name. Otherwise it stays in place as the
//!    first parameter and the action is `index`.
//! 6. An action missing from the table is not found.
//! 7. What is left are the positional parameters.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use auth::domain::repository::UserRepository;
use thiserror::Error;

use crate::controller::{Action, ActionTable, BoxFuture, Context, Controller};
use crate::error::{WebError, WebResult};
use crate::response::Response;

const DEFAULT_CONTROLLER: &str = "home";
const DEFAULT_ACTION: &str = "index";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Route not found")]
pub struct RouteNotFound;

impl From<RouteNotFound> for WebError {
    fn from(_: RouteNotFound) -> Self {
        WebError::RouteNotFound
    }
}

/// A resolved request target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub controller: String,
    pub method: String,
    pub params: Vec<String>,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.controller, self.method)
    }
}

/// Keep only characters that may appear in a URL
pub fn sanitize_path(raw: &str) -> String {
    const ALLOWED_SYMBOLS: &str = "$-_.+!*'(),{}|\\^~[]`<>#%\";/?:@&=";
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || ALLOWED_SYMBOLS.contains(*c))
        .collect()
}

/// Percent-decode, sanitize, trim and split a request path
pub fn split_path(raw: &str) -> Vec<String> {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    };
    let sanitized = sanitize_path(&decoded);
    let trimmed = sanitized.trim_matches('/');

    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(str::to_string).collect()
}

/// `do-reset-password` -> `doResetPassword`
pub fn to_camel_case(segment: &str) -> String {
    let mut parts = segment.split('-').filter(|part| !part.is_empty());
    let mut camel = parts.next().map(str::to_ascii_lowercase).unwrap_or_default();

    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            camel.push(first.to_ascii_uppercase());
            camel.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    camel
}

/// Pick the action from the leading segment, or fall back to `index`
fn resolve_action<C, R>(
    table: &ActionTable<C, R>,
    mut segments: Vec<String>,
) -> Result<(&'static str, Action<C, R>, Vec<String>), RouteNotFound>
where
    R: UserRepository,
{
    let named = segments
        .first()
        .and_then(|segment| table.get(&to_camel_case(segment)));

    let (name, action) = match named {
        Some(found) => {
            segments.remove(0);
            found
        }
        None => table.get(DEFAULT_ACTION).ok_or(RouteNotFound)?,
    };

    Ok((name, action, segments))
}

/// A controller type with its action table, type-erased for the registry
trait Registered<R>: Send + Sync
where
    R: UserRepository + Send + Sync + 'static,
{
    fn resolve(&self, segments: Vec<String>) -> Result<(&'static str, Vec<String>), RouteNotFound>;

    fn dispatch<'a>(
        &'a self,
        name: &'a str,
        ctx: &'a mut Context<R>,
        segments: Vec<String>,
    ) -> BoxFuture<'a, WebResult<Response>>;
}

struct Entry<C, R>
where
    R: UserRepository,
{
    actions: ActionTable<C, R>,
    _controller: PhantomData<fn() -> C>,
}

impl<C, R> Registered<R> for Entry<C, R>
where
    C: Controller<R>,
    R: UserRepository + Send + Sync + 'static,
{
    fn resolve(&self, segments: Vec<String>) -> Result<(&'static str, Vec<String>), RouteNotFound> {
        resolve_action(&self.actions, segments).map(|(name, _, params)| (name, params))
    }

    fn dispatch<'a>(
        &'a self,
        name: &'a str,
        ctx: &'a mut Context<R>,
        segments: Vec<String>,
    ) -> BoxFuture<'a, WebResult<Response>> {
        Box::pin(async move {
            let controller = match C::construct(ctx) {
                Ok(controller) => controller,
                Err(response) => {
                    tracing::debug!(controller = name, "Controller declined the request");
                    return Ok(response);
                }
            };

            let (method, action, params) = match resolve_action(&self.actions, segments) {
                Ok(resolved) => resolved,
                Err(not_found) => {
                    tracing::warn!(controller = name, "Action not found");
                    return Err(not_found.into());
                }
            };

            tracing::debug!(controller = name, method, params = params.len(), "Route matched");
            action(&controller, ctx, params).await
        })
    }
}

/// Registration table: lowercase route name -> controller
pub struct Router<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    controllers: HashMap<String, Box<dyn Registered<R>>>,
}

impl<R> Default for Router<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            controllers: HashMap::new(),
        }
    }
}

impl<R> Router<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `name` (matched ignoring ASCII case)
    pub fn register<C>(mut self, name: &str) -> Self
    where
        C: Controller<R>,
    {
        let entry: Entry<C, R> = Entry {
            actions: C::actions(),
            _controller: PhantomData,
        };
        self.controllers
            .insert(name.to_ascii_lowercase(), Box::new(entry));
        self
    }

    pub fn controller_names(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    fn split_controller(&self, path: &str) -> Result<(String, Vec<String>), RouteNotFound> {
        let mut segments = split_path(path);
        if segments.is_empty() {
            return Ok((DEFAULT_CONTROLLER.to_string(), segments));
        }

        let name = segments.remove(0).to_ascii_lowercase();
        if !self.controllers.contains_key(&name) {
            tracing::warn!(controller = %name, "Controller not found");
            return Err(RouteNotFound);
        }
        Ok((name, segments))
    }

    /// Resolve without constructing anything
    pub fn resolve(&self, path: &str) -> Result<Route, RouteNotFound> {
        let (controller, segments) = self.split_controller(path)?;
        let entry = self.controllers.get(&controller).ok_or(RouteNotFound)?;
        let (method, params) = entry.resolve(segments)?;

        Ok(Route {
            controller,
            method: method.to_string(),
            params,
        })
    }

    /// Resolve and run the action for `path`
    pub async fn dispatch(&self, ctx: &mut Context<R>, path: &str) -> WebResult<Response> {
        let (controller, segments) = self.split_controller(path)?;
        let entry = self.controllers.get(&controller).ok_or(RouteNotFound)?;
        entry.dispatch(&controller, ctx, segments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_non_url_characters() {
        assert_eq!(sanitize_path("auth/log in"), "auth/login");
        assert_eq!(sanitize_path("héllo/wörld"), "hllo/wrld");
        assert_eq!(sanitize_path("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(sanitize_path("tab\there\n"), "tabhere");
    }

    #[test]
    fn test_split_path() {
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
        assert!(split_path("///").is_empty());
        assert_eq!(split_path("/auth/do-login/"), vec!["auth", "do-login"]);
        assert_eq!(split_path("/dashboard/profile/%20x"), vec!["dashboard", "profile", "x"]);
        assert_eq!(split_path("/a%2Fb"), vec!["a", "b"]);
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("index"), "index");
        assert_eq!(to_camel_case("do-login"), "doLogin");
        assert_eq!(to_camel_case("do-reset-password"), "doResetPassword");
        assert_eq!(to_camel_case("Do-Login"), "doLogin");
        assert_eq!(to_camel_case("do--login-"), "doLogin");
        assert_eq!(to_camel_case(""), "");
    }
}
