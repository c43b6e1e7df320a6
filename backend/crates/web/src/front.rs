//! Front Controller
//!
//! The single axum handler every request falls through to. Per request it:
//!
//! 1. reads method, path, query string and (for POST) the urlencoded form
//! 2. restores the session from the signed cookie, or starts a new one
//! 3. restores the signed-in user into an [`AuthService`]
//! 4. rejects POSTs without the session's CSRF token (when enabled)
//! 5. dispatches through the [`Router`]
//! 6. renders the action's [`Response`]
//! 7. saves the session and sends the cookie

use std::collections::HashMap;
use std::sync::Arc;

use auth::domain::repository::UserRepository;
use auth::{AuthConfig, AuthService};
use axum::Form;
use axum::extract::{FromRequest, Query, Request as HttpRequest, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response as HttpResponse};
use serde_json::{Map, Value, json};

use crate::config::WebConfig;
use crate::controller::Context;
use crate::error::WebError;
use crate::mail::Mailer;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::session::{Session, SessionStore};
use crate::view::{ViewRenderer, fallback_page};

/// Form field carrying the CSRF token
pub const CSRF_FIELD: &str = "csrf_token";

/// Shared state for the front controller
pub struct AppState<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    pub router: Arc<Router<R>>,
    pub users: Arc<R>,
    pub sessions: Arc<S>,
    pub views: Arc<dyn ViewRenderer>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<WebConfig>,
    pub auth_config: Arc<AuthConfig>,
}

// Manual impl: `R` and `S` sit behind `Arc` and need not be `Clone`
impl<R, S> Clone for AppState<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            users: self.users.clone(),
            sessions: self.sessions.clone(),
            views: self.views.clone(),
            mailer: self.mailer.clone(),
            config: self.config.clone(),
            auth_config: self.auth_config.clone(),
        }
    }
}

impl<R, S> AppState<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    pub fn new(
        router: Router<R>,
        users: Arc<R>,
        sessions: Arc<S>,
        views: Arc<dyn ViewRenderer>,
        mailer: Arc<dyn Mailer>,
        config: WebConfig,
        auth_config: AuthConfig,
    ) -> Self {
        Self {
            router: Arc::new(router),
            users,
            sessions,
            views,
            mailer,
            config: Arc::new(config),
            auth_config: Arc::new(auth_config),
        }
    }
}

/// An axum router sending every request to the front controller
pub fn app_router<R, S>(state: AppState<R, S>) -> axum::Router
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    axum::Router::new()
        .fallback(front_controller::<R, S>)
        .with_state(state)
}

/// Fallback handler: every path goes through the dispatcher
pub async fn front_controller<R, S>(
    State(state): State<AppState<R, S>>,
    request: HttpRequest,
) -> HttpResponse
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let (method, uri, headers, form) = read_request(request).await;
    let path = uri.path().to_string();

    let query = match Query::<HashMap<String, String>>::try_from_uri(&uri) {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Query string ignored");
            HashMap::new()
        }
    };

    let session = load_session(&state, &headers).await;
    let auth =
        AuthService::init(state.users.clone(), state.auth_config.clone(), &session).await;

    let request = Request::new(method, path.clone())
        .with_query(query)
        .with_form(form);

    let mut ctx = Context::new(
        request,
        session,
        auth,
        state.users.clone(),
        state.mailer.clone(),
        state.config.clone(),
    );

    let response = if csrf_rejected(&state.config, &ctx) {
        tracing::warn!(path = %path, "CSRF token mismatch");
        let back = referer_path(&headers);
        let redirect = ctx.redirect_with(&back, "error", "Your session expired, please try again");
        into_http(&state, &mut ctx, Ok(redirect))
    } else {
        let result = state.router.dispatch(&mut ctx, &path).await;
        into_http(&state, &mut ctx, result)
    };

    let cookie = persist_session(&state, &ctx.session).await;
    with_cookie(response, cookie)
}

/// Split the request and read the form body of a POST
async fn read_request(request: HttpRequest) -> (Method, Uri, HeaderMap, HashMap<String, String>) {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();

    if method != Method::POST {
        return (method, uri, headers, HashMap::new());
    }

    let form = match Form::<HashMap<String, String>>::from_request(request, &()).await {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Request body is not a urlencoded form");
            HashMap::new()
        }
    };
    (method, uri, headers, form)
}

/// Restore the session named by the signed cookie
///
/// A missing, forged or expired cookie starts a new session. So does a
/// store failure, which is logged.
async fn load_session<R, S>(state: &AppState<R, S>, headers: &HeaderMap) -> Session
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let Some(token) = platform::cookie::extract_cookie(headers, &state.config.session_cookie_name)
    else {
        return Session::new();
    };

    let Some(id) = platform::crypto::verify_signed(&state.config.session_secret, &token) else {
        tracing::debug!("Session cookie signature rejected");
        return Session::new();
    };

    match state.sessions.load(id).await {
        Ok(Some(data)) => Session::from_store(id.to_string(), data),
        Ok(None) => Session::new(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load session, starting a new one");
            Session::new()
        }
    }
}

fn csrf_rejected<R>(config: &WebConfig, ctx: &Context<R>) -> bool
where
    R: UserRepository + Send + Sync,
{
    if !config.csrf_protection || !ctx.request.is_post() {
        return false;
    }
    let submitted = ctx.request.form().get(CSRF_FIELD).map(String::as_str);
    !submitted.is_some_and(|token| ctx.session.verify_csrf(token))
}

/// Path part of the Referer header, or `/`
///
/// Only the path is kept so a redirect never leaves the site.
fn referer_path(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok())
        .map(|uri| uri.path().to_string())
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| "/".to_string())
}

/// Turn an action outcome into HTTP
fn into_http<R, S>(
    state: &AppState<R, S>,
    ctx: &mut Context<R>,
    result: Result<Response, WebError>,
) -> HttpResponse
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    match result {
        Ok(Response::View {
            template,
            context,
            status,
        }) => render_view(state, ctx, &template, context, status),
        Ok(Response::Redirect(location)) => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
        }
        Ok(Response::NotFound) => error_page(state, &WebError::RouteNotFound),
        Err(e) => error_page(state, &e),
    }
}

fn render_view<R, S>(
    state: &AppState<R, S>,
    ctx: &mut Context<R>,
    template: &str,
    mut context: Map<String, Value>,
    status: StatusCode,
) -> HttpResponse
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    let flash = serde_json::to_value(ctx.session.take_flash()).unwrap_or_default();
    let auth_user = ctx
        .auth
        .user()
        .and_then(|user| serde_json::to_value(user.profile()).ok())
        .unwrap_or_default();

    context
        .entry("app_name")
        .or_insert_with(|| Value::String(state.config.app_name.clone()));
    context.insert(
        CSRF_FIELD.to_string(),
        Value::String(ctx.session.csrf_token().to_string()),
    );
    context.insert("flash".to_string(), flash);
    context.insert("auth_user".to_string(), auth_user);

    match state.views.render(template, &Value::Object(context)) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => error_page(state, &WebError::from(e)),
    }
}

/// The `errors/*` template for `error`, or a bare page when it is missing
fn error_page<R, S>(state: &AppState<R, S>, error: &WebError) -> HttpResponse
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    error.log();
    let status = error.status_code();
    let title = error.public_title();

    let html = if state.views.has_template(error.template()) {
        let context = json!({
            "title": title,
            "status": status.as_u16(),
            "app_name": state.config.app_name,
        });
        state
            .views
            .render(error.template(), &context)
            .unwrap_or_else(|e| {
                tracing::error!(template = error.template(), error = %e, "Error page failed to render");
                fallback_page(status.as_u16(), title)
            })
    } else {
        fallback_page(status.as_u16(), title)
    };

    (status, Html(html)).into_response()
}

/// Store the session and return the `Set-Cookie` value to send
///
/// Anything but an untouched new session is saved, so every visit
/// extends the expiry. A rotated-away id is destroyed.
async fn persist_session<R, S>(state: &AppState<R, S>, session: &Session) -> Option<String>
where
    R: UserRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
{
    if let Some(old_id) = session.replaced_id() {
        if let Err(e) = state.sessions.destroy(old_id).await {
            tracing::warn!(error = %e, "Failed to destroy rotated session");
        }
    }

    if session.is_new() && !session.is_dirty() {
        return None;
    }

    match state
        .sessions
        .save(session.id(), session.data(), state.config.session_ttl)
        .await
    {
        Ok(()) => {
            let signed = platform::crypto::sign(&state.config.session_secret, session.id());
            Some(state.config.session_cookie().build_set_cookie(&signed))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save session");
            None
        }
    }
}

fn with_cookie(mut response: HttpResponse, cookie: Option<String>) -> HttpResponse {
    let Some(cookie) = cookie else {
        return response;
    };
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => {
            tracing::error!(error = %e, "Session cookie is not a valid header value");
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::routes;
    use crate::mail::MemoryMailer;
    use crate::session::MemorySessionStore;
    use crate::view::TemplateRenderer;
    use auth::InMemoryUserRepository;
    use auth::UserSession;
    use auth::models::UserId;

    #[test]
    fn test_referer_path_keeps_only_the_path() {
        let mut headers = HeaderMap::new();
        assert_eq!(referer_path(&headers), "/");

        headers.insert(
            header::REFERER,
            HeaderValue::from_static("http://localhost:8080/auth/login?x=1"),
        );
        assert_eq!(referer_path(&headers), "/auth/login");

        headers.insert(
            header::REFERER,
            HeaderValue::from_static("http://localhost:8080//evil.example"),
        );
        assert_eq!(referer_path(&headers), "/");
    }

    #[test]
    fn test_with_cookie_appends_header() {
        let response = with_cookie(
            StatusCode::OK.into_response(),
            Some("sid=abc; Path=/".to_string()),
        );
        assert_eq!(
            response.headers().get(header::SET_COOKIE).unwrap(),
            "sid=abc; Path=/"
        );

        let response = with_cookie(StatusCode::OK.into_response(), None);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_persist_session_stores_only_touched_sessions() {
        let sessions = MemorySessionStore::new();
        let state = AppState::new(
            routes(),
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(sessions.clone()),
            Arc::new(TemplateRenderer::from_templates(Vec::<(String, String)>::new())),
            Arc::new(MemoryMailer::new()),
            WebConfig::development(),
            AuthConfig::development(),
        );

        assert!(persist_session(&state, &Session::new()).await.is_none());
        assert!(sessions.is_empty().await);

        let mut touched = Session::new();
        touched.flash("success", "Saved");
        assert!(persist_session(&state, &touched).await.is_some());
        assert_eq!(sessions.len().await, 1);

        let mut rotated = Session::from_store(touched.id().to_string(), touched.data().clone());
        rotated.set_user_id(UserId::new(1).unwrap());
        assert!(persist_session(&state, &rotated).await.is_some());
        assert_eq!(sessions.len().await, 1);
        assert!(sessions.load(touched.id()).await.unwrap().is_none());
        assert!(sessions.load(rotated.id()).await.unwrap().is_some());
    }
}
