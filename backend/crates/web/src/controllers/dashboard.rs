//! Dashboard Controller
//!
//! Signed-in area. Construction redirects anonymous visitors to the sign
//! in page before any action is looked up.

use auth::AuthError;
use auth::domain::repository::UserRepository;
use auth::models::{Email, UserChanges, UserName};

use crate::controller::{ActionTable, BoxFuture, Context, Controller};
use crate::error::WebResult;
use crate::response::Response;
use crate::validation::Validator;

const DASHBOARD: &str = "/dashboard";
const EDIT_PROFILE: &str = "/dashboard/edit-profile";
const CHANGE_PASSWORD: &str = "/dashboard/change-password";

pub struct DashboardController;

type ActionResult<'a> = BoxFuture<'a, WebResult<Response>>;

/// Current user's public fields for templates
fn with_user<R>(response: Response, ctx: &Context<R>) -> Response
where
    R: UserRepository + Send + Sync,
{
    match ctx.auth.user() {
        Some(user) => response.with("user", user.profile()),
        None => response,
    }
}

impl DashboardController {
    fn index<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            let response = Response::view("dashboard/index").with("title", "Dashboard");
            Ok(with_user(response, ctx))
        })
    }

    fn profile<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            let response = Response::view("dashboard/profile").with("title", "Profile");
            Ok(with_user(response, ctx))
        })
    }

    fn edit_profile<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            let response = Response::view("dashboard/edit-profile").with("title", "Edit profile");
            Ok(with_user(response, ctx))
        })
    }

    fn do_update_profile<'a, R>(
        &'a self,
        ctx: &'a mut Context<R>,
        _: Vec<String>,
    ) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if !ctx.request.is_post() {
                return Ok(Response::redirect(EDIT_PROFILE));
            }

            let mut validator = Validator::new(ctx.request.inputs(&["name", "email"]));
            if !validator.validate(&[
                ("name", "required|min:2|max:100"),
                ("email", "required|email"),
            ]) {
                return Ok(ctx.redirect_with(EDIT_PROFILE, "errors", validator.into_errors()));
            }

            let parsed = UserName::new(ctx.request.input_or_empty("name"))
                .and_then(|name| Ok((name, Email::new(ctx.request.input_or_empty("email"))?)));
            let (name, email) = match parsed {
                Ok(parsed) => parsed,
                Err(e) => {
                    return Ok(ctx.redirect_with(EDIT_PROFILE, "error", e.message().to_string()));
                }
            };

            let changes = UserChanges {
                name: Some(name),
                email: Some(email),
                ..UserChanges::default()
            };

            match ctx.auth.update_profile(changes).await {
                Ok(true) => Ok(ctx.redirect_with(DASHBOARD, "success", "Profile updated")),
                Ok(false) => Ok(ctx.redirect_with(
                    EDIT_PROFILE,
                    "error",
                    "Profile could not be updated",
                )),
                Err(AuthError::DuplicateEmail) => Ok(ctx.redirect_with(
                    EDIT_PROFILE,
                    "error",
                    AuthError::DuplicateEmail.user_message(),
                )),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn change_password<'a, R>(
        &'a self,
        ctx: &'a mut Context<R>,
        _: Vec<String>,
    ) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            let response =
                Response::view("dashboard/change-password").with("title", "Change password");
            Ok(with_user(response, ctx))
        })
    }

    fn do_change_password<'a, R>(
        &'a self,
        ctx: &'a mut Context<R>,
        _: Vec<String>,
    ) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if !ctx.request.is_post() {
                return Ok(Response::redirect(CHANGE_PASSWORD));
            }

            let fields = ["current_password", "new_password", "password_confirm"];
            let mut validator = Validator::new(ctx.request.inputs(&fields));
            if !validator.validate(&[
                ("current_password", "required"),
                ("new_password", "required|min:6"),
                ("password_confirm", "required|confirmed:new_password"),
            ]) {
                return Ok(ctx.redirect_with(CHANGE_PASSWORD, "errors", validator.into_errors()));
            }

            if !ctx.auth.verify_password(ctx.request.input_or_empty("current_password")) {
                return Ok(ctx.redirect_with(
                    CHANGE_PASSWORD,
                    "error",
                    "Current password is incorrect",
                ));
            }

            let Some(email) = ctx.auth.user().map(|user| user.email.as_str().to_string()) else {
                return Ok(Response::redirect("/auth/login"));
            };
            let new_password = ctx.request.input_or_empty("new_password").to_string();

            match ctx.auth.reset_password(&email, &new_password).await {
                Ok(true) => Ok(ctx.redirect_with(DASHBOARD, "success", "Password changed")),
                Ok(false) => Ok(ctx.redirect_with(
                    CHANGE_PASSWORD,
                    "error",
                    "Password could not be changed",
                )),
                Err(AuthError::Validation(e)) => {
                    Ok(ctx.redirect_with(CHANGE_PASSWORD, "error", e.message().to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}

impl<R> Controller<R> for DashboardController
where
    R: UserRepository + Send + Sync + 'static,
{
    fn construct(ctx: &mut Context<R>) -> Result<Self, Response> {
        if !ctx.auth.check() {
            return Err(ctx.redirect_with("/auth/login", "error", "Please sign in first"));
        }
        Ok(DashboardController)
    }

    fn actions() -> ActionTable<Self, R> {
        ActionTable::new()
            .action("index", Self::index::<R>)
            .action("profile", Self::profile::<R>)
            .action("editProfile", Self::edit_profile::<R>)
            .action("doUpdateProfile", Self::do_update_profile::<R>)
            .action("changePassword", Self::change_password::<R>)
            .action("doChangePassword", Self::do_change_password::<R>)
    }
}
