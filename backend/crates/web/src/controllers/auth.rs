//! Auth Controller
//!
//! Sign in, registration, sign out and the password reset request.

use auth::AuthError;
use auth::domain::repository::UserRepository;
use auth::models::Email;
use serde_json::json;

use crate::controller::{ActionTable, BoxFuture, Context, Controller};
use crate::error::WebResult;
use crate::mail::Mail;
use crate::response::Response;
use crate::validation::Validator;

const LOGIN: &str = "/auth/login";
const REGISTER: &str = "/auth/register";
const FORGOT_PASSWORD: &str = "/auth/forgot-password";
const DASHBOARD: &str = "/dashboard";

/// Same answer whether or not the address is registered
const RESET_REQUESTED: &str = "If this email is registered, a reset link is on its way";

pub struct AuthController;

type ActionResult<'a> = BoxFuture<'a, WebResult<Response>>;

impl AuthController {
    fn login<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if ctx.auth.check() {
                return Ok(Response::redirect(DASHBOARD));
            }
            Ok(Response::view("auth/login").with("title", "Sign in"))
        })
    }

    fn do_login<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if !ctx.request.is_post() {
                return Ok(Response::redirect(LOGIN));
            }

            let mut validator = Validator::new(ctx.request.inputs(&["email", "password"]));
            if !validator.validate(&[("email", "required|email"), ("password", "required|min:6")])
            {
                return Ok(ctx.redirect_with(LOGIN, "errors", validator.into_errors()));
            }

            let email = ctx.request.input_or_empty("email").to_string();
            let password = ctx.request.input_or_empty("password").to_string();

            if ctx.auth.attempt(&mut ctx.session, &email, &password).await? {
                Ok(ctx.redirect_with(DASHBOARD, "success", "Signed in successfully"))
            } else {
                Ok(ctx.redirect_with(
                    LOGIN,
                    "error",
                    AuthError::InvalidCredentials.user_message(),
                ))
            }
        })
    }

    fn register<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if ctx.auth.check() {
                return Ok(Response::redirect(DASHBOARD));
            }
            Ok(Response::view("auth/register").with("title", "Create an account"))
        })
    }

    fn do_register<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if !ctx.request.is_post() {
                return Ok(Response::redirect(REGISTER));
            }

            let fields = ["name", "email", "password", "password_confirm"];
            let mut validator = Validator::new(ctx.request.inputs(&fields));
            if !validator.validate(&[
                ("name", "required|min:2|max:100"),
                ("email", "required|email"),
                ("password", "required|min:6"),
                ("password_confirm", "required|confirmed:password"),
            ]) {
                return Ok(ctx.redirect_with(REGISTER, "errors", validator.into_errors()));
            }

            let name = ctx.request.input_or_empty("name").trim().to_string();
            let email = ctx.request.input_or_empty("email").to_string();
            let password = ctx.request.input_or_empty("password").to_string();

            let email_taken = match Email::new(&email) {
                Ok(parsed) => ctx.users.email_exists(&parsed).await?,
                Err(e) => return Ok(ctx.redirect_with(REGISTER, "error", e.message().to_string())),
            };
            if email_taken {
                return Ok(ctx.redirect_with(
                    REGISTER,
                    "error",
                    AuthError::DuplicateEmail.user_message(),
                ));
            }

            match ctx
                .auth
                .register(&mut ctx.session, &name, &email, &password)
                .await
            {
                Ok(true) => {
                    ctx.send_mail(Mail {
                        to: Email::normalize(&email),
                        subject: format!("Welcome to {}", ctx.config.app_name),
                        template: "welcome".to_string(),
                        context: json!({
                            "name": name,
                            "app_name": ctx.config.app_name,
                            "login_url": format!("{}{}", ctx.config.app_url, LOGIN),
                        }),
                    });
                    Ok(ctx.redirect_with(
                        DASHBOARD,
                        "success",
                        format!("Registration successful! Welcome {}", name),
                    ))
                }
                Ok(false) => Ok(ctx.redirect_with(
                    REGISTER,
                    "error",
                    "Something went wrong during registration",
                )),
                Err(AuthError::Validation(e)) => {
                    Ok(ctx.redirect_with(REGISTER, "error", e.message().to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn logout<'a, R>(&'a self, ctx: &'a mut Context<R>, _: Vec<String>) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if !ctx.request.is_post() {
                return Ok(Response::redirect("/"));
            }
            ctx.auth.logout(&mut ctx.session);
            Ok(ctx.redirect_with("/", "success", "Signed out"))
        })
    }

    fn forgot_password<'a, R>(
        &'a self,
        ctx: &'a mut Context<R>,
        _: Vec<String>,
    ) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if ctx.auth.check() {
                return Ok(Response::redirect(DASHBOARD));
            }
            Ok(Response::view("auth/forgot-password").with("title", "Forgot password"))
        })
    }

    fn do_reset_password<'a, R>(
        &'a self,
        ctx: &'a mut Context<R>,
        _: Vec<String>,
    ) -> ActionResult<'a>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            if !ctx.request.is_post() {
                return Ok(Response::redirect(FORGOT_PASSWORD));
            }

            let raw_email = ctx.request.input_or_empty("email").to_string();
            if raw_email.trim().is_empty() {
                return Ok(ctx.redirect_with(FORGOT_PASSWORD, "error", "Email is required"));
            }

            let user = match Email::new(&raw_email) {
                Ok(email) => ctx.users.find_by_email(&email).await?,
                Err(_) => None,
            };

            if let Some(user) = user {
                tracing::info!(user_id = %user.id, "Password reset requested");
                ctx.send_mail(Mail {
                    to: user.email.to_string(),
                    subject: format!("{} password reset", ctx.config.app_name),
                    template: "reset-password".to_string(),
                    context: json!({
                        "name": user.name.as_str(),
                        "app_name": ctx.config.app_name,
                        "reset_url": format!("{}{}", ctx.config.app_url, FORGOT_PASSWORD),
                    }),
                });
            }

            Ok(ctx.redirect_with(FORGOT_PASSWORD, "success", RESET_REQUESTED))
        })
    }
}

impl<R> Controller<R> for AuthController
where
    R: UserRepository + Send + Sync + 'static,
{
    fn construct(_ctx: &mut Context<R>) -> Result<Self, Response> {
        Ok(AuthController)
    }

    fn actions() -> ActionTable<Self, R> {
        ActionTable::new()
            .action("login", Self::login::<R>)
            .action("doLogin", Self::do_login::<R>)
            .action("register", Self::register::<R>)
            .action("doRegister", Self::do_register::<R>)
            .action("logout", Self::logout::<R>)
            .action("forgotPassword", Self::forgot_password::<R>)
            .action("doResetPassword", Self::do_reset_password::<R>)
    }
}
