//! Application controllers

pub mod auth;
pub mod dashboard;
pub mod home;

use ::auth::domain::repository::UserRepository;

use crate::router::Router;

pub use self::auth::AuthController;
pub use dashboard::DashboardController;
pub use home::HomeController;

/// The application's registration table
pub fn routes<R>() -> Router<R>
where
    R: UserRepository + Send + Sync + 'static,
{
    Router::new()
        .register::<HomeController>("home")
        .register::<AuthController>("auth")
        .register::<DashboardController>("dashboard")
}
