//! Home Controller

use auth::domain::repository::UserRepository;

use crate::controller::{ActionTable, BoxFuture, Context, Controller};
use crate::error::WebResult;
use crate::response::Response;

/// Framework version shown on the landing page
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct HomeController;

impl HomeController {
    fn index<'a, R>(
        &'a self,
        ctx: &'a mut Context<R>,
        params: Vec<String>,
    ) -> BoxFuture<'a, WebResult<Response>>
    where
        R: UserRepository + Send + Sync + 'static,
    {
        Box::pin(async move {
            Ok(Response::view("home/index")
                .with("title", format!("{} - Lightweight MVC", ctx.config.app_name))
                .with("version", VERSION)
                .with("params", params))
        })
    }
}

impl<R> Controller<R> for HomeController
where
    R: UserRepository + Send + Sync + 'static,
{
    fn construct(_ctx: &mut Context<R>) -> Result<Self, Response> {
        Ok(HomeController)
    }

    fn actions() -> ActionTable<Self, R> {
        ActionTable::new().action("index", Self::index::<R>)
    }
}
