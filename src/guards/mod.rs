mod page_language;
mod webhook_secret;

use anyhow::{anyhow, Context};
pub use page_language::*;
use rocket::http::Status;
pub use webhook_secret::*;

trait OrStatus<T> {
    fn or_status(self, status: Status, context: &'static str)
        -> Result<T, (Status, anyhow::Error)>;
}

impl<T, E> OrStatus<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_status(
        self,
        status: Status,
        context: &'static str,
    ) -> Result<T, (Status, anyhow::Error)> {
        self.context(context).map_err(|e| (status, e))
    }
}

impl<T> OrStatus<T> for Option<T> {
    fn or_status(
        self,
        status: Status,
        context: &'static str,
    ) -> Result<T, (Status, anyhow::Error)> {
        self.ok_or_else(|| (status, anyhow!(context)))
    }
}
