mod health_check;
mod home_page;
mod status_report;
mod subscriptions;
mod webhook;

pub use health_check::*;
pub use home_page::*;
pub use status_report::*;
pub use subscriptions::*;
pub use webhook::*;

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
