mod availability;
mod chat_id;
mod language;
mod location;
mod query;
mod subscriber;

pub use availability::*;
pub use chat_id::ChatId;
pub use language::Language;
pub use location::{Location, LocationFilter};
pub use query::*;
pub use subscriber::*;
