mod subscriber;
mod subscription_query;

pub use subscriber::*;
pub use subscription_query::*;
