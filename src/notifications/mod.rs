mod engine;
pub mod format;
mod notified;

pub use engine::*;
pub use notified::*;
