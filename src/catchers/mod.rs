mod invalid_secret_token;
mod unprocessable_entity;

pub use invalid_secret_token::*;
pub use unprocessable_entity::*;
