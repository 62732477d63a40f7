pub mod auth;
pub mod errors;

pub use auth::*;
pub use errors::*;
