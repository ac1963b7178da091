pub mod error;
pub mod health;
pub mod logging;
pub mod routes;

#[cfg(test)]
mod tests;

pub use error::{ApiError, Result as ApiResult};
pub use routes::build_router;
