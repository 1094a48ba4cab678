pub mod comfy;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod vm;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
