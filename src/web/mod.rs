//! JSON Web API for filevault.
//!
//! Authentication, folder and file management over HTTP. Handlers are thin
//! wrappers around [`FileService`](crate::file::FileService) and
//! [`auth`](crate::auth); the storage backend is chosen at startup.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::RateLimitState;
pub use router::{create_app, create_router};
pub use server::WebServer;
