//! HTTP adapter: DTOs, handlers, and routes for the invoke API.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::app_router;
