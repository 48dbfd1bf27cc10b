//! HTTP surface: health endpoint and WebSocket upgrade route

pub mod routes;

pub use routes::build_router;
