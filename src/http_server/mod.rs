pub mod app;
pub mod error;
pub mod extract;
pub mod http_routes;
pub mod state;
