//! HTTP API handlers for hairswap

pub mod health;
pub mod swap;

pub use health::health_routes;
pub use swap::process_hair_swap;
