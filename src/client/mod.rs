// Client module - every call to the remote API goes through the gateway
pub mod action;
pub mod gateway;
pub mod rate_limiter;
pub mod transport;

pub use action::Action;
pub use gateway::Gateway;
pub use rate_limiter::RateLimiter;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
