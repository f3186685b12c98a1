pub mod algorithms;
pub mod client_key;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod response;
pub mod server;
pub mod token_bucket;

pub use algorithms::{Limiter, Quota};
pub use config::{Config, ThrottleConfig};
pub use error::{Result, ThrottleError};
pub use middleware::{wrap, Throttle, ThrottleLayer};
pub use registry::ClientRegistry;
pub use server::create_app;
