//! Application loading: protocol surface, registry, and resolver.

pub mod asgi;
pub mod registry;
pub mod resolver;

pub use asgi::{Asgi3Adapter, AsgiApplication, AsgiHandle, DefaultAsgiApplication};
pub use registry::AppRegistry;
pub use resolver::resolve;
