//! Application registry.
//!
//! Dynamic import of a configured application path is modeled as a lookup
//! in a registry of factories keyed by path string. A project registers its
//! entry points once at startup; the resolver then looks up whatever the
//! settings name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::app::asgi::AsgiHandle;

type AppFactory = Arc<dyn Fn() -> AsgiHandle + Send + Sync>;

#[derive(Default, Clone)]
pub struct AppRegistry {
    entries: HashMap<String, AppFactory>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: impl Into<String>, factory: F)
    where
        F: Fn() -> AsgiHandle + Send + Sync + 'static,
    {
        self.entries.insert(path.into(), Arc::new(factory));
    }

    pub fn lookup(&self, path: &str) -> Option<AsgiHandle> {
        self.entries.get(path).map(|factory| factory())
    }
}
