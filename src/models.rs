use std::sync::Arc;

use crate::config::ConfigStore;

/// Bot state shared across all handlers
#[derive(Clone)]
pub struct Data {
    /// Persisted guild configuration
    pub config: Arc<ConfigStore>,
}

impl Data {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
