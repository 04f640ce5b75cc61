mod engine;
mod security_templates;

pub use engine::{AskamaTemplateEngine, TemplateEngine};
pub use security_templates::{
    BlockedLoginDetails, BlockedLoginTemplate, SuccessfulLoginDetails, SuccessfulLoginTemplate,
    TemplateContext,
};

use crate::MailerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named JSON values handed to a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateData {
    pub data: HashMap<String, serde_json::Value>,
}

impl TemplateData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(mut self, key: &str, value: T) -> Result<Self, MailerError> {
        self.data
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Deserialize a required entry.
    pub(crate) fn require<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<T, MailerError> {
        let value = self
            .get(key)
            .cloned()
            .ok_or_else(|| MailerError::MissingTemplateData(key.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }
}
