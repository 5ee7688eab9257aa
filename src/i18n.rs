use serde::Deserialize;
use std::collections::HashMap;

/// Label translation backed by a flat message catalog. Unknown messages are
/// returned unchanged.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Translator {
    catalog: HashMap<String, String>,
}

impl Translator {
    pub fn tr(&self, msg: &str) -> String {
        match self.catalog.get(msg) {
            Some(t) if !t.is_empty() => t.clone(),
            _ => msg.to_string(),
        }
    }
}
