use crate::i18n::Translator;
use crate::profile::DialogContext;
use crate::widgets::form::FormValues;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub action_label: Option<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    // Label catalog: source label -> translated label
    #[serde(default)]
    pub translations: Translator,
    #[serde(default)]
    pub initial_values: FormValues,
    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub user: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub company: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceConfig {
    // e.g. "${APP_BIN} get-doc {doctype} {name}"
    #[serde(default)]
    pub get_doc_cmd: Option<String>,
    // e.g. "${APP_BIN} get-list {doctype}"
    #[serde(default)]
    pub get_list_cmd: Option<String>,
    // Dotted path of the payload inside the command envelope (default "data")
    #[serde(default)]
    pub unwrap: Option<String>,
    // Inline records keyed by doctype, used when no commands are set
    #[serde(default)]
    pub records: HashMap<String, Vec<JsonValue>>,
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

impl SourceConfig {
    pub fn uses_commands(&self) -> bool {
        self.get_doc_cmd.is_some() || self.get_list_cmd.is_some()
    }
}

impl AppConfig {
    /// `HUB_PROFILE_USER` and `HUB_PROFILE_DEFAULT_COMPANY` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(user) = std::env::var("HUB_PROFILE_USER") {
            if !user.is_empty() {
                self.session.user = user;
            }
        }
        if let Ok(company) = std::env::var("HUB_PROFILE_DEFAULT_COMPANY") {
            self.defaults.company = Some(company).filter(|c| !c.is_empty());
        }
    }

    pub fn context(&self) -> DialogContext {
        DialogContext {
            session_user: self.session.user.clone(),
            default_company: self.defaults.company.clone(),
            translator: self.translations.clone(),
        }
    }
}

pub fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    if cfg.session.user.trim().is_empty() {
        return Err("session.user must be set (or HUB_PROFILE_USER)".into());
    }
    let src = &cfg.source;
    if src.uses_commands() {
        match (&src.get_doc_cmd, &src.get_list_cmd) {
            (Some(doc), Some(list)) => {
                if !doc.contains("{doctype}") || !doc.contains("{name}") {
                    return Err("source.get_doc_cmd must contain {doctype} and {name}".into());
                }
                if !list.contains("{doctype}") {
                    return Err("source.get_list_cmd must contain {doctype}".into());
                }
            }
            _ => {
                return Err("source needs both get_doc_cmd and get_list_cmd".into());
            }
        }
    } else if src.records.is_empty() {
        return Err("source must specify commands or inline records".into());
    }
    Ok(())
}
