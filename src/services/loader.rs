use crate::model::SourceConfig;
use crate::services::cli_runner::{run_argv_to_json, template_argv};
use crate::ui::{LoadKind, LoadMsg, LoadOutcome};
use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Record and list fetches the profile dialog depends on.
pub trait DataSource: Send + Sync {
    fn get_doc(&self, doctype: &str, name: &str) -> Result<JsonValue>;
    fn get_list(&self, doctype: &str) -> Result<Vec<JsonValue>>;
}

pub fn get_by_path<'a>(v: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut cur = v;
    for seg in path.split('.') {
        cur = cur.get(seg)?;
    }
    Some(cur)
}

/// Rejects `{"ok": false}` envelopes and returns the payload at `path`.
pub(crate) fn unwrap_envelope(v: JsonValue, path: &str) -> Result<JsonValue> {
    if v.get("ok").and_then(|b| b.as_bool()) == Some(false) {
        let msg = v
            .get("data")
            .and_then(|d| d.get("message"))
            .or_else(|| v.get("message"))
            .and_then(|s| s.as_str())
            .unwrap_or("request failed");
        return Err(anyhow!("{msg}"));
    }
    get_by_path(&v, path)
        .cloned()
        .ok_or_else(|| anyhow!("response has no '{path}'"))
}

pub struct CliSource {
    get_doc_cmd: String,
    get_list_cmd: String,
    unwrap: String,
}

impl CliSource {
    pub fn new(get_doc_cmd: String, get_list_cmd: String, unwrap: Option<String>) -> Self {
        Self {
            get_doc_cmd,
            get_list_cmd,
            unwrap: unwrap.unwrap_or_else(|| "data".to_string()),
        }
    }

    pub(crate) fn argv(template: &str, doctype: &str, name: Option<&str>) -> Result<Vec<String>> {
        let mut vars = vec![("doctype", doctype)];
        if let Some(name) = name {
            vars.push(("name", name));
        }
        template_argv(template, &vars)
    }
}

impl DataSource for CliSource {
    fn get_doc(&self, doctype: &str, name: &str) -> Result<JsonValue> {
        let argv = Self::argv(&self.get_doc_cmd, doctype, Some(name))?;
        let v = run_argv_to_json(&argv)?;
        let doc = unwrap_envelope(v, &self.unwrap)?;
        if !doc.is_object() {
            return Err(anyhow!("{doctype} {name}: expected an object"));
        }
        Ok(doc)
    }

    fn get_list(&self, doctype: &str) -> Result<Vec<JsonValue>> {
        let argv = Self::argv(&self.get_list_cmd, doctype, None)?;
        let v = run_argv_to_json(&argv)?;
        match unwrap_envelope(v, &self.unwrap)? {
            JsonValue::Array(rows) => Ok(rows),
            JsonValue::Object(obj) => match obj.get("items") {
                Some(JsonValue::Array(rows)) => Ok(rows.clone()),
                _ => Err(anyhow!("{doctype} list: expected an array")),
            },
            _ => Err(anyhow!("{doctype} list: expected an array")),
        }
    }
}

/// Records declared inline in the config file.
pub struct StaticSource {
    records: HashMap<String, Vec<JsonValue>>,
    latency: Option<Duration>,
}

impl StaticSource {
    pub fn new(records: HashMap<String, Vec<JsonValue>>, latency: Option<Duration>) -> Self {
        Self { records, latency }
    }

    fn wait(&self) {
        if let Some(d) = self.latency {
            thread::sleep(d);
        }
    }
}

impl DataSource for StaticSource {
    fn get_doc(&self, doctype: &str, name: &str) -> Result<JsonValue> {
        self.wait();
        self.records
            .get(doctype)
            .and_then(|rows| {
                rows.iter()
                    .find(|r| r.get("name").and_then(|n| n.as_str()) == Some(name))
            })
            .cloned()
            .ok_or_else(|| anyhow!("{doctype} {name} not found"))
    }

    fn get_list(&self, doctype: &str) -> Result<Vec<JsonValue>> {
        self.wait();
        Ok(self.records.get(doctype).cloned().unwrap_or_default())
    }
}

pub fn source_from_config(cfg: &SourceConfig) -> Arc<dyn DataSource> {
    match (&cfg.get_doc_cmd, &cfg.get_list_cmd) {
        (Some(doc), Some(list)) => Arc::new(CliSource::new(
            doc.clone(),
            list.clone(),
            cfg.unwrap.clone(),
        )),
        _ => Arc::new(StaticSource::new(
            cfg.records.clone(),
            cfg.latency_ms.map(Duration::from_millis),
        )),
    }
}

/// Loading-set key for one company lookup. `seq` keeps concurrent lookups
/// of the same name apart.
pub fn company_key(name: &str, seq: u64) -> String {
    format!("company:{name}#{seq}")
}

pub const USERS_KEY: &str = "users";

pub(crate) fn spawn_load_company(
    source: Arc<dyn DataSource>,
    doctype: String,
    name: String,
    key: String,
    tx: Sender<LoadMsg>,
) {
    thread::spawn(move || {
        debug!("fetching {doctype} {name}");
        let outcome = source
            .get_doc(&doctype, &name)
            .map(LoadOutcome::Record)
            .map_err(|e| format!("{e:#}"));
        if let Err(e) = &outcome {
            warn!("{doctype} {name}: {e}");
        }
        let _ = tx.send(LoadMsg {
            key,
            outcome,
            kind: LoadKind::Company { name },
        });
    });
}

pub(crate) fn spawn_load_users(source: Arc<dyn DataSource>, doctype: String, tx: Sender<LoadMsg>) {
    thread::spawn(move || {
        debug!("fetching {doctype} list");
        let outcome = source
            .get_list(&doctype)
            .map(LoadOutcome::Rows)
            .map_err(|e| format!("{e:#}"));
        if let Err(e) = &outcome {
            warn!("{doctype} list: {e}");
        }
        let _ = tx.send(LoadMsg {
            key: USERS_KEY.to_string(),
            outcome,
            kind: LoadKind::Users,
        });
    });
}

#[cfg(test)]
mod loader_tests;
