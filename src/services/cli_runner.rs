use anyhow::{anyhow, Context, Result};
use log::debug;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::process::Command;
use std::{collections::HashMap, env};

fn expand_cmdline_env(cmdline: &str) -> Result<String> {
    // Expand ${VAR} from environment; ${APP_BIN} falls back to HUB_PROFILE_APP_BIN
    // (shell-quoted so shlex::split keeps it whole) or "hub-app"
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}")?;
    let env_map: HashMap<String, String> = env::vars().collect();
    let mut quote_err = None;
    let out = re.replace_all(cmdline, |caps: &regex::Captures| {
        let key = &caps[1];
        if key == "APP_BIN" {
            return match env_map.get("HUB_PROFILE_APP_BIN") {
                Some(v) => match shlex::try_quote(v) {
                    Ok(q) => q.into_owned(),
                    Err(e) => {
                        quote_err = Some(e);
                        String::new()
                    }
                },
                None => "hub-app".to_string(),
            };
        }
        env_map.get(key).cloned().unwrap_or_default()
    });
    if let Some(e) = quote_err {
        return Err(anyhow!("HUB_PROFILE_APP_BIN: {e}"));
    }
    Ok(out.to_string())
}

/// Splits a command template into argv, then fills `{placeholder}`s inside
/// each argument. Substituted values are never shell-parsed or env-expanded.
pub fn template_argv(template: &str, vars: &[(&str, &str)]) -> Result<Vec<String>> {
    let expanded = expand_cmdline_env(template)?;
    let parts = shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
    if parts.is_empty() {
        return Err(anyhow!("Empty command line"));
    }
    Ok(parts
        .into_iter()
        .map(|arg| {
            vars.iter().fold(arg, |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            })
        })
        .collect())
}

pub fn run_argv_to_json(argv: &[String]) -> Result<JsonValue> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("Empty command line"))?;
    debug!("running {argv:?}");
    let output = Command::new(program)
        .args(args)
        .env("HUB_PROFILE_JSON", "1")
        .output()
        .with_context(|| format!("spawning {program}"))?;
    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(anyhow!("Command failed ({}): {:?}\n{}", output.status, argv, err));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let v: JsonValue = serde_json::from_str(&text).with_context(|| "parsing command JSON")?;
    Ok(v)
}
