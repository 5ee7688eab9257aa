use crate::ui::{AppState, LoadOutcome, ToastLevel};
use crate::widgets::form::FormValues;
use crate::widgets::Widget;
use crossterm::event::KeyCode;
use log::{info, warn};

pub enum AppMsg {
    Key(KeyCode),
    SubmitShortcut,
    LoadedCompany {
        name: String,
        outcome: Result<LoadOutcome, String>,
    },
    LoadedUsers {
        outcome: Result<LoadOutcome, String>,
    },
    Submitted(FormValues),
}

#[derive(Debug)]
pub enum Effect {
    LoadCompany {
        name: String,
    },
    LoadUsers,
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
    CloseDialog,
    Quit,
}

pub(crate) fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        Key(code) => {
            if let Some(dialog) = state.dialog.as_mut().filter(|d| !d.is_closed()) {
                effects.extend(dialog.on_key(code));
            } else if matches!(code, KeyCode::Esc | KeyCode::Char('q')) {
                effects.push(Effect::Quit);
            }
        }
        SubmitShortcut => {
            if let Some(dialog) = state.dialog.as_mut().filter(|d| !d.is_closed()) {
                effects.extend(dialog.submit_shortcut());
            }
        }
        LoadedCompany { name, outcome } => {
            clear_status_when_idle(state);
            match outcome {
                Ok(LoadOutcome::Record(record)) => {
                    state.dbg(format!("company {name} loaded"));
                    if let Some(dialog) = state.dialog.as_mut() {
                        dialog.apply_company(&record);
                    }
                }
                Ok(LoadOutcome::Rows(_)) => {
                    state.dbg(format!("company {name}: expected a record, got rows"));
                }
                Err(e) => {
                    warn!("company lookup for {name} failed: {e}");
                    state.dbg(format!("company {name} failed: {e}"));
                    state.last_error = Some(e.clone());
                    effects.push(Effect::ShowToast {
                        text: format!("Could not load company {name}: {e}"),
                        level: ToastLevel::Error,
                        seconds: 4,
                    });
                }
            }
        }
        LoadedUsers { outcome } => {
            clear_status_when_idle(state);
            match outcome {
                Ok(LoadOutcome::Rows(rows)) => {
                    state.dbg(format!("user directory loaded: {} rows", rows.len()));
                    if let Some(dialog) = state.dialog.as_mut() {
                        dialog.apply_users(&rows);
                    }
                }
                Ok(LoadOutcome::Record(_)) => {
                    state.dbg("user directory: expected rows, got a record");
                }
                Err(e) => {
                    warn!("user directory fetch failed: {e}");
                    state.dbg(format!("user directory failed: {e}"));
                    state.last_error = Some(e.clone());
                    effects.push(Effect::ShowToast {
                        text: format!("Could not load users: {e}"),
                        level: ToastLevel::Error,
                        seconds: 4,
                    });
                }
            }
        }
        Submitted(values) => {
            info!("profile submitted with {} fields", values.len());
            state.dbg(format!("submitted: {:?}", values.keys().collect::<Vec<_>>()));
            state.submitted.push(values);
            effects.push(Effect::CloseDialog);
            effects.push(Effect::ShowToast {
                text: "Profile updated".into(),
                level: ToastLevel::Success,
                seconds: 2,
            });
        }
    }
    effects
}

// The spinner stays up while any load is still in flight.
fn clear_status_when_idle(state: &mut AppState) {
    if state.loading.is_empty() {
        state.status_text = None;
    }
}
