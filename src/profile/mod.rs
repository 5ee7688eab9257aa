pub mod schema;

use crate::app::Effect;
use crate::i18n::Translator;
use crate::widgets::form::{FieldValue, FormState, FormValues};
use crate::widgets::form_widget::{FormEvent, FormWidget};
use crossterm::event::KeyCode;
use log::{debug, info, warn};
use ratatui::prelude::*;
use schema::{FieldSpec, OnChange, MANDATORY_FIELDS, SYSTEM_USERS};
use serde_json::Value as JsonValue;

/// Caller-owned submit hook. Runs once per successful submission.
pub struct Action {
    pub label: Option<String>,
    pub on_submit: Box<dyn FnMut(FormValues)>,
}

impl Action {
    pub fn new(label: Option<String>, on_submit: impl FnMut(FormValues) + 'static) -> Self {
        Self {
            label,
            on_submit: Box::new(on_submit),
        }
    }
}

/// Environment the dialog would otherwise read from globals.
#[derive(Clone, Debug, Default)]
pub struct DialogContext {
    pub session_user: String,
    pub default_company: Option<String>,
    pub translator: Translator,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    Incomplete(Vec<String>),
}

pub struct ProfileDialog {
    pub widget: FormWidget,
    specs: Vec<FieldSpec>,
    action: Action,
    session_user: String,
    closed: bool,
}

impl ProfileDialog {
    /// Builds the dialog and returns it with the loads to start, in order.
    ///
    /// The default company is written after `initial_values`, so it always
    /// replaces a caller-supplied company (an absent default clears it).
    pub fn open(
        title: Option<&str>,
        action: Action,
        initial_values: FormValues,
        ctx: &DialogContext,
    ) -> (Self, Vec<Effect>) {
        let tr = &ctx.translator;
        let specs = schema::profile_fields(tr);
        let form = FormState {
            title: title
                .map(str::to_string)
                .unwrap_or_else(|| tr.tr("Edit Profile")),
            fields: specs.iter().map(FieldSpec::to_form_field).collect(),
            primary_label: action.label.clone().unwrap_or_else(|| tr.tr("Update")),
            ..Default::default()
        };
        let mut dialog = Self {
            widget: FormWidget::new(form),
            specs,
            action,
            session_user: ctx.session_user.clone(),
            closed: false,
        };
        let mut effects = vec![Effect::LoadUsers];
        effects.extend(dialog.set_values(initial_values));
        let default_company = ctx.default_company.clone().unwrap_or_default();
        effects.extend(dialog.set_value("company", FieldValue::Text(default_company)));
        (dialog, effects)
    }

    pub fn form(&self) -> &FormState {
        &self.widget.form
    }

    pub fn get_value(&self, fieldname: &str) -> Option<&FieldValue> {
        self.widget.form.get_value(fieldname)
    }

    pub fn get_values(&self) -> FormValues {
        self.widget.form.get_values()
    }

    pub fn candidates(&self) -> Vec<String> {
        match self.widget.form.field("users").map(|f| &f.kind) {
            Some(crate::widgets::form::FieldKind::MultiSelect { options, .. }) => options.clone(),
            _ => Vec::new(),
        }
    }

    /// Writes one value; a real change runs the field's change hook.
    pub fn set_value(&mut self, fieldname: &str, value: FieldValue) -> Vec<Effect> {
        if !self.widget.form.set_value(fieldname, value) {
            return Vec::new();
        }
        self.field_changed(fieldname)
    }

    pub fn set_values(&mut self, values: FormValues) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (fieldname, value) in values {
            effects.extend(self.set_value(&fieldname, value));
        }
        effects
    }

    fn field_changed(&mut self, fieldname: &str) -> Vec<Effect> {
        let hook = self
            .specs
            .iter()
            .find(|s| s.fieldname == fieldname)
            .and_then(|s| s.onchange);
        match hook {
            Some(OnChange::FetchCompanyDetails) => self.on_company_change(),
            None => Vec::new(),
        }
    }

    // A cleared company leaves the derived fields as they are.
    fn on_company_change(&self) -> Vec<Effect> {
        match self.get_value("company").and_then(FieldValue::as_text) {
            Some(name) => {
                debug!("company changed to {name}, fetching details");
                vec![Effect::LoadCompany {
                    name: name.to_string(),
                }]
            }
            None => Vec::new(),
        }
    }

    /// Copies the derived fields out of a fetched company record.
    pub fn apply_company(&mut self, record: &JsonValue) {
        let derived = [
            ("country", record_text(record, "country")),
            ("company_email", record_text(record, "email")),
            ("currency", record_text(record, "default_currency")),
        ];
        for (fieldname, value) in derived {
            self.widget.form.set_value(fieldname, FieldValue::Text(value));
        }
    }

    pub fn apply_users(&mut self, rows: &[JsonValue]) {
        if self.closed {
            // No guard against late delivery; the result still lands.
            warn!("user list arrived after the profile dialog was closed");
        }
        let users = candidate_users(rows, &self.session_user);
        info!("loaded {} collaborator candidates", users.len());
        self.widget.form.set_options("users", users);
    }

    /// Submission gate: every mandatory field must hold a value, otherwise the
    /// missing ones are flagged and the action is skipped.
    pub fn primary_action(&mut self) -> SubmitOutcome {
        let values = self.get_values();
        let mut missing: Vec<String> = Vec::new();
        for fieldname in MANDATORY_FIELDS {
            let filled = values.get(fieldname).is_some_and(|v| !v.is_empty());
            if !filled {
                self.widget.form.set_required(fieldname, true);
                missing.push(fieldname.to_string());
            }
        }
        if !missing.is_empty() {
            debug!("submit blocked, missing {missing:?}");
            self.widget.form.message = Some("Please fill in the highlighted fields".into());
            return SubmitOutcome::Incomplete(missing);
        }
        self.widget.form.message = None;
        (self.action.on_submit)(values);
        SubmitOutcome::Submitted
    }

    /// Ctrl+S: save the open description editor, or submit.
    pub fn submit_shortcut(&mut self) -> Vec<Effect> {
        if self.widget.editing_textarea() {
            let events = self.widget.commit_textarea();
            return self.handle_events(events);
        }
        if self.widget.form.editing {
            return Vec::new();
        }
        self.primary_action();
        Vec::new()
    }

    fn handle_events(&mut self, events: Vec<FormEvent>) -> Vec<Effect> {
        let mut effects = Vec::new();
        for ev in events {
            match ev {
                FormEvent::Changed(fieldname) => effects.extend(self.field_changed(&fieldname)),
                FormEvent::Primary => {
                    self.primary_action();
                }
                FormEvent::Cancel => effects.push(Effect::CloseDialog),
            }
        }
        effects
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl crate::widgets::Widget for ProfileDialog {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        self.widget.render(f, area, focused, tick);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        let events = self.widget.on_key(key);
        self.handle_events(events)
    }
}

fn record_text(record: &JsonValue, key: &str) -> String {
    match record.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// User names from directory rows, minus system accounts and the session user.
pub fn candidate_users(rows: &[JsonValue], session_user: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|row| {
            row.as_str()
                .or_else(|| row.get("name").and_then(|n| n.as_str()))
        })
        .filter(|name| !SYSTEM_USERS.contains(name) && *name != session_user)
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests;
