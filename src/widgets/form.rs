use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Empty string and empty list both count as "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(v) => v.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(v) => v.join(", "),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        FieldValue::List(v)
    }
}

pub type FormValues = BTreeMap<String, FieldValue>;

#[derive(Clone, Debug)]
pub enum FieldKind {
    Data,
    // Free text naming a record of `doctype`
    Link {
        doctype: String,
    },
    MultiSelect {
        options: Vec<String>,
        cursor: usize,
        offset: usize,
    },
    ReadOnly,
    Text {
        edit_lines: usize,
        offset: usize,
    },
}

impl FieldKind {
    pub fn is_editable(&self) -> bool {
        !matches!(self, FieldKind::ReadOnly)
    }
}

pub const OPTIONS_VISIBLE: usize = 8;

#[derive(Clone, Debug)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    pub value: FieldValue,
}

impl FormField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        let value = match kind {
            FieldKind::MultiSelect { .. } => FieldValue::List(Vec::new()),
            _ => FieldValue::Text(String::new()),
        };
        Self {
            name: name.into(),
            label: label.into(),
            required: false,
            kind,
            value,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FormState {
    pub title: String,
    pub fields: Vec<FormField>,
    pub selected: usize,
    pub editing: bool,
    pub message: Option<String>,
    pub primary_label: String,
    // Value held before the current edit started, restored on Esc
    pub edit_backup: Option<FieldValue>,
}

impl FormState {
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn get_value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|f| &f.value).filter(|v| !v.is_empty())
    }

    /// Returns true when the stored value actually changed.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> bool {
        let Some(fld) = self.field_mut(name) else {
            return false;
        };
        let value = match (&fld.kind, value) {
            // A multi-select keeps a list even when handed a single string
            (FieldKind::MultiSelect { .. }, FieldValue::Text(s)) => FieldValue::List(
                s.split(',')
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(|t| t.to_string())
                    .collect(),
            ),
            (FieldKind::MultiSelect { .. }, v) => v,
            (_, FieldValue::List(v)) => FieldValue::Text(v.join(", ")),
            (_, v) => v,
        };
        if fld.value == value {
            return false;
        }
        fld.value = value;
        true
    }

    /// Snapshot of every field holding a non-empty value.
    pub fn get_values(&self) -> FormValues {
        self.fields
            .iter()
            .filter(|f| !f.value.is_empty())
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }

    /// Replace the candidate list of a multi-select. Current selections are kept.
    pub fn set_options(&mut self, name: &str, new_options: Vec<String>) -> bool {
        let Some(fld) = self.field_mut(name) else {
            return false;
        };
        if let FieldKind::MultiSelect {
            options,
            cursor,
            offset,
        } = &mut fld.kind
        {
            *options = new_options;
            *cursor = 0;
            *offset = 0;
            return true;
        }
        false
    }

    pub fn set_required(&mut self, name: &str, required: bool) {
        if let Some(fld) = self.field_mut(name) {
            fld.required = required;
        }
    }

    pub fn primary_idx(&self) -> usize {
        self.fields.len()
    }

    pub fn cancel_idx(&self) -> usize {
        self.fields.len() + 1
    }
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    form: &mut FormState,
    highlight: bool,
    cursor_on: bool,
) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, fld) in form.fields.iter().enumerate() {
        let sel = if i == form.selected { '›' } else { ' ' };
        let req = if fld.required { " *" } else { "" };
        let missing = fld.required && fld.value.is_empty();
        let label_style = if missing {
            crate::theme::text_error()
        } else {
            Style::default()
        };
        let value_style = if !fld.kind.is_editable() {
            crate::theme::text_muted()
        } else if i == form.selected {
            if form.editing {
                crate::theme::text_editing_bold()
            } else {
                crate::theme::text_active_bold()
            }
        } else {
            Style::default()
        };
        match &fld.kind {
            FieldKind::Data | FieldKind::Link { .. } | FieldKind::ReadOnly => {
                let mut val = fld.value.display();
                if form.editing && i == form.selected && cursor_on {
                    val.push('▏');
                }
                lines.push(Line::from(vec![
                    Span::styled(format!("{sel} {}{req}: ", fld.label), label_style),
                    Span::styled(val, value_style),
                ]));
                if let FieldKind::Link { doctype } = &fld.kind {
                    if form.editing && i == form.selected {
                        lines.push(Line::from(Span::styled(
                            format!("    name of a {doctype} record"),
                            crate::theme::text_muted(),
                        )));
                    }
                }
            }
            FieldKind::Text { edit_lines, offset } => {
                lines.push(Line::from(vec![Span::styled(
                    format!("{sel} {}{req}:", fld.label),
                    label_style,
                )]));
                let text = fld.value.display();
                let body_lines: Vec<String> = if text.is_empty() {
                    vec![String::new()]
                } else {
                    text.lines().map(|l| l.to_string()).collect()
                };
                let total = body_lines.len();
                let start = (*offset).min(total);
                let end = (start + *edit_lines).min(total);
                for bl in body_lines.iter().take(end).skip(start) {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(bl.clone(), value_style),
                    ]));
                }
                if end < total {
                    let more = total - end;
                    lines.push(Line::from(Span::styled(
                        format!(
                            "  … ({} more line{})",
                            more,
                            if more == 1 { "" } else { "s" }
                        ),
                        crate::theme::text_muted(),
                    )));
                }
            }
            FieldKind::MultiSelect {
                options,
                cursor,
                offset,
            } => {
                let chosen: &[String] = match &fld.value {
                    FieldValue::List(v) => v,
                    FieldValue::Text(_) => &[],
                };
                let summary = if chosen.is_empty() {
                    "(none)".to_string()
                } else {
                    chosen.join(", ")
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{sel} {}{req}: ", fld.label), label_style),
                    Span::styled(summary, value_style),
                ]));
                if form.editing && i == form.selected {
                    if options.is_empty() {
                        lines.push(Line::from(Span::styled(
                            "    (no candidates yet)",
                            crate::theme::text_muted(),
                        )));
                    }
                    let start = (*offset).min(options.len());
                    let end = (start + OPTIONS_VISIBLE).min(options.len());
                    for (oi, opt) in options.iter().enumerate().take(end).skip(start) {
                        let chk = if chosen.iter().any(|c| c == opt) {
                            "[x]"
                        } else {
                            "[ ]"
                        };
                        let cur = if oi == *cursor { '›' } else { ' ' };
                        let st = if oi == *cursor {
                            crate::theme::list_cursor_style()
                        } else {
                            crate::theme::text_muted()
                        };
                        lines.push(Line::from(vec![Span::styled(
                            format!("  {cur} {chk} {opt}"),
                            st,
                        )]));
                    }
                }
            }
        }
    }
    if !form.fields.is_empty() {
        lines.push(Line::from(""));
    }
    let mut primary_style = crate::theme::text_active_bold();
    let mut cancel_style = crate::theme::text_muted();
    if form.selected == form.primary_idx() {
        primary_style = crate::theme::list_cursor_style();
    }
    if form.selected == form.cancel_idx() {
        cancel_style = crate::theme::list_cursor_style();
    }
    lines.push(Line::from(vec![
        Span::styled(format!("  [ {} ]  ", form.primary_label), primary_style),
        Span::styled("Cancel", cancel_style),
    ]));
    if let Some(msg) = &form.message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    let title = if form.editing {
        format!("{} — editing", form.title)
    } else {
        form.title.clone()
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}
