use crate::widgets::form::{draw_form, FieldKind, FieldValue, FormState, OPTIONS_VISIBLE};
use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use tui_textarea::TextArea;

/// What a key press did to the form, for the owner to act on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormEvent {
    // A committed edit changed the named field
    Changed(String),
    Primary,
    Cancel,
}

pub struct FormWidget {
    pub form: FormState,
    ta: Option<TextArea<'static>>,
}

impl FormWidget {
    pub fn new(form: FormState) -> Self {
        Self { form, ta: None }
    }

    fn selected_kind(&self) -> Option<&FieldKind> {
        self.form.fields.get(self.form.selected).map(|f| &f.kind)
    }

    pub fn editing_textarea(&self) -> bool {
        self.form.editing && matches!(self.selected_kind(), Some(FieldKind::Text { .. }))
    }

    fn begin_edit(&mut self) {
        let sel = self.form.selected;
        let Some(fld) = self.form.fields.get(sel) else {
            return;
        };
        if !fld.kind.is_editable() {
            self.form.message = Some(format!("{} is read only", fld.label));
            return;
        }
        if let FieldKind::Text { .. } = fld.kind {
            let mut ta = TextArea::default();
            let txt = fld.value.display();
            if !txt.is_empty() {
                ta.insert_str(txt);
            }
            ta.set_block(
                ratatui::widgets::Block::default()
                    .borders(ratatui::widgets::Borders::ALL)
                    .title(format!("Editing: {} — Ctrl+S Save • Esc Cancel", fld.label)),
            );
            self.ta = Some(ta);
        }
        self.form.edit_backup = Some(fld.value.clone());
        self.form.editing = true;
        self.form.message = None;
    }

    fn finish_edit(&mut self) -> Vec<FormEvent> {
        self.form.editing = false;
        let backup = self.form.edit_backup.take();
        let Some(fld) = self.form.fields.get(self.form.selected) else {
            return Vec::new();
        };
        if backup.as_ref() != Some(&fld.value) {
            vec![FormEvent::Changed(fld.name.clone())]
        } else {
            Vec::new()
        }
    }

    fn cancel_edit(&mut self) {
        let sel = self.form.selected;
        if let Some(prev) = self.form.edit_backup.take() {
            if let Some(fld) = self.form.fields.get_mut(sel) {
                fld.value = prev;
            }
        }
        self.ta = None;
        self.form.editing = false;
        self.form.message = None;
    }

    pub fn commit_textarea(&mut self) -> Vec<FormEvent> {
        if !self.editing_textarea() {
            return Vec::new();
        }
        let Some(ta) = self.ta.take() else {
            return Vec::new();
        };
        let text = ta.lines().join("\n");
        let sel = self.form.selected;
        if let Some(fld) = self.form.fields.get_mut(sel) {
            fld.value = FieldValue::Text(text);
        }
        self.finish_edit()
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        // Suppress the inline cursor while the textarea overlay is up
        let cursor_on = tick % 2 == 0 && !self.editing_textarea();
        draw_form(f, area, &mut self.form, focused, cursor_on);
        if self.editing_textarea() {
            if let Some(ta) = self.ta.as_ref() {
                let rect = centered_rect(80, 70, area);
                f.render_widget(ratatui::widgets::Clear, rect);
                f.render_widget(ta, rect);
            }
        }
    }

    pub fn on_key(&mut self, key: KeyCode) -> Vec<FormEvent> {
        if self.editing_textarea() {
            if key == KeyCode::Esc {
                self.cancel_edit();
            } else if let (Some(ta), Some(ev)) = (self.ta.as_mut(), textarea_key(key)) {
                let _ = ta.input(ev);
            }
            return Vec::new();
        }
        if self.form.editing {
            return self.on_edit_key(key);
        }
        match key {
            KeyCode::Up => {
                if self.form.selected > 0 {
                    self.form.selected -= 1;
                }
                Vec::new()
            }
            KeyCode::Down | KeyCode::Tab => {
                if self.form.selected < self.form.cancel_idx() {
                    self.form.selected += 1;
                }
                Vec::new()
            }
            KeyCode::Left if self.form.selected == self.form.cancel_idx() => {
                self.form.selected = self.form.primary_idx();
                Vec::new()
            }
            KeyCode::Right if self.form.selected == self.form.primary_idx() => {
                self.form.selected = self.form.cancel_idx();
                Vec::new()
            }
            KeyCode::Enter => {
                let sel = self.form.selected;
                if sel == self.form.primary_idx() {
                    vec![FormEvent::Primary]
                } else if sel == self.form.cancel_idx() {
                    vec![FormEvent::Cancel]
                } else {
                    self.begin_edit();
                    Vec::new()
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => vec![FormEvent::Cancel],
            _ => Vec::new(),
        }
    }

    fn on_edit_key(&mut self, key: KeyCode) -> Vec<FormEvent> {
        let sel = self.form.selected;
        match key {
            KeyCode::Enter => return self.finish_edit(),
            KeyCode::Esc => {
                self.cancel_edit();
                return Vec::new();
            }
            _ => {}
        }
        let Some(fld) = self.form.fields.get_mut(sel) else {
            return Vec::new();
        };
        match (&mut fld.kind, &mut fld.value, key) {
            (FieldKind::MultiSelect { cursor, offset, .. }, _, KeyCode::Up) => {
                if *cursor > 0 {
                    *cursor -= 1;
                }
                if *cursor < *offset {
                    *offset = *cursor;
                }
            }
            (
                FieldKind::MultiSelect {
                    options,
                    cursor,
                    offset,
                },
                _,
                KeyCode::Down,
            ) => {
                if *cursor + 1 < options.len() {
                    *cursor += 1;
                }
                if *cursor >= *offset + OPTIONS_VISIBLE {
                    *offset = *cursor + 1 - OPTIONS_VISIBLE;
                }
            }
            (
                FieldKind::MultiSelect {
                    options, cursor, ..
                },
                value,
                KeyCode::Char(' '),
            ) => {
                if let Some(opt) = options.get(*cursor).cloned() {
                    let mut chosen = match value {
                        FieldValue::List(v) => std::mem::take(v),
                        FieldValue::Text(_) => Vec::new(),
                    };
                    if let Some(pos) = chosen.iter().position(|c| *c == opt) {
                        chosen.remove(pos);
                    } else {
                        chosen.push(opt);
                    }
                    *value = FieldValue::List(chosen);
                }
            }
            (FieldKind::Data | FieldKind::Link { .. }, FieldValue::Text(s), KeyCode::Char(c)) => {
                s.push(c);
            }
            (FieldKind::Data | FieldKind::Link { .. }, FieldValue::Text(s), KeyCode::Backspace) => {
                s.pop();
            }
            _ => {}
        }
        Vec::new()
    }
}

fn textarea_key(key: KeyCode) -> Option<rt_event::KeyEvent> {
    let code = match key {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    };
    Some(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE))
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(v[1]);
    h[1]
}
