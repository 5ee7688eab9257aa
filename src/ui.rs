use crate::app::{update, AppMsg, Effect};
use crate::model::{validate_app_config, AppConfig};
use crate::profile::schema::{COMPANY_DOCTYPE, USER_DOCTYPE};
use crate::profile::{Action, ProfileDialog};
use crate::services::loader::{self, DataSource};
use crate::widgets::form::FormValues;
use crate::widgets::status_bar::draw_footer;
use crate::widgets::Widget;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::info;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub enum LoadOutcome {
    Record(JsonValue),
    Rows(Vec<JsonValue>),
}

pub(crate) struct LoadMsg {
    pub(crate) key: String,
    pub(crate) outcome: Result<LoadOutcome, String>,
    pub(crate) kind: LoadKind,
}

#[derive(Clone, Debug)]
pub(crate) enum LoadKind {
    Company { name: String },
    Users,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) dialog: Option<ProfileDialog>,
    pub(crate) source: Option<Arc<dyn DataSource>>,
    pub(crate) tick: u64,
    pub(crate) loading: HashSet<String>,
    load_seq: u64,
    tx: Option<Sender<LoadMsg>>,
    rx: Option<Receiver<LoadMsg>>,
    submit_rx: Option<Receiver<FormValues>>,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) last_error: Option<String>,
    // Every snapshot handed to the submit action, oldest first
    pub(crate) submitted: Vec<FormValues>,
    pub(crate) standalone: bool,
    pub(crate) should_quit: bool,
    pub(crate) show_debug: bool,
    // Debug log (rendered in the bottom strip when enabled)
    pub(crate) debug_log: VecDeque<String>,
}

impl AppState {
    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        let msg = msg.into();
        log::debug!("{msg}");
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg);
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::LoadCompany { name } => {
                state.dbg(format!("load company {name}"));
                state.load_seq = state.load_seq.wrapping_add(1);
                let key = loader::company_key(&name, state.load_seq);
                state.status_text = Some(format!("Loading company {name}"));
                state.loading.insert(key.clone());
                if let (Some(tx), Some(src)) = (&state.tx, &state.source) {
                    loader::spawn_load_company(
                        Arc::clone(src),
                        COMPANY_DOCTYPE.to_string(),
                        name,
                        key,
                        tx.clone(),
                    );
                }
            }
            Effect::LoadUsers => {
                state.dbg("load user directory");
                state.status_text = Some("Loading users".into());
                state.loading.insert(loader::USERS_KEY.to_string());
                if let (Some(tx), Some(src)) = (&state.tx, &state.source) {
                    loader::spawn_load_users(Arc::clone(src), USER_DOCTYPE.to_string(), tx.clone());
                }
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
            Effect::CloseDialog => {
                state.dbg("close dialog");
                if let Some(dialog) = state.dialog.as_mut() {
                    dialog.close();
                }
                // The dialog is the whole app; closing it ends the session
                if state.standalone {
                    state.should_quit = true;
                }
            }
            Effect::Quit => state.should_quit = true,
        }
    }
}

/// Builds the dialog with an action that forwards submissions to the loop.
pub(crate) fn open_dialog(state: &mut AppState, submit_tx: Sender<FormValues>) {
    let cfg = &state.config;
    let action = Action::new(cfg.action_label.clone(), move |values| {
        let _ = submit_tx.send(values);
    });
    let ctx = cfg.context();
    let (dialog, effects) = ProfileDialog::open(
        cfg.title.as_deref(),
        action,
        cfg.initial_values.clone(),
        &ctx,
    );
    state.dialog = Some(dialog);
    run_effects(state, effects);
}

/// Apply every finished load and submission. Results for a closed dialog
/// are applied all the same.
pub(crate) fn pump(state: &mut AppState) {
    let mut drained_msgs: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained_msgs.push(msg);
        }
    }
    for msg in drained_msgs {
        state.loading.remove(&msg.key);
        let outcome = msg.outcome;
        let effects = match msg.kind {
            LoadKind::Company { name } => update(state, AppMsg::LoadedCompany { name, outcome }),
            LoadKind::Users => update(state, AppMsg::LoadedUsers { outcome }),
        };
        run_effects(state, effects);
    }
    let mut drained_values: Vec<FormValues> = Vec::new();
    if let Some(srx) = &state.submit_rx {
        while let Ok(values) = srx.try_recv() {
            drained_values.push(values);
        }
    }
    for values in drained_values {
        let effects = update(state, AppMsg::Submitted(values));
        run_effects(state, effects);
    }
}

fn key_msg(code: KeyCode, modifiers: KeyModifiers) -> Option<AppMsg> {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('s') => Some(AppMsg::SubmitShortcut),
            _ => None,
        };
    }
    Some(AppMsg::Key(code))
}

pub fn run() -> Result<()> {
    let mut cfg = load_config()?;
    cfg.apply_env_overrides();
    validate_app_config(&cfg).map_err(|e| anyhow!("invalid config: {e}"))?;
    let source = loader::source_from_config(&cfg.source);
    let mut state = AppState {
        config: cfg,
        source: Some(source),
        standalone: true,
        show_debug: env_flag("HUB_PROFILE_DEBUG"),
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);
    let (submit_tx, submit_rx) = mpsc::channel::<FormValues>();
    state.submit_rx = Some(submit_rx);
    info!("opening profile dialog for {}", state.config.session.user);
    open_dialog(&mut state, submit_tx);

    if env_flag("HUB_PROFILE_HEADLESS") {
        return run_headless(&mut state);
    }

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = event_loop(&mut terminal, &mut state);
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res?;

    if let Some(values) = state.submitted.last() {
        let out = serde_json::to_string_pretty(values).context("serializing submitted values")?;
        println!("{out}");
    }
    Ok(())
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    while !state.should_quit {
        terminal.draw(|f| ui(f, state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    break;
                }
                if let Some(msg) = key_msg(key.code, key.modifiers) {
                    let effects = update(state, msg);
                    run_effects(state, effects);
                }
            }
        }
        pump(state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn run_headless(state: &mut AppState) -> Result<()> {
    let ticks: u64 = std::env::var("HUB_PROFILE_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let submit = env_flag("HUB_PROFILE_HEADLESS_SUBMIT");
    // Headless runs keep pumping after a close so the summary sees late results
    state.standalone = false;
    let backend = ratatui::backend::TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend)?;
    for _ in 0..ticks {
        terminal.draw(|f| ui(f, state))?;
        pump(state);
        state.tick = state.tick.wrapping_add(1);
        std::thread::sleep(Duration::from_millis(200));
    }
    if submit {
        let effects = update(state, AppMsg::SubmitShortcut);
        run_effects(state, effects);
        pump(state);
    }
    println!("{}", headless_summary(state));
    Ok(())
}

pub(crate) fn headless_summary(state: &AppState) -> JsonValue {
    let missing: Vec<String> = state
        .dialog
        .as_ref()
        .map(|d| {
            d.form()
                .fields
                .iter()
                .filter(|f| f.required && f.value.is_empty())
                .map(|f| f.name.clone())
                .collect()
        })
        .unwrap_or_default();
    let values = match state.submitted.last() {
        Some(v) => v.clone(),
        None => state
            .dialog
            .as_ref()
            .map(|d| d.get_values())
            .unwrap_or_default(),
    };
    let candidates = state
        .dialog
        .as_ref()
        .map(|d| d.candidates())
        .unwrap_or_default();
    serde_json::json!({
        "ok": state.last_error.is_none(),
        "submitted": !state.submitted.is_empty(),
        "missing": missing,
        "values": values,
        "candidates": candidates,
    })
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading config: {path:?}"))?;
    let cfg: AppConfig =
        serde_yaml::from_str(&s).with_context(|| format!("parsing config: {path:?}"))?;
    Ok(cfg)
}

const CONFIG_FILE: &str = "hub-profile.yaml";

fn load_config() -> Result<AppConfig> {
    // 1) Explicit file
    if let Ok(p) = std::env::var("HUB_PROFILE_CONFIG") {
        return read_config(Path::new(&p));
    }
    // 2) CWD and CWD/.tui
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let candidates = [cwd.join(CONFIG_FILE), cwd.join(".tui").join(CONFIG_FILE)];
    for p in &candidates {
        if p.exists() {
            return read_config(p);
        }
    }
    // 3) <ancestor>/.tui/hub-profile.yaml
    let mut cur = cwd.as_path();
    while let Some(parent) = cur.parent() {
        let p = parent.join(".tui").join(CONFIG_FILE);
        if p.exists() {
            return read_config(&p);
        }
        cur = parent;
    }
    // 4) ~/.tui/hub-profile.yaml
    if let Some(home) = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from)
    {
        let p = home.join(".tui").join(CONFIG_FILE);
        if p.exists() {
            return read_config(&p);
        }
    }
    Err(anyhow!(
        "No config found. Set HUB_PROFILE_CONFIG=<file> or place hub-profile.yaml in CWD/.tui and ancestors"
    ))
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
    let screen = f.area();
    let bg = Block::default().style(Style::default().bg(crate::theme::Theme::default().bg));
    f.render_widget(bg, screen);

    const DEBUG_H: u16 = 4;
    let mut constraints = vec![Constraint::Min(0)];
    if state.show_debug {
        constraints.push(Constraint::Length(DEBUG_H));
    }
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(screen);
    let main = chunks[0];
    let footer = chunks[chunks.len() - 1];

    let tick = state.tick;
    match state.dialog.as_mut().filter(|d| !d.is_closed()) {
        Some(dialog) => {
            let area = crate::widgets::form_widget::centered_rect(70, 90, main);
            f.render_widget(Clear, area);
            dialog.render(f, area, true, tick);
        }
        None => {
            let p = Paragraph::new("Profile dialog closed. Press q to quit.")
                .style(crate::theme::text_muted())
                .block(crate::widgets::chrome::panel_block("Profile", false));
            f.render_widget(p, main);
        }
    }
    if state.show_debug {
        draw_debug(f, chunks[1], state);
    }
    let help = "↑/↓ move  Enter edit  Space toggle  Ctrl+S save  Esc cancel";
    draw_footer(f, footer, state, help);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "Debug",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ));
    // Take last `area.height` lines
    let h = area.height as usize;
    let total = state.debug_log.len();
    let start = total.saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
