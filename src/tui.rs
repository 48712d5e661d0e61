use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};

use crate::app::{ProgressEvent, ProgressSink, ProgressSinkKind};
use crate::error::CatalogError;
use crate::notify::{TOAST_TTL, Toast, ToastKind, ToastState};

const EVENTS_MAX: usize = 200;

#[derive(Debug)]
struct AppState {
    status: String,
    percent: Option<u8>,
    events: VecDeque<String>,
    toast: ToastState,
    started: Instant,
    active: bool,
    summary: Vec<String>,
}

/// Full-screen progress view for long-running commands.
pub struct Tui {
    kind: ProgressSinkKind,
    state: Arc<Mutex<AppState>>,
    scroll: u16,
}

struct TuiProgress {
    state: Arc<Mutex<AppState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some(percent) = event.percent {
                state.percent = Some(percent);
            }
            state.status = message.clone();
            push_event(&mut state.events, format!("[{}] {message}", timestamp()));
        }
    }

    fn notify(&self, toast: &Toast) {
        if let Ok(mut state) = self.state.lock() {
            state.toast.show(toast.clone());
        }
    }
}

impl Tui {
    pub fn new(kind: ProgressSinkKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(AppState {
                status: "starting".to_string(),
                percent: None,
                events: VecDeque::new(),
                toast: ToastState::default(),
                started: Instant::now(),
                active: false,
                summary: Vec::new(),
            })),
            scroll: 0,
        }
    }

    /// Runs `f` on a worker thread while drawing its progress. `q` or `Esc`
    /// leaves the view; the worker is not interrupted.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, CatalogError> + Send + 'static,
        R: Send + 'static,
    {
        self.set_active(true);

        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        loop {
            if let Ok(mut state) = self.state.lock() {
                state.toast.tick(Instant::now());
                terminal
                    .draw(|frame| draw_ui(frame, self.kind, &state, tick, self.scroll))
                    .into_diagnostic()?;
            }

            if let Ok(result) = rx.try_recv() {
                self.set_active(false);
                restore_terminal()?;
                handle.join().ok();
                return result.map_err(miette::Report::new);
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        self.set_active(false);
        restore_terminal()?;
        Err(miette::Report::msg("aborted"))
    }

    /// Shows the final state with `summary` until a key is pressed or the
    /// last toast expires.
    pub fn finish(&mut self, summary: Vec<String>) -> miette::Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.summary = summary;
        }

        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let shown = Instant::now();
        loop {
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, self.kind, &state, 0, self.scroll))
                    .into_diagnostic()?;
            }
            if shown.elapsed() >= TOAST_TTL {
                break;
            }
            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if key.kind == KeyEventKind::Press {
                        break;
                    }
                }
            }
        }

        restore_terminal()
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => true,
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_add(1);
                false
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_sub(1);
                false
            }
            _ => false,
        }
    }

    fn set_active(&self, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.active = active;
            if active {
                state.started = Instant::now();
            }
        }
    }
}

fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
    Ok(())
}

fn draw_ui(
    frame: &mut ratatui::Frame,
    kind: ProgressSinkKind,
    state: &AppState,
    tick: usize,
    scroll: u16,
) {
    let show_gauge = kind == ProgressSinkKind::BulkDownload;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(if show_gauge { 3 } else { 0 }),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(state, kind, tick), chunks[0]);
    if show_gauge {
        let percent = state.percent.unwrap_or(0);
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(u16::from(percent))
            .label(format!("{percent}%"));
        frame.render_widget(gauge, chunks[1]);
    }
    frame.render_widget(draw_events(state, scroll, chunks[2].height), chunks[2]);
    frame.render_widget(draw_toast(state), chunks[3]);
}

fn draw_header(state: &AppState, kind: ProgressSinkKind, tick: usize) -> Paragraph<'static> {
    let hb = if state.active && tick % 2 == 0 { "*" } else { " " };
    let op_label = match kind {
        ProgressSinkKind::BulkDownload => "Download all",
        ProgressSinkKind::SingleDownload => "Download",
    };
    let title = Line::from(vec![
        Span::styled(
            "CEO BARS",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   Op: "),
        Span::styled(op_label, Style::default().fg(Color::Cyan)),
        Span::raw(format!("   {:.1}s ", state.started.elapsed().as_secs_f64())),
        Span::styled(hb, Style::default().fg(Color::Green)),
    ]);
    let status = Line::from(Span::styled(
        state.status.clone(),
        Style::default().fg(Color::Gray),
    ));
    Paragraph::new(vec![title, status])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_events(state: &AppState, scroll: u16, height: u16) -> Paragraph<'static> {
    let mut lines: Vec<Line> = state
        .events
        .iter()
        .map(|event| Line::from(event.clone()))
        .collect();
    for line in &state.summary {
        lines.push(Line::from(Span::styled(
            line.clone(),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )));
    }
    let visible = height.saturating_sub(2) as usize;
    let bottom = lines.len().saturating_sub(visible) as u16;
    let offset = bottom.saturating_sub(scroll);
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Events"))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0))
}

fn draw_toast(state: &AppState) -> Paragraph<'static> {
    let line = match state.toast.current() {
        Toast::Hidden => Line::from(Span::styled(
            "q: quit   ↑/↓: scroll",
            Style::default().fg(Color::DarkGray),
        )),
        Toast::Showing { message, kind } => {
            let (icon, color) = match kind {
                ToastKind::Loading => ("…", Color::Cyan),
                ToastKind::Success => ("✓", Color::Green),
                ToastKind::Error => ("✗", Color::Red),
            };
            Line::from(Span::styled(
                format!("{icon} {message}"),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
        }
    };
    Paragraph::new(line).block(Block::default().borders(Borders::TOP))
}

fn push_event(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(item);
    while buffer.len() > EVENTS_MAX {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    let now = SystemTime::now();
    let secs = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs();
    let mins = (secs / 60) % 60;
    let hours = (secs / 3600) % 24;
    let seconds = secs % 60;
    format!("{hours:02}:{mins:02}:{seconds:02}")
}
