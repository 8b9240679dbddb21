//! Ratatui-based terminal UI.
//!
//! The TUI walks the applicant through the wizard: a chooser, the upload
//! screen (spreadsheet picker, typed path or the sample document), the
//! seven-page manual form and the result view. Submissions run on a worker
//! thread so the screen keeps redrawing while the service answers.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::data::predict::{PredictionClient, PredictionService};
use crate::data::sample::{SAMPLE_DOWNLOAD_NAME, SampleSource, download_sample_document, load_sample_document};
use crate::domain::{Field, FieldKind, FieldValue, PredictionResult};
use crate::error::AppError;
use crate::report::{
    NOT_AVAILABLE, approval_badge, display_value, format_currency, format_range, probability_percent, truncate,
};
use crate::wizard::{Page, Screen, Wizard};

const HELP_TITLE: &str = "How this works";

const HELP_TEXT: &str = "\
Start by choosing how to provide your application.

Upload: pick a spreadsheet (.xlsx, .xls, .xlsb, .ods or .csv, up to 10MB)
found under the current directory, type a path with `p`, or load the sample
application with `l`. Only the first data row of the first sheet is read and
columns are matched by their exact header text. Save the sample with `s` to
see the expected layout.

Manual: fill in the six sections one page at a time. Use n / b to move
between pages. On a page, Up/Down selects a field, Enter edits an amount,
Space toggles a yes/no answer and Left/Right cycles through coded answers.
Leave an amount blank if it does not apply; blanks are sent as 0.

Summary: review every answer, then press Enter to submit. The assessment
service returns a decision, a predicted loan amount, an approved range and
the approval probability, with the factors that weighed most.

Press ? to close this help. Press q to quit at any time.";

/// Start the TUI.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let service: Arc<dyn PredictionService + Send + Sync> = Arc::new(PredictionClient::new(config.api_url.clone()));
    let sample = crate::app::sample_source(&config);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    info!(api_url = %config.api_url, "starting wizard");
    let mut app = App::new(service, sample);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Choices on the opening screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Upload,
    Manual,
}

type Outcome = Result<PredictionResult, AppError>;

struct App {
    wizard: Wizard,
    service: Arc<dyn PredictionService + Send + Sync>,
    sample: SampleSource,
    choice: Choice,
    documents: Vec<PathBuf>,
    selected_document: usize,
    path_input: String,
    editing_path: bool,
    selected_field: usize,
    /// Text being typed into a numeric field.
    edit_buffer: Option<String>,
    status: String,
    pending: Option<Receiver<Outcome>>,
}

impl App {
    fn new(service: Arc<dyn PredictionService + Send + Sync>, sample: SampleSource) -> Self {
        Self {
            wizard: Wizard::new(),
            service,
            sample,
            choice: Choice::Upload,
            documents: Vec::new(),
            selected_document: 0,
            path_input: String::new(),
            editing_path: false,
            selected_field: 0,
            edit_buffer: None,
            status: "Press ? for help.".to_string(),
            pending: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if self.poll_submission() {
                needs_redraw = true;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code)? {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool, AppError> {
        // The alert blocks everything until acknowledged.
        if self.wizard.alert().is_some() {
            if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                self.wizard.dismiss_alert();
            }
            return Ok(false);
        }

        if self.edit_buffer.is_some() {
            self.handle_number_edit(code);
            return Ok(false);
        }
        if self.editing_path {
            self.handle_path_edit(code);
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('?') => {
                self.wizard.toggle_help();
                self.wizard.reset_scroll();
                return Ok(false);
            }
            _ => {}
        }

        if self.wizard.help_visible() {
            match code {
                KeyCode::Esc => self.wizard.toggle_help(),
                KeyCode::Up => self.wizard.scroll_by(-1),
                KeyCode::Down => self.wizard.scroll_by(1),
                _ => {}
            }
            return Ok(false);
        }

        match self.wizard.screen() {
            Screen::Buttons => self.handle_buttons_key(code),
            Screen::Upload => self.handle_upload_key(code),
            Screen::Manual => self.handle_manual_key(code),
            Screen::Result => self.handle_result_key(code),
        }
        Ok(false)
    }

    fn handle_buttons_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                self.choice = match self.choice {
                    Choice::Upload => Choice::Manual,
                    Choice::Manual => Choice::Upload,
                };
            }
            KeyCode::Enter => match self.choice {
                Choice::Upload => self.open_upload(),
                Choice::Manual => self.open_manual(),
            },
            KeyCode::Char('u') => self.open_upload(),
            KeyCode::Char('m') => self.open_manual(),
            _ => {}
        }
    }

    fn open_upload(&mut self) {
        self.start_flow(Screen::Upload);
        self.refresh_documents();
    }

    fn open_manual(&mut self) {
        self.start_flow(Screen::Manual);
        self.status = "Fill in each section; n for next page.".to_string();
    }

    /// Leaving the chooser always starts over with an empty record.
    fn start_flow(&mut self, screen: Screen) {
        self.discard_pending();
        self.wizard.start_flow(screen);
        self.selected_field = 0;
        self.path_input.clear();
    }

    fn refresh_documents(&mut self) {
        self.documents = crate::cli::picker::discover_documents();
        self.selected_document = 0;
        self.wizard.clear_upload_error();
        self.status = format!("Found {} spreadsheet(s).", self.documents.len());
    }

    fn handle_upload_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.selected_document = self.selected_document.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_document + 1 < self.documents.len() {
                    self.selected_document += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(path) = self.documents.get(self.selected_document).cloned() {
                    self.load_document(&path);
                }
            }
            KeyCode::Char('p') => {
                self.editing_path = true;
                self.status = "Type a path. Enter to load, Esc to cancel.".to_string();
            }
            KeyCode::Char('l') => self.load_sample(),
            KeyCode::Char('s') => self.save_sample(),
            KeyCode::Char('r') => self.refresh_documents(),
            KeyCode::Esc => self.wizard.go_to(Screen::Buttons),
            _ => {}
        }
    }

    fn handle_path_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_path = false;
                self.status = "Path entry canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_path = false;
                let path = PathBuf::from(self.path_input.trim());
                self.load_document(&path);
            }
            KeyCode::Backspace => {
                self.path_input.pop();
            }
            KeyCode::Char(c) => self.path_input.push(c),
            _ => {}
        }
    }

    fn load_document(&mut self, path: &Path) {
        match crate::io::document::parse_document(path) {
            Ok(partial) => {
                self.discard_pending();
                self.wizard.apply_document(&partial);
                self.status = format!(
                    "Loaded {} field(s) from {}.",
                    partial.len(),
                    crate::cli::picker::pretty_path(path)
                );
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "document rejected");
                self.wizard.fail_document(&err);
            }
        }
    }

    fn load_sample(&mut self) {
        match load_sample_document(&self.sample) {
            Ok(partial) => {
                self.discard_pending();
                self.wizard.apply_document(&partial);
                self.status = "Loaded the sample application.".to_string();
            }
            Err(err) => self.wizard.fail_document(&err),
        }
    }

    fn save_sample(&mut self) {
        match download_sample_document(&self.sample, Path::new(SAMPLE_DOWNLOAD_NAME)) {
            Ok(path) => self.status = format!("Saved sample to {}.", path.display()),
            Err(err) => self.wizard.fail_document(&err),
        }
    }

    fn handle_manual_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('n') | KeyCode::PageDown => {
                self.wizard.next();
                self.selected_field = 0;
                return;
            }
            KeyCode::Char('b') | KeyCode::PageUp => {
                self.wizard.back();
                self.selected_field = 0;
                return;
            }
            KeyCode::Esc => {
                self.wizard.go_to(Screen::Buttons);
                return;
            }
            _ => {}
        }

        let fields = self.wizard.page().fields();
        if fields.is_empty() {
            // Summary page.
            match code {
                KeyCode::Enter => self.start_submission(),
                KeyCode::Up => self.wizard.scroll_by(-1),
                KeyCode::Down => self.wizard.scroll_by(1),
                _ => {}
            }
            return;
        }

        self.selected_field = self.selected_field.min(fields.len() - 1);
        let field = fields[self.selected_field];
        match code {
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_field + 1 < fields.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Enter if field.kind() == FieldKind::Numeric => {
                let current = match self.wizard.record().get(field) {
                    FieldValue::Number(Some(v)) => format!("{v}"),
                    _ => String::new(),
                };
                self.edit_buffer = Some(current);
            }
            KeyCode::Enter | KeyCode::Char(' ') if field.kind() == FieldKind::Boolean => {
                let flag = matches!(self.wizard.record().get(field), FieldValue::Flag(true));
                self.wizard.set_field(field, FieldValue::Flag(!flag));
            }
            KeyCode::Left => self.cycle_code(field, -1),
            KeyCode::Right | KeyCode::Enter => self.cycle_code(field, 1),
            _ => {}
        }
    }

    fn handle_number_edit(&mut self, code: KeyCode) {
        let Some(buffer) = self.edit_buffer.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.edit_buffer = None,
            KeyCode::Enter => {
                let text = std::mem::take(buffer);
                self.edit_buffer = None;
                if let Some(field) = self.wizard.page().fields().get(self.selected_field).copied() {
                    // Rejected input simply leaves the previous value in place.
                    self.wizard.set_field_text(field, &text);
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => buffer.push(c),
            _ => {}
        }
    }

    fn cycle_code(&mut self, field: Field, delta: isize) {
        let options = field.codes();
        if options.is_empty() {
            return;
        }
        let current = match self.wizard.record().get(field) {
            FieldValue::Code(code) => options.iter().position(|o| o.code == code.as_str()),
            _ => None,
        };
        let len = options.len() as isize;
        let next = match current {
            Some(idx) => (idx as isize + delta).rem_euclid(len),
            None if delta < 0 => len - 1,
            None => 0,
        };
        let option = &options[next as usize];
        self.wizard.set_field(field, FieldValue::Code(option.code.to_string()));
    }

    fn start_submission(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let Some(ticket) = self.wizard.submit() else {
            return;
        };

        let (tx, rx) = mpsc::channel();
        let service = Arc::clone(&self.service);
        thread::spawn(move || {
            let outcome = service.predict(&ticket.request);
            // The receiver is gone if the UI quit or the record was replaced.
            let _ = tx.send(outcome);
        });
        self.pending = Some(rx);
        self.status = "Submitting application...".to_string();
    }

    /// Drop the receiver of a submission made from a record that is being
    /// replaced. The worker still finishes; its send fails and is ignored.
    fn discard_pending(&mut self) {
        if self.pending.take().is_some() {
            info!("discarding in-flight submission for a replaced record");
            self.wizard.abandon_submission();
        }
    }

    /// Apply a finished submission, if any. Returns true when state changed.
    fn poll_submission(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(AppError::remote("Prediction worker stopped unexpectedly.")),
        };
        self.pending = None;
        self.status = match &outcome {
            Ok(_) => "Assessment received.".to_string(),
            Err(_) => "Submission failed; press Enter on the summary to retry.".to_string(),
        };
        self.wizard.complete_submission(outcome);
        true
    }

    fn handle_result_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('r') => {
                self.discard_pending();
                self.wizard.restart();
                self.choice = Choice::Upload;
                self.selected_field = 0;
                self.path_input.clear();
                self.status = "Started a new application.".to_string();
            }
            KeyCode::Up => self.wizard.scroll_by(-1),
            KeyCode::Down => self.wizard.scroll_by(1),
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        if self.wizard.help_visible() {
            self.draw_help(frame, chunks[1]);
        } else {
            match self.wizard.screen() {
                Screen::Buttons => self.draw_buttons(frame, chunks[1]),
                Screen::Upload => self.draw_upload(frame, chunks[1]),
                Screen::Manual => self.draw_manual(frame, chunks[1]),
                Screen::Result => self.draw_result(frame, chunks[1]),
            }
        }
        self.draw_footer(frame, chunks[2]);

        if let Some(alert) = self.wizard.alert() {
            draw_alert(frame, size, alert);
        }
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let screen = self.wizard.screen();
        let (title, guide) = if self.wizard.help_visible() {
            (HELP_TITLE, "Press ? to return")
        } else {
            (screen.title(), screen.guide())
        };

        let lines = vec![
            Line::from(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(guide, Style::default().fg(Color::Gray))),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_help(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let p = Paragraph::new(HELP_TEXT)
            .wrap(Wrap { trim: false })
            .scroll((self.wizard.scroll(), 0))
            .block(Block::default().title("Help").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_buttons(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(5), Constraint::Min(0)])
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let buttons = [
            (Choice::Upload, "Upload Document", "u"),
            (Choice::Manual, "Enter Manually", "m"),
        ];
        for ((choice, label, key), rect) in buttons.into_iter().zip(cols.iter()) {
            let style = if choice == self.choice {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let p = Paragraph::new(vec![Line::from(label), Line::from(format!("[{key}]"))])
                .alignment(Alignment::Center)
                .style(style)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(p, *rect);
        }
    }

    fn draw_upload(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3), Constraint::Length(3)])
            .split(area);

        let items: Vec<ListItem> = if self.documents.is_empty() {
            vec![ListItem::new("No spreadsheets found under the current directory.")]
        } else {
            self.documents
                .iter()
                .map(|p| ListItem::new(crate::cli::picker::pretty_path(p)))
                .collect()
        };
        let list = List::new(items)
            .block(Block::default().title("Spreadsheets").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");
        let mut state = ListState::default();
        if !self.documents.is_empty() {
            state.select(Some(self.selected_document));
        }
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let path_style = if self.editing_path {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if self.editing_path { "_" } else { "" };
        let path = Paragraph::new(format!("{}{cursor}", self.path_input))
            .style(path_style)
            .block(Block::default().title("Path (p)").borders(Borders::ALL));
        frame.render_widget(path, chunks[1]);

        let (message, style) = match self.wizard.upload_error() {
            Some(err) => (err.to_string(), Style::default().fg(Color::Red)),
            None => (
                "l: load the sample application  s: save the sample to disk".to_string(),
                Style::default().fg(Color::Gray),
            ),
        };
        let p = Paragraph::new(message)
            .style(style)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, chunks[2]);
    }

    fn draw_manual(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let page = self.wizard.page();
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(self.wizard.progress().clamp(0.0, 1.0))
            .label(format!("Step {} of {}: {}", page.index() + 1, Page::ALL.len(), page.title()));
        frame.render_widget(gauge, chunks[0]);

        if page == Page::Summary {
            self.draw_summary(frame, chunks[1]);
            return;
        }

        let record = self.wizard.record();
        let items: Vec<ListItem> = page
            .fields()
            .into_iter()
            .enumerate()
            .map(|(idx, field)| {
                let value = match (&self.edit_buffer, idx == self.selected_field) {
                    (Some(buffer), true) => format!("{buffer}_"),
                    _ => display_value(field, &record.get(field)),
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:<44} ", truncate(field.label(), 44))),
                    Span::styled(value, Style::default().fg(Color::Yellow)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title(page.title()).borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("» ");
        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_summary(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let record = self.wizard.record();
        let mut lines: Vec<Line> = Vec::new();
        for page in Page::ALL {
            let fields = page.fields();
            if fields.is_empty() {
                continue;
            }
            lines.push(Line::from(Span::styled(
                page.title(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for field in fields {
                lines.push(Line::from(vec![
                    Span::raw(format!("  {:<44} ", truncate(field.label(), 44))),
                    Span::styled(display_value(field, &record.get(field)), Style::default().fg(Color::Yellow)),
                ]));
            }
        }

        let title = if self.wizard.is_submitting() {
            "Summary (submitting...)"
        } else {
            "Summary (Enter to submit)"
        };
        let p = Paragraph::new(Text::from(lines))
            .scroll((self.wizard.scroll(), 0))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_result(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(result) = self.wizard.result() else {
            let msg = Paragraph::new("No assessment available.")
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(msg, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Length(3), Constraint::Min(0)])
            .split(area);

        let badge_style = if result.approved {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        };
        let lines = vec![
            Line::from(vec![
                Span::raw("Decision: "),
                Span::styled(approval_badge(result.approved), badge_style),
            ]),
            Line::from(format!("Predicted loan amount: {}", format_currency(result.prediction))),
            Line::from(format!("Loan range: {}", format_range(result))),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Assessment").borders(Borders::ALL));
        frame.render_widget(p, chunks[0]);

        let pct = probability_percent(result.approval_probability);
        let gauge = Gauge::default()
            .block(Block::default().title("Approval probability").borders(Borders::ALL))
            .gauge_style(Style::default().fg(if result.approved { Color::Green } else { Color::Red }))
            .percent(u16::from(pct.unwrap_or(0)))
            .label(pct.map(|p| format!("{p}%")).unwrap_or_else(|| NOT_AVAILABLE.to_string()));
        frame.render_widget(gauge, chunks[1]);

        let lines: Vec<Line> = match result.explanation.as_ref().filter(|e| !e.is_empty()) {
            Some(explanation) => explanation
                .iter()
                .map(|item| {
                    let color = if item.shap_value >= 0.0 { Color::Green } else { Color::Red };
                    Line::from(vec![
                        Span::raw(format!("{:<36} ", truncate(&item.feature, 36))),
                        Span::styled(format!("{:>+10.4}", item.shap_value), Style::default().fg(color)),
                    ])
                })
                .collect(),
            None => vec![Line::from("No explanation returned.")],
        };
        let p = Paragraph::new(Text::from(lines))
            .scroll((self.wizard.scroll(), 0))
            .block(Block::default().title("Top factors").borders(Borders::ALL));
        frame.render_widget(p, chunks[2]);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if self.wizard.help_visible() {
            "↑/↓ scroll  ? close  q quit"
        } else {
            match self.wizard.screen() {
                Screen::Buttons => "←/→ choose  Enter select  u upload  m manual  ? help  q quit",
                Screen::Upload => "↑/↓ select  Enter load  p path  l sample  s save sample  Esc back",
                Screen::Manual if self.wizard.page() == Page::Summary => "Enter submit  b back  ↑/↓ scroll  Esc menu",
                Screen::Manual => "↑/↓ field  Enter edit  Space toggle  ←/→ choose  n next  b back",
                Screen::Result => "r new application  ↑/↓ scroll  q quit",
            }
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_alert(frame: &mut ratatui::Frame<'_>, area: Rect, message: &str) {
    let rect = centered_rect(area, 60, 7);
    frame.render_widget(Clear, rect);
    let p = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled("Press Enter to dismiss", Style::default().fg(Color::Gray))),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title("Error")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );
    frame.render_widget(p, rect);
}

fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let width = width.max(20).min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use ratatui::backend::TestBackend;

    use super::*;
    use crate::data::predict::PredictionRequest;

    struct StubService {
        outcome: Outcome,
        calls: Mutex<Vec<PredictionRequest>>,
    }

    impl PredictionService for StubService {
        fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, AppError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(request.clone());
            }
            self.outcome.clone()
        }
    }

    fn approved() -> PredictionResult {
        PredictionResult {
            prediction: Some(300_000.0),
            range_low: Some(280_000.0),
            range_high: Some(320_000.0),
            approved: true,
            approval_probability: Some(0.87),
            explanation: None,
        }
    }

    fn app_with(outcome: Outcome) -> (App, Arc<StubService>) {
        let stub = Arc::new(StubService {
            outcome,
            calls: Mutex::new(Vec::new()),
        });
        let service: Arc<dyn PredictionService + Send + Sync> = stub.clone();
        (App::new(service, SampleSource::Bundled), stub)
    }

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            assert!(!app.handle_key(*key).unwrap());
        }
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn wait_for_submission(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.poll_submission() {
            assert!(Instant::now() < deadline, "submission did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn to_summary(app: &mut App) {
        press(app, &[KeyCode::Char('m')]);
        for _ in 0..Page::ALL.len() {
            press(app, &[KeyCode::Char('n')]);
        }
        assert_eq!(app.wizard.page(), Page::Summary);
    }

    #[test]
    fn opens_on_the_chooser() {
        let (mut app, _) = app_with(Ok(approved()));
        let screen = render(&mut app);
        assert!(screen.contains("Begin Your Mortgage Assessment"));
        assert!(screen.contains("Upload Document"));
        assert!(screen.contains("Enter Manually"));

        press(&mut app, &[KeyCode::Right, KeyCode::Enter]);
        assert_eq!(app.wizard.screen(), Screen::Manual);
        assert_eq!(app.wizard.page(), Page::Income);
    }

    #[test]
    fn help_replaces_body_and_title() {
        let (mut app, _) = app_with(Ok(approved()));
        press(&mut app, &[KeyCode::Char('?')]);
        let screen = render(&mut app);
        assert!(screen.contains(HELP_TITLE));
        assert!(!screen.contains("Begin Your Mortgage Assessment"));
        assert_eq!(app.wizard.screen(), Screen::Buttons);

        press(&mut app, &[KeyCode::Char('?')]);
        assert!(!app.wizard.help_visible());
    }

    #[test]
    fn edits_each_kind_of_field() {
        let (mut app, _) = app_with(Ok(approved()));
        press(&mut app, &[KeyCode::Char('m'), KeyCode::Enter]);
        press(
            &mut app,
            &[
                KeyCode::Char('9'),
                KeyCode::Char('0'),
                KeyCode::Char('0'),
                KeyCode::Char('0'),
                KeyCode::Char('0'),
                KeyCode::Enter,
            ],
        );
        assert_eq!(
            app.wizard.record().get(Field::ApplicantIncome),
            FieldValue::Number(Some(90_000.0))
        );

        // A negative amount is not committed.
        press(&mut app, &[KeyCode::Enter]);
        for _ in 0..5 {
            press(&mut app, &[KeyCode::Backspace]);
        }
        press(&mut app, &[KeyCode::Char('-'), KeyCode::Char('5'), KeyCode::Enter]);
        assert_eq!(
            app.wizard.record().get(Field::ApplicantIncome),
            FieldValue::Number(Some(90_000.0))
        );

        // Liquid page: holds-liquid-assets flag is last.
        for _ in 0..3 {
            press(&mut app, &[KeyCode::Char('n')]);
        }
        assert_eq!(app.wizard.page(), Page::Liquid);
        let last = Page::Liquid.fields().len() - 1;
        for _ in 0..last {
            press(&mut app, &[KeyCode::Down]);
        }
        press(&mut app, &[KeyCode::Char(' ')]);
        assert_eq!(app.wizard.record().get(Field::HoldsLiquidAssets), FieldValue::Flag(true));

        // Loan application page: cycle the first coded answer.
        press(&mut app, &[KeyCode::Char('n'), KeyCode::Char('n')]);
        assert_eq!(app.wizard.page(), Page::Hmda);
        let field = Page::Hmda.fields()[0];
        press(&mut app, &[KeyCode::Right]);
        assert_eq!(
            app.wizard.record().get(field),
            FieldValue::Code(field.codes()[0].code.to_string())
        );
        press(&mut app, &[KeyCode::Left]);
        let last_code = field.codes()[field.codes().len() - 1].code;
        assert_eq!(app.wizard.record().get(field), FieldValue::Code(last_code.to_string()));
    }

    #[test]
    fn submission_runs_in_background_and_shows_result() {
        let (mut app, stub) = app_with(Ok(approved()));
        to_summary(&mut app);
        press(&mut app, &[KeyCode::Enter]);
        assert!(app.wizard.is_submitting());

        // A second Enter while in flight is ignored.
        press(&mut app, &[KeyCode::Enter]);
        wait_for_submission(&mut app);

        assert_eq!(stub.calls.lock().unwrap().len(), 1);
        assert_eq!(app.wizard.screen(), Screen::Result);
        let screen = render(&mut app);
        assert!(screen.contains("Approved"));
        assert!(screen.contains("$300,000"));
        assert!(screen.contains("$280,000 to $320,000"));
        assert!(screen.contains("87%"));

        press(&mut app, &[KeyCode::Char('r')]);
        assert_eq!(app.wizard.screen(), Screen::Buttons);
        assert!(app.wizard.result().is_none());
    }

    #[test]
    fn failed_submission_shows_blocking_alert() {
        let (mut app, stub) = app_with(Err(AppError::remote("Prediction request failed: connection refused")));
        to_summary(&mut app);
        press(&mut app, &[KeyCode::Enter]);
        wait_for_submission(&mut app);

        assert_eq!(app.wizard.screen(), Screen::Manual);
        assert_eq!(app.wizard.page(), Page::Summary);
        assert!(!app.wizard.is_submitting());
        let screen = render(&mut app);
        assert!(screen.contains("Error submitting form"));

        // Keys other than Enter/Esc are swallowed by the alert.
        press(&mut app, &[KeyCode::Char('b')]);
        assert_eq!(app.wizard.page(), Page::Summary);
        press(&mut app, &[KeyCode::Enter]);
        assert!(app.wizard.alert().is_none());

        press(&mut app, &[KeyCode::Enter]);
        wait_for_submission(&mut app);
        assert_eq!(stub.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn sample_document_lands_on_summary() {
        let (mut app, _) = app_with(Ok(approved()));
        app.wizard.go_to(Screen::Upload);
        press(&mut app, &[KeyCode::Char('l')]);
        assert_eq!(app.wizard.screen(), Screen::Manual);
        assert_eq!(app.wizard.page(), Page::Summary);
        assert_eq!(
            app.wizard.record().get(Field::ApplicantIncome),
            FieldValue::Number(Some(95_000.0))
        );
        let screen = render(&mut app);
        assert!(screen.contains("Summary (Enter to submit)"));
    }

    #[test]
    fn bad_path_reports_inline_error() {
        let (mut app, _) = app_with(Ok(approved()));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");

        app.wizard.go_to(Screen::Upload);
        press(&mut app, &[KeyCode::Char('p')]);
        for c in path.display().to_string().chars() {
            press(&mut app, &[KeyCode::Char(c)]);
        }
        press(&mut app, &[KeyCode::Enter]);

        assert_eq!(app.wizard.screen(), Screen::Upload);
        assert!(app.wizard.upload_error().is_some_and(|e| e.contains("File not found")));
        let screen = render(&mut app);
        assert!(screen.contains("File not found"));
    }

    #[test]
    fn new_flow_from_chooser_starts_blank() {
        let (mut app, _) = app_with(Ok(approved()));
        app.wizard.go_to(Screen::Upload);
        press(&mut app, &[KeyCode::Char('l')]);
        assert_eq!(app.wizard.page(), Page::Summary);

        press(&mut app, &[KeyCode::Esc]);
        assert_eq!(app.wizard.screen(), Screen::Buttons);
        press(&mut app, &[KeyCode::Char('m')]);

        assert_eq!(app.wizard.screen(), Screen::Manual);
        assert_eq!(app.wizard.page(), Page::Income);
        assert_eq!(app.wizard.record().get(Field::ApplicantIncome), FieldValue::Number(None));
    }

    #[test]
    fn replaced_record_ignores_stale_submission() {
        let (mut app, stub) = app_with(Ok(approved()));
        to_summary(&mut app);
        press(&mut app, &[KeyCode::Enter]);
        assert!(app.wizard.is_submitting());

        // Back to the chooser and load a different application.
        press(&mut app, &[KeyCode::Esc, KeyCode::Char('u'), KeyCode::Char('l')]);
        assert!(!app.wizard.is_submitting());
        thread::sleep(Duration::from_millis(50));
        assert!(!app.poll_submission());
        assert_eq!(app.wizard.screen(), Screen::Manual);
        assert_eq!(app.wizard.page(), Page::Summary);
        assert!(app.wizard.result().is_none());

        press(&mut app, &[KeyCode::Enter]);
        wait_for_submission(&mut app);
        assert_eq!(stub.calls.lock().unwrap().len(), 2);
        assert_eq!(app.wizard.screen(), Screen::Result);
    }

    #[test]
    fn quits_on_q() {
        let (mut app, _) = app_with(Ok(approved()));
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }
}
