//! Wizard state: which screen is shown, which form page is active, the
//! applicant record, and the submission guard.
//!
//! Nothing in here touches the terminal or the network. The TUI and the CLI
//! drive a `Wizard` and render whatever it reports, which keeps every
//! transition testable in plain unit tests.

use tracing::debug;

use crate::data::predict::{PredictionRequest, normalize};
use crate::domain::{Field, FieldKind, FieldValue, FormRecord, MIN_AMOUNT, PartialRecord, PredictionResult, Section};
use crate::error::AppError;

/// Top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Upload-or-manual chooser.
    Buttons,
    Upload,
    Manual,
    Result,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Buttons, Screen::Upload, Screen::Manual, Screen::Result];

    pub fn title(self) -> &'static str {
        match self {
            Screen::Buttons => "Begin Your Mortgage Assessment",
            Screen::Upload => "Upload Your Application",
            Screen::Manual => "Complete Your Application",
            Screen::Result => "Your Mortgage Assessment",
        }
    }

    pub fn guide(self) -> &'static str {
        match self {
            Screen::Buttons => "Choose how you would like to proceed",
            Screen::Upload => "Select a spreadsheet or load the sample document",
            Screen::Manual => "Fill in each section, then review and submit",
            Screen::Result => "Prediction returned by the assessment service",
        }
    }
}

/// Pages of the manual form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Income,
    Assets,
    Debt,
    Liquid,
    Demographics,
    Hmda,
    Summary,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Income,
        Page::Assets,
        Page::Debt,
        Page::Liquid,
        Page::Demographics,
        Page::Hmda,
        Page::Summary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Page> {
        Page::ALL.get(idx).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Income => "Income",
            Page::Assets => "Assets",
            Page::Debt => "Debt",
            Page::Liquid => "Liquid Assets",
            Page::Demographics => "Household & Risk",
            Page::Hmda => "Loan Application",
            Page::Summary => "Summary",
        }
    }

    pub fn section(self) -> Option<Section> {
        match self {
            Page::Income => Some(Section::Income),
            Page::Assets => Some(Section::Assets),
            Page::Debt => Some(Section::Debt),
            Page::Liquid => Some(Section::Liquid),
            Page::Demographics => Some(Section::Demographics),
            Page::Hmda => Some(Section::Hmda),
            Page::Summary => None,
        }
    }

    /// Fields edited on this page (empty for the summary).
    pub fn fields(self) -> Vec<Field> {
        match self.section() {
            Some(section) => Field::in_section(section).collect(),
            None => Vec::new(),
        }
    }
}

/// Screen selection plus the help overlay and content scroll offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenController {
    screen: Screen,
    help_visible: bool,
    scroll: u16,
}

impl Default for ScreenController {
    fn default() -> Self {
        Self {
            screen: Screen::Buttons,
            help_visible: false,
            scroll: 0,
        }
    }
}

impl ScreenController {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Unconditional transition. Scroll position starts over on the new screen.
    pub fn go_to(&mut self, screen: Screen) {
        debug!(from = ?self.screen, to = ?screen, "screen transition");
        self.screen = screen;
        self.reset_scroll();
    }

    pub fn toggle_help(&mut self) {
        self.help_visible = !self.help_visible;
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let next = i32::from(self.scroll) + delta;
        self.scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
    }
}

/// Handed out by [`Wizard::submit`]; carries the normalized request body.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    pub request: PredictionRequest,
}

/// The whole wizard session.
#[derive(Debug, Clone, Default)]
pub struct Wizard {
    controller: ScreenController,
    page_index: usize,
    record: FormRecord,
    is_submitting: bool,
    result: Option<PredictionResult>,
    alert: Option<String>,
    upload_error: Option<String>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.controller.screen()
    }

    pub fn go_to(&mut self, screen: Screen) {
        self.controller.go_to(screen);
    }

    pub fn toggle_help(&mut self) {
        self.controller.toggle_help();
    }

    pub fn help_visible(&self) -> bool {
        self.controller.help_visible()
    }

    pub fn scroll(&self) -> u16 {
        self.controller.scroll()
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.controller.scroll_by(delta);
    }

    pub fn reset_scroll(&mut self) {
        self.controller.reset_scroll();
    }

    pub fn page(&self) -> Page {
        Page::from_index(self.page_index).unwrap_or(Page::Income)
    }

    /// Advance one page. No-op on the summary page.
    pub fn next(&mut self) {
        if self.page_index + 1 >= Page::ALL.len() {
            return;
        }
        self.page_index += 1;
        self.controller.reset_scroll();
    }

    /// Go back one page. No-op on the first page.
    pub fn back(&mut self) {
        if self.page_index == 0 {
            return;
        }
        self.page_index -= 1;
        self.controller.reset_scroll();
    }

    /// Fraction of the form reached, `(index + 1) / 7`.
    pub fn progress(&self) -> f64 {
        (self.page_index + 1) as f64 / Page::ALL.len() as f64
    }

    pub fn record(&self) -> &FormRecord {
        &self.record
    }

    /// Merge one typed value into the record. Values of the wrong kind are
    /// ignored.
    pub fn set_field(&mut self, field: Field, value: FieldValue) -> bool {
        self.record.set(field, value)
    }

    /// Commit raw text typed into a numeric field.
    ///
    /// Empty text unsets the field. Text that does not parse, or a number
    /// below [`MIN_AMOUNT`], is not committed.
    pub fn set_field_text(&mut self, field: Field, text: &str) -> bool {
        if field.kind() != FieldKind::Numeric {
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            return self.record.set(field, FieldValue::Number(None));
        }
        let Ok(value) = text.parse::<f64>() else {
            return false;
        };
        if !value.is_finite() || value < MIN_AMOUNT {
            return false;
        }
        self.record.set(field, FieldValue::Number(Some(value)))
    }

    /// Start over: fresh record, first page, chooser screen.
    pub fn restart(&mut self) {
        let help_visible = self.controller.help_visible();
        *self = Self::default();
        if help_visible {
            self.controller.toggle_help();
        }
    }

    /// Leave the chooser for `screen` with a fresh record.
    pub fn start_flow(&mut self, screen: Screen) {
        self.restart();
        self.controller.go_to(screen);
    }

    /// Populate the record from a mapped document and jump to the summary.
    pub fn apply_document(&mut self, partial: &PartialRecord) {
        debug!(fields = partial.len(), "applying mapped document");
        self.record = FormRecord::from_partial(partial);
        self.upload_error = None;
        self.page_index = Page::Summary.index();
        self.controller.go_to(Screen::Manual);
    }

    /// Record a document read failure. The screen and record are untouched.
    pub fn fail_document(&mut self, err: &AppError) {
        self.upload_error = Some(err.message().to_string());
    }

    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    pub fn clear_upload_error(&mut self) {
        self.upload_error = None;
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Begin a submission.
    ///
    /// Returns `None` (ignored click) unless the manual form is on its summary
    /// page and no other submission is in flight.
    pub fn submit(&mut self) -> Option<SubmitTicket> {
        if self.screen() != Screen::Manual || self.page() != Page::Summary || self.is_submitting {
            return None;
        }
        self.is_submitting = true;
        self.alert = None;
        Some(SubmitTicket {
            request: normalize(&self.record),
        })
    }

    /// Forget an in-flight submission whose record has been replaced. Its
    /// outcome must not be passed to [`Wizard::complete_submission`].
    pub fn abandon_submission(&mut self) {
        self.is_submitting = false;
    }

    /// Finish the in-flight submission.
    pub fn complete_submission(&mut self, outcome: Result<PredictionResult, AppError>) {
        self.is_submitting = false;
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.controller.go_to(Screen::Result);
            }
            Err(err) => {
                self.alert = Some(format!("Error submitting form: {err}"));
            }
        }
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    /// Blocking alert awaiting acknowledgement, if any.
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}
