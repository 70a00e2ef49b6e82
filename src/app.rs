// src/app.rs

use crate::core::batch::BatchRequest;
use crate::core::error::ValidationError;
use crate::core::models::{BatchReport, TargetReport};
use ratatui::widgets::ListState;

pub const SPINNER_CHARS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub enum AppState {
    Disclaimer,
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub targets: usize,
    pub probes_passed: usize,
    pub probes_failed: usize,
    /// Targets whose whole pipeline failed.
    pub degraded_targets: usize,
}

impl BatchSummary {
    pub fn from_report(report: &BatchReport) -> Self {
        let total: usize = report.iter().map(|target| target.kinds().count()).sum();
        let failed: usize = report.iter().map(|target| target.failed_count()).sum();
        Self {
            targets: report.len(),
            probes_passed: total - failed,
            probes_failed: failed,
            degraded_targets: report.iter().filter(|target| target.is_degraded()).count(),
        }
    }

    /// Share of probes that succeeded, 0-100.
    pub fn pass_rate(&self) -> u16 {
        let total = self.probes_passed + self.probes_failed;
        if total == 0 {
            return 0;
        }
        (self.probes_passed * 100 / total) as u16
    }
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    /// Rejection message for the last submitted input.
    pub notice: Option<String>,
    pub batch_report: Option<BatchReport>,
    pub summary: BatchSummary,
    pub results_state: ListState,
    pub detail_scroll: u16,
    pub spinner_frame: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            input: String::new(),
            notice: None,
            batch_report: None,
            summary: BatchSummary::default(),
            results_state: ListState::default(),
            detail_scroll: 0,
            spinner_frame: 0,
        }
    }

    /// Splits the input on whitespace and commas into a batch request.
    pub fn batch_request(&self) -> BatchRequest {
        BatchRequest::new(
            self.input
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|part| !part.is_empty()),
        )
    }

    /// Validates the current input. On success the app moves to `Running` and the
    /// request is handed back for execution.
    pub fn submit(&mut self) -> Option<BatchRequest> {
        let request = self.batch_request();
        match request.validate() {
            Ok(_) => {
                self.notice = None;
                self.state = AppState::Running;
                Some(request)
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                None
            }
        }
    }

    pub fn finish(&mut self, result: Result<BatchReport, ValidationError>) {
        match result {
            Ok(report) => {
                self.summary = BatchSummary::from_report(&report);
                self.results_state.select((!report.is_empty()).then_some(0));
                self.batch_report = Some(report);
                self.state = AppState::Finished;
            }
            Err(e) => {
                self.notice = Some(e.to_string());
                self.state = AppState::Idle;
            }
        }
    }

    pub fn on_tick(&mut self) {
        if let AppState::Running = self.state {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn select_next(&mut self) {
        let len = self.batch_report.as_ref().map_or(0, BatchReport::len);
        if len == 0 {
            return;
        }
        let next = self.results_state.selected().map_or(0, |i| (i + 1) % len);
        self.results_state.select(Some(next));
        self.detail_scroll = 0;
    }

    pub fn select_previous(&mut self) {
        let len = self.batch_report.as_ref().map_or(0, BatchReport::len);
        if len == 0 {
            return;
        }
        let previous = self.results_state.selected().map_or(0, |i| (i + len - 1) % len);
        self.results_state.select(Some(previous));
        self.detail_scroll = 0;
    }

    pub fn scroll_detail_down(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_add(1);
    }

    pub fn scroll_detail_up(&mut self) {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
    }

    pub fn selected_report(&self) -> Option<&TargetReport> {
        let index = self.results_state.selected()?;
        self.batch_report.as_ref()?.results.get(index)
    }

    pub fn acknowledge_disclaimer(&mut self) {
        self.state = AppState::Idle;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.notice = None;
        self.batch_report = None;
        self.summary = BatchSummary::default();
        self.results_state = ListState::default();
        self.detail_scroll = 0;
        self.spinner_frame = 0;
    }
}
