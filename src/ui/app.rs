use crate::application::calendar::{CalendarViewModel, DisplayPhase, GridCell, Rollback, WritePlan};
use crate::domain::models::{DayKey, DayStatusMap};
use crate::ui::layout::{CalendarLayout, contains};
use chrono::{Datelike, Days, NaiveDate};
use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

const ANCHOR_INPUT_LIMIT: usize = 10;

/// Results arriving from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    Snapshot(DayStatusMap),
    SubscriptionFailed(String),
    WriteSucceeded {
        batch_id: u64,
    },
    WriteFailed {
        batch_id: u64,
        rollback: Rollback,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditingAnchor(String),
}

pub struct App {
    calendar: CalendarViewModel,
    focus: DayKey,
    mode: InputMode,
    layout: Option<CalendarLayout>,
    pending_writes: Vec<WritePlan>,
    in_flight: usize,
    resync_requested: bool,
    should_quit: bool,
}

impl App {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            calendar: CalendarViewModel::new(today),
            focus: DayKey::new(today),
            mode: InputMode::Normal,
            layout: None,
            pending_writes: Vec::new(),
            in_flight: 0,
            resync_requested: false,
            should_quit: false,
        }
    }

    pub fn calendar(&self) -> &CalendarViewModel {
        &self.calendar
    }

    pub fn focus(&self) -> DayKey {
        self.focus
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Records where the last frame put things so pointer events can be
    /// mapped back to days.
    pub fn set_layout(&mut self, layout: CalendarLayout) {
        self.layout = Some(layout);
    }

    /// Hands over plans produced since the last call. They count as in
    /// flight until a matching write event comes back.
    pub fn take_pending_writes(&mut self) -> Vec<WritePlan> {
        let plans = std::mem::take(&mut self.pending_writes);
        self.in_flight += plans.len();
        plans
    }

    /// True once after a rollback, when the subscription should re-deliver
    /// the remote map even if it looks unchanged.
    pub fn take_resync_request(&mut self) -> bool {
        std::mem::take(&mut self.resync_requested)
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Snapshot(days) => self.calendar.apply_snapshot(days),
            AppEvent::SubscriptionFailed(message) => {
                self.mode = InputMode::Normal;
                self.calendar.fail_subscription(message);
            }
            AppEvent::WriteSucceeded { batch_id } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                tracing::debug!(batch_id, "day write confirmed");
            }
            AppEvent::WriteFailed {
                batch_id,
                rollback,
                message,
            } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                tracing::warn!(batch_id, error = %message, "day write failed, rolling back");
                self.calendar.write_failed(rollback, message);
                self.resync_requested = true;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if let InputMode::EditingAnchor(input) = &mut self.mode {
            match key.code {
                KeyCode::Enter => {
                    let input = std::mem::take(input);
                    self.mode = InputMode::Normal;
                    if !self.calendar.set_rolling_window_anchor(&input) {
                        tracing::debug!(input = %input, "anchor input ignored");
                    }
                }
                KeyCode::Esc => self.mode = InputMode::Normal,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(ch) if input.chars().count() < ANCHOR_INPUT_LIMIT => input.push(ch),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('x') => self.calendar.dismiss_error(),
            _ if matches!(self.calendar.phase(), DisplayPhase::Failed(_)) => {}
            KeyCode::Left => self.move_focus(-1),
            KeyCode::Right => self.move_focus(1),
            KeyCode::Up => self.move_focus(-7),
            KeyCode::Down => self.move_focus(7),
            KeyCode::Char('[') | KeyCode::PageUp => self.shift_month(-1),
            KeyCode::Char(']') | KeyCode::PageDown => self.shift_month(1),
            KeyCode::Char('t') => {
                self.calendar.jump_to_today();
                self.focus = DayKey::new(self.calendar.today());
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some(plan) = self.calendar.toggle_day(self.focus) {
                    self.pending_writes.push(plan);
                }
            }
            KeyCode::Char('a') => {
                self.mode = InputMode::EditingAnchor(DayKey::new(self.calendar.anchor()).to_string());
            }
            KeyCode::Esc => self.calendar.cancel_drag(),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(layout) = self.layout else {
            return;
        };
        if matches!(self.calendar.phase(), DisplayPhase::Failed(_)) {
            return;
        }
        let (column, row) = (mouse.column, mouse.row);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if contains(layout.prev_button, column, row) {
                    self.shift_month(-1);
                } else if contains(layout.next_button, column, row) {
                    self.shift_month(1);
                } else if let Some(key) = self.day_at(&layout, column, row) {
                    self.focus = key;
                    self.calendar.begin_drag(key);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(key) = self.day_at(&layout, column, row) {
                    self.calendar.extend_drag(key);
                }
            }
            // A release ends the gesture wherever the pointer is.
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(plan) = self.calendar.commit_drag() {
                    self.pending_writes.push(plan);
                }
            }
            MouseEventKind::ScrollUp => self.shift_month(-1),
            MouseEventKind::ScrollDown => self.shift_month(1),
            _ => {}
        }
    }

    fn day_at(&self, layout: &CalendarLayout, column: u16, row: u16) -> Option<DayKey> {
        let index = layout.cell_at(column, row)?;
        match self.calendar.month_grid().get(index) {
            Some(GridCell::Day(cell)) => Some(cell.key),
            _ => None,
        }
    }

    fn move_focus(&mut self, delta_days: i64) {
        let date = self.focus.date();
        let moved = if delta_days >= 0 {
            date.checked_add_days(Days::new(delta_days.unsigned_abs()))
        } else {
            date.checked_sub_days(Days::new(delta_days.unsigned_abs()))
        };
        if let Some(date) = moved {
            self.focus = DayKey::new(date);
            self.calendar.show_month_of(date);
        }
    }

    fn shift_month(&mut self, delta_months: i32) {
        self.calendar.shift_view_window(delta_months);
        let month = self.calendar.view_window();
        self.focus = DayKey::new(month.with_day(self.focus.day_of_month()).unwrap_or(month));
    }
}
