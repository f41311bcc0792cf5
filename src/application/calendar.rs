use crate::domain::models::{
    DayKey, DayStatus, DayStatusMap, DragMode, DragSelection, MonthCell, ROLLING_WINDOW_DAYS,
    count_marked_in_window, first_of_month, month_cells, rolling_window, shift_months,
};
use chrono::{Local, NaiveDate, Utc};
use chrono_tz::Tz;

pub const SUBSCRIPTION_HINT: &str =
    "Check your Firebase config (environment variables and Firestore rules).";

/// Today's calendar date, in `time_zone` when given, else the machine's zone.
pub fn today(time_zone: Option<Tz>) -> NaiveDate {
    match time_zone {
        Some(time_zone) => Utc::now().with_timezone(&time_zone).date_naive(),
        None => Local::now().date_naive(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayPhase {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging(DragSelection),
}

/// How to undo an optimistic change once its write fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    Key {
        key: DayKey,
        previous: Option<DayStatus>,
    },
    Snapshot(DayStatusMap),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayUpdate {
    pub key: DayKey,
    pub status: Option<DayStatus>,
}

/// Remote writes produced by one user action, already applied locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub batch_id: u64,
    pub updates: Vec<DayUpdate>,
    pub rollback: Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub key: DayKey,
    pub day_of_month: u32,
    pub marked: bool,
    pub in_preview: bool,
    pub is_today: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCell {
    Pad,
    Day(DayCell),
}

#[derive(Debug, Clone)]
pub struct CalendarViewModel {
    days: DayStatusMap,
    view_window: NaiveDate,
    anchor: NaiveDate,
    today: NaiveDate,
    drag: DragState,
    phase: DisplayPhase,
    write_error: Option<String>,
    next_batch_id: u64,
}

impl CalendarViewModel {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            days: DayStatusMap::new(),
            view_window: first_of_month(today),
            anchor: today,
            today,
            drag: DragState::Idle,
            phase: DisplayPhase::Loading,
            write_error: None,
            next_batch_id: 1,
        }
    }

    pub fn days(&self) -> &DayStatusMap {
        &self.days
    }

    pub fn view_window(&self) -> NaiveDate {
        self.view_window
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn phase(&self) -> &DisplayPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == DisplayPhase::Ready
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging(_))
    }

    pub fn write_error(&self) -> Option<&str> {
        self.write_error.as_deref()
    }

    pub fn is_marked(&self, key: DayKey) -> bool {
        self.days.get(&key) == Some(&DayStatus::Japan)
    }

    /// Replaces the whole local map with a remote snapshot. Later snapshots
    /// win over anything applied locally, including in-flight writes.
    pub fn apply_snapshot(&mut self, days: DayStatusMap) {
        self.days = days;
        if self.phase == DisplayPhase::Loading {
            self.phase = DisplayPhase::Ready;
        }
    }

    pub fn fail_subscription(&mut self, message: impl Into<String>) {
        self.phase = DisplayPhase::Failed(message.into());
        self.drag = DragState::Idle;
    }

    pub fn toggle_day(&mut self, key: DayKey) -> Option<WritePlan> {
        if !self.is_ready() {
            return None;
        }
        let previous = self.days.get(&key).copied();
        let status = match previous {
            Some(_) => {
                self.days.remove(&key);
                None
            }
            None => {
                self.days.insert(key, DayStatus::Japan);
                Some(DayStatus::Japan)
            }
        };
        Some(self.plan(vec![DayUpdate { key, status }], Rollback::Key { key, previous }))
    }

    pub fn begin_drag(&mut self, key: DayKey) {
        if !self.is_ready() {
            return;
        }
        self.drag = DragState::Dragging(DragSelection {
            start: key,
            end: key,
            mode: DragMode::for_start(&self.days, key),
        });
    }

    pub fn extend_drag(&mut self, key: DayKey) {
        if let DragState::Dragging(selection) = &mut self.drag {
            selection.end = key;
        }
    }

    /// Ends the gesture and applies it. The drag state is always cleared,
    /// whether or not a plan comes back.
    pub fn commit_drag(&mut self) -> Option<WritePlan> {
        let DragState::Dragging(selection) = std::mem::replace(&mut self.drag, DragState::Idle)
        else {
            return None;
        };
        if !self.is_ready() {
            return None;
        }

        let range = selection.range();
        if let [key] = range.as_slice() {
            return self.toggle_day(*key);
        }

        let snapshot = self.days.clone();
        let status = match selection.mode {
            DragMode::Fill => Some(DayStatus::Japan),
            DragMode::Clear => None,
        };
        let updates = range
            .into_iter()
            .map(|key| {
                match status {
                    Some(status) => {
                        self.days.insert(key, status);
                    }
                    None => {
                        self.days.remove(&key);
                    }
                }
                DayUpdate { key, status }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            mode = selection.mode.as_str(),
            size = updates.len(),
            "drag committed"
        );
        Some(self.plan(updates, Rollback::Snapshot(snapshot)))
    }

    pub fn cancel_drag(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Undoes the optimistic change of a failed write and keeps its message
    /// until dismissed or replaced.
    pub fn write_failed(&mut self, rollback: Rollback, message: impl Into<String>) {
        match rollback {
            Rollback::Key { key, previous } => match previous {
                Some(status) => {
                    self.days.insert(key, status);
                }
                None => {
                    self.days.remove(&key);
                }
            },
            Rollback::Snapshot(snapshot) => self.days = snapshot,
        }
        self.write_error = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.write_error = None;
    }

    pub fn shift_view_window(&mut self, delta_months: i32) {
        self.view_window = shift_months(self.view_window, delta_months);
    }

    pub fn show_month_of(&mut self, date: NaiveDate) {
        self.view_window = first_of_month(date);
    }

    pub fn jump_to_today(&mut self) {
        self.show_month_of(self.today);
    }

    /// Accepts only a non-empty `YYYY-MM-DD`; anything else keeps the
    /// current anchor.
    pub fn set_rolling_window_anchor(&mut self, input: &str) -> bool {
        let input = input.trim();
        if input.is_empty() {
            return false;
        }
        match DayKey::parse(input) {
            Ok(key) => {
                self.anchor = key.date();
                true
            }
            Err(_) => false,
        }
    }

    pub fn rolling_window(&self) -> Vec<DayKey> {
        rolling_window(self.anchor)
    }

    pub fn days_in_japan(&self) -> usize {
        count_marked_in_window(&self.days, self.anchor)
    }

    pub fn window_len(&self) -> usize {
        ROLLING_WINDOW_DAYS as usize
    }

    pub fn counter_text(&self) -> String {
        format!(
            "{} days in Japan out of the past {} days",
            self.days_in_japan(),
            self.window_len()
        )
    }

    pub fn month_title(&self) -> String {
        self.view_window.format("%B %Y").to_string()
    }

    pub fn preview_range(&self) -> Vec<DayKey> {
        match self.drag {
            DragState::Dragging(selection) => selection.range(),
            DragState::Idle => Vec::new(),
        }
    }

    pub fn month_grid(&self) -> Vec<GridCell> {
        let selection = match self.drag {
            DragState::Dragging(selection) => Some(selection),
            DragState::Idle => None,
        };
        month_cells(self.view_window)
            .into_iter()
            .map(|cell| match cell {
                MonthCell::Pad => GridCell::Pad,
                MonthCell::Day(key) => GridCell::Day(DayCell {
                    key,
                    day_of_month: key.day_of_month(),
                    marked: self.is_marked(key),
                    in_preview: selection.is_some_and(|selection| selection.contains(key)),
                    is_today: key.date() == self.today,
                }),
            })
            .collect()
    }

    fn plan(&mut self, updates: Vec<DayUpdate>, rollback: Rollback) -> WritePlan {
        let batch_id = self.next_batch_id;
        self.next_batch_id = self.next_batch_id.saturating_add(1);
        WritePlan {
            batch_id,
            updates,
            rollback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(value: &str) -> DayKey {
        DayKey::parse(value).expect("valid day key")
    }

    fn date(value: &str) -> NaiveDate {
        key(value).date()
    }

    fn ready_model(marked: &[&str]) -> CalendarViewModel {
        let mut model = CalendarViewModel::new(date("2024-06-30"));
        model.apply_snapshot(
            marked
                .iter()
                .map(|value| (key(value), DayStatus::Japan))
                .collect(),
        );
        model
    }

    fn marked(model: &CalendarViewModel) -> Vec<String> {
        model.days().keys().map(ToString::to_string).collect()
    }

    #[test]
    fn starts_loading_and_becomes_ready_on_first_snapshot() {
        let mut model = CalendarViewModel::new(date("2024-06-30"));
        assert_eq!(model.phase(), &DisplayPhase::Loading);
        assert!(model.toggle_day(key("2024-06-01")).is_none());
        assert!(model.days().is_empty());

        model.apply_snapshot(DayStatusMap::new());
        assert!(model.is_ready());
        assert_eq!(model.view_window(), date("2024-06-01"));
        assert_eq!(model.anchor(), date("2024-06-30"));
    }

    #[test]
    fn subscription_failure_halts_the_grid() {
        let mut model = ready_model(&[]);
        model.begin_drag(key("2024-06-03"));
        model.fail_subscription("permission denied");

        assert_eq!(
            model.phase(),
            &DisplayPhase::Failed("permission denied".to_string())
        );
        assert!(!model.is_dragging());
        assert!(model.toggle_day(key("2024-06-03")).is_none());

        model.apply_snapshot(DayStatusMap::new());
        assert!(matches!(model.phase(), DisplayPhase::Failed(_)));
    }

    #[test]
    fn toggle_day_marks_and_clears() {
        let mut model = ready_model(&[]);

        let plan = model.toggle_day(key("2024-06-10")).expect("plan");
        assert_eq!(
            plan.updates,
            vec![DayUpdate {
                key: key("2024-06-10"),
                status: Some(DayStatus::Japan)
            }]
        );
        assert_eq!(
            plan.rollback,
            Rollback::Key {
                key: key("2024-06-10"),
                previous: None
            }
        );
        assert!(model.is_marked(key("2024-06-10")));

        let plan = model.toggle_day(key("2024-06-10")).expect("plan");
        assert_eq!(plan.updates[0].status, None);
        assert!(!model.is_marked(key("2024-06-10")));
        assert!(model.days().is_empty());
    }

    #[test]
    fn failed_toggle_restores_only_that_key() {
        let mut model = ready_model(&["2024-06-01"]);

        let plan = model.toggle_day(key("2024-06-02")).expect("plan");
        model.toggle_day(key("2024-06-03")).expect("second plan");
        model.write_failed(plan.rollback, "write rejected");

        assert_eq!(marked(&model), vec!["2024-06-01", "2024-06-03"]);
        assert_eq!(model.write_error(), Some("write rejected"));

        let plan = model.toggle_day(key("2024-06-01")).expect("plan");
        assert!(!model.is_marked(key("2024-06-01")));
        model.write_failed(plan.rollback, "second failure");
        assert!(model.is_marked(key("2024-06-01")));
        assert_eq!(model.write_error(), Some("second failure"));

        model.dismiss_error();
        assert_eq!(model.write_error(), None);
    }

    #[test]
    fn reversed_fill_drag_commits_sorted_range() {
        let mut model = ready_model(&[]);
        model.begin_drag(key("2024-03-05"));
        model.extend_drag(key("2024-03-01"));

        assert_eq!(model.preview_range().len(), 5);
        let plan = model.commit_drag().expect("plan");

        let keys = plan
            .updates
            .iter()
            .map(|update| update.key.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec!["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04", "2024-03-05"]
        );
        assert!(plan
            .updates
            .iter()
            .all(|update| update.status == Some(DayStatus::Japan)));
        assert_eq!(marked(&model), keys);
        assert_eq!(model.drag_state(), DragState::Idle);
        assert!(model.preview_range().is_empty());
    }

    #[test]
    fn clear_drag_removes_every_key_in_range() {
        let mut model = ready_model(&["2024-03-02", "2024-03-03", "2024-03-09"]);
        model.begin_drag(key("2024-03-02"));
        model.extend_drag(key("2024-03-04"));

        match model.drag_state() {
            DragState::Dragging(selection) => assert_eq!(selection.mode, DragMode::Clear),
            DragState::Idle => panic!("expected an active drag"),
        }

        let plan = model.commit_drag().expect("plan");
        assert_eq!(plan.updates.len(), 3);
        assert!(plan.updates.iter().all(|update| update.status.is_none()));
        assert_eq!(marked(&model), vec!["2024-03-09"]);
    }

    #[test]
    fn single_day_drag_matches_toggle() {
        let mut dragged = ready_model(&[]);
        dragged.begin_drag(key("2024-02-10"));
        let drag_plan = dragged.commit_drag().expect("drag plan");

        let mut toggled = ready_model(&[]);
        let toggle_plan = toggled.toggle_day(key("2024-02-10")).expect("toggle plan");

        assert_eq!(dragged.days(), toggled.days());
        assert_eq!(drag_plan.updates, toggle_plan.updates);
        assert_eq!(drag_plan.updates.len(), 1);
        assert_eq!(drag_plan.rollback, toggle_plan.rollback);
    }

    #[test]
    fn failed_batch_reverts_to_pre_drag_snapshot() {
        let mut model = ready_model(&["2024-03-02", "2024-04-01"]);
        let before = model.days().clone();

        model.begin_drag(key("2024-03-01"));
        model.extend_drag(key("2024-03-03"));
        let plan = model.commit_drag().expect("plan");
        assert_eq!(plan.updates.len(), 3);
        assert_eq!(model.days().len(), 4);

        model.write_failed(plan.rollback, "write to 2024-03-03 rejected");
        assert_eq!(model.days(), &before);
        assert_eq!(model.write_error(), Some("write to 2024-03-03 rejected"));
    }

    #[test]
    fn commit_without_drag_is_a_noop() {
        let mut model = ready_model(&[]);
        model.extend_drag(key("2024-03-03"));
        assert_eq!(model.drag_state(), DragState::Idle);
        assert!(model.commit_drag().is_none());
    }

    #[test]
    fn drag_mode_is_fixed_at_gesture_start() {
        let mut model = ready_model(&[]);
        model.begin_drag(key("2024-03-01"));
        model.apply_snapshot(DayStatusMap::from([(key("2024-03-01"), DayStatus::Japan)]));
        model.extend_drag(key("2024-03-02"));

        let plan = model.commit_drag().expect("plan");
        assert!(plan
            .updates
            .iter()
            .all(|update| update.status == Some(DayStatus::Japan)));
    }

    #[test]
    fn snapshot_replaces_optimistic_state() {
        let mut model = ready_model(&[]);
        model.toggle_day(key("2024-06-10")).expect("plan");
        model.apply_snapshot(DayStatusMap::from([(key("2024-01-01"), DayStatus::Japan)]));
        assert_eq!(marked(&model), vec!["2024-01-01"]);
    }

    #[test]
    fn batch_ids_increase() {
        let mut model = ready_model(&[]);
        let first = model.toggle_day(key("2024-06-10")).expect("plan");
        let second = model.toggle_day(key("2024-06-11")).expect("plan");
        assert!(second.batch_id > first.batch_id);
    }

    #[test]
    fn counter_tracks_anchor() {
        let mut model = ready_model(&["2023-07-05", "2024-06-30"]);
        assert_eq!(model.days_in_japan(), 2);
        assert_eq!(
            model.counter_text(),
            "2 days in Japan out of the past 365 days"
        );

        assert!(model.set_rolling_window_anchor("2023-07-04"));
        assert_eq!(model.days_in_japan(), 0);
        assert_eq!(model.rolling_window().len(), 365);
    }

    #[test]
    fn invalid_anchor_input_is_ignored() {
        let mut model = ready_model(&[]);
        assert!(!model.set_rolling_window_anchor(""));
        assert!(!model.set_rolling_window_anchor("   "));
        assert!(!model.set_rolling_window_anchor("2024-13-01"));
        assert!(!model.set_rolling_window_anchor("yesterday"));
        assert_eq!(model.anchor(), date("2024-06-30"));

        assert!(model.set_rolling_window_anchor(" 2024-02-29 "));
        assert_eq!(model.anchor(), date("2024-02-29"));
    }

    #[test]
    fn month_navigation_is_unbounded() {
        let mut model = ready_model(&[]);
        model.shift_view_window(-1);
        assert_eq!(model.view_window(), date("2024-05-01"));
        assert_eq!(model.month_title(), "May 2024");

        model.shift_view_window(-1200);
        assert_eq!(model.view_window(), date("1924-05-01"));
        model.shift_view_window(2400);
        assert_eq!(model.view_window(), date("2124-05-01"));

        model.jump_to_today();
        assert_eq!(model.view_window(), date("2024-06-01"));
    }

    #[test]
    fn month_grid_reports_marks_preview_and_today() {
        let mut model = ready_model(&["2024-06-03"]);
        model.begin_drag(key("2024-06-05"));
        model.extend_drag(key("2024-06-06"));

        let grid = model.month_grid();
        // June 2024 starts on a Saturday.
        assert_eq!(grid.len(), 6 + 30);
        assert!(grid[..6].iter().all(|cell| *cell == GridCell::Pad));

        let cell = |day: u32| match grid[5 + day as usize] {
            GridCell::Day(cell) => cell,
            GridCell::Pad => panic!("expected day {day}"),
        };
        assert!(cell(3).marked);
        assert!(!cell(4).marked);
        assert!(cell(5).in_preview && cell(6).in_preview);
        assert!(!cell(7).in_preview);
        assert!(cell(30).is_today);
        assert_eq!(cell(30).day_of_month, 30);
    }

    proptest! {
        #[test]
        fn toggling_twice_restores_membership(day in 1u32..=30, seeded in any::<bool>()) {
            let target = DayKey::new(NaiveDate::from_ymd_opt(2024, 6, day).expect("june day"));
            let mut model = ready_model(&[]);
            if seeded {
                model.apply_snapshot(DayStatusMap::from([(target, DayStatus::Japan)]));
            }
            let before = model.days().clone();

            model.toggle_day(target).expect("first plan");
            prop_assert_ne!(model.days(), &before);
            model.toggle_day(target).expect("second plan");
            prop_assert_eq!(model.days(), &before);
        }
    }
}
