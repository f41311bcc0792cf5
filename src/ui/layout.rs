//! Screen geometry shared by rendering and pointer hit-testing.

use ratatui::layout::Rect;

pub const GRID_COLUMNS: u16 = 7;
const MIN_CELL_WIDTH: u16 = 4;
const MAX_CELL_WIDTH: u16 = 9;
const MAX_CELL_HEIGHT: u16 = 3;
const NAV_BUTTON_WIDTH: u16 = 3;
// title, counter, anchor, spacer, nav, weekdays, status, help
const FIXED_ROWS: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarLayout {
    pub title: Rect,
    pub counter: Rect,
    pub anchor: Rect,
    pub nav: Rect,
    pub prev_button: Rect,
    pub next_button: Rect,
    pub weekdays: Rect,
    pub grid: Rect,
    pub cell_width: u16,
    pub cell_height: u16,
    pub status: Rect,
    pub help: Rect,
}

fn row(area: Rect, offset: u16) -> Rect {
    let y = area.y.saturating_add(offset).min(area.bottom().saturating_sub(1));
    Rect::new(area.x, y, area.width, 1.min(area.height))
}

pub fn contains(rect: Rect, column: u16, row: u16) -> bool {
    rect.width > 0
        && rect.height > 0
        && column >= rect.x
        && column < rect.right()
        && row >= rect.y
        && row < rect.bottom()
}

impl CalendarLayout {
    /// Lays out the calendar view for a grid of `grid_rows` week rows.
    pub fn compute(area: Rect, grid_rows: u16) -> Self {
        let grid_rows = grid_rows.max(1);
        let cell_width = (area.width / GRID_COLUMNS).clamp(MIN_CELL_WIDTH, MAX_CELL_WIDTH);
        let available = area.height.saturating_sub(FIXED_ROWS);
        let cell_height = (available / grid_rows).clamp(1, MAX_CELL_HEIGHT);

        let grid_width = (cell_width * GRID_COLUMNS).min(area.width);
        let grid_x = area.x + (area.width - grid_width) / 2;
        let column = |rect: Rect| Rect::new(grid_x, rect.y, grid_width, rect.height);

        let title = row(area, 0);
        let counter = row(area, 1);
        let anchor = row(area, 2);
        let nav = column(row(area, 4));
        let weekdays = column(row(area, 5));
        let grid_height = (cell_height * grid_rows)
            .min(area.bottom().saturating_sub(weekdays.bottom()));
        let grid = Rect::new(grid_x, weekdays.bottom(), grid_width, grid_height);
        let status = row(area, grid.bottom().saturating_sub(area.y));
        let help = row(area, grid.bottom().saturating_sub(area.y) + 1);

        let button_width = NAV_BUTTON_WIDTH.min(nav.width);
        let prev_button = Rect::new(nav.x, nav.y, button_width, nav.height);
        let next_button = Rect::new(
            nav.right().saturating_sub(button_width),
            nav.y,
            button_width,
            nav.height,
        );

        Self {
            title,
            counter,
            anchor,
            nav,
            prev_button,
            next_button,
            weekdays,
            grid,
            cell_width,
            cell_height,
            status,
            help,
        }
    }

    /// Grid cell index under a terminal position, counted row by row.
    pub fn cell_at(&self, column: u16, row: u16) -> Option<usize> {
        if !contains(self.grid, column, row) {
            return None;
        }
        let grid_column = (column - self.grid.x) / self.cell_width;
        let grid_row = (row - self.grid.y) / self.cell_height;
        if grid_column >= GRID_COLUMNS {
            return None;
        }
        Some(usize::from(grid_row) * usize::from(GRID_COLUMNS) + usize::from(grid_column))
    }

    pub fn cell_rect(&self, index: usize) -> Rect {
        let grid_column = (index % usize::from(GRID_COLUMNS)) as u16;
        let grid_row = (index / usize::from(GRID_COLUMNS)) as u16;
        Rect::new(
            self.grid.x + grid_column * self.cell_width,
            self.grid.y + grid_row * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
        .intersection(self.grid)
    }
}

pub fn grid_rows(cell_count: usize) -> u16 {
    cell_count.div_ceil(usize::from(GRID_COLUMNS)) as u16
}
