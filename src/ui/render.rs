use crate::application::calendar::{DayCell, DisplayPhase, GridCell, SUBSCRIPTION_HINT};
use crate::domain::models::DayKey;
use crate::ui::app::{App, InputMode};
use crate::ui::layout::{CalendarLayout, grid_rows};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const HELP: &str = "arrows move  space toggle  drag mark range  [ ] month  t today  a anchor  q quit";

pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let grid = app.calendar().month_grid();
    let layout = CalendarLayout::compute(frame.size(), grid_rows(grid.len()));
    app.set_layout(layout);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "Stay Tracker",
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center),
        layout.title,
    );

    match app.calendar().phase() {
        DisplayPhase::Loading => {
            frame.render_widget(
                Paragraph::new("Loading your days...")
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(Alignment::Center),
                layout.counter,
            );
            draw_help(frame, layout.help, "q quit");
        }
        DisplayPhase::Failed(message) => {
            let area = Rect::new(
                layout.counter.x,
                layout.counter.y,
                layout.counter.width,
                layout.help.y.saturating_sub(layout.counter.y),
            );
            draw_failure(frame, area, message);
            draw_help(frame, layout.help, "q quit");
        }
        DisplayPhase::Ready => {
            draw_header(frame, &layout, app);
            draw_grid(frame, &layout, &grid, app.focus());
            draw_status(frame, layout.status, app);
            draw_help(frame, layout.help, HELP);
        }
    }
}

fn draw_failure(frame: &mut Frame<'_>, area: Rect, message: &str) {
    let text = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from(SUBSCRIPTION_HINT),
    ];
    frame.render_widget(
        Paragraph::new(text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Unable to load your days"),
            )
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_header(frame: &mut Frame<'_>, layout: &CalendarLayout, app: &App) {
    let calendar = app.calendar();
    frame.render_widget(
        Paragraph::new(Span::styled(
            calendar.counter_text(),
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        layout.counter,
    );

    let anchor_line = match app.mode() {
        InputMode::Normal => Line::from(vec![
            Span::raw("Counting back from "),
            Span::styled(
                DayKey::new(calendar.anchor()).to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled("  (a to change)", Style::default().fg(Color::DarkGray)),
        ]),
        InputMode::EditingAnchor(input) => Line::from(vec![
            Span::raw("Count back from: "),
            Span::styled(
                format!("{input}_"),
                Style::default().add_modifier(Modifier::UNDERLINED),
            ),
            Span::styled(
                "  Enter apply  Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    };
    frame.render_widget(
        Paragraph::new(anchor_line).alignment(Alignment::Center),
        layout.anchor,
    );

    let button = Style::default().add_modifier(Modifier::BOLD);
    frame.render_widget(Paragraph::new(Span::styled(" < ", button)), layout.prev_button);
    frame.render_widget(Paragraph::new(Span::styled(" > ", button)), layout.next_button);
    let title_area = Rect::new(
        layout.prev_button.right(),
        layout.nav.y,
        layout
            .next_button
            .x
            .saturating_sub(layout.prev_button.right()),
        layout.nav.height,
    );
    frame.render_widget(
        Paragraph::new(calendar.month_title()).alignment(Alignment::Center),
        title_area,
    );

    for (column, name) in WEEKDAYS.iter().enumerate() {
        let rect = column_rect(layout, layout.weekdays, column as u16);
        frame.render_widget(
            Paragraph::new(*name)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            rect,
        );
    }
}

fn column_rect(layout: &CalendarLayout, row: Rect, column: u16) -> Rect {
    Rect::new(
        row.x + column * layout.cell_width,
        row.y,
        layout.cell_width.saturating_sub(1),
        row.height,
    )
    .intersection(row)
}

fn draw_grid(frame: &mut Frame<'_>, layout: &CalendarLayout, grid: &[GridCell], focus: DayKey) {
    for (index, cell) in grid.iter().enumerate() {
        let GridCell::Day(day) = cell else {
            continue;
        };
        let rect = layout.cell_rect(index);
        let rect = Rect {
            width: rect.width.saturating_sub(1),
            ..rect
        };
        if rect.area() == 0 {
            continue;
        }

        let mut lines = Vec::new();
        if rect.height >= 3 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(format!("{:>2}", day.day_of_month)));
        frame.render_widget(
            Paragraph::new(lines)
                .style(day_style(day, day.key == focus))
                .alignment(Alignment::Center),
            rect,
        );
    }
}

fn day_style(day: &DayCell, focused: bool) -> Style {
    let mut style = Style::default();
    if day.marked {
        style = style.bg(Color::Red).fg(Color::White);
    }
    if day.in_preview {
        style = style.bg(Color::Yellow).fg(Color::Black);
    }
    if day.is_today {
        style = style.add_modifier(Modifier::BOLD);
        if !day.marked && !day.in_preview {
            style = style.fg(Color::Cyan);
        }
    }
    if focused {
        style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
    }
    style
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = if let Some(error) = app.calendar().write_error() {
        Line::from(vec![
            Span::styled(
                format!("Could not save: {error}"),
                Style::default().fg(Color::Red),
            ),
            Span::styled("  (x to dismiss)", Style::default().fg(Color::DarkGray)),
        ])
    } else if app.in_flight() > 0 {
        Line::from(Span::styled(
            "Saving...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from("")
    };
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_help(frame: &mut Frame<'_>, area: Rect, text: &str) {
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        area,
    );
}
