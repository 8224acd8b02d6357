use covidash_core::models::{City, CountryReport, GlobalStats, Region};
use covidash_core::search::{Combobox, ComboboxView, ItemKind, ListState, Searchable, SearchableItem};
use covidash_core::utils::{format_count, format_diff, format_percent, truncate_string};
use covidash_core::{SearchTarget, Selection};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, AppState};

use super::styles;

/// Text of the clear affordance drawn inside a combobox with a selection.
const CLEAR_LABEL: &str = "[x]";

/// Fixed regions of the screen. Input hit-tests against the same values
/// the renderer draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub title: Rect,
    pub stats: Rect,
    pub region_input: Rect,
    pub location_input: Rect,
    pub content: Rect,
    pub status: Rect,
}

pub fn screen_layout(area: Rect) -> ScreenLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(4), // Global stats
            Constraint::Length(3), // Search row
            Constraint::Min(5),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let search = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);

    ScreenLayout {
        title: chunks[0],
        stats: chunks[1],
        region_input: search[0],
        location_input: search[1],
        content: chunks[3],
        status: chunks[4],
    }
}

/// Clickable `[x]` inside the right border of a combobox.
pub fn clear_button_area(input: Rect) -> Rect {
    let width = CLEAR_LABEL.len() as u16;
    Rect::new(
        (input.x + input.width).saturating_sub(width + 2),
        input.y + 1,
        width,
        1,
    )
    .intersection(input)
}

/// Dropdown under an open combobox, sized to its results and kept inside
/// the content area.
pub fn dropdown_area(layout: &ScreenLayout, target: SearchTarget, rows: usize) -> Rect {
    let anchor = match target {
        SearchTarget::Region => layout.region_input,
        SearchTarget::Location => layout.location_input,
    };
    // Empty lists still show one line of explanation
    let rows = u16::try_from(rows.max(1)).unwrap_or(u16::MAX);
    let height = rows.saturating_add(2).min(layout.content.height);
    Rect::new(anchor.x, layout.content.y, anchor.width, height)
}

/// Row index of the result under (`column`, `row`), if any.
pub fn dropdown_row_at(dropdown: Rect, column: u16, row: u16) -> Option<usize> {
    let inner = Rect::new(
        dropdown.x + 1,
        dropdown.y + 1,
        dropdown.width.saturating_sub(2),
        dropdown.height.saturating_sub(2),
    );
    contains(inner, column, row).then(|| (row - inner.y) as usize)
}

pub fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.x + area.width && row >= area.y && row < area.y + area.height
}

pub fn render(frame: &mut Frame, app: &App) {
    let layout = screen_layout(frame.area());

    render_title_bar(frame, layout.title);
    render_global_stats(frame, app, layout.stats);
    render_combobox(
        frame,
        app.dashboard.region_select(),
        layout.region_input,
        true,
        |r: &Region| r.name.clone(),
    );
    render_combobox(
        frame,
        app.dashboard.location_select(),
        layout.location_input,
        app.dashboard.location_search_available(),
        location_badge,
    );
    render_main_content(frame, app, layout.content);
    render_status_bar(frame, app, layout.status);

    if let Some(target) = app.dashboard.open_target() {
        render_dropdown(frame, app, &layout, target);
    }

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let title = "  COVID-19 Dashboard";
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_global_stats(frame: &mut Frame, app: &App, area: Rect) {
    let Some(global) = app.dashboard.global() else {
        let text = if app.dashboard.is_loading_summary() {
            "  Loading worldwide totals..."
        } else {
            "  Worldwide totals unavailable"
        };
        frame.render_widget(Paragraph::new(Span::styled(text, styles::muted_style())), area);
        return;
    };

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let stats: [(&str, i64, i64); 4] = [
        ("Confirmed", global.confirmed, global.confirmed_diff),
        ("Deaths", global.deaths, global.deaths_diff),
        ("Recovered", global.recovered, global.recovered_diff),
        ("Active", global.active, global.active_diff),
    ];
    for ((label, value, diff), area) in stats.iter().zip(cards.iter()) {
        render_stat_card(frame, *area, label, *value, *diff);
    }
    render_fatality_card(frame, global, cards[4]);
}

fn render_stat_card(frame: &mut Frame, area: Rect, label: &str, value: i64, diff: i64) {
    let lines = vec![
        Line::from(Span::styled(format_count(value), styles::list_item_style())),
        Line::from(Span::styled(format_diff(diff), styles::diff_style(diff))),
    ];
    let block = Block::default()
        .title(Span::styled(format!(" {} ", label), styles::muted_style()))
        .borders(Borders::ALL)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_fatality_card(frame: &mut Frame, global: &GlobalStats, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            format_percent(global.fatality_rate),
            styles::fatality_style(global.fatality_level()),
        )),
        Line::from(Span::styled(global.date.clone(), styles::muted_style())),
    ];
    let block = Block::default()
        .title(Span::styled(" Fatality ", styles::muted_style()))
        .borders(Borders::ALL)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn location_badge(item: &SearchableItem) -> String {
    match item.parent_province_name() {
        Some(parent) => format!("{} ({})", item.name(), parent),
        None => item.name().to_string(),
    }
}

/// Draw exactly one of: the search input, the selection badge with its
/// clear affordance, or the placeholder.
fn render_combobox<T>(
    frame: &mut Frame,
    combobox: &Combobox<T>,
    area: Rect,
    enabled: bool,
    badge: impl Fn(&T) -> String,
) {
    let config = combobox.config();
    let icon = if config.icon.is_empty() {
        String::new()
    } else {
        format!("{} ", config.icon)
    };
    let inner_width = area.width.saturating_sub(2) as usize;

    let line = match combobox.view() {
        ComboboxView::Input { term } => Line::from(vec![
            Span::raw(icon),
            Span::styled(format!("{}▌", term), styles::search_style()),
        ]),
        ComboboxView::Selected(item) => {
            let label = truncate_string(&badge(item), inner_width.saturating_sub(CLEAR_LABEL.len() + 4));
            let used = icon.chars().count() + label.chars().count();
            let padding = inner_width.saturating_sub(used + CLEAR_LABEL.len() + 1);
            Line::from(vec![
                Span::raw(icon),
                Span::styled(label, styles::badge_style(config.accent)),
                Span::raw(" ".repeat(padding)),
                Span::styled(CLEAR_LABEL, styles::muted_style()),
            ])
        }
        ComboboxView::Placeholder => {
            let text = if enabled {
                config.placeholder.as_str()
            } else {
                "Select a country with provinces first"
            };
            Line::from(vec![Span::raw(icon), Span::styled(text.to_string(), styles::muted_style())])
        }
    };

    let block = Block::default()
        .title(Span::styled(format!(" {} ", config.label), styles::muted_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(config.accent, combobox.is_open()));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_dropdown(frame: &mut Frame, app: &App, layout: &ScreenLayout, target: SearchTarget) {
    let dashboard = &app.dashboard;
    let (lines, term, highlighted, accent, hint) = match target {
        SearchTarget::Region => {
            let results = dashboard.filtered_regions();
            let lines: Vec<Line> = results
                .iter()
                .map(|r| {
                    Line::from(vec![
                        Span::raw(format!(" {:<4}", r.iso)),
                        Span::raw(r.search_name().to_string()),
                    ])
                })
                .collect();
            let select = dashboard.region_select();
            (
                lines,
                select.search_term(),
                select.highlighted(),
                select.config().accent,
                format!(" {} countries ", dashboard.current_regions().len()),
            )
        }
        SearchTarget::Location => {
            let results = dashboard.filtered_search_results();
            let lines: Vec<Line> = results.iter().map(|item| location_line(item)).collect();
            let select = dashboard.location_select();
            let counts = dashboard.index_counts();
            (
                lines,
                select.search_term(),
                select.highlighted(),
                select.config().accent,
                format!(" {} regions • {} cities ", counts.provinces, counts.cities),
            )
        }
    };

    let area = dropdown_area(layout, target, lines.len());
    frame.render_widget(Clear, area);

    let body: Vec<Line> = match ListState::classify(term, &lines) {
        ListState::Populated => {
            // Scroll so the highlighted row stays visible
            let visible = area.height.saturating_sub(2) as usize;
            let offset = (highlighted + 1).saturating_sub(visible);
            lines
                .into_iter()
                .enumerate()
                .skip(offset)
                .map(|(i, line)| {
                    if i == highlighted {
                        line.style(styles::selected_style())
                    } else {
                        line
                    }
                })
                .collect()
        }
        ListState::NoQuery => vec![Line::from(Span::styled(" Nothing to search yet", styles::muted_style()))],
        ListState::NoMatches { term } => vec![Line::from(Span::styled(
            format!(" No results for \"{}\"", term),
            styles::muted_style(),
        ))],
    };

    let block = Block::default()
        .title_bottom(Span::styled(hint, styles::muted_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(accent, true));
    frame.render_widget(Paragraph::new(body).block(block), area);
}

fn location_line(item: &SearchableItem) -> Line<'static> {
    let (tag, parent) = match item.kind() {
        ItemKind::Province => ("region", String::new()),
        ItemKind::City => ("city", format!("  in {}", item.parent_province_name().unwrap_or(""))),
    };
    Line::from(vec![
        Span::styled(format!(" {:<7}", tag), styles::muted_style()),
        Span::raw(item.name().to_string()),
        Span::styled(parent, styles::muted_style()),
    ])
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.dashboard.current_selection() {
        Some(Selection::Location(item)) => render_location_detail(frame, item, area),
        Some(Selection::Region(region)) => {
            if app.dashboard.is_loading_reports() {
                render_message(frame, area, &format!("Loading reports for {}...", region.name));
            } else if app.dashboard.reports().is_empty() {
                render_message(frame, area, &format!("No reports for {}", region.name));
            } else {
                render_province_table(frame, app, area);
            }
        }
        None => render_message(frame, area, "Select a country to see its provinces"),
    }
}

fn render_message(frame: &mut Frame, area: Rect, text: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::muted_style());
    let paragraph = Paragraph::new(Span::styled(format!(" {}", text), styles::muted_style())).block(block);
    frame.render_widget(paragraph, area);
}

fn render_province_table(frame: &mut Frame, app: &App, area: Rect) {
    let reports = app.dashboard.reports();
    let visible = area.height.saturating_sub(3) as usize;
    let offset = (app.province_selection + 1).saturating_sub(visible);

    let header = Row::new(["Province", "Confirmed", "Deaths", "Recovered", "Active", "Fatality"])
        .style(styles::highlight_style());

    let rows: Vec<Row> = reports
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(i, report)| {
            let row = province_row(report);
            if i == app.province_selection {
                row.style(styles::selected_style())
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(Span::styled(format!(" {} provinces ", reports.len()), styles::muted_style()))
            .borders(Borders::ALL)
            .border_style(styles::muted_style()),
    );
    frame.render_widget(table, area);
}

fn province_row(report: &CountryReport) -> Row<'static> {
    Row::new(vec![
        Cell::from(report.display_name().to_string()),
        Cell::from(format_count(report.confirmed)),
        Cell::from(format_count(report.deaths)),
        Cell::from(format_count(report.recovered)),
        Cell::from(format_count(report.active)),
        Cell::from(Span::styled(
            format_percent(report.fatality_rate),
            styles::fatality_style(report.fatality_level()),
        )),
    ])
}

fn render_location_detail(frame: &mut Frame, item: &SearchableItem, area: Rect) {
    let mut lines = Vec::new();
    match item {
        SearchableItem::Province { name, source_report } => {
            lines.push(Line::from(Span::styled(format!(" {}", name), styles::title_style())));
            lines.push(Line::from(""));
            lines.extend(report_lines(source_report));
        }
        SearchableItem::City {
            name,
            parent_province_name,
            source_city,
        } => {
            lines.push(Line::from(vec![
                Span::styled(format!(" {}", name), styles::title_style()),
                Span::styled(format!("  {}", parent_province_name), styles::muted_style()),
            ]));
            lines.push(Line::from(""));
            lines.extend(city_lines(source_city));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::muted_style());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn stat_line(label: &str, value: i64, diff: Option<i64>) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("  {:<12}", label), styles::muted_style()),
        Span::styled(format!("{:>14}", format_count(value)), styles::list_item_style()),
    ];
    if let Some(diff) = diff {
        spans.push(Span::styled(format!("  {}", format_diff(diff)), styles::diff_style(diff)));
    }
    Line::from(spans)
}

fn fatality_line(rate: f64, style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<12}", "Fatality"), styles::muted_style()),
        Span::styled(format!("{:>14}", format_percent(rate)), style),
    ])
}

fn report_lines(report: &CountryReport) -> Vec<Line<'static>> {
    let mut lines = vec![
        stat_line("Confirmed", report.confirmed, Some(report.confirmed_diff)),
        stat_line("Deaths", report.deaths, Some(report.deaths_diff)),
        stat_line("Recovered", report.recovered, Some(report.recovered_diff)),
        stat_line("Active", report.active, Some(report.active_diff)),
        fatality_line(report.fatality_rate, styles::fatality_style(report.fatality_level())),
    ];
    if !report.region.cities.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {} cities reported", report.region.cities.len()),
            styles::muted_style(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("  Last update {}", report.last_update),
        styles::muted_style(),
    )));
    lines
}

fn city_lines(city: &City) -> Vec<Line<'static>> {
    vec![
        stat_line("Confirmed", city.confirmed, Some(city.confirmed_diff)),
        stat_line("Deaths", city.deaths, Some(city.deaths_diff)),
        fatality_line(city.fatality_rate(), styles::fatality_style(city.fatality_level())),
        Line::from(""),
        Line::from(Span::styled(
            format!("  Last update {}", city.last_update),
            styles::muted_style(),
        )),
    ]
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "[/] country | [l]ocation | [x] clear | [u]pdate | [q]uit";

    let (left_text, left_style) = if let Some(error) = app.dashboard.last_error() {
        (format!(" {} ", error), styles::error_style())
    } else if app.dashboard.is_loading() {
        (" Loading... ".to_string(), styles::highlight_style())
    } else {
        let age = app.dashboard.summary_age().unwrap_or_else(|| "never".to_string());
        (format!(" Updated {} ", age), styles::muted_style())
    };

    let right_text = format!(" {} ", shortcuts);
    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(Paragraph::new(status_line).style(styles::status_bar_style()), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 20, frame.area());
    frame.render_widget(Clear, area);

    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", k), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled(
            format!("  covidash {}", env!("CARGO_PKG_VERSION")),
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Search", styles::highlight_style())),
        key("/ or c", "Search countries"),
        key("l or Tab", "Search provinces and cities"),
        key("↑/↓", "Move through results"),
        key("Enter", "Pick highlighted result"),
        key("Esc", "Close search"),
        key("x / Del", "Clear location, then country"),
        Line::from(""),
        Line::from(Span::styled(" Other", styles::highlight_style())),
        key("↑/↓ PgUp/PgDn", "Scroll provinces"),
        key("u", "Update data"),
        key("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::title_style());
    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
