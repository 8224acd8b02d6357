//! Keyboard and mouse input handling for the TUI.
//!
//! Keys go to whichever search control is open; otherwise they are global
//! shortcuts. Mouse clicks are hit-tested against [`screen_layout`] so that
//! clicks land on exactly one target: a clear affordance, a control, a
//! dropdown row, or "outside".

use anyhow::Result;
use covidash_core::SearchTarget;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, AppState, PAGE_SCROLL_SIZE};

use super::render::{clear_button_area, contains, dropdown_area, dropdown_row_at, screen_layout};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    if app.dashboard.open_target().is_some() {
        handle_search_input(app, key);
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('/') | KeyCode::Char('c') => app.dashboard.open_search(SearchTarget::Region),
        KeyCode::Char('l') | KeyCode::Tab => app.dashboard.open_search(SearchTarget::Location),
        KeyCode::Char('x') | KeyCode::Delete => app.dashboard.on_clear_selection(),
        KeyCode::Char('u') => app.refresh(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev_province(1),
        KeyCode::Down | KeyCode::Char('j') => app.select_next_province(1),
        KeyCode::PageUp => app.select_prev_province(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => app.select_next_province(PAGE_SCROLL_SIZE),
        KeyCode::Esc => app.dashboard.dismiss_error(),
        _ => {}
    }
    Ok(false)
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    let dashboard = &mut app.dashboard;
    match key.code {
        KeyCode::Esc => dashboard.dismiss_search(),
        KeyCode::Enter => dashboard.confirm_highlighted(),
        KeyCode::Up => dashboard.highlight_prev(),
        KeyCode::Down => dashboard.highlight_next(),
        KeyCode::Backspace => dashboard.backspace(),
        KeyCode::Tab => match dashboard.open_target() {
            Some(SearchTarget::Region) => dashboard.open_search(SearchTarget::Location),
            _ => dashboard.open_search(SearchTarget::Region),
        },
        KeyCode::Char(c) => dashboard.type_char(c),
        _ => {}
    }
}

/// Handle a mouse event against the last drawn screen.
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
        return;
    }
    if matches!(app.state, AppState::ShowingHelp) {
        app.state = AppState::Normal;
        return;
    }

    let (column, row) = (mouse.column, mouse.row);
    let layout = screen_layout(app.screen);
    let dashboard = &mut app.dashboard;

    // An open dropdown covers whatever is under it
    if let Some(target) = dashboard.open_target() {
        let rows = match target {
            SearchTarget::Region => dashboard.filtered_regions().len(),
            SearchTarget::Location => dashboard.filtered_search_results().len(),
        };
        let dropdown = dropdown_area(&layout, target, rows);
        if contains(dropdown, column, row) {
            if let Some(index) = dropdown_row_at(dropdown, column, row) {
                let highlighted = match target {
                    SearchTarget::Region => dashboard.region_select().highlighted(),
                    SearchTarget::Location => dashboard.location_select().highlighted(),
                };
                // Rows are drawn scrolled so the highlight stays visible
                let visible = dropdown.height.saturating_sub(2) as usize;
                let offset = (highlighted + 1).saturating_sub(visible);
                dashboard.pick_result(offset + index);
            }
            return;
        }
    }

    // The clear affordance consumes the click; it never also opens the
    // control it sits in.
    if dashboard.selected_region().is_some()
        && !dashboard.region_select().is_open()
        && contains(clear_button_area(layout.region_input), column, row)
    {
        dashboard.dismiss_search();
        dashboard.clear_region();
        return;
    }
    if dashboard.selected_location().is_some()
        && !dashboard.location_select().is_open()
        && contains(clear_button_area(layout.location_input), column, row)
    {
        dashboard.dismiss_search();
        dashboard.clear_location();
        return;
    }

    if contains(layout.region_input, column, row) {
        dashboard.open_search(SearchTarget::Region);
    } else if contains(layout.location_input, column, row) {
        dashboard.open_search(SearchTarget::Location);
    } else {
        dashboard.dismiss_search();
    }
}
