pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;

/// Lay out header, current view and footer
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Current view
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], app.title(), &app.shortcuts());

  let breadcrumb = app.breadcrumb();
  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  let notice = app.current_view().and_then(|v| v.notice());
  renderfns::draw_footer(frame, chunks[2], &breadcrumb, notice);
}

/// Keep the table selection inside `0..len`, or clear it when empty
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
  } else {
    match state.selected() {
      None => state.select(Some(0)),
      Some(i) if i >= len => state.select(Some(len - 1)),
      Some(_) => {}
    }
  }
}
