pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;

/// Draw one frame: header, active view, footer, then the command overlay
pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, body, footer] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  let capturing = app.current_view().is_some_and(|v| v.captures_input());
  let context = app
    .current_view()
    .and_then(|v| v.context())
    .map(str::to_string);
  renderfns::draw_header(
    frame,
    header,
    &app.api_host(),
    context.as_deref(),
    &app.shortcuts(),
    capturing,
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, body);
  }

  renderfns::draw_footer(frame, footer, &app.view_breadcrumb(), app.status());
  app.command_input().render_overlay(frame, body);
}
