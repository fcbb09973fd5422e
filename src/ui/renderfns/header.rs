use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::{ShortcutInfo, ShortcutVisibility};

/// Draw the header bar: logo, API host, corporation in view, shortcuts.
///
/// Shortcuts marked `when_active` are only shown while `active` is set.
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  host: &str,
  context: Option<&str>,
  shortcuts: &[ShortcutInfo],
  active: bool,
) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(" dartdash ", Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
  ];

  if let Some(corp) = context.filter(|c| !c.is_empty()) {
    spans.push(sep());
    spans.push(Span::styled(
      format!(" {} ", corp),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }
  spans.push(Span::raw(" "));

  let mut visible: Vec<&ShortcutInfo> = shortcuts
    .iter()
    .filter(|s| active || s.visibility == ShortcutVisibility::Always)
    .collect();
  visible.sort_by_key(|s| s.priority);

  for shortcut in visible {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
