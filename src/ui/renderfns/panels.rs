use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::query::{Emptiable, QueryState};

/// Draw the placeholder panel for states with no rows to show.
///
/// Returns `false` when there is data and the caller should draw its table.
pub fn draw_state_panel<T: Emptiable>(
  frame: &mut Frame,
  area: Rect,
  block: Block,
  state: &QueryState<T>,
  empty_message: &str,
) -> bool {
  let (text, color) = match state {
    QueryState::Idle => ("Press / to search.".to_string(), Color::DarkGray),
    QueryState::NotReady(reason) => (
      format!("{}\nPress / to fill in the search form.", reason),
      Color::Yellow,
    ),
    QueryState::Loading { previous: None } => ("Loading...".to_string(), Color::DarkGray),
    QueryState::Error {
      message,
      previous: None,
    } => (
      format!("Error: {}", message),
      Color::Red,
    ),
    s if s.is_empty_result() => (empty_message.to_string(), Color::DarkGray),
    _ => return false,
  };

  let paragraph = Paragraph::new(text)
    .block(block)
    .style(Style::default().fg(color))
    .wrap(Wrap { trim: false });
  frame.render_widget(paragraph, area);
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dart::ApiResult;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;
  use serde_json::{json, Value};

  type State = QueryState<ApiResult<Value>>;

  fn result(list: Vec<Value>) -> ApiResult<Value> {
    ApiResult {
      status: "000".to_string(),
      message: "ok".to_string(),
      list,
      page_no: None,
      page_count: None,
      total_count: None,
      total_page: None,
    }
  }

  /// Draw the panel and return whether it drew, plus the screen text.
  fn draw(state: &State) -> (bool, String) {
    let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
    let mut drawn = false;
    terminal
      .draw(|frame| {
        drawn = draw_state_panel(
          frame,
          frame.area(),
          Block::bordered(),
          state,
          "No disclosures found.",
        );
      })
      .unwrap();

    let text = terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect::<String>();
    (drawn, text)
  }

  #[test]
  fn test_loading_panel() {
    let (drawn, text) = draw(&State::Loading { previous: None });
    assert!(drawn);
    assert!(text.contains("Loading..."));
  }

  #[test]
  fn test_error_panel_shows_message() {
    let (drawn, text) = draw(&State::Error {
      message: "request timed out".to_string(),
      previous: None,
    });
    assert!(drawn);
    assert!(text.contains("Error: request timed out"));
  }

  #[test]
  fn test_empty_list_shows_empty_panel_not_error() {
    let (drawn, text) = draw(&State::Success(result(vec![])));
    assert!(drawn);
    assert!(text.contains("No disclosures found."));
    assert!(!text.contains("Error"));
  }

  #[test]
  fn test_not_ready_panel_shows_reason() {
    let (drawn, text) = draw(&State::NotReady("Company code is required".to_string()));
    assert!(drawn);
    assert!(text.contains("Company code is required"));
  }

  #[test]
  fn test_rows_leave_drawing_to_the_table() {
    let (drawn, text) = draw(&State::Success(result(vec![json!({"rcept_no": "1"})])));
    assert!(!drawn);
    assert!(!text.contains("No disclosures found."));
  }

  #[test]
  fn test_loading_with_previous_rows_keeps_table() {
    let (drawn, _) = draw(&State::Loading {
      previous: Some(result(vec![json!({"rcept_no": "1"})])),
    });
    assert!(!drawn);
  }
}
