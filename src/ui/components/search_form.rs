//! Parameter form shown above each query view.
//!
//! Text fields wrap [`TextInput`]; select fields cycle through a DART code
//! table and start blank, meaning "not supplied".

use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::dart::codes::Code;

/// Submitted field values keyed by field name. Blank means not supplied.
pub type FormValues = BTreeMap<&'static str, String>;

/// Value of a submitted field, or `None` when it was left blank
pub fn non_blank(values: &FormValues, name: &str) -> Option<String> {
  values.get(name).filter(|v| !v.is_empty()).cloned()
}

/// Events emitted by the form that the owning view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// All required fields are filled
  Submitted(FormValues),
  /// Fields were restored to their initial values
  Reset,
  /// Focus left the form without submitting
  Closed,
}

#[derive(Debug, Clone)]
enum FieldKind {
  Text {
    input: TextInput,
    placeholder: &'static str,
  },
  Select {
    options: &'static [Code],
    selected: Option<usize>,
  },
}

/// One labelled form field
#[derive(Debug, Clone)]
pub struct FormField {
  name: &'static str,
  label: &'static str,
  required: bool,
  kind: FieldKind,
}

impl FormField {
  pub fn text(name: &'static str, label: &'static str, placeholder: &'static str) -> Self {
    Self {
      name,
      label,
      required: false,
      kind: FieldKind::Text {
        input: TextInput::new(),
        placeholder,
      },
    }
  }

  pub fn select(name: &'static str, label: &'static str, options: &'static [Code]) -> Self {
    Self {
      name,
      label,
      required: false,
      kind: FieldKind::Select {
        options,
        selected: None,
      },
    }
  }

  pub fn required(mut self) -> Self {
    self.required = true;
    self
  }

  /// Initial value. For selects, a value outside the table leaves it blank.
  pub fn with_value(mut self, value: &str) -> Self {
    self.set(value);
    self
  }

  fn set(&mut self, value: &str) {
    match &mut self.kind {
      FieldKind::Text { input, .. } => input.set_value(value),
      FieldKind::Select { options, selected } => {
        *selected = options.iter().position(|c| c.value == value);
      }
    }
  }

  /// Current value, trimmed; empty when blank
  pub fn value(&self) -> String {
    match &self.kind {
      FieldKind::Text { input, .. } => input.value().trim().to_string(),
      FieldKind::Select { options, selected } => selected
        .and_then(|i| options.get(i))
        .map(|c| c.value.to_string())
        .unwrap_or_default(),
    }
  }

  fn is_blank(&self) -> bool {
    self.value().is_empty()
  }

  /// Step a select through blank, then each option, wrapping around
  fn cycle(&mut self, forward: bool) {
    if let FieldKind::Select { options, selected } = &mut self.kind {
      let n = options.len();
      // Position 0 is blank, 1..=n are options
      let pos = selected.map(|i| i + 1).unwrap_or(0);
      let next = if forward {
        (pos + 1) % (n + 1)
      } else {
        (pos + n) % (n + 1)
      };
      *selected = next.checked_sub(1);
    }
  }

  fn display(&self) -> (String, bool) {
    match &self.kind {
      FieldKind::Text { input, placeholder } if input.is_empty() => (placeholder.to_string(), true),
      FieldKind::Text { input, .. } => (input.value().to_string(), false),
      FieldKind::Select { options, selected } => match selected.and_then(|i| options.get(i)) {
        Some(code) => (format!("< {} ({}) >", code.label, code.value), false),
        None => ("< any >".to_string(), true),
      },
    }
  }
}

/// A vertical list of fields with focus, validation, and reset
#[derive(Debug, Clone)]
pub struct SearchForm {
  fields: Vec<FormField>,
  defaults: Vec<FormField>,
  focus: usize,
  active: bool,
  error: Option<String>,
}

impl SearchForm {
  pub fn new(fields: Vec<FormField>) -> Self {
    Self {
      defaults: fields.clone(),
      fields,
      focus: 0,
      active: false,
      error: None,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
  }

  /// Current values of every field
  pub fn values(&self) -> FormValues {
    self.fields.iter().map(|f| (f.name, f.value())).collect()
  }

  /// Display label of the named field
  pub fn label_of(&self, name: &str) -> Option<&'static str> {
    self.fields.iter().find(|f| f.name == name).map(|f| f.label)
  }

  /// Rows needed to render the form
  pub fn height(&self) -> u16 {
    // borders + one line per field + status line
    self.fields.len() as u16 + 3
  }

  fn focused(&mut self) -> Option<&mut FormField> {
    self.fields.get_mut(self.focus)
  }

  fn move_focus(&mut self, forward: bool) {
    let n = self.fields.len();
    if n == 0 {
      return;
    }
    self.focus = if forward {
      (self.focus + 1) % n
    } else {
      (self.focus + n - 1) % n
    };
  }

  fn submit(&mut self) -> KeyResult<FormEvent> {
    if let Some(missing) = self.fields.iter().find(|f| f.required && f.is_blank()) {
      self.error = Some(format!("{} is required", missing.label));
      return KeyResult::Handled;
    }

    self.error = None;
    self.active = false;
    KeyResult::Event(FormEvent::Submitted(self.values()))
  }

  fn reset(&mut self) {
    self.fields = self.defaults.clone();
    self.focus = 0;
    self.error = None;
  }

  /// Handle a key while the form has focus
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.error = None;
        return KeyResult::Event(FormEvent::Closed);
      }
      KeyCode::Enter => return self.submit(),
      KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.reset();
        return KeyResult::Event(FormEvent::Reset);
      }
      KeyCode::Tab | KeyCode::Down => {
        self.move_focus(true);
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.move_focus(false);
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some(field) = self.focused() else {
      return KeyResult::NotHandled;
    };

    if let FieldKind::Text { input, .. } = &mut field.kind {
      return match input.handle_key(key) {
        InputResult::NotHandled => KeyResult::NotHandled,
        _ => KeyResult::Handled,
      };
    }

    match key.code {
      KeyCode::Left | KeyCode::Char('h') => field.cycle(false),
      KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => field.cycle(true),
      KeyCode::Backspace | KeyCode::Delete => field.set(""),
      _ => return KeyResult::NotHandled,
    }
    KeyResult::Handled
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, title: &str) {
    let border = if self.active {
      Color::Yellow
    } else {
      Color::DarkGray
    };
    let block = Block::default()
      .title(format!(" {} ", title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.chars().count() + 2)
      .max()
      .unwrap_or(0);

    let mut lines: Vec<Line> = self
      .fields
      .iter()
      .enumerate()
      .map(|(i, field)| {
        let focused = self.active && i == self.focus;
        let marker = if field.required { "*" } else { " " };
        let (value, dim) = field.display();

        let label_style = if focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::White)
        };
        let value_style = if dim {
          Style::default().fg(Color::DarkGray)
        } else {
          Style::default().fg(Color::Cyan)
        };

        let mut spans = vec![
          Span::styled(if focused { "> " } else { "  " }, label_style),
          Span::styled(format!("{:<width$}", field.label, width = label_width - 2), label_style),
          Span::styled(marker, Style::default().fg(Color::Red)),
          Span::raw(" "),
          Span::styled(value, value_style),
        ];
        if focused && matches!(field.kind, FieldKind::Text { .. }) {
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
      })
      .collect();

    let status = match (&self.error, self.active) {
      (Some(error), _) => Span::styled(format!("  {}", error), Style::default().fg(Color::Red)),
      (None, true) => Span::styled(
        "  Enter search  Tab next  ←/→ choose  Ctrl-R reset  Esc close",
        Style::default().fg(Color::DarkGray),
      ),
      (None, false) => Span::styled("  / edit search", Style::default().fg(Color::DarkGray)),
    };
    lines.push(Line::from(status));

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dart::codes::REPORT_CODES;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn form() -> SearchForm {
    SearchForm::new(vec![
      FormField::text("corpCode", "Company code", "e.g. 00126380").required(),
      FormField::text("bsnsYear", "Year", "YYYY").with_value("2023"),
      FormField::select("reprtCode", "Report", REPORT_CODES),
    ])
  }

  fn type_str(form: &mut SearchForm, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_inactive_form_ignores_keys() {
    let mut form = form();
    assert_eq!(form.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    assert_eq!(form.values()["corpCode"], "");
  }

  #[test]
  fn test_required_field_blocks_submit() {
    let mut form = form();
    form.activate();
    type_str(&mut form, "   ");

    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert!(form.is_active());
    assert_eq!(form.error.as_deref(), Some("Company code is required"));
  }

  #[test]
  fn test_submit_trims_values() {
    let mut form = form();
    form.activate();
    type_str(&mut form, " 00126380 ");

    let KeyResult::Event(FormEvent::Submitted(values)) = form.handle_key(key(KeyCode::Enter)) else {
      panic!("expected submit");
    };
    assert_eq!(values["corpCode"], "00126380");
    assert_eq!(values["bsnsYear"], "2023");
    assert_eq!(values["reprtCode"], "");
    assert!(!form.is_active());
  }

  #[test]
  fn test_select_cycles_through_blank() {
    let mut form = form();
    form.activate();
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Tab));

    form.handle_key(key(KeyCode::Right));
    assert_eq!(form.values()["reprtCode"], "11011");
    form.handle_key(key(KeyCode::Left));
    assert_eq!(form.values()["reprtCode"], "");
    form.handle_key(key(KeyCode::Left));
    assert_eq!(form.values()["reprtCode"], "11014");
  }

  #[test]
  fn test_focus_wraps() {
    let mut form = form();
    form.activate();
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focus, 2);
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focus, 0);
  }

  #[test]
  fn test_reset_restores_defaults() {
    let mut form = form();
    form.activate();
    type_str(&mut form, "123");
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Backspace));

    let result = form.handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
    assert_eq!(result, KeyResult::Event(FormEvent::Reset));
    assert_eq!(form.values()["corpCode"], "");
    assert_eq!(form.values()["bsnsYear"], "2023");
    assert_eq!(form.focus, 0);
  }

  #[test]
  fn test_escape_closes() {
    let mut form = form();
    form.activate();
    assert_eq!(form.handle_key(key(KeyCode::Esc)), KeyResult::Event(FormEvent::Closed));
    assert!(!form.is_active());
  }

  #[test]
  fn test_non_blank() {
    let form = form();
    let values = form.values();
    assert_eq!(non_blank(&values, "bsnsYear"), Some("2023".to_string()));
    assert_eq!(non_blank(&values, "corpCode"), None);
    assert_eq!(non_blank(&values, "nope"), None);
    assert_eq!(form.label_of("corpCode"), Some("Company code"));
  }

  #[test]
  fn test_unknown_select_value_stays_blank() {
    let field = FormField::select("reprtCode", "Report", REPORT_CODES).with_value("99999");
    assert_eq!(field.value(), "");
  }
}
