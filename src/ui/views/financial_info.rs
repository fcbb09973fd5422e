use chrono::{Datelike, Local};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use super::{point_query, DartQuery};
use crate::dart::codes::{label_for, FS_DIVS, REPORT_CODES, SJ_DIVS};
use crate::dart::{
  CachedDartClient, FinancialInfo, FinancialInfoOptions, MainInfoOptions, PreparedQuery,
};
use crate::query::Query;
use crate::ui::components::{non_blank, FormEvent, FormField, FormValues, KeyResult, SearchForm};
use crate::ui::renderfns::{cache_badge, draw_state_panel, ensure_valid_selection, format_amount, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Which statement endpoint the view reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementScope {
  /// Key accounts (`fnlttSinglAcnt`)
  KeyAccounts,
  /// Every account of every statement (`fnlttSinglAcntAll`)
  FullStatements,
}

impl StatementScope {
  fn title(self) -> &'static str {
    match self {
      StatementScope::KeyAccounts => "Key accounts",
      StatementScope::FullStatements => "Financial statements",
    }
  }
}

/// Periodic report figures for one corporation and business year
pub struct FinancialInfoView {
  client: CachedDartClient,
  scope: StatementScope,
  form: SearchForm,
  query: DartQuery<FinancialInfo>,
  table: TableState,
  values: FormValues,
  current: Option<PreparedQuery>,
}

impl FinancialInfoView {
  pub fn new(client: CachedDartClient, scope: StatementScope, corp_code: Option<&str>) -> Self {
    let last_year = (Local::now().year() - 1).to_string();

    let mut fields = vec![
      FormField::text("corpCode", "Company code", "8-digit DART code, e.g. 00126380")
        .required()
        .with_value(corp_code.unwrap_or_default()),
      FormField::text("bsnsYear", "Business year", "YYYY")
        .required()
        .with_value(&last_year),
      FormField::select("reprtCode", "Report", REPORT_CODES)
        .required()
        .with_value("11011"),
      FormField::select("fsDiv", "Statements", FS_DIVS),
    ];
    if scope == StatementScope::KeyAccounts {
      fields.push(FormField::select("sjDiv", "Statement kind", SJ_DIVS));
    }
    let form = SearchForm::new(fields);

    let mut view = Self {
      client,
      scope,
      values: form.values(),
      form,
      query: Query::new(),
      table: TableState::default(),
      current: None,
    };
    view.request();
    if view.current.is_none() {
      view.form.activate();
    }
    view
  }

  fn request(&mut self) {
    let field = |name: &str| self.values.get(name).cloned().unwrap_or_default();
    self.current = match self.scope {
      StatementScope::KeyAccounts => {
        let options = FinancialInfoOptions {
          corp_code: field("corpCode"),
          bsns_year: field("bsnsYear"),
          reprt_code: field("reprtCode"),
          fs_div: non_blank(&self.values, "fsDiv"),
          sj_div: non_blank(&self.values, "sjDiv"),
        };
        point_query(
          &self.client,
          &mut self.query,
          &self.form,
          options,
          |client, options| async move { client.financial_info(&options).await },
        )
      }
      StatementScope::FullStatements => {
        let options = MainInfoOptions {
          corp_code: field("corpCode"),
          bsns_year: field("bsnsYear"),
          reprt_code: field("reprtCode"),
          fs_div: non_blank(&self.values, "fsDiv"),
        };
        point_query(
          &self.client,
          &mut self.query,
          &self.form,
          options,
          |client, options| async move { client.main_info(&options).await },
        )
      }
    };
  }

  fn search(&mut self, values: FormValues) {
    self.values = values;
    self.table.select(None);
    self.request();
  }

  fn refresh(&mut self) {
    if let Some(prepared) = &self.current {
      self.client.invalidate(prepared);
    }
    self.query.refetch();
  }

  fn rows(&self) -> &[FinancialInfo] {
    self
      .query
      .data()
      .map(|r| r.data.list.as_slice())
      .unwrap_or(&[])
  }

  fn value(&self, name: &str) -> &str {
    self.values.get(name).map(String::as_str).unwrap_or_default()
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Summary ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let label = |s: &str| Span::styled(s.to_string(), Style::default().fg(Color::DarkGray));
    let value = |s: &str| Span::styled(s.to_string(), Style::default().fg(Color::White).bold());

    let report = self.value("reprtCode");
    let mut spans = vec![
      label("Company "),
      value(or_dash(self.value("corpCode"))),
      label("  Year "),
      value(or_dash(self.value("bsnsYear"))),
      label("  Report "),
      value(label_for(REPORT_CODES, report).unwrap_or(or_dash(report))),
      label("  Basis "),
      value(label_for(FS_DIVS, self.value("fsDiv")).unwrap_or("all")),
    ];
    if self.scope == StatementScope::KeyAccounts {
      spans.push(label("  Kind "));
      spans.push(value(label_for(SJ_DIVS, self.value("sjDiv")).unwrap_or("all")));
    }

    if let Some(result) = self.query.data() {
      let total = result
        .data
        .total_count
        .unwrap_or(result.data.list.len() as u32);
      spans.push(label("  Accounts "));
      spans.push(value(&total.to_string()));
      spans.push(Span::raw("  "));
      spans.push(cache_badge(result.source, result.cached_at, result.error.is_some()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let mut title = format!(" {} ({}) ", self.scope.title(), self.rows().len());
    if self.query.is_loading() {
      title.push_str("(loading...) ");
    } else if let Some(error) = self.query.error() {
      let first_line = error.lines().next().unwrap_or_default();
      title.push_str(&format!("(error: {}) ", truncate(first_line, 60)));
    }

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if draw_state_panel(frame, area, block.clone(), self.query.state(), "No accounts found.") {
      return;
    }

    let len = self.rows().len();
    ensure_valid_selection(&mut self.table, len);

    // Period names come with the rows, e.g. "제 55 기"
    let (current, prior) = self
      .rows()
      .first()
      .map(|r| (r.thstrm_nm.clone(), r.frmtrm_nm.clone()))
      .unwrap_or_default();
    let column = |name: String, fallback: &str| if name.is_empty() { fallback.to_string() } else { name };

    let amount = |raw: &str| Cell::from(Line::from(format_amount(raw)).alignment(Alignment::Right));
    let rows: Vec<Row> = self
      .rows()
      .iter()
      .map(|r| {
        Row::new(vec![
          Cell::from(truncate(&r.sj_nm, 16)),
          Cell::from(truncate(&r.account_nm, 30)),
          Cell::from(if r.account_detail.trim().is_empty() {
            "-".to_string()
          } else {
            truncate(&r.account_detail, 24)
          }),
          amount(&r.thstrm_amount),
          amount(&r.frmtrm_amount),
        ])
      })
      .collect();

    let header = Row::new(vec![
      Cell::from("Statement"),
      Cell::from("Account"),
      Cell::from("Detail"),
      Cell::from(Line::from(column(current, "Current")).alignment(Alignment::Right)),
      Cell::from(Line::from(column(prior, "Prior")).alignment(Alignment::Right)),
    ])
    .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(
      rows,
      [
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(24),
        Constraint::Length(22),
        Constraint::Length(22),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table);
  }
}

fn or_dash(s: &str) -> &str {
  if s.is_empty() {
    "-"
  } else {
    s
  }
}

impl View for FinancialInfoView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.search(values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Reset) => {
        let values = self.form.values();
        self.search(values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Closed) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled if self.form.is_active() => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('/') | KeyCode::Tab => self.form.activate(),
      KeyCode::Char('j') | KeyCode::Down => self.table.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table.select_previous(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [form_area, summary_area, table_area] = Layout::vertical([
      Constraint::Length(self.form.height()),
      Constraint::Length(3),
      Constraint::Min(3),
    ])
    .areas(area);

    self.form.render(frame, form_area, self.scope.title());
    self.render_summary(frame, summary_area);
    self.render_table(frame, table_area);
  }

  fn breadcrumb_label(&self) -> String {
    let corp = self.value("corpCode");
    if corp.is_empty() {
      self.scope.title().to_string()
    } else {
      format!("{} [{} {}]", self.scope.title(), corp, self.value("bsnsYear"))
    }
  }

  fn context(&self) -> Option<&str> {
    Some(self.value("corpCode")).filter(|c| !c.is_empty())
  }

  fn captures_input(&self) -> bool {
    self.form.is_active()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("Ctrl-R", "reset").with_priority(50).when_active(),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::config::ApiConfig;
  use crate::dart::cached_client::ResultStorage;
  use crate::dart::client::DartClient;
  use crate::dart::testing::mock_upstream;
  use crate::query::QueryState;
  use axum::extract::Query as AxumQuery;
  use axum::routing::get;
  use axum::{Json, Router};
  use crossterm::event::KeyModifiers;
  use serde_json::{json, Value};
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  type Seen = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn row(sj: &str, account: &str, current: &str) -> Value {
    json!({
      "sj_div": sj,
      "sj_nm": sj,
      "account_nm": account,
      "thstrm_nm": "제 55 기",
      "thstrm_amount": current,
      "frmtrm_amount": "",
    })
  }

  /// Upstream recording which endpoint was hit with which parameters
  async fn client() -> (CachedDartClient, Seen) {
    let seen: Seen = Arc::default();
    let single = Arc::clone(&seen);
    let all = Arc::clone(&seen);
    let router = Router::new()
      .route(
        "/api/fnlttSinglAcnt.json",
        get(move |AxumQuery(params): AxumQuery<HashMap<String, String>>| {
          single.lock().unwrap().push(("single".to_string(), params));
          async { Json(json!({"status": "000", "message": "ok", "list": [row("BS", "자산총계", "455905980000000")]})) }
        }),
      )
      .route(
        "/api/fnlttSinglAcntAll.json",
        get(move |AxumQuery(params): AxumQuery<HashMap<String, String>>| {
          all.lock().unwrap().push(("all".to_string(), params));
          async { Json(json!({"status": "013", "message": "no data"})) }
        }),
      );

    let config = ApiConfig {
      base_url: mock_upstream(router).await,
      ..ApiConfig::default()
    };
    let inner = DartClient::new(&config).unwrap();
    let client =
      CachedDartClient::with_storage(inner, ResultStorage::Memory(MemoryStorage::new()), "test-key");
    (client, seen)
  }

  async fn settle(view: &mut FinancialInfoView) {
    for _ in 0..50 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      view.tick();
      if !view.query.is_loading() {
        return;
      }
    }
    panic!("query did not settle");
  }

  #[tokio::test]
  async fn test_defaults_request_annual_report_of_last_year() {
    let (client, seen) = client().await;
    let mut view = FinancialInfoView::new(client, StatementScope::KeyAccounts, Some("00126380"));
    settle(&mut view).await;

    let seen = seen.lock().unwrap();
    let (endpoint, params) = &seen[0];
    assert_eq!(endpoint, "single");
    assert_eq!(params["corp_code"], "00126380");
    assert_eq!(params["reprt_code"], "11011");
    assert_eq!(params["bsns_year"], (Local::now().year() - 1).to_string());
    assert!(!params.contains_key("fs_div"));
    assert!(!params.contains_key("sj_div"));

    assert_eq!(view.rows().len(), 1);
    assert_eq!(view.rows()[0].account_nm, "자산총계");
  }

  #[tokio::test]
  async fn test_full_statements_use_main_endpoint_and_show_empty() {
    let (client, seen) = client().await;
    let mut view = FinancialInfoView::new(client, StatementScope::FullStatements, Some("00126380"));
    settle(&mut view).await;

    assert_eq!(seen.lock().unwrap()[0].0, "all");
    assert!(view.query.state().is_empty_result());
    assert_eq!(view.form.label_of("sjDiv"), None);
  }

  #[tokio::test]
  async fn test_missing_corp_code_sends_nothing() {
    let (client, seen) = client().await;
    let view = FinancialInfoView::new(client, StatementScope::KeyAccounts, None);

    assert!(matches!(view.query.state(), QueryState::NotReady(_)));
    assert!(view.captures_input());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(seen.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_select_change_sends_new_request() {
    let (client, seen) = client().await;
    let mut view = FinancialInfoView::new(client, StatementScope::KeyAccounts, Some("00126380"));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('/')));
    for _ in 0..3 {
      view.handle_key(key(KeyCode::Tab));
    }
    view.handle_key(key(KeyCode::Right));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].1["fs_div"], "CFS");
    assert_eq!(view.breadcrumb_label(), format!("Key accounts [00126380 {}]", Local::now().year() - 1));
  }

  #[tokio::test]
  async fn test_refresh_bypasses_cache() {
    let (client, seen) = client().await;
    let mut view = FinancialInfoView::new(client, StatementScope::KeyAccounts, Some("00126380"));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('r')));
    settle(&mut view).await;
    assert_eq!(seen.lock().unwrap().len(), 2);
  }
}
