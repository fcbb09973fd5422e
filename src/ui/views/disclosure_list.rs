use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

use super::{point_query, DartQuery};
use crate::dart::codes::{CORP_CLASSES, DISCLOSURE_TYPES, SORT_KEYS};
use crate::dart::{CachedDartClient, DisclosureInfo, DisclosureListOptions, PreparedQuery};
use crate::query::Query;
use crate::ui::components::{non_blank, FormEvent, FormField, FormValues, KeyResult, SearchForm};
use crate::ui::renderfns::{cache_badge, draw_state_panel, ensure_valid_selection, format_date, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Rows per page
pub const PAGE_SIZE: u32 = 20;

/// Disclosure search for one corporation, one page at a time
pub struct DisclosureListView {
  client: CachedDartClient,
  form: SearchForm,
  query: DartQuery<DisclosureInfo>,
  table: TableState,
  criteria: DisclosureListOptions,
  page: u32,
  current: Option<PreparedQuery>,
}

impl DisclosureListView {
  pub fn new(client: CachedDartClient, corp_code: Option<&str>) -> Self {
    let form = SearchForm::new(vec![
      FormField::text("corpCode", "Company code", "8-digit DART code, e.g. 00126380")
        .required()
        .with_value(corp_code.unwrap_or_default()),
      FormField::text("bgnDe", "From", "YYYYMMDD"),
      FormField::text("endDe", "To", "YYYYMMDD"),
      FormField::select("corpCls", "Market", CORP_CLASSES),
      FormField::select("pblntfDetailTy", "Report type", DISCLOSURE_TYPES),
      FormField::select("sort", "Sort by", SORT_KEYS),
    ]);

    let mut view = Self {
      client,
      criteria: criteria_from(&form.values()),
      form,
      query: Query::new(),
      table: TableState::default(),
      page: 1,
      current: None,
    };
    view.request();
    if view.current.is_none() {
      view.form.activate();
    }
    view
  }

  fn request(&mut self) {
    let options = DisclosureListOptions {
      page_no: Some(self.page),
      page_count: Some(PAGE_SIZE),
      ..self.criteria.clone()
    };
    self.current = point_query(
      &self.client,
      &mut self.query,
      &self.form,
      options,
      |client, options| async move { client.disclosure_list(&options).await },
    );
  }

  /// Start a new search from the form, back on the first page
  fn search(&mut self, values: &FormValues) {
    self.criteria = criteria_from(values);
    self.page = 1;
    self.table.select(None);
    self.request();
  }

  fn total_pages(&self) -> Option<u32> {
    self
      .query
      .data()
      .and_then(|r| r.data.pagination())
      .map(|p| p.total_page)
  }

  fn next_page(&mut self) {
    if self.total_pages().is_some_and(|total| self.page < total) {
      self.page += 1;
      self.table.select(None);
      self.request();
    }
  }

  fn prev_page(&mut self) {
    if self.page > 1 {
      self.page -= 1;
      self.table.select(None);
      self.request();
    }
  }

  fn refresh(&mut self) {
    if let Some(prepared) = &self.current {
      self.client.invalidate(prepared);
    }
    self.query.refetch();
  }

  fn rows(&self) -> &[DisclosureInfo] {
    self
      .query
      .data()
      .map(|r| r.data.list.as_slice())
      .unwrap_or(&[])
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Summary ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let label = |s: &str| Span::styled(s.to_string(), Style::default().fg(Color::DarkGray));
    let value = |s: String| Span::styled(s, Style::default().fg(Color::White).bold());

    let range = match (&self.criteria.bgn_de, &self.criteria.end_de) {
      (None, None) => "all dates".to_string(),
      (bgn, end) => format!(
        "{} ~ {}",
        bgn.as_deref().map(format_date).unwrap_or_default(),
        end.as_deref().map(format_date).unwrap_or_default()
      ),
    };

    let mut spans = vec![
      label("Company "),
      value(if self.criteria.corp_code.is_empty() {
        "-".to_string()
      } else {
        self.criteria.corp_code.clone()
      }),
      label("  Period "),
      value(range),
    ];

    if let Some(result) = self.query.data() {
      let total = result
        .data
        .total_count
        .unwrap_or(result.data.list.len() as u32);
      spans.push(label("  Filings "));
      spans.push(value(total.to_string()));
      spans.push(label("  Page "));
      spans.push(value(format!(
        "{}/{}",
        self.page,
        self.total_pages().unwrap_or(1).max(1)
      )));
      spans.push(Span::raw("  "));
      spans.push(cache_badge(result.source, result.cached_at, result.error.is_some()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let mut title = format!(" Disclosures ({}) ", self.rows().len());
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

    if draw_state_panel(frame, area, block.clone(), self.query.state(), "No disclosures found.") {
      return;
    }

    let len = self.rows().len();
    ensure_valid_selection(&mut self.table, len);

    let rows: Vec<Row> = self
      .rows()
      .iter()
      .map(|d| {
        Row::new(vec![
          format_date(&d.rcept_dt),
          truncate(&d.corp_name, 20),
          truncate(&d.report_nm, 60),
          truncate(&d.flr_nm, 20),
          if d.rm.trim().is_empty() {
            "-".to_string()
          } else {
            d.rm.clone()
          },
        ])
      })
      .collect();

    let header = Row::new(vec!["Date", "Company", "Report", "Filer", "Remark"])
      .style(Style::default().fg(Color::Yellow).bold());

    let table = Table::new(
      rows,
      [
        Constraint::Length(10),
        Constraint::Length(20),
        Constraint::Min(30),
        Constraint::Length(20),
        Constraint::Length(6),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table);
  }
}

/// Search criteria from form values; blank fields are left out
fn criteria_from(values: &FormValues) -> DisclosureListOptions {
  DisclosureListOptions {
    corp_code: values.get("corpCode").cloned().unwrap_or_default(),
    bgn_de: non_blank(values, "bgnDe"),
    end_de: non_blank(values, "endDe"),
    corp_cls: non_blank(values, "corpCls"),
    pblntf_detail_ty: non_blank(values, "pblntfDetailTy"),
    sort: non_blank(values, "sort"),
    ..DisclosureListOptions::default()
  }
}

impl View for DisclosureListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.search(&values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Reset) => {
        let values = self.form.values();
        self.search(&values);
        return ViewAction::None;
      }
      KeyResult::Event(FormEvent::Closed) | KeyResult::Handled => return ViewAction::None,
      // The open form swallows everything
      KeyResult::NotHandled if self.form.is_active() => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('/') | KeyCode::Tab => self.form.activate(),
      KeyCode::Char('j') | KeyCode::Down => self.table.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table.select_previous(),
      KeyCode::Char('n') | KeyCode::Right => self.next_page(),
      KeyCode::Char('p') | KeyCode::Left => self.prev_page(),
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

    self.form.render(frame, form_area, "Disclosure search");
    self.render_summary(frame, summary_area);
    self.render_table(frame, table_area);
  }

  fn breadcrumb_label(&self) -> String {
    if self.criteria.corp_code.is_empty() {
      "Disclosures".to_string()
    } else {
      format!("Disclosures [{}]", self.criteria.corp_code)
    }
  }

  fn context(&self) -> Option<&str> {
    Some(self.criteria.corp_code.as_str()).filter(|c| !c.is_empty())
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
      ShortcutInfo::new("n/p", "page").with_priority(30),
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
  use serde_json::json;
  use std::collections::HashMap;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  /// Upstream with 45 filings, paged by `page_no`/`page_count`
  async fn client() -> CachedDartClient {
    let router = Router::new().route(
      "/api/list.json",
      get(|AxumQuery(params): AxumQuery<HashMap<String, String>>| async move {
        let page: u32 = params["page_no"].parse().unwrap();
        let count: u32 = params["page_count"].parse().unwrap();
        let total = 45;
        let first = (page - 1) * count;
        let list: Vec<_> = (first..(first + count).min(total))
          .map(|i| {
            json!({
              "rcept_no": format!("2024{:06}", i),
              "corp_code": params["corp_code"],
              "corp_name": "삼성전자",
              "rcept_dt": "20240315",
              "report_nm": format!("report {}", i),
            })
          })
          .collect();
        Json(json!({
          "status": "000",
          "message": "ok",
          "page_no": page,
          "page_count": count,
          "total_count": total,
          "total_page": total.div_ceil(count),
          "list": list,
        }))
      }),
    );
    let config = ApiConfig {
      base_url: mock_upstream(router).await,
      ..ApiConfig::default()
    };
    let inner = DartClient::new(&config).unwrap();
    CachedDartClient::with_storage(inner, ResultStorage::Memory(MemoryStorage::new()), "test-key")
  }

  async fn settle(view: &mut DisclosureListView) {
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
  async fn test_missing_corp_code_is_not_ready() {
    let view = DisclosureListView::new(client().await, None);

    assert!(matches!(
      view.query.state(),
      QueryState::NotReady(reason) if reason == "Company code is required"
    ));
    assert!(view.captures_input());
  }

  #[tokio::test]
  async fn test_initial_corp_code_loads_first_page() {
    let mut view = DisclosureListView::new(client().await, Some("00126380"));
    settle(&mut view).await;

    assert_eq!(view.rows().len(), 20);
    assert_eq!(view.rows()[0].corp_code, "00126380");
    assert_eq!(view.total_pages(), Some(3));
    assert_eq!(view.context(), Some("00126380"));
  }

  #[tokio::test]
  async fn test_paging_stops_at_last_page() {
    let mut view = DisclosureListView::new(client().await, Some("00126380"));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('n')));
    settle(&mut view).await;
    view.handle_key(key(KeyCode::Char('n')));
    settle(&mut view).await;
    assert_eq!(view.page, 3);
    assert_eq!(view.rows().len(), 5);

    view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(view.page, 3);

    view.handle_key(key(KeyCode::Char('p')));
    settle(&mut view).await;
    assert_eq!(view.page, 2);
    assert_eq!(view.rows()[0].report_nm, "report 20");
  }

  #[tokio::test]
  async fn test_new_search_resets_to_first_page() {
    let mut view = DisclosureListView::new(client().await, Some("00126380"));
    settle(&mut view).await;
    view.handle_key(key(KeyCode::Char('n')));
    settle(&mut view).await;
    assert_eq!(view.page, 2);

    view.handle_key(key(KeyCode::Char('/')));
    for _ in 0..8 {
      view.handle_key(key(KeyCode::Backspace));
    }
    for c in "00164779".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    assert_eq!(view.page, 1);
    assert_eq!(view.rows()[0].corp_code, "00164779");
    assert_eq!(view.breadcrumb_label(), "Disclosures [00164779]");
  }

  #[tokio::test]
  async fn test_open_form_swallows_navigation_keys() {
    let mut view = DisclosureListView::new(client().await, Some("00126380"));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('/')));
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::None));
    assert_eq!(view.page, 1);

    view.handle_key(key(KeyCode::Esc));
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Pop));
  }

  #[test]
  fn test_criteria_leave_blank_fields_out() {
    let mut values = FormValues::new();
    values.insert("corpCode", "00126380".to_string());
    values.insert("bgnDe", String::new());
    values.insert("corpCls", "Y".to_string());
    values.insert("pblntfDetailTy", "A001".to_string());

    let criteria = criteria_from(&values);
    assert_eq!(criteria.corp_code, "00126380");
    assert_eq!(criteria.bgn_de, None);
    assert_eq!(criteria.corp_cls.as_deref(), Some("Y"));
    assert_eq!(criteria.pblntf_detail_ty.as_deref(), Some("A001"));
    assert_eq!(criteria.page_no, None);
  }
}
