use crate::commands;
use crate::config::Config;
use crate::dart::endpoints::lookup;
use crate::dart::{CachedDartClient, Operation};
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{DisclosureListView, FinancialInfoView, StatementScope};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  /// One-line message shown in the footer until the next key
  status: Option<String>,

  config: Config,
  client: CachedDartClient,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = CachedDartClient::new(&config)?;
    Ok(Self::with_client(config, client))
  }

  pub fn with_client(config: Config, client: CachedDartClient) -> Self {
    let root = DisclosureListView::new(client.clone(), config.default_corp_code.as_deref());
    Self {
      view_stack: vec![Box::new(root)],
      command: CommandInput::new(),
      status: None,
      config,
      client,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;
    self.shutdown();

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    tracing::info!("exiting");
    Ok(())
  }

  /// Tear down the result cache for this session.
  fn shutdown(&mut self) {
    self.view_stack.clear();
    self.client.clear();
    tracing::debug!("result cache cleared");
  }

  fn tick(&mut self) {
    if let Some(view) = self.view_stack.last_mut() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    self.status = None;

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // An open form gets every key, including ':'
    let capturing = self.current_view().is_some_and(|v| v.captures_input());
    if !capturing {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(name)) => {
          self.execute_command(name);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          self.status = Some(format!("Unknown command: {}", input));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        tracing::debug!(view = %view.breadcrumb_label(), "push view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  /// Switch the root view. The corporation in view carries over.
  fn execute_command(&mut self, name: &str) {
    let Some(command) = commands::find(name) else {
      self.status = Some(format!("Unknown command: {}", name));
      return;
    };
    let Some(id) = command.operation else {
      self.should_quit = true;
      return;
    };
    let operation = match lookup(id) {
      Ok(spec) => spec.operation,
      Err(err) => {
        tracing::warn!(command = name, error = %err, "command has no registered operation");
        self.status = Some(err.to_string());
        return;
      }
    };

    let corp = self
      .current_view()
      .and_then(|v| v.context())
      .map(str::to_string)
      .or_else(|| self.config.default_corp_code.clone());
    let corp = corp.as_deref();
    let client = self.client.clone();

    let root: Box<dyn View> = match operation {
      Operation::DisclosureList => Box::new(DisclosureListView::new(client, corp)),
      Operation::FinancialInfo => {
        Box::new(FinancialInfoView::new(client, StatementScope::KeyAccounts, corp))
      }
      Operation::MainInfo => {
        Box::new(FinancialInfoView::new(client, StatementScope::FullStatements, corp))
      }
      Operation::CompanyList => {
        self.status = Some(format!("No view for {}", operation));
        return;
      }
    };

    tracing::info!(command = name, corp = ?corp, "switching view");
    self.view_stack = vec![root];
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn api_host(&self) -> String {
    self.config.api.host()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .current_view()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::dart::cached_client::ResultStorage;
  use crate::config::ApiConfig;
  use crate::dart::client::DartClient;
  use crate::dart::testing::mock_upstream;
  use crate::dart::{DisclosureInfo, DisclosureListOptions};
  use axum::routing::get;
  use axum::{Json, Router};
  use serde_json::json;

  fn app() -> App {
    let config = Config::default();
    let inner = DartClient::new(&config.api).unwrap();
    let client =
      CachedDartClient::with_storage(inner, ResultStorage::Memory(MemoryStorage::new()), "test-key");
    App::with_client(config, client)
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn run_command(app: &mut App, input: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in input.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  /// The root form opens when no corporation is configured; close it
  fn close_form(app: &mut App) {
    if app.current_view().is_some_and(|v| v.captures_input()) {
      app.handle_key(key(KeyCode::Esc));
    }
  }

  #[tokio::test]
  async fn test_starts_on_disclosures() {
    let app = app();
    assert_eq!(app.view_breadcrumb(), vec!["Disclosures".to_string()]);
  }

  #[tokio::test]
  async fn test_command_switches_root_view() {
    let mut app = app();
    close_form(&mut app);

    run_command(&mut app, "fin");
    assert_eq!(app.view_breadcrumb(), vec!["Key accounts".to_string()]);

    close_form(&mut app);
    run_command(&mut app, "main");
    assert_eq!(app.view_breadcrumb(), vec!["Financial statements".to_string()]);
  }

  #[tokio::test]
  async fn test_unknown_command_sets_status() {
    let mut app = app();
    close_form(&mut app);

    run_command(&mut app, "zzz");
    assert_eq!(app.status(), Some("Unknown command: zzz"));

    app.handle_key(key(KeyCode::Char('j')));
    assert_eq!(app.status(), None);
  }

  #[tokio::test]
  async fn test_open_form_receives_colon_and_q() {
    let mut app = app();
    assert!(app.current_view().unwrap().captures_input());

    app.handle_key(key(KeyCode::Char(':')));
    app.handle_key(key(KeyCode::Char('q')));
    assert!(!app.command_input().is_active());
    assert!(!app.should_quit);
  }

  #[tokio::test]
  async fn test_q_at_root_quits() {
    let mut app = app();
    close_form(&mut app);
    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_always_quits() {
    let mut app = app();
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_unregistered_command_name_is_reported() {
    let mut app = app();
    app.execute_command("frobnicate");
    assert_eq!(app.status(), Some("Unknown command: frobnicate"));
    assert_eq!(app.view_breadcrumb(), vec!["Disclosures".to_string()]);
  }

  #[tokio::test]
  async fn test_shutdown_clears_result_cache() {
    let router = Router::new().route(
      "/api/list.json",
      get(|| async { Json(json!({"status": "013", "message": "no data"})) }),
    );
    let config = Config::default();
    let api = ApiConfig {
      base_url: mock_upstream(router).await,
      ..ApiConfig::default()
    };
    let inner = DartClient::new(&api).unwrap();
    let client =
      CachedDartClient::with_storage(inner, ResultStorage::Memory(MemoryStorage::new()), "test-key");
    let mut app = App::with_client(config, client.clone());

    let options = DisclosureListOptions::new("00126380");
    client.disclosure_list(&options).await.unwrap();
    let prepared = client.prepare(&options).unwrap();
    assert!(client.peek::<DisclosureInfo>(&prepared).is_some());

    app.shutdown();
    assert!(client.peek::<DisclosureInfo>(&prepared).is_none());
    assert!(app.view_breadcrumb().is_empty());
  }

  #[tokio::test]
  async fn test_quit_command() {
    let mut app = app();
    close_form(&mut app);
    run_command(&mut app, "quit");
    assert!(app.should_quit);
  }
}
