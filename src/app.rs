use crate::catalog::FetchLimit;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{ListContext, ProductListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(title: String, ctx: ListContext, page_size: usize, limit: FetchLimit) -> Self {
    Self {
      view_stack: vec![Box::new(ProductListView::new(ctx, page_size, limit))],
      title,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    info!("terminal UI started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Views below the top keep polling so their data is fresh on pop
        for view in &mut self.view_stack {
          view.tick();
        }
      }
      Event::Resize => {}
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let Some(view) = self.view_stack.last_mut() else {
      self.should_quit = true;
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  // Accessors for UI rendering
  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    self
      .current_view()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
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
  use crate::catalog::source::fake::{numbered, FakeSource};
  use crate::catalog::CachedCatalogClient;
  use crate::config::LimitsConfig;
  use crate::export::CsvEncoder;
  use crate::prefs::MemoryPreferences;
  use std::sync::Arc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn app() -> App {
    let source = Arc::new(FakeSource::new(numbered(3)));
    let ctx = ListContext {
      client: CachedCatalogClient::new(source, LimitsConfig::default()),
      prefs: Arc::new(MemoryPreferences::new()),
      encoder: Arc::new(CsvEncoder),
      export_dir: std::env::temp_dir(),
      page_size_options: vec![5, 10],
    };
    App::new(
      "localhost:3001".to_string(),
      ctx,
      10,
      FetchLimit::new(100).unwrap(),
    )
  }

  #[tokio::test]
  async fn test_detail_push_and_pop() {
    let mut app = app();
    for _ in 0..100 {
      app.handle_event(Event::Tick);
      tokio::time::sleep(Duration::from_millis(5)).await;
      if app.breadcrumb().len() == 1 && app.current_view().is_some() {
        app.handle_key(key(KeyCode::Enter));
        if app.breadcrumb().len() == 2 {
          break;
        }
      }
    }
    assert_eq!(app.breadcrumb(), vec!["Products", "#1"]);

    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.breadcrumb(), vec!["Products"]);
    assert!(!app.should_quit);

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = app();
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }
}
