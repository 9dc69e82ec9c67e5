use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events a prompt reports to its view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// Enter pressed with this value
  Submitted(String),
  Cancelled,
}

/// One-line input overlay opened by a trigger key, e.g. `/` for the name
/// search or `l` for the fetch limit
#[derive(Debug, Clone)]
pub struct PromptInput {
  trigger: char,
  title: &'static str,
  input: TextInput,
  active: bool,
}

impl PromptInput {
  pub fn new(trigger: char, title: &'static str) -> Self {
    Self {
      trigger,
      title,
      input: TextInput::new(),
      active: false,
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  /// Open the prompt pre-filled with `initial`
  pub fn activate(&mut self, initial: &str) {
    self.active = true;
    self.input.set_value(initial);
  }

  /// Offer a key. Opens on the trigger key when inactive; `initial`
  /// supplies the starting text.
  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    initial: impl FnOnce() -> String,
  ) -> KeyResult<PromptEvent> {
    if !self.active {
      if key.code == KeyCode::Char(self.trigger) {
        let initial = initial();
        self.activate(&initial);
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        KeyResult::Event(PromptEvent::Submitted(value))
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(PromptEvent::Cancelled)
      }
      // Swallow everything else while open
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30.min(area.width), 60);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3).intersection(area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let value = self.input.value();
    let split = value
      .char_indices()
      .nth(self.input.cursor_position())
      .map(|(i, _)| i)
      .unwrap_or(value.len());
    let (before, after) = value.split_at(split);

    let line = Line::from(vec![
      Span::styled(self.trigger.to_string(), Style::default().fg(Color::Yellow)),
      Span::raw(" "),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_trigger_opens_with_initial_value() {
    let mut prompt = PromptInput::new('l', "Fetch limit");
    assert_eq!(
      prompt.handle_key(key(KeyCode::Char('x')), String::new),
      KeyResult::NotHandled
    );

    let result = prompt.handle_key(key(KeyCode::Char('l')), || "1000".to_string());
    assert_eq!(result, KeyResult::Handled);
    assert!(prompt.is_active());
    assert_eq!(prompt.value(), "1000");
  }

  #[test]
  fn test_submit_closes_and_reports_value() {
    let mut prompt = PromptInput::new('/', "Search name");
    prompt.handle_key(key(KeyCode::Char('/')), String::new);
    for c in "sofa".chars() {
      assert_eq!(
        prompt.handle_key(key(KeyCode::Char(c)), String::new),
        KeyResult::Handled
      );
    }

    assert_eq!(
      prompt.handle_key(key(KeyCode::Enter), String::new),
      KeyResult::Event(PromptEvent::Submitted("sofa".to_string()))
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_escape_cancels() {
    let mut prompt = PromptInput::new('/', "Search name");
    prompt.handle_key(key(KeyCode::Char('/')), || "old".to_string());
    assert_eq!(
      prompt.handle_key(key(KeyCode::Esc), String::new),
      KeyResult::Event(PromptEvent::Cancelled)
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_open_prompt_swallows_view_keys() {
    let mut prompt = PromptInput::new('/', "Search name");
    prompt.handle_key(key(KeyCode::Char('/')), String::new);
    assert_eq!(
      prompt.handle_key(key(KeyCode::PageDown), String::new),
      KeyResult::Handled
    );
  }
}
