use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Yes/no question guarding a destructive action. `T` is the action to run
/// on confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmPrompt<T> {
  pending: Option<(String, T)>,
}

impl<T> Default for ConfirmPrompt<T> {
  fn default() -> Self {
    Self { pending: None }
  }
}

impl<T> ConfirmPrompt<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn ask(&mut self, question: impl Into<String>, action: T) {
    self.pending = Some((question.into(), action));
  }

  /// `y`/Enter yields the action, `n`/Esc drops it. Every key is swallowed
  /// while a question is open.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<T> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => match self.pending.take() {
        Some((_, action)) => KeyResult::Event(action),
        None => KeyResult::Handled,
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
        self.pending = None;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((question, _)) = &self.pending else {
      return;
    };

    let width = (area.width * 50 / 100).clamp(36.min(area.width), 70);
    let height = 5.min(area.height);
    let overlay_area = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(height) / 2,
      width,
      height,
    );

    frame.render_widget(Clear, overlay_area);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let text = vec![
      Line::from(question.as_str()),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Cyan)),
        Span::styled(" yes   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" no", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let paragraph = Paragraph::new(text)
      .block(block)
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, overlay_area);
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
  fn test_inactive_passes_keys_through() {
    let mut confirm: ConfirmPrompt<u64> = ConfirmPrompt::new();
    assert_eq!(confirm.handle_key(key(KeyCode::Char('y'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_yes_yields_action_once() {
    let mut confirm = ConfirmPrompt::new();
    confirm.ask("Delete Wool coat?", 18u64);
    assert!(confirm.is_active());

    assert_eq!(confirm.handle_key(key(KeyCode::Char('j'))), KeyResult::Handled);
    assert_eq!(confirm.handle_key(key(KeyCode::Char('y'))), KeyResult::Event(18));
    assert!(!confirm.is_active());
  }

  #[test]
  fn test_no_drops_action() {
    let mut confirm = ConfirmPrompt::new();
    confirm.ask("Delete 3 products?", vec![1u64, 2, 3]);
    assert_eq!(confirm.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(!confirm.is_active());
  }
}
