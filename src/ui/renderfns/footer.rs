use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Severity of a footer notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Warning,
  Error,
}

impl NoticeLevel {
  fn color(self) -> Color {
    match self {
      NoticeLevel::Info => Color::Green,
      NoticeLevel::Warning => Color::Yellow,
      NoticeLevel::Error => Color::Red,
    }
  }
}

/// Draw the footer: view breadcrumb on the left, the latest notice after it
pub fn draw_footer(
  frame: &mut Frame,
  area: Rect,
  breadcrumb: &[String],
  notice: Option<(&str, NoticeLevel)>,
) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  if let Some((message, level)) = notice {
    spans.push(Span::styled("  │  ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      message.to_string(),
      Style::default().fg(level.color()),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
