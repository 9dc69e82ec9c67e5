use crate::catalog::{CachedCatalogClient, Product};
use crate::query::{Query, QueryState};
use crate::ui::renderfns::{format_price, status_color, stock_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Single product, fetched fresh from the source
pub struct ProductDetailView {
  id: u64,
  name: String,
  query: Query<Product>,
}

impl ProductDetailView {
  pub fn new(id: u64, name: String, client: CachedCatalogClient) -> Self {
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.get(id).await.map_err(|e| e.to_string()) }
    });
    query.fetch();

    Self { id, name, query }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => format!(" #{} (loading...) ", self.id),
      QueryState::Error(e) => format!(" #{} (error: {}) ", self.id, e),
      _ => format!(" #{} {} ", self.id, self.name),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading product...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(product) = self.query.data() else {
      return;
    };

    frame.render_widget(Paragraph::new(detail_lines(product)), inner);
  }
}

fn field<'a>(label: &'a str, value: Span<'a>) -> Line<'a> {
  Line::from(vec![
    Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
    value,
  ])
}

fn detail_lines(product: &Product) -> Vec<Line<'_>> {
  vec![
    field("ID", Span::styled(product.id.to_string(), Style::default().fg(Color::Cyan))),
    field("Name", Span::raw(product.name.as_str()).bold()),
    field("Category", Span::raw(product.category.label())),
    field("Price", Span::raw(format_price(product.price))),
    field(
      "Stock",
      Span::styled(
        product.stock.to_string(),
        Style::default().fg(stock_color(product.stock)),
      ),
    ),
    field(
      "Status",
      Span::styled(
        product.status.label(),
        Style::default().fg(status_color(product.status)),
      ),
    ),
    Line::default(),
    field("Created", Span::raw(product.created_at.to_string())),
    field("Updated", Span::raw(product.updated_at.to_string())),
  ]
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.id)
  }

  fn tick(&mut self) {
    if self.query.poll() {
      if let Some(product) = self.query.data() {
        self.name = product.name.clone();
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
