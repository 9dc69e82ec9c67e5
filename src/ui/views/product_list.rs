use crate::cache::page::page_count;
use crate::catalog::{
  CachedCatalogClient, Category, ExportSummary, FetchLimit, Product, ProductPatch, ProductStatus,
  ProductView, QueryFilter, SortField, SortSpec,
};
use crate::error::CatalogError;
use crate::export::{default_filename, ExportEncoder};
use crate::prefs::{save_fetch_limit, PreferenceStore};
use crate::query::{Query, QueryState};
use crate::ui::components::{ConfirmPrompt, KeyResult, PromptEvent, PromptInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, status_color, stock_color, truncate, NoticeLevel};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductDetailView;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Collaborators of the list view
#[derive(Clone)]
pub struct ListContext {
  pub client: CachedCatalogClient,
  pub prefs: Arc<dyn PreferenceStore>,
  pub encoder: Arc<dyn ExportEncoder>,
  /// Where exports are written
  pub export_dir: PathBuf,
  pub page_size_options: Vec<usize>,
}

/// Destructive actions waiting for confirmation
#[derive(Debug, Clone)]
enum Pending {
  Delete(u64),
  DeleteMany(Vec<u64>),
}

/// Finished background action
#[derive(Debug)]
enum Outcome {
  Deleted(Product),
  DeletedMany { requested: usize, deleted: Vec<u64> },
  Updated(Product),
  Exported(ExportSummary),
  NothingToExport,
}

impl Outcome {
  /// Writes invalidated the cache, so the page has to be fetched again
  fn changed_data(&self) -> bool {
    matches!(
      self,
      Outcome::Deleted(_) | Outcome::DeletedMany { .. } | Outcome::Updated(_)
    )
  }

  fn notice(&self) -> (String, NoticeLevel) {
    match self {
      Outcome::Deleted(p) => (format!("Deleted {}", p.name), NoticeLevel::Info),
      Outcome::DeletedMany { requested, deleted } if deleted.len() < *requested => (
        format!(
          "Deleted {} of {} products; the rest no longer existed",
          deleted.len(),
          requested
        ),
        NoticeLevel::Warning,
      ),
      Outcome::DeletedMany { deleted, .. } => {
        (format!("Deleted {} products", deleted.len()), NoticeLevel::Info)
      }
      Outcome::Updated(p) => (
        format!("{} is now {}", p.name, p.status.label()),
        NoticeLevel::Info,
      ),
      Outcome::Exported(summary) => (
        format!(
          "Exported {} products to {}",
          summary.records,
          summary.path.display()
        ),
        NoticeLevel::Info,
      ),
      Outcome::NothingToExport => (
        "No products match the current filter; nothing exported".to_string(),
        NoticeLevel::Warning,
      ),
    }
  }
}

/// Next value in `all` after `current`; `None` before the first and after
/// the last, so the cycle passes through "no filter"
fn cycle<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
  match current {
    None => all.first().copied(),
    Some(value) => all
      .iter()
      .position(|x| *x == value)
      .and_then(|i| all.get(i + 1))
      .copied(),
  }
}

/// The option after `current`, wrapping around
fn next_page_size(current: usize, options: &[usize]) -> usize {
  options
    .iter()
    .position(|&s| s == current)
    .map(|i| options[(i + 1) % options.len()])
    .or_else(|| options.first().copied())
    .unwrap_or(current)
}

/// Filterable, sortable, paginated product table
pub struct ProductListView {
  ctx: ListContext,
  filter: QueryFilter,
  sort: SortSpec,
  limit: FetchLimit,
  page: usize,
  page_size: usize,
  query: Query<ProductView>,
  /// Last applied page; kept on screen while the next one loads
  shown: Option<ProductView>,
  action: Query<Outcome>,
  notice: Option<(String, NoticeLevel)>,
  marked: BTreeSet<u64>,
  table_state: TableState,
  search: PromptInput,
  limit_prompt: PromptInput,
  confirm: ConfirmPrompt<Pending>,
}

impl ProductListView {
  pub fn new(ctx: ListContext, page_size: usize, limit: FetchLimit) -> Self {
    let mut view = Self {
      ctx,
      filter: QueryFilter::default(),
      sort: SortSpec::default(),
      limit,
      page: 1,
      page_size,
      query: Query::idle(),
      shown: None,
      action: Query::idle(),
      notice: None,
      marked: BTreeSet::new(),
      table_state: TableState::default().with_selected(Some(0)),
      search: PromptInput::new('/', "Search name"),
      limit_prompt: PromptInput::new('l', "Fetch limit"),
      confirm: ConfirmPrompt::new(),
    };
    view.load(false);
    view
  }

  /// Request the current page. Unchanged filter, sort and limit are served
  /// from the cache.
  fn load(&mut self, force_reload: bool) {
    let client = self.ctx.client.clone();
    let filter = self.filter.clone();
    let sort = self.sort;
    let limit = i64::from(self.limit.get());
    let (page, page_size) = (self.page, self.page_size);

    self.query.start(async move {
      client
        .request_view(&filter, &sort, limit, page, page_size, force_reload)
        .await
        .map_err(|e| e.to_string())
    });
  }

  /// Filter, sort or limit changed: back to page 1 with a new cache key
  fn requery(&mut self) {
    self.page = 1;
    self.table_state.select(Some(0));
    self.load(false);
  }

  fn records(&self) -> &[Product] {
    self.shown.as_ref().map(|v| v.records.as_slice()).unwrap_or(&[])
  }

  fn total(&self) -> u64 {
    self.shown.as_ref().map(|v| v.total).unwrap_or(0)
  }

  fn page_count(&self) -> usize {
    page_count(self.total(), self.page_size)
  }

  fn selected(&self) -> Option<&Product> {
    self
      .table_state
      .selected()
      .and_then(|i| self.records().get(i))
  }

  fn set_notice(&mut self, message: impl Into<String>, level: NoticeLevel) {
    self.notice = Some((message.into(), level));
  }

  fn action_busy(&mut self) -> bool {
    if self.action.is_loading() {
      self.set_notice("Still working on the previous action", NoticeLevel::Warning);
      true
    } else {
      false
    }
  }

  fn go_to_page(&mut self, page: usize) {
    let last = self.page_count().max(1);
    let page = page.clamp(1, last);
    if page != self.page {
      self.page = page;
      self.table_state.select(Some(0));
      self.load(false);
    }
  }

  fn apply_search(&mut self, value: String) {
    let name = Some(value.trim().to_string()).filter(|v| !v.is_empty());
    if name != self.filter.name {
      self.filter.name = name;
      self.requery();
    }
  }

  fn apply_limit(&mut self, value: &str) {
    match value.parse::<FetchLimit>() {
      Ok(limit) => {
        self.limit = limit;
        if let Err(e) = save_fetch_limit(self.ctx.prefs.as_ref(), limit) {
          warn!(error = %e, "could not persist fetch limit");
          self.set_notice(
            format!("Fetch limit {} applied but not saved: {}", limit, e),
            NoticeLevel::Warning,
          );
        } else {
          self.set_notice(format!("Fetch limit set to {}", limit), NoticeLevel::Info);
        }
        self.requery();
      }
      Err(e) => self.set_notice(e.to_string(), NoticeLevel::Error),
    }
  }

  fn start_delete(&mut self, pending: Pending) {
    if self.action_busy() {
      return;
    }
    let client = self.ctx.client.clone();
    match pending {
      Pending::Delete(id) => self.action.start(async move {
        client
          .delete(id)
          .await
          .map(Outcome::Deleted)
          .map_err(|e| e.to_string())
      }),
      Pending::DeleteMany(ids) => self.action.start(async move {
        let requested = ids.len();
        client
          .delete_many(&ids)
          .await
          .map(|deleted| Outcome::DeletedMany { requested, deleted })
          .map_err(|e| e.to_string())
      }),
    }
  }

  fn toggle_status(&mut self) {
    let Some(product) = self.selected() else {
      return;
    };
    let next = match product.status {
      ProductStatus::Active => ProductStatus::Inactive,
      ProductStatus::Inactive => ProductStatus::Active,
      ProductStatus::Soldout => {
        let message = format!("{} is sold out; restock it before listing", product.name);
        self.set_notice(message, NoticeLevel::Warning);
        return;
      }
    };
    let id = product.id;
    if self.action_busy() {
      return;
    }

    let client = self.ctx.client.clone();
    let patch = ProductPatch {
      status: Some(next),
      ..Default::default()
    };
    self.action.start(async move {
      client
        .update(id, &patch)
        .await
        .map(Outcome::Updated)
        .map_err(|e| e.to_string())
    });
  }

  fn start_export(&mut self) {
    if self.action_busy() {
      return;
    }
    let client = self.ctx.client.clone();
    let encoder = Arc::clone(&self.ctx.encoder);
    let filter = self.filter.clone();
    let sort = self.sort;
    let path = self
      .ctx
      .export_dir
      .join(default_filename(Local::now().date_naive(), encoder.extension()));

    self.set_notice("Exporting...", NoticeLevel::Info);
    self.action.start(async move {
      match client
        .request_export(&filter, &sort, encoder.as_ref(), &path)
        .await
      {
        Ok(summary) => Ok(Outcome::Exported(summary)),
        Err(CatalogError::EmptyResult) => Ok(Outcome::NothingToExport),
        Err(e) => Err(e.to_string()),
      }
    });
  }

  fn toggle_mark(&mut self) {
    if let Some(id) = self.selected().map(|p| p.id) {
      if !self.marked.remove(&id) {
        self.marked.insert(id);
      }
      self.table_state.select_next();
    }
  }

  fn on_view_loaded(&mut self) {
    match self.query.state() {
      QueryState::Success(view) if !view.is_superseded() => {
        let view = view.clone();
        // Deletions can leave the current page past the end
        let last = page_count(view.total, view.page_size).max(1);
        if view.records.is_empty() && self.page > last {
          self.page = last;
          self.load(false);
        }
        ensure_valid_selection(&mut self.table_state, view.records.len());
        self.shown = Some(view);
      }
      QueryState::Error(e) => {
        let message = format!("Load failed: {}", e);
        self.set_notice(message, NoticeLevel::Error);
      }
      _ => {}
    }
  }

  fn on_action_finished(&mut self) {
    match self.action.state() {
      QueryState::Success(outcome) => {
        let (message, level) = outcome.notice();
        let reload = outcome.changed_data();
        match outcome {
          Outcome::Deleted(p) => {
            self.marked.remove(&p.id);
          }
          Outcome::DeletedMany { deleted, .. } => {
            for id in deleted {
              self.marked.remove(id);
            }
          }
          _ => {}
        }
        self.notice = Some((message, level));
        if reload {
          self.load(false);
        }
      }
      QueryState::Error(e) => {
        let message = e.to_string();
        self.set_notice(message, NoticeLevel::Error);
      }
      _ => {}
    }
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::Event(pending) => {
        self.start_delete(pending);
        return Some(ViewAction::None);
      }
      KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::NotHandled => {}
    }

    let current_name = self.filter.name.clone().unwrap_or_default();
    match self.search.handle_key(key, || current_name) {
      KeyResult::Event(PromptEvent::Submitted(value)) => {
        self.apply_search(value);
        return Some(ViewAction::None);
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None)
      }
      KeyResult::NotHandled => {}
    }

    let current_limit = self.limit.to_string();
    match self.limit_prompt.handle_key(key, || current_limit) {
      KeyResult::Event(PromptEvent::Submitted(value)) => {
        self.apply_limit(&value);
        Some(ViewAction::None)
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('n') | KeyCode::PageDown => self.go_to_page(self.page + 1),
      KeyCode::Char('p') | KeyCode::PageUp => self.go_to_page(self.page.saturating_sub(1)),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_filters(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('c') => self.filter.category = cycle(self.filter.category, &Category::ALL),
      KeyCode::Char('s') => self.filter.status = cycle(self.filter.status, &ProductStatus::ALL),
      KeyCode::Char('o') => self.sort.field = cycle(self.sort.field, &SortField::ALL),
      KeyCode::Char('O') => self.sort.order = Some(self.sort.effective_order().toggled()),
      KeyCode::Char('z') => {
        self.page_size = next_page_size(self.page_size, &self.ctx.page_size_options);
      }
      _ => return None,
    }
    self.requery();
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.notice = None;
        self.page = 1;
        self.table_state.select(Some(0));
        self.load(true);
      }
      KeyCode::Char('e') => self.start_export(),
      KeyCode::Char('x') => self.toggle_status(),
      KeyCode::Char(' ') => self.toggle_mark(),
      KeyCode::Char('d') => {
        if let Some(product) = self.selected() {
          let question = format!("Delete \"{}\"?", product.name);
          let pending = Pending::Delete(product.id);
          self.confirm.ask(question, pending);
        }
      }
      KeyCode::Char('D') => {
        if self.marked.is_empty() {
          self.set_notice("Mark products with <space> first", NoticeLevel::Warning);
        } else {
          let ids: Vec<u64> = self.marked.iter().copied().collect();
          let question = format!("Delete {} marked products?", ids.len());
          self.confirm.ask(question, Pending::DeleteMany(ids));
        }
      }
      KeyCode::Enter => {
        let product = self.selected()?;
        return Some(ViewAction::Push(Box::new(ProductDetailView::new(
          product.id,
          product.name.clone(),
          self.ctx.client.clone(),
        ))));
      }
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Pop),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn filter_line(&self) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::Yellow);
    let sort = format!(
      "{} {}",
      self.sort.effective_field(),
      self.sort.effective_order()
    );

    let mut spans = vec![
      Span::styled(" Name ", dim),
      Span::styled(
        self.filter.name_term().unwrap_or("*").to_string(),
        value,
      ),
      Span::styled("  Category ", dim),
      Span::styled(
        self.filter.category.map(|c| c.label()).unwrap_or("All"),
        value,
      ),
      Span::styled("  Status ", dim),
      Span::styled(
        self.filter.status.map(|s| s.label()).unwrap_or("All"),
        value,
      ),
      Span::styled("  Sort ", dim),
      Span::styled(sort, value),
      Span::styled("  Limit ", dim),
      Span::styled(self.limit.to_string(), value),
    ];
    if !self.marked.is_empty() {
      spans.push(Span::styled("  Marked ", dim));
      spans.push(Span::styled(
        self.marked.len().to_string(),
        Style::default().fg(Color::Magenta),
      ));
    }
    Line::from(spans)
  }

  fn pagination_line(&self) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let Some(view) = &self.shown else {
      return Line::default();
    };

    let first = (self.page - 1) * self.page_size + 1;
    let last = first + view.records.len().saturating_sub(1);
    let range = if view.records.is_empty() {
      "no rows".to_string()
    } else {
      format!("{}-{} of {}", first, last, view.total)
    };

    Line::from(vec![
      Span::styled(
        format!(" Page {}/{} ", self.page, self.page_count().max(1)),
        Style::default().fg(Color::Cyan),
      ),
      Span::styled(format!(" {} ", range), Style::default().fg(Color::White)),
      Span::styled(format!(" {} per page ", self.page_size), dim),
      Span::styled(
        format!(
          " {} at {} ",
          view.source.label(),
          view.fetched_at.with_timezone(&Local).format("%H:%M:%S")
        ),
        dim,
      ),
    ])
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.records().len();
    ensure_valid_selection(&mut self.table_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Products (loading...) ".to_string(),
      QueryState::Error(_) => " Products (error) ".to_string(),
      _ => format!(" Products ({}) ", self.total()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.records().is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() && self.shown.is_none() {
        "Failed to load products. Press 'r' to retry."
      } else {
        "No products match the current filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(vec![
      "  ID", "Name", "Category", "Price", "Stock", "Status", "Created", "Updated",
    ])
    .style(Style::default().fg(Color::DarkGray).bold());

    let rows: Vec<Row> = self
      .records()
      .iter()
      .map(|p| {
        let mark = if self.marked.contains(&p.id) { "* " } else { "  " };
        Row::new(vec![
          Cell::from(format!("{}{}", mark, p.id)).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&p.name, 40)),
          Cell::from(p.category.label()),
          Cell::from(Text::from(format_price(p.price)).alignment(Alignment::Right)),
          Cell::from(Text::from(p.stock.to_string()).alignment(Alignment::Right))
            .style(Style::default().fg(stock_color(p.stock))),
          Cell::from(p.status.label()).style(Style::default().fg(status_color(p.status))),
          Cell::from(p.created_at.to_string()),
          Cell::from(p.updated_at.to_string()),
        ])
      })
      .collect();

    let widths = [
      Constraint::Length(8),
      Constraint::Min(20),
      Constraint::Length(12),
      Constraint::Length(12),
      Constraint::Length(6),
      Constraint::Length(9),
      Constraint::Length(10),
      Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .column_spacing(2)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for ProductListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_filters(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Filters
        Constraint::Min(3),    // Table
        Constraint::Length(1), // Pagination
      ])
      .split(area);

    frame.render_widget(Paragraph::new(self.filter_line()), chunks[0]);
    self.render_table(frame, chunks[1]);
    frame.render_widget(Paragraph::new(self.pagination_line()), chunks[2]);

    self.search.render_overlay(frame, chunks[1]);
    self.limit_prompt.render_overlay(frame, chunks[1]);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Products".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      self.on_view_loaded();
    }
    if self.action.poll() {
      self.on_action_finished();
    }
  }

  fn notice(&self) -> Option<(&str, NoticeLevel)> {
    self.notice.as_ref().map(|(m, level)| (m.as_str(), *level))
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("/", "search").with_priority(10),
      ShortcutInfo::new("c", "category").with_priority(20),
      ShortcutInfo::new("s", "status").with_priority(21),
      ShortcutInfo::new("o/O", "sort").with_priority(22),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("z", "size").with_priority(31),
      ShortcutInfo::new("l", "limit").with_priority(32),
      ShortcutInfo::new("r", "reload").with_priority(40),
      ShortcutInfo::new("e", "export").with_priority(50),
      ShortcutInfo::new("x", "on/off").with_priority(60),
      ShortcutInfo::new("d", "delete").with_priority(61),
      ShortcutInfo::new("space/D", "mark/delete").with_priority(62),
      ShortcutInfo::new("y/n", "confirm").when_active(),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::source::fake::{numbered, FakeSource};
  use crate::config::LimitsConfig;
  use crate::export::CsvEncoder;
  use crate::prefs::{load_fetch_limit, MemoryPreferences};
  use crossterm::event::KeyModifiers;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn press(view: &mut ProductListView, text: &str) {
    for c in text.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
  }

  struct Harness {
    view: ProductListView,
    source: Arc<FakeSource>,
    prefs: Arc<MemoryPreferences>,
    _dir: tempfile::TempDir,
  }

  fn harness(count: u64) -> Harness {
    let source = Arc::new(FakeSource::new(numbered(count)));
    let prefs = Arc::new(MemoryPreferences::new());
    let dir = tempfile::tempdir().unwrap();
    let ctx = ListContext {
      client: CachedCatalogClient::new(source.clone(), LimitsConfig::default()),
      prefs: prefs.clone(),
      encoder: Arc::new(CsvEncoder),
      export_dir: dir.path().to_path_buf(),
      page_size_options: vec![5, 10, 20, 50],
    };
    let view = ProductListView::new(ctx, 10, FetchLimit::new(1000).unwrap());
    Harness {
      view,
      source,
      prefs,
      _dir: dir,
    }
  }

  /// Tick until both queries are idle
  async fn settle(view: &mut ProductListView) {
    for _ in 0..200 {
      view.tick();
      if !view.query.is_loading() && !view.action.is_loading() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("view did not settle");
  }

  fn shown_ids(view: &ProductListView) -> Vec<u64> {
    view.records().iter().map(|p| p.id).collect()
  }

  #[test]
  fn test_cycle_passes_through_none() {
    let all = [1, 2, 3];
    assert_eq!(cycle(None, &all), Some(1));
    assert_eq!(cycle(Some(2), &all), Some(3));
    assert_eq!(cycle(Some(3), &all), None);
  }

  #[test]
  fn test_next_page_size_wraps() {
    let options = [5, 10, 20, 50];
    assert_eq!(next_page_size(10, &options), 20);
    assert_eq!(next_page_size(50, &options), 5);
    assert_eq!(next_page_size(7, &options), 5);
  }

  #[tokio::test]
  async fn test_paging_reuses_cached_window() {
    let mut h = harness(25);
    settle(&mut h.view).await;
    assert_eq!(shown_ids(&h.view), (1..=10).collect::<Vec<_>>());
    assert_eq!(h.view.total(), 25);

    h.view.handle_key(key(KeyCode::PageDown));
    settle(&mut h.view).await;
    h.view.handle_key(key(KeyCode::Char('n')));
    settle(&mut h.view).await;

    assert_eq!(h.view.page, 3);
    assert_eq!(shown_ids(&h.view), (21..=25).collect::<Vec<_>>());
    assert_eq!(h.source.query_count(), 1);

    // Already on the last page
    h.view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(h.view.page, 3);
  }

  #[tokio::test]
  async fn test_reload_refetches_and_resets_page() {
    let mut h = harness(25);
    settle(&mut h.view).await;
    h.view.handle_key(key(KeyCode::Char('n')));
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('r')));
    settle(&mut h.view).await;

    assert_eq!(h.view.page, 1);
    assert_eq!(h.source.query_count(), 2);
  }

  #[tokio::test]
  async fn test_search_prompt_filters_by_name() {
    let mut h = harness(25);
    settle(&mut h.view).await;

    press(&mut h.view, "/item 2");
    h.view.handle_key(key(KeyCode::Enter));
    settle(&mut h.view).await;

    assert_eq!(h.view.filter.name.as_deref(), Some("item 2"));
    // "Item 2" and "Item 20".."Item 25"
    assert_eq!(h.view.total(), 7);
    assert_eq!(h.source.query_count(), 2);
  }

  #[tokio::test]
  async fn test_category_cycle_requeries() {
    let mut h = harness(5);
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('c')));
    settle(&mut h.view).await;
    assert_eq!(h.view.filter.category, Some(Category::Electronics));
    assert_eq!(h.view.total(), 5);

    h.view.handle_key(key(KeyCode::Char('c')));
    settle(&mut h.view).await;
    assert_eq!(h.view.filter.category, Some(Category::Clothing));
    assert_eq!(h.view.total(), 0);
    assert_eq!(h.source.query_count(), 3);
  }

  #[tokio::test]
  async fn test_limit_prompt_persists_and_clamps_total() {
    let mut h = harness(25);
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('l')));
    // Prompt opens pre-filled with the current limit
    for _ in 0..4 {
      h.view.handle_key(key(KeyCode::Backspace));
    }
    press(&mut h.view, "12");
    h.view.handle_key(key(KeyCode::Enter));
    settle(&mut h.view).await;

    assert_eq!(h.view.limit.get(), 12);
    assert_eq!(h.view.total(), 12);
    let default = FetchLimit::new(1000).unwrap();
    assert_eq!(load_fetch_limit(h.prefs.as_ref(), default).get(), 12);
  }

  #[tokio::test]
  async fn test_invalid_limit_is_rejected() {
    let mut h = harness(5);
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('l')));
    for _ in 0..4 {
      h.view.handle_key(key(KeyCode::Backspace));
    }
    press(&mut h.view, "0");
    h.view.handle_key(key(KeyCode::Enter));

    assert_eq!(h.view.limit.get(), 1000);
    assert!(matches!(h.view.notice, Some((_, NoticeLevel::Error))));
  }

  #[tokio::test]
  async fn test_delete_requires_confirmation() {
    let mut h = harness(3);
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('d')));
    h.view.handle_key(key(KeyCode::Char('n')));
    settle(&mut h.view).await;
    assert_eq!(h.view.total(), 3);

    h.view.handle_key(key(KeyCode::Char('d')));
    h.view.handle_key(key(KeyCode::Char('y')));
    settle(&mut h.view).await;
    settle(&mut h.view).await;

    assert_eq!(shown_ids(&h.view), vec![2, 3]);
    assert!(matches!(h.view.notice, Some((ref m, NoticeLevel::Info)) if m == "Deleted Item 1"));
  }

  #[tokio::test]
  async fn test_bulk_delete_marked_rows() {
    let mut h = harness(4);
    settle(&mut h.view).await;

    // Mark rows 1 and 2, skip 3, mark 4
    press(&mut h.view, "  ");
    h.view.handle_key(key(KeyCode::Down));
    press(&mut h.view, " ");
    assert_eq!(h.view.marked.len(), 3);

    h.view.handle_key(key(KeyCode::Char('D')));
    h.view.handle_key(key(KeyCode::Enter));
    settle(&mut h.view).await;
    settle(&mut h.view).await;

    assert_eq!(shown_ids(&h.view), vec![3]);
    assert!(h.view.marked.is_empty());
  }

  #[tokio::test]
  async fn test_bulk_delete_without_marks_warns() {
    let mut h = harness(2);
    settle(&mut h.view).await;
    h.view.handle_key(key(KeyCode::Char('D')));
    assert!(!h.view.confirm.is_active());
    assert!(matches!(h.view.notice, Some((_, NoticeLevel::Warning))));
  }

  #[tokio::test]
  async fn test_toggle_status() {
    let mut h = harness(2);
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('x')));
    settle(&mut h.view).await;
    settle(&mut h.view).await;

    assert_eq!(h.view.records()[0].status, ProductStatus::Inactive);
  }

  #[tokio::test]
  async fn test_export_writes_file() {
    let mut h = harness(3);
    settle(&mut h.view).await;

    h.view.handle_key(key(KeyCode::Char('e')));
    settle(&mut h.view).await;

    let Some((message, NoticeLevel::Info)) = &h.view.notice else {
      panic!("unexpected notice {:?}", h.view.notice);
    };
    assert!(message.starts_with("Exported 3 products"));
  }

  #[tokio::test]
  async fn test_export_with_no_matches_is_a_notice() {
    let mut h = harness(3);
    settle(&mut h.view).await;
    h.view.handle_key(key(KeyCode::Char('s')));
    h.view.handle_key(key(KeyCode::Char('s')));
    settle(&mut h.view).await;
    assert_eq!(h.view.filter.status, Some(ProductStatus::Inactive));

    h.view.handle_key(key(KeyCode::Char('e')));
    settle(&mut h.view).await;

    assert!(matches!(h.view.notice, Some((_, NoticeLevel::Warning))));
  }

  #[tokio::test]
  async fn test_enter_opens_detail() {
    let mut h = harness(2);
    settle(&mut h.view).await;
    assert!(matches!(
      h.view.handle_key(key(KeyCode::Enter)),
      ViewAction::Push(_)
    ));
    assert!(matches!(
      h.view.handle_key(key(KeyCode::Char('q'))),
      ViewAction::Pop
    ));
  }
}
