//! Poll-based async state for views.
//!
//! A `Query<T>` runs a future on the tokio runtime and hands its result back
//! through a channel that the view drains on each tick, so rendering never
//! awaits.
//!
//! ```ignore
//! let mut query = Query::new(move || {
//!     let client = client.clone();
//!     async move { client.get(id).await.map_err(|e| e.to_string()) }
//! });
//! query.fetch();
//!
//! // In the view's tick
//! if query.poll() {
//!     // state changed, re-render picks it up
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Nothing started yet
  Idle,
  Loading,
  Success(T),
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query with loading/success/error state.
///
/// Either built around a fetcher closure (`new`, then `fetch`/`refetch`), or
/// left without one (`idle`) and driven by `start` with a ready-made future
/// whenever the parameters change.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: Option<FetcherFn<T>>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
}

impl<T: Send + 'static> Query<T> {
  /// Query re-running `fetcher` on each `fetch()` or `refetch()`
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Some(Box::new(move || Box::pin(fetcher()))),
      receiver: None,
      fetched_at: None,
    }
  }

  /// Query without a fetcher; see [`Query::start`]
  pub fn idle() -> Self {
    Self {
      state: QueryState::Idle,
      fetcher: None,
      receiver: None,
      fetched_at: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// When the last successful result arrived
  pub fn fetched_at(&self) -> Option<Instant> {
    self.fetched_at
  }

  /// Run the fetcher unless a fetch is already in flight
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.refetch();
  }

  /// Run the fetcher, abandoning any pending result
  pub fn refetch(&mut self) {
    if let Some(fetcher) = &self.fetcher {
      let future = fetcher();
      self.start(future);
    }
  }

  /// Run `future`, abandoning any pending result. The abandoned task still
  /// completes; its result is dropped.
  pub fn start<Fut>(&mut self, future: Fut)
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    tokio::spawn(async move {
      // The receiver is gone when a newer start() replaced it
      let _ = tx.send(future.await);
    });
  }

  /// Drain a finished fetch. Returns `true` when the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .finish_non_exhaustive()
  }
}
