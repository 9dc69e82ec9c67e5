/// Outcome of offering a key to a component.
///
/// Views try their components first and only handle the key themselves on
/// `NotHandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the view to do
  Handled,
  /// Consumed, and the view has an event to act on
  Event(T),
  NotHandled,
}
