// snapcart/core/src/core/context_data.rs

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lock-protected state handed to every handler of a pipeline run.
///
/// Cloning is cheap and yields another handle to the same data. The guards are
/// blocking `parking_lot` guards and must never live across an `.await`.
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    ContextData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Read guard narrowed to one part of the data, e.g. `ctx.map_read(|c| &c.order)`.
  pub fn map_read<U: ?Sized, F>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Clones a value out of the context under a short-lived read lock.
  pub fn snapshot<U, F>(&self, f: F) -> U
  where
    F: FnOnce(&T) -> U,
  {
    let guard = self.read();
    f(&guard)
  }

  /// Applies `f` under a short-lived write lock.
  pub fn update<U, F>(&self, f: F) -> U
  where
    F: FnOnce(&mut T) -> U,
  {
    let mut guard = self.write();
    f(&mut guard)
  }

  /// Returns the inner value when this is the last handle.
  pub fn try_unwrap(self) -> Result<T, Self> {
    Arc::try_unwrap(self.0).map(RwLock::into_inner).map_err(ContextData)
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    ContextData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + Default + 'static> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}
