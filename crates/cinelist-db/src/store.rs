//! `KeyValueStore` trait definition.

use std::fmt::Debug;

use anyhow::Result;

/// Durable key-value storage holding serialized documents.
///
/// Reads and writes are synchronous and whole-value: a `set` replaces
/// the previous value entirely. Implementations must be shareable across
/// tasks, so interior mutability is expected.
#[allow(clippy::module_name_repetitions)]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}
