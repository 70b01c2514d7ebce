//! Session-scoped key/value storage

use crate::error::Result;

/// Storage that lives for the current browsing session
///
/// Values are cleared when the session ends (tab or browser close). Both
/// operations may fail, e.g. when storage is disabled or the quota is full.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}
