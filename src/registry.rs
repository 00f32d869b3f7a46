//! Per-connection registry of open cursors
//!
//! The registry is a plain container owned by the engine next to its
//! connection. It holds at most one [`CursorState`] per name and keeps names
//! in the order the cursors were opened.

use indexmap::IndexMap;

use crate::cursor::CursorState;

/// Named cursor states for one connection
#[derive(Debug, Default)]
pub struct CursorRegistry {
    cursors: IndexMap<String, CursorState>,
}

impl CursorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cursor, returning the state it replaces
    pub fn insert(&mut self, state: CursorState) -> Option<CursorState> {
        self.cursors.insert(state.name().to_string(), state)
    }

    /// Look up a cursor
    pub fn get(&self, name: &str) -> Option<&CursorState> {
        self.cursors.get(name)
    }

    /// Look up a cursor for mutation
    pub fn get_mut(&mut self, name: &str) -> Option<&mut CursorState> {
        self.cursors.get_mut(name)
    }

    /// Remove a cursor, keeping the order of the others
    pub fn remove(&mut self, name: &str) -> Option<CursorState> {
        self.cursors.shift_remove(name)
    }

    /// Check if a cursor is registered
    pub fn contains(&self, name: &str) -> bool {
        self.cursors.contains_key(name)
    }

    /// Number of open cursors
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Check if no cursors are open
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Names of open cursors, in opening order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cursors.keys().map(String::as_str)
    }
}
