//! # Handle Table
//!
//! Maps client-chosen names to generalized columns so one operator's output can
//! feed the next. Lookup is most-recent-first: binding a name again shadows the
//! earlier binding, and the shadowed value is released at that point. Only live
//! names count against the capacity.

use crate::config::INITIAL_HANDLE_SLOTS;
use crate::error::{Error, Result};
use crate::schema::validate_name;

use super::result::GeneralizedColumn;

#[derive(Debug)]
pub struct HandleTable {
    entries: Vec<(String, GeneralizedColumn)>,
    capacity: usize,
}

impl HandleTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(INITIAL_HANDLE_SLOTS.min(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, name: &str, value: GeneralizedColumn) -> Result<()> {
        validate_name("handle", name)?;

        let existing = self.entries.iter().rposition(|(n, _)| n == name);
        if existing.is_none() && self.entries.len() >= self.capacity {
            return Err(Error::ResourceExhausted(format!(
                "handle table is full ({} entries)",
                self.capacity
            )));
        }
        if let Some(idx) = existing {
            self.entries.remove(idx);
        }

        tracing::debug!(handle = name, kind = value.type_name(), "registered handle");
        self.entries.push((name.to_string(), value));
        Ok(())
    }

    /// Checks that binding all of `names` would fit, so a multi-output operator
    /// binds either every output or none.
    pub fn ensure_room(&self, names: &[String]) -> Result<()> {
        for name in names {
            validate_name("handle", name)?;
        }
        let mut fresh: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| !self.entries.iter().any(|(e, _)| e == n))
            .collect();
        fresh.sort_unstable();
        fresh.dedup();

        if self.entries.len() + fresh.len() > self.capacity {
            return Err(Error::ResourceExhausted(format!(
                "handle table is full ({} entries)",
                self.capacity
            )));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&GeneralizedColumn> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::NotFound(format!("handle '{}'", name)))
    }

    /// Live handles, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeneralizedColumn)> {
        self.entries.iter().rev().map(|(n, v)| (n.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
