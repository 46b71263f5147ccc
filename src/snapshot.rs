use std::sync::{Arc, Mutex};

use crate::lock_or_recover;

/// Shared single-slot mailbox: writers overwrite, the reader takes whatever is newest.
#[derive(Debug)]
pub struct LatestValue<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for LatestValue<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for LatestValue<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> LatestValue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, value: T) {
        *lock_or_recover(&self.slot, "latest value publish") = Some(value);
    }

    /// Take the newest value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        lock_or_recover(&self.slot, "latest value take").take()
    }
}

impl<T: Clone> LatestValue<T> {
    pub fn peek(&self) -> Option<T> {
        lock_or_recover(&self.slot, "latest value peek").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_values_overwrite_older() {
        let slot = LatestValue::new();
        let writer = slot.clone();
        writer.publish(1u64);
        writer.publish(2);
        writer.publish(3);
        assert_eq!(slot.peek(), Some(3));
        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot.take(), None);
    }
}
