use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::PathBuf;

use super::AudioPriority;

/// A resolved clip waiting behind the one currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackItem {
    pub priority: AudioPriority,
    pub seq: u64,
    pub token: u64,
    pub path: PathBuf,
}

impl Ord for PlaybackItem {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.priority, self.seq, self.token).cmp(&(other.priority, other.seq, other.token))
    }
}

impl PartialOrd for PlaybackItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending clips ordered by (priority, sequence).
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    heap: BinaryHeap<Reverse<PlaybackItem>>,
}

impl PlaybackQueue {
    pub fn push(&mut self, item: PlaybackItem) {
        self.heap.push(Reverse(item));
    }

    /// Pop the most urgent clip carrying `live_token`, dropping stale ones on the way.
    pub fn pop_live(&mut self, live_token: u64) -> Option<PlaybackItem> {
        while let Some(Reverse(item)) = self.heap.pop() {
            if item.token == live_token {
                return Some(item);
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(priority: AudioPriority, seq: u64, token: u64) -> PlaybackItem {
        PlaybackItem {
            priority,
            seq,
            token,
            path: PathBuf::from(format!("/tmp/{seq}.mp3")),
        }
    }

    #[test]
    fn pops_by_priority_then_sequence() {
        let mut queue = PlaybackQueue::default();
        queue.push(item(AudioPriority::Normal, 1, 0));
        queue.push(item(AudioPriority::High, 3, 0));
        queue.push(item(AudioPriority::Normal, 2, 0));
        queue.push(item(AudioPriority::High, 4, 0));
        let order: Vec<u64> = std::iter::from_fn(|| queue.pop_live(0))
            .map(|i| i.seq)
            .collect();
        assert_eq!(order, vec![3, 4, 1, 2]);
    }

    #[test]
    fn stale_entries_are_skipped() {
        let mut queue = PlaybackQueue::default();
        queue.push(item(AudioPriority::High, 1, 1));
        queue.push(item(AudioPriority::Normal, 2, 2));
        assert_eq!(queue.pop_live(2).unwrap().seq, 2);
        assert!(queue.is_empty());
        assert!(queue.pop_live(2).is_none());
    }
}
