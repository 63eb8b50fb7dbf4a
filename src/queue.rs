/*
 * Epidemic Simulation Using Census Data (ESUCD)
 * Copyright (c)  2021. Sam Ralph
 *
 * This file is part of ESUCD.
 *
 * ESUCD is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3 of the License.
 *
 * ESUCD is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ESUCD.  If not, see <https://www.gnu.org/licenses/>.
 *
 */

//! Core B-1: the event queue.
//!
//! A min-heap keyed on event time, backed by `BinaryHeap` (a max-heap by
//! default) with a reversed `Ord` so the earliest-time entry pops first.
//! Ties are broken by a monotonic insertion counter so the comparator is a
//! total order regardless of how many events share a timestamp.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::event::Event;

struct QueueEntry {
    time: f64,
    sequence: u64,
    event: Event,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence == other.sequence
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest time (and,
        // for ties, the earliest inserted) to compare as the greatest.
        other.time.total_cmp(&self.time).then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// The sole sink of pending transitions and contraction attempts. Events are
/// owned by the queue until popped; the queue never leaks a reference to a
/// popped event back to the caller.
pub struct EventQueue {
    heap: BinaryHeap<QueueEntry>,
    sequence_counter: u64,
}

impl EventQueue {
    pub fn new() -> EventQueue {
        EventQueue { heap: BinaryHeap::new(), sequence_counter: 0 }
    }

    /// Pushes `event` onto the queue. Push is O(log n).
    pub fn push(&mut self, event: Event) {
        let sequence = self.sequence_counter;
        self.sequence_counter += 1;
        self.heap.push(QueueEntry { time: event.time, sequence, event });
    }

    /// Pops the event with the smallest (time, insertion sequence). O(log n).
    pub fn pop_min(&mut self) -> Option<Event> {
        self.heap.pop().map(|entry| entry.event)
    }

    pub fn peek_min_time(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        EventQueue::new()
    }
}
