//! In-flight delivery queue
//!
//! Tracks documents handed to the consumer but not yet acknowledged. The
//! queue is an explicit VecDeque with a contiguous-prefix rule: the durable
//! checkpoint only ever advances past the longest fully acknowledged prefix
//! in delivery order, so an out-of-order acknowledgment parks until every
//! earlier delivery is acknowledged too. Popped entries transfer ownership
//! back to the caller.

use std::collections::VecDeque;

use crate::identity::DocumentId;

#[derive(Debug)]
struct InFlight {
    id: DocumentId,
    acked: bool,
}

/// Delivery-ordered queue of unacknowledged documents.
#[derive(Debug, Default)]
pub struct InFlightQueue {
    entries: VecDeque<InFlight>,
}

impl InFlightQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record a delivery in order.
    pub fn push(&mut self, id: DocumentId) {
        self.entries.push_back(InFlight { id, acked: false });
    }

    /// Mark the oldest unacknowledged delivery of `id` as acknowledged.
    ///
    /// Returns false when no such delivery is in flight.
    pub fn acknowledge(&mut self, id: &DocumentId) -> bool {
        for entry in self.entries.iter_mut() {
            if !entry.acked && entry.id == *id {
                entry.acked = true;
                return true;
            }
        }
        false
    }

    /// Pop the acknowledged prefix, returning the last id popped.
    ///
    /// This is the id the durable checkpoint may advance to. Returns `None`
    /// when the front of the queue is still unacknowledged.
    pub fn advance(&mut self) -> Option<DocumentId> {
        let mut last = None;
        while let Some(front) = self.entries.front() {
            if !front.acked {
                break;
            }
            // ownership of the retired entry moves out of the queue
            let entry = self.entries.pop_front().unwrap_or_else(|| unreachable!());
            last = Some(entry.id);
        }
        last
    }
}
