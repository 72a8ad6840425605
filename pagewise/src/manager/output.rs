//! What a manager shows its consumers.

use bitflags::bitflags;

bitflags! {
    /// Which directions have a request in flight.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Busy: u8 {
        /// A refresh is running.
        const REFRESHING = 1;
        /// A prepend is running.
        const PREPENDING = 1 << 1;
        /// An append is running.
        const APPENDING = 1 << 2;
    }
}

/// The accumulated values plus busy flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output<V> {
    /// Directions currently loading.
    pub busy: Busy,
    /// Every value loaded so far, in order.
    pub values: Vec<V>,
}

impl<V> Output<V> {
    /// Nothing loaded, nothing in flight.
    pub fn new() -> Self {
        Self {
            busy: Busy::empty(),
            values: Vec::new(),
        }
    }

    /// Whether a refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.busy.contains(Busy::REFRESHING)
    }

    /// Whether a prepend is running.
    pub fn is_prepending(&self) -> bool {
        self.busy.contains(Busy::PREPENDING)
    }

    /// Whether an append is running.
    pub fn is_appending(&self) -> bool {
        self.busy.contains(Busy::APPENDING)
    }

    /// Whether anything is running.
    pub fn is_busy(&self) -> bool {
        !self.busy.is_empty()
    }
}

impl<V> Default for Output<V> {
    fn default() -> Self {
        Self::new()
    }
}
