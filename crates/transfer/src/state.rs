use crate::progress::progress_percentage;

/// Runtime status of one chunk within an upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkState {
    #[default]
    Pending,
    InFlight,
    Acknowledged,
    Failed,
}

/// Per-chunk state for one upload attempt.
///
/// Owned by a single scheduler; every mutation goes through `&mut self`, so
/// acknowledgments are serialized even when transfers complete out of order.
/// The acknowledged count only moves on a chunk's first acknowledgment.
#[derive(Debug, Clone)]
pub struct ChunkTracker {
    states: Vec<ChunkState>,
    acknowledged: usize,
}

impl ChunkTracker {
    /// Creates a tracker with `total_chunks` chunks, all pending.
    pub fn new(total_chunks: usize) -> Self {
        Self {
            states: vec![ChunkState::Pending; total_chunks],
            acknowledged: 0,
        }
    }

    /// Returns the state of `index`, or `None` if out of range.
    pub fn state(&self, index: usize) -> Option<ChunkState> {
        self.states.get(index).copied()
    }

    /// Marks a pending chunk as dispatched. Returns `false` for any other
    /// starting state.
    pub fn mark_in_flight(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(state) if *state == ChunkState::Pending => {
                *state = ChunkState::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Records an acknowledgment.
    ///
    /// Returns `true` only the first time `index` is acknowledged; repeated
    /// acknowledgments of the same index are ignored.
    pub fn acknowledge(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(ChunkState::Acknowledged) | None => false,
            Some(state) => {
                *state = ChunkState::Acknowledged;
                self.acknowledged += 1;
                true
            }
        }
    }

    /// Marks a chunk as terminally failed. Acknowledged chunks stay
    /// acknowledged.
    pub fn mark_failed(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(ChunkState::Acknowledged) | None => false,
            Some(state) => {
                *state = ChunkState::Failed;
                true
            }
        }
    }

    /// Number of distinct acknowledged chunks.
    pub fn acknowledged(&self) -> usize {
        self.acknowledged
    }

    /// Total number of chunks tracked.
    pub fn total(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` once every chunk is acknowledged.
    pub fn is_complete(&self) -> bool {
        self.acknowledged == self.states.len()
    }

    /// Progress percentage, capped below completion.
    pub fn percentage(&self) -> u8 {
        progress_percentage(self.acknowledged, self.states.len())
    }
}
