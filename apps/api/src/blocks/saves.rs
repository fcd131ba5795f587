use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

/// Blocks with a save in flight. A second save of the same block is turned
/// away until the first guard drops.
#[derive(Debug, Clone, Default)]
pub struct SaveRegistry {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl SaveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if `block_id` is already being saved.
    pub fn begin(&self, block_id: Uuid) -> Option<SaveGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.insert(block_id).then(|| SaveGuard {
            in_flight: Arc::clone(&self.in_flight),
            block_id,
        })
    }
}

#[derive(Debug)]
pub struct SaveGuard {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    block_id: Uuid,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.block_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_save_is_refused_until_first_ends() {
        let saves = SaveRegistry::new();
        let id = Uuid::new_v4();

        let first = saves.begin(id);
        assert!(first.is_some());
        assert!(saves.begin(id).is_none());
        assert!(saves.begin(Uuid::new_v4()).is_some());

        drop(first);
        assert!(saves.begin(id).is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let saves = SaveRegistry::new();
        let id = Uuid::new_v4();
        let _guard = saves.begin(id);
        assert!(saves.clone().begin(id).is_none());
    }
}
