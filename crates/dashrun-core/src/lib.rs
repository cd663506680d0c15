pub mod codec;
pub mod player;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::player::{Player, PlayerColor, PlayerId};
    use crate::time::{Clock, TimestampMs};

    /// Create `n` test players with sequential IDs starting at 1.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player {
                id: i as PlayerId + 1,
                display_name: format!("Player{}", i + 1),
                color: PlayerColor::for_slot(i),
            })
            .collect()
    }

    /// A clock that only moves when told to.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now: AtomicU64,
    }

    impl ManualClock {
        pub fn new(start_ms: TimestampMs) -> Self {
            Self {
                now: AtomicU64::new(start_ms),
            }
        }

        pub fn advance(&self, ms: TimestampMs) {
            self.now.fetch_add(ms, Ordering::SeqCst);
        }

        pub fn set(&self, ms: TimestampMs) {
            self.now.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> TimestampMs {
            self.now.load(Ordering::SeqCst)
        }
    }

}
