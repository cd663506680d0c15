use std::collections::HashMap;
use std::time::Instant;

use dashrun_core::player::PlayerId;

/// Per-player token bucket.
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Input rate limiter owned by one race session, using a token bucket per
/// player.
pub struct InputRateLimiter {
    buckets: HashMap<PlayerId, TokenBucket>,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl InputRateLimiter {
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            buckets: HashMap::new(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns `true` if the input is allowed, `false` if rate-limited.
    pub fn check(&mut self, player_id: PlayerId, now: Instant) -> bool {
        let bucket = self.buckets.entry(player_id).or_insert_with(|| TokenBucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        // Refill
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        bucket.last_refill = bucket.last_refill.max(now);

        // Consume
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop the bucket of a player who left.
    pub fn forget(&mut self, player_id: PlayerId) {
        self.buckets.remove(&player_id);
    }

    pub fn tracked_players(&self) -> usize {
        self.buckets.len()
    }
}
