//! What a dancer does outside the protocol: getting ready and dancing.

use async_trait::async_trait;
use ballroom_core::{BallroomConfig, DancerId};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::time::Duration;

/// Time spent before arriving and on the floor.
///
/// Neither method touches shared protocol state.
#[async_trait]
pub trait DanceActivity: Send + Sync {
    /// Preparation before arriving at the floor
    async fn prepare(&self, dancer: &DancerId);

    /// The dance itself, run concurrently by both members of a match
    async fn dance(&self, dancer: &DancerId);
}

async fn pause(duration: Duration) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(duration).await;
    }
}

/// Uniformly random delays from a seeded generator.
#[derive(Debug)]
pub struct RandomDelays {
    max_arrival: Duration,
    max_dance: Duration,
    seed: u64,
    rng: Mutex<ChaCha8Rng>,
}

impl RandomDelays {
    /// Delays drawn from `0..=max_arrival` and `0..=max_dance`.
    ///
    /// Without a seed one is drawn from the thread RNG; [`RandomDelays::seed`]
    /// reports it so a run can be replayed.
    pub fn new(max_arrival: Duration, max_dance: Duration, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            max_arrival,
            max_dance,
            seed,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Delays configured by `config`
    pub fn from_config(config: &BallroomConfig) -> Self {
        Self::new(
            Duration::from_millis(config.max_arrival_delay_ms),
            Duration::from_millis(config.max_dance_ms),
            config.seed,
        )
    }

    /// Seed actually in use
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn draw(&self, max: Duration) -> Duration {
        let max_ms = max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.lock().gen_range(0..=max_ms))
    }
}

#[async_trait]
impl DanceActivity for RandomDelays {
    async fn prepare(&self, _dancer: &DancerId) {
        let delay = self.draw(self.max_arrival);
        pause(delay).await;
    }

    async fn dance(&self, _dancer: &DancerId) {
        let delay = self.draw(self.max_dance);
        pause(delay).await;
    }
}

/// Fixed, per-dancer delays for staging exact arrival orders.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDelays {
    default_arrival: Duration,
    arrivals: HashMap<DancerId, Duration>,
    dance: Duration,
}

impl ScriptedDelays {
    /// Every dance lasts `dance`; everybody arrives immediately.
    pub fn new(dance: Duration) -> Self {
        Self {
            dance,
            ..Default::default()
        }
    }

    /// Preparation delay for dancers without their own entry
    pub fn with_default_arrival(mut self, delay: Duration) -> Self {
        self.default_arrival = delay;
        self
    }

    /// Preparation delay for one dancer, applied before each of its arrivals
    pub fn with_arrival(mut self, dancer: DancerId, delay: Duration) -> Self {
        self.arrivals.insert(dancer, delay);
        self
    }

    fn arrival_of(&self, dancer: &DancerId) -> Duration {
        self.arrivals
            .get(dancer)
            .copied()
            .unwrap_or(self.default_arrival)
    }
}

#[async_trait]
impl DanceActivity for ScriptedDelays {
    async fn prepare(&self, dancer: &DancerId) {
        pause(self.arrival_of(dancer)).await;
    }

    async fn dance(&self, _dancer: &DancerId) {
        pause(self.dance).await;
    }
}
