use std::sync::Mutex;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Shared, seedable source of randomness for account and model selection
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_os() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use `seed` when given, OS entropy otherwise
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_os, Self::seeded)
    }

    /// Uniform index in `0..len`; zero for empty and single-element inputs
    pub fn index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }

        self.rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .random_range(0..len)
    }

    pub fn shuffle<T>(&self, items: &mut [T]) {
        let mut rng = self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        items.shuffle(&mut *rng);
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_os()
    }
}
