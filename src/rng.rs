// src/rng.rs

//! Injectable randomness for the frame generators.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// A source of uniformly distributed integers.
pub trait RandomSource {
    /// Returns a value in the inclusive range `lo..=hi`.
    fn next_in_range(&mut self, lo: i32, hi: i32) -> i32;
}

/// `rand`-backed source, either seeded from OS entropy or from a fixed seed.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Same seed, same draw sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_in_range(&mut self, lo: i32, hi: i32) -> i32 {
        self.rng.gen_range(lo..=hi)
    }
}

/// Replays a fixed list of draws, cycling when it runs out.
///
/// Each scripted value is clamped into the requested range so a script
/// written for one call site cannot produce impossible values at another.
pub struct ScriptedRandom {
    script: VecDeque<i32>,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            script: values.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_in_range(&mut self, lo: i32, hi: i32) -> i32 {
        match self.script.pop_front() {
            Some(value) => {
                self.script.push_back(value);
                value.clamp(lo, hi)
            }
            None => lo,
        }
    }
}
