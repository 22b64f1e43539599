// src/fire.rs

//! Frame sources. `FireEffect` is a small cellular automaton: heat is injected
//! along the bottom row every tick and rises, averaging and cooling as it goes.

use crate::palette::{heat_to_rgb, MAX_HEAT};
use crate::pixel::Frame;
use crate::rng::RandomSource;

/// Range of fresh heat written into the bottom row each tick.
pub const SOURCE_HEAT: (i32, i32) = (160, 255);
/// Range of cooling subtracted as heat rises one row.
pub const DECAY: (i32, i32) = (10, 35);

/// Anything that can produce the next frame for the matrix.
pub trait FrameSource {
    fn next_frame(&mut self) -> Frame;
}

/// Rising-heat / fading-embers effect.
///
/// Not thread-safe; a single caller drives `step`.
pub struct FireEffect<R: RandomSource> {
    width: usize,
    height: usize,
    // Row-major, indexed `y * width + x`.
    heat: Vec<i32>,
    rng: R,
}

impl<R: RandomSource> FireEffect<R> {
    /// Creates a cold grid. A grid with no cells produces empty frames.
    pub fn new(width: usize, height: usize, rng: R) -> Self {
        Self {
            width,
            height,
            heat: vec![0; width * height],
            rng,
        }
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Advances the simulation one tick and returns the coloured frame.
    pub fn step(&mut self) -> Frame {
        let Some(bottom) = self.height.checked_sub(1) else {
            return Frame::clear();
        };
        for x in 0..self.width {
            let i = self.idx(x, bottom);
            self.heat[i] = self.rng.next_in_range(SOURCE_HEAT.0, SOURCE_HEAT.1);
        }

        // Bottom-up: each row reads the row beneath it as already updated this tick.
        for y in (0..bottom).rev() {
            for x in 0..self.width {
                let below = y + 1;
                let mut sum = self.heat[self.idx(x, below)];
                let mut count = 1;
                if x > 0 {
                    sum += self.heat[self.idx(x - 1, below)];
                    count += 1;
                }
                if x + 1 < self.width {
                    sum += self.heat[self.idx(x + 1, below)];
                    count += 1;
                }
                let decay = self.rng.next_in_range(DECAY.0, DECAY.1);
                let i = self.idx(x, y);
                self.heat[i] = (sum / count - decay).clamp(0, MAX_HEAT);
            }
        }

        self.heat.iter().map(|&value| heat_to_rgb(value)).collect()
    }
}

impl<R: RandomSource> FrameSource for FireEffect<R> {
    fn next_frame(&mut self) -> Frame {
        self.step()
    }
}
