/*!
# Synthetic Trajectories

Seeded generators for the two movement styles the local rule separates:

- human-like: slow drift with small heading changes and occasional pauses,
- scripted: bursts that alternate between a crawl and a jump, in random
  directions.

Used by the `simulate` command, the benchmarks and the tests.
*/

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::sample::Sample;

const SCREEN_CENTER: (f64, f64) = (960.0, 540.0);

/// Movement style to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Human,
    Bot,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Human => write!(f, "human"),
            Profile::Bot => write!(f, "bot"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(Profile::Human),
            "bot" => Ok(Profile::Bot),
            other => Err(format!("unknown profile '{other}', expected human or bot")),
        }
    }
}

/// Deterministic trajectory source.
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    rng: StdRng,
    start_ms: i64,
}

impl TrajectoryGenerator {
    /// Generator starting at t = 0.
    pub fn new(seed: u64) -> Self {
        Self::with_start(seed, 0)
    }

    /// Generator whose first sample is stamped `start_ms`.
    pub fn with_start(seed: u64, start_ms: i64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            start_ms,
        }
    }

    pub fn generate(&mut self, profile: Profile, count: usize) -> Vec<Sample> {
        match profile {
            Profile::Human => self.human(count),
            Profile::Bot => self.bot(count),
        }
    }

    /// Slow, smooth movement: every interval stays at or under 20 px/s.
    pub fn human(&mut self, count: usize) -> Vec<Sample> {
        let mut samples: Vec<Sample> = Vec::with_capacity(count);
        let (mut x, mut y) = SCREEN_CENTER;
        let mut t: i64 = self.start_ms;
        let mut heading: f64 = self.rng.random_range(0.0..TAU);

        for i in 0..count {
            if i > 0 {
                let pause: bool = self.rng.random_bool(0.05);
                let dt_ms: i64 = if pause {
                    self.rng.random_range(600..900)
                } else {
                    self.rng.random_range(40..60)
                };
                let speed: f64 = if pause {
                    self.rng.random_range(0.0..2.0)
                } else {
                    self.rng.random_range(8.0..20.0)
                };
                heading += self.rng.random_range(-0.25..0.25);
                let step: f64 = speed * dt_ms as f64 / 1000.0;
                x += step * heading.cos();
                y += step * heading.sin();
                t += dt_ms;
            }
            samples.push(Sample::new(x, y, t));
        }
        samples
    }

    /// Fast, erratic movement: intervals alternate between 20-40 px/s and
    /// 800-2000 px/s with a fresh random heading each step.
    pub fn bot(&mut self, count: usize) -> Vec<Sample> {
        let mut samples: Vec<Sample> = Vec::with_capacity(count);
        let (mut x, mut y) = SCREEN_CENTER;
        let mut t: i64 = self.start_ms;

        for i in 0..count {
            if i > 0 {
                let dt_ms: i64 = self.rng.random_range(10..30);
                let speed: f64 = if i % 2 == 0 {
                    self.rng.random_range(20.0..40.0)
                } else {
                    self.rng.random_range(800.0..2000.0)
                };
                let heading: f64 = self.rng.random_range(0.0..TAU);
                let step: f64 = speed * dt_ms as f64 / 1000.0;
                x += step * heading.cos();
                y += step * heading.sin();
                t += dt_ms;
            }
            samples.push(Sample::new(x, y, t));
        }
        samples
    }
}
