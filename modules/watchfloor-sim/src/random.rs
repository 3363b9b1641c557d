//! Injectable randomness. Detection and escalation draws are the only
//! nondeterminism in a session; all of them go through [`RandomSource`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Bernoulli draw. `p <= 0` never fires, `p >= 1` always fires.
    fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_unit() < p
    }

    /// Uniform index into a collection of `len` items.
    fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let idx = (self.next_unit() * len as f64) as usize;
        Some(idx.min(len - 1))
    }
}

/// `StdRng` seeded from a u64, reproducible across runs.
pub struct SeededRandom {
    seed: u64,
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fresh seed from the thread rng; the seed is kept so the session can be replayed.
    pub fn unseeded() -> Self {
        Self::new(rand::rng().random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Per-session seed derived from a base seed and the operator code, so the
/// same code replays the same world under the same base seed. FNV-1a over
/// the code, then the splitmix64 finaliser.
pub fn seed_for(base: u64, operator_code: &str) -> u64 {
    let code = operator_code
        .bytes()
        .fold(0xCBF2_9CE4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01B3)
        });
    let mut z = base ^ code;
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_draws() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let xs: Vec<f64> = (0..8).map(|_| a.next_unit()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.next_unit()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn chance_edges_do_not_draw() {
        let mut r = SeededRandom::new(7);
        assert!(!r.chance(0.0));
        assert!(r.chance(1.0));
        assert!(!r.chance(-0.5));
    }

    #[test]
    fn pick_stays_in_bounds() {
        let mut r = SeededRandom::new(3);
        assert_eq!(r.pick(0), None);
        for _ in 0..100 {
            assert!(r.pick(4).unwrap() < 4);
        }
    }

    #[test]
    fn session_seeds_follow_base_and_operator_code() {
        assert_eq!(seed_for(1, "OP-0042"), seed_for(1, "OP-0042"));
        assert_ne!(seed_for(1, "OP-0042"), seed_for(1, "OP-0043"));
        assert_ne!(seed_for(1, "OP-0042"), seed_for(2, "OP-0042"));
    }
}
