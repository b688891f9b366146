use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Group sizes up to this are sampled animal by animal.
const EXACT_SAMPLE_LIMIT: u32 = 50;

pub struct RngManager {
    master: ChaCha8Rng,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    /// Named stream, seeded from the master generator the first time it is requested.
    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let entry = self.streams.entry(name.to_string()).or_insert_with(|| {
            let mut seed_bytes = [0u8; 8];
            self.master.fill_bytes(&mut seed_bytes);
            ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed_bytes))
        });
        SystemRng { inner: entry }
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Random draws used by the stock model.
pub trait RngExt {
    /// Number of `n` animals affected by an event of probability `p`.
    fn sample_proportion(&mut self, n: u32, p: f64) -> u32;
}

impl<R: Rng + ?Sized> RngExt for R {
    fn sample_proportion(&mut self, n: u32, p: f64) -> u32 {
        if n == 0 || p <= 0.0 {
            return 0;
        }
        if p >= 1.0 {
            return n;
        }
        if n <= EXACT_SAMPLE_LIMIT {
            return (0..n).filter(|_| self.gen::<f64>() < p).count() as u32;
        }
        // Box-Muller normal approximation to the binomial.
        let u1: f64 = self.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        let mean = n as f64 * p;
        let sd = (mean * (1.0 - p)).sqrt();
        (mean + sd * z).round().clamp(0.0, n as f64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_deterministic() {
        let mut a = RngManager::new(42);
        let mut b = RngManager::new(42);
        let x: f64 = a.stream("stock").gen();
        let y: f64 = b.stream("stock").gen();
        assert_eq!(x, y);
    }

    #[test]
    fn named_streams_differ() {
        let mut rng = RngManager::new(42);
        let x: f64 = rng.stream("stock").gen();
        let y: f64 = rng.stream("weather").gen();
        assert_ne!(x, y);
    }

    #[test]
    fn proportion_edges() {
        let mut rng = RngManager::new(7);
        let mut stream = rng.stream("test");
        assert_eq!(stream.sample_proportion(0, 0.5), 0);
        assert_eq!(stream.sample_proportion(100, 0.0), 0);
        assert_eq!(stream.sample_proportion(100, 1.0), 100);
        for _ in 0..100 {
            assert!(stream.sample_proportion(20, 0.3) <= 20);
            assert!(stream.sample_proportion(1000, 0.999) <= 1000);
        }
    }

    #[test]
    fn large_groups_centre_on_mean() {
        let mut rng = RngManager::new(11);
        let mut stream = rng.stream("test");
        let total: u32 = (0..200).map(|_| stream.sample_proportion(1000, 0.2)).sum();
        let mean = total as f64 / 200.0;
        assert!((mean - 200.0).abs() < 5.0, "{mean}");
    }
}
