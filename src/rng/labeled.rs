//! Labeled seeded generator

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable 64-bit FNV-1a hash of a stream label.
///
/// Unlike `std::collections::hash_map::DefaultHasher` the output never
/// changes between toolchains or processes.
pub fn label_hash(label: &str) -> u64 {
    label.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Reproducible pseudo-random stream owned by exactly one component.
///
/// Derived from `seed ^ label_hash(label)`. Distinct labels give distinct
/// streams on a best-effort basis only: labels are few and hand-picked,
/// and nothing here is suitable for cryptographic use.
///
/// Deliberately not `Clone`: a stream has a single owner.
#[derive(Debug)]
pub struct LabeledRng {
    inner: StdRng,
    label: String,
}

impl LabeledRng {
    /// Derive the stream for `label` from the global seed
    pub fn derive(seed: u64, label: &str) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed ^ label_hash(label)),
            label: label.to_string(),
        }
    }

    /// Label the stream was derived from
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Uniform integer in `[min, max]` inclusive.
    ///
    /// A degenerate range (`min >= max`) returns `min` without consuming
    /// the stream.
    pub fn sample_range(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Bernoulli trial with probability `p`.
    ///
    /// `p <= 0` is always false and `p >= 1` always true; neither boundary
    /// consumes the stream.
    pub fn happens(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.inner.gen::<f64>() < p
    }

    /// Standard normal draw
    pub fn sample_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Normal draw with the given mean and standard deviation
    pub fn sample_normal_with(&mut self, mean: f64, stddev: f64) -> f64 {
        mean + stddev * self.sample_normal()
    }
}

impl RngCore for LabeledRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
