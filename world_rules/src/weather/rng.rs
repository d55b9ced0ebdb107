use chrono::{DateTime, Datelike, Timelike, Utc};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const LCG_MUL: u32 = 1_664_525;
const LCG_INC: u32 = 1_013_904_223;

/// A small string-seeded linear congruential generator.
///
/// The key is hashed with FNV-1a into the initial state; draws step the
/// 32-bit LCG. Identical keys always yield identical sequences.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn from_key(key: &str) -> Self {
        let mut hash = FNV_OFFSET;
        for byte in key.bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        Self { state: hash }
    }

    /// Generator for one sub-decision at one hour of the year.
    pub fn for_decision(seed: &str, decision: &str, at: DateTime<Utc>) -> Self {
        Self::from_key(&format!("{seed}:{decision}:{}:{}", at.ordinal(), at.hour()))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC);
        self.state
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    pub fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Uniform in `[-spread, spread)`.
    pub fn jitter(&mut self, spread: f64) -> f64 {
        self.range(-spread, spread)
    }

    /// Weighted choice. Non-positive weights are never chosen unless all are.
    pub fn pick<T: Copy>(&mut self, weighted: &[(T, f64)]) -> Option<T> {
        let total: f64 = weighted.iter().map(|(_, w)| w.max(0.0)).sum();
        let first = weighted.first()?.0;
        if total <= 0.0 {
            return Some(first);
        }
        let mut roll = self.next_f64() * total;
        for (value, weight) in weighted {
            let weight = weight.max(0.0);
            if roll < weight {
                return Some(*value);
            }
            roll -= weight;
        }
        weighted.iter().rev().find(|(_, w)| *w > 0.0).map(|(v, _)| *v)
    }
}
