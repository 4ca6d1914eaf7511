//! Lamport logical clock ordering sync operations, with device-id tiebreak.
//!
//! Not present in the teacher crate; the algorithm is the standard Lamport
//! rule, not attributed to a specific corpus file.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct LamportTimestamp {
    pub counter: u64,
    pub device_id: [u8; 16],
}

pub struct LamportClock {
    counter: Mutex<u64>,
    device_id: [u8; 16],
}

impl LamportClock {
    pub fn new(device_id: [u8; 16]) -> Self {
        Self { counter: Mutex::new(0), device_id }
    }

    /// Stamps a locally generated operation, advancing the clock by one.
    pub fn tick(&self) -> LamportTimestamp {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        LamportTimestamp { counter: *counter, device_id: self.device_id }
    }

    /// Advances the clock to stay ahead of an externally observed
    /// timestamp: `max(local, observed) + 1`.
    pub fn observe(&self, observed: LamportTimestamp) -> LamportTimestamp {
        let mut counter = self.counter.lock().unwrap();
        *counter = (*counter).max(observed.counter) + 1;
        LamportTimestamp { counter: *counter, device_id: self.device_id }
    }
}

/// Orders two timestamps by counter, falling back to `device_id` to break
/// ties between concurrent operations from different devices.
pub fn order(a: &LamportTimestamp, b: &LamportTimestamp) -> std::cmp::Ordering {
    a.counter.cmp(&b.counter).then_with(|| a.device_id.cmp(&b.device_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_monotonically() {
        let clock = LamportClock::new([1u8; 16]);
        let a = clock.tick();
        let b = clock.tick();
        assert!(order(&a, &b) == std::cmp::Ordering::Less);
    }

    #[test]
    fn observing_a_larger_timestamp_jumps_ahead() {
        let clock = LamportClock::new([1u8; 16]);
        clock.tick();
        let observed = LamportTimestamp { counter: 100, device_id: [2u8; 16] };
        let next = clock.observe(observed);
        assert!(next.counter > observed.counter);
    }

    #[test]
    fn tiebreak_uses_device_id() {
        let a = LamportTimestamp { counter: 5, device_id: [1u8; 16] };
        let b = LamportTimestamp { counter: 5, device_id: [2u8; 16] };
        assert_eq!(order(&a, &b), std::cmp::Ordering::Less);
    }
}
