// src/watch/debounce.rs

//! Trailing-edge debouncing over explicit instants.
//!
//! Nothing here reads the clock; callers pass `now`, which keeps the timing
//! logic testable without sleeping.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Fires once, `delay` after the last `touch`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm or refresh the deadline to `now + delay`.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True (and disarmed) if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// One independent trailing-edge deadline per key.
#[derive(Debug, Clone)]
pub struct KeyedDebouncer<K> {
    deadlines: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> KeyedDebouncer<K> {
    pub fn new() -> Self {
        Self {
            deadlines: HashMap::new(),
        }
    }

    pub fn touch(&mut self, key: K, now: Instant, delay: Duration) {
        self.deadlines.insert(key, now + delay);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every key whose deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let due: Vec<K> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.deadlines.remove(key);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedDebouncer<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_fires_once_after_quiet_period() {
        let t0 = Instant::now();
        let delay = Duration::from_millis(100);
        let mut d = Debouncer::new(delay);

        let mut fired = 0;
        for i in 0..10 {
            let now = t0 + Duration::from_millis(i * 20);
            d.touch(now);
            if d.fire_if_due(now) {
                fired += 1;
            }
        }
        assert_eq!(fired, 0);

        let last = t0 + Duration::from_millis(180);
        assert!(!d.fire_if_due(last + Duration::from_millis(99)));
        assert!(d.fire_if_due(last + delay));
        assert!(!d.fire_if_due(last + delay * 5));
    }

    #[test]
    fn keyed_deadlines_are_independent() {
        let t0 = Instant::now();
        let mut d = KeyedDebouncer::new();
        d.touch("fast", t0, Duration::from_millis(10));
        d.touch("slow", t0, Duration::from_millis(500));

        assert_eq!(d.next_deadline(), Some(t0 + Duration::from_millis(10)));
        assert_eq!(d.take_due(t0 + Duration::from_millis(20)), vec!["fast"]);
        assert_eq!(d.len(), 1);
        assert!(d.take_due(t0 + Duration::from_millis(20)).is_empty());
        assert_eq!(d.take_due(t0 + Duration::from_secs(1)), vec!["slow"]);
    }
}
