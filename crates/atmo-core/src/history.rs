//! Two-tier value history for trend display.
//!
//! Each tracked quantity keeps a fine-grained ring of the most recent
//! `MINUTES` samples (one per sampling tick) and a coarse ring of
//! `HOURS` aggregates, one per completed minute-ring cycle. Together
//! they cover roughly a day of history in fixed memory: the minute ring
//! is the most recent window, the hour ring the strictly older history,
//! and the two never overlap.
//!
//! All storage is inline arrays; the store never allocates and is only
//! ever mutated by the sampling loop through [`ValueHistory::add_measurement`].

/// Numeric sample type stored in a [`ValueHistory`].
///
/// Implemented for the widths the sensors actually produce; extremes
/// default to [`Sample::ZERO`] before the first measurement arrives.
/// Floats are assumed NaN-free; sensor conversions never produce one.
pub trait Sample: Copy + PartialOrd {
    /// Additive identity. Also what the extremes report while the
    /// history is still empty.
    const ZERO: Self;

    /// Arithmetic mean over a full minute window. Integer types
    /// truncate (C-style division); floats keep the exact mean.
    fn window_mean(window: &[Self]) -> Self;
}

impl Sample for u16 {
    const ZERO: Self = 0;

    fn window_mean(window: &[Self]) -> Self {
        let sum: u32 = window.iter().map(|&v| u32::from(v)).sum();
        (sum / window.len() as u32) as u16
    }
}

impl Sample for u32 {
    const ZERO: Self = 0;

    fn window_mean(window: &[Self]) -> Self {
        let sum: u64 = window.iter().map(|&v| u64::from(v)).sum();
        (sum / window.len() as u64) as u32
    }
}

impl Sample for i32 {
    const ZERO: Self = 0;

    fn window_mean(window: &[Self]) -> Self {
        let sum: i64 = window.iter().map(|&v| i64::from(v)).sum();
        (sum / window.len() as i64) as i32
    }
}

impl Sample for f32 {
    const ZERO: Self = 0.0;

    fn window_mean(window: &[Self]) -> Self {
        let sum: f32 = window.iter().sum();
        sum / window.len() as f32
    }
}

/// Multi-resolution history of one sensor quantity.
///
/// `MINUTES` is the capacity of the fine-grained ring, `HOURS` the
/// capacity of the aggregate ring. With the nominal one-sample-a-minute
/// cadence and 60/24 capacities this retains the last hour at full
/// detail and the last day at one value per hour.
///
/// The minimum and maximum over everything currently retained are kept
/// incrementally: a new sample only extends the cached range, and a
/// full rescan happens only when the slot being overwritten held the
/// current extreme.
pub struct ValueHistory<T, const MINUTES: usize, const HOURS: usize> {
    minute_slots: [T; MINUTES],
    minute_write: usize,
    minute_filled: usize,
    hour_slots: [T; HOURS],
    hour_write: usize,
    hour_filled: usize,
    last: T,
    cached_min: T,
    cached_max: T,
}

impl<T: Sample, const MINUTES: usize, const HOURS: usize> Default
    for ValueHistory<T, MINUTES, HOURS>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample, const MINUTES: usize, const HOURS: usize> ValueHistory<T, MINUTES, HOURS> {
    /// Capacity of the fine-grained ring.
    pub const MINUTE_CAPACITY: usize = MINUTES;

    /// Capacity of the aggregate ring.
    pub const HOUR_CAPACITY: usize = HOURS;

    pub const fn new() -> Self {
        Self {
            minute_slots: [T::ZERO; MINUTES],
            minute_write: 0,
            minute_filled: 0,
            hour_slots: [T::ZERO; HOURS],
            hour_write: 0,
            hour_filled: 0,
            last: T::ZERO,
            cached_min: T::ZERO,
            cached_max: T::ZERO,
        }
    }

    /// Record one sample. O(1), never fails.
    ///
    /// Overwrites the oldest minute slot once the ring is full. Every
    /// `MINUTES` calls (exactly when the write cursor wraps back to
    /// slot 0) the completed window is condensed into one hour bucket.
    pub fn add_measurement(&mut self, value: T) {
        let first_sample = self.minute_filled == 0 && self.hour_filled == 0;
        let evicted = (self.minute_filled == MINUTES).then(|| self.minute_slots[self.minute_write]);

        self.minute_slots[self.minute_write] = value;
        self.last = value;
        self.minute_write = (self.minute_write + 1) % MINUTES;
        if self.minute_filled < MINUTES {
            self.minute_filled += 1;
        }

        if first_sample {
            self.cached_min = value;
            self.cached_max = value;
        } else {
            self.track_extremes(value, evicted);
        }

        if self.minute_write == 0 {
            self.roll_over();
        }
    }

    /// Condense the just-completed minute window into one hour bucket.
    ///
    /// Only called when the cursor wrapped, so the whole minute ring is
    /// valid and its physical order does not matter for the mean.
    fn roll_over(&mut self) {
        let bucket = T::window_mean(&self.minute_slots);
        let evicted = (self.hour_filled == HOURS).then(|| self.hour_slots[self.hour_write]);

        self.hour_slots[self.hour_write] = bucket;
        self.hour_write = (self.hour_write + 1) % HOURS;
        if self.hour_filled < HOURS {
            self.hour_filled += 1;
        }

        self.track_extremes(bucket, evicted);
    }

    fn track_extremes(&mut self, inserted: T, evicted: Option<T>) {
        if let Some(old) = evicted {
            // The value leaving the window may have been the extreme;
            // only then is a rescan needed, and the rescan already sees
            // the inserted value.
            if old == self.cached_min || old == self.cached_max {
                self.recompute_extremes();
                return;
            }
        }
        if inserted < self.cached_min {
            self.cached_min = inserted;
        }
        if inserted > self.cached_max {
            self.cached_max = inserted;
        }
    }

    fn recompute_extremes(&mut self) {
        let mut entries = self.minutes().chain(self.hours());
        if let Some(first) = entries.next() {
            let mut lo = first;
            let mut hi = first;
            for v in entries {
                if v < lo {
                    lo = v;
                }
                if v > hi {
                    hi = v;
                }
            }
            self.cached_min = lo;
            self.cached_max = hi;
        }
    }

    /// Most recent raw sample. [`Sample::ZERO`] before the first one.
    pub fn last_data(&self) -> T {
        self.last
    }

    /// Minimum over all retained entries, minute and hour rings
    /// combined. [`Sample::ZERO`] while empty.
    pub fn min_value(&self) -> T {
        self.cached_min
    }

    /// Maximum over all retained entries. [`Sample::ZERO`] while empty.
    pub fn max_value(&self) -> T {
        self.cached_max
    }

    /// Number of valid minute samples (saturates at `MINUTES`).
    pub fn minute_len(&self) -> usize {
        self.minute_filled
    }

    /// Number of valid hour buckets (saturates at `HOURS`).
    pub fn hour_len(&self) -> usize {
        self.hour_filled
    }

    pub fn is_empty(&self) -> bool {
        self.minute_filled == 0
    }

    /// Valid minute samples, oldest first. The ring rotation is not
    /// visible to callers.
    pub fn minutes(&self) -> impl Iterator<Item = T> + '_ {
        let start = if self.minute_filled < MINUTES {
            0
        } else {
            self.minute_write
        };
        (0..self.minute_filled).map(move |i| self.minute_slots[(start + i) % MINUTES])
    }

    /// Valid hour buckets, oldest first.
    pub fn hours(&self) -> impl Iterator<Item = T> + '_ {
        let start = if self.hour_filled < HOURS {
            0
        } else {
            self.hour_write
        };
        (0..self.hour_filled).map(move |i| self.hour_slots[(start + i) % HOURS])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    /// Reference model: unbounded sample log, everything recomputed by
    /// brute force.
    struct Reference<T, const MINUTES: usize, const HOURS: usize> {
        samples: Vec<T>,
        buckets: Vec<T>,
    }

    impl<T: Sample, const MINUTES: usize, const HOURS: usize> Reference<T, MINUTES, HOURS> {
        fn new() -> Self {
            Self {
                samples: Vec::new(),
                buckets: Vec::new(),
            }
        }

        fn add(&mut self, value: T) {
            self.samples.push(value);
            if self.samples.len() % MINUTES == 0 {
                let window = &self.samples[self.samples.len() - MINUTES..];
                self.buckets.push(T::window_mean(window));
            }
        }

        fn minute_view(&self) -> Vec<T> {
            let n = self.samples.len().min(MINUTES);
            self.samples[self.samples.len() - n..].to_vec()
        }

        fn hour_view(&self) -> Vec<T> {
            let n = self.buckets.len().min(HOURS);
            self.buckets[self.buckets.len() - n..].to_vec()
        }

        fn extremes(&self) -> Option<(T, T)> {
            let mut all = self.minute_view();
            all.extend(self.hour_view());
            let mut it = all.into_iter();
            let first = it.next()?;
            let mut lo = first;
            let mut hi = first;
            for v in it {
                if v < lo {
                    lo = v;
                }
                if v > hi {
                    hi = v;
                }
            }
            Some((lo, hi))
        }
    }

    fn assert_matches_reference<T: Sample + core::fmt::Debug, const M: usize, const H: usize>(
        history: &ValueHistory<T, M, H>,
        reference: &Reference<T, M, H>,
    ) {
        assert_eq!(history.minutes().collect::<Vec<_>>(), reference.minute_view());
        assert_eq!(history.hours().collect::<Vec<_>>(), reference.hour_view());
        if let Some((lo, hi)) = reference.extremes() {
            assert_eq!(history.min_value(), lo);
            assert_eq!(history.max_value(), hi);
        }
    }

    /// xorshift32, deterministic and dependency-free.
    struct Rng(u32);

    impl Rng {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn empty_store_reports_zero_extremes() {
        let history = ValueHistory::<u16, 4, 3>::new();
        assert!(history.is_empty());
        assert_eq!(history.minute_len(), 0);
        assert_eq!(history.hour_len(), 0);
        assert_eq!(history.last_data(), 0);
        assert_eq!(history.min_value(), 0);
        assert_eq!(history.max_value(), 0);
        assert_eq!(history.minutes().count(), 0);
        assert_eq!(history.hours().count(), 0);
    }

    #[test]
    fn partial_fill_preserves_order() {
        let mut history = ValueHistory::<u16, 4, 3>::new();
        history.add_measurement(7);
        history.add_measurement(3);
        assert_eq!(history.minute_len(), 2);
        assert_eq!(history.minutes().collect::<Vec<_>>(), [7, 3]);
        assert_eq!(history.hour_len(), 0);
        assert_eq!(history.last_data(), 3);
        assert_eq!(history.min_value(), 3);
        assert_eq!(history.max_value(), 7);
    }

    #[test]
    fn worked_example_two_cycles() {
        let mut history = ValueHistory::<u16, 4, 3>::new();
        for v in [5, 10, 3, 8] {
            history.add_measurement(v);
        }
        assert_eq!(history.minutes().collect::<Vec<_>>(), [5, 10, 3, 8]);
        // (5 + 10 + 3 + 8) / 4 = 6 with truncating integer mean
        assert_eq!(history.hours().collect::<Vec<_>>(), [6]);
        assert_eq!(history.min_value(), 3);
        assert_eq!(history.max_value(), 10);

        for v in [100, 1, 1, 1] {
            history.add_measurement(v);
        }
        assert_eq!(history.minutes().collect::<Vec<_>>(), [100, 1, 1, 1]);
        // (100 + 1 + 1 + 1) / 4 = 25 truncated
        assert_eq!(history.hours().collect::<Vec<_>>(), [6, 25]);
        assert_eq!(history.min_value(), 1);
        assert_eq!(history.max_value(), 100);
    }

    #[test]
    fn wraparound_matches_unbounded_reference() {
        let mut history = ValueHistory::<u16, 4, 3>::new();
        let mut reference = Reference::<u16, 4, 3>::new();
        for k in 0..100u16 {
            let v = (k * 7) % 31;
            history.add_measurement(v);
            reference.add(v);
            assert_matches_reference(&history, &reference);
        }
        // Ring saturated: view length pinned at capacity forever after.
        assert_eq!(history.minute_len(), 4);
        assert_eq!(history.hour_len(), 3);
    }

    #[test]
    fn rollover_cadence_is_locked_to_minute_writes() {
        let mut history = ValueHistory::<u16, 5, 8>::new();
        for k in 1..=40usize {
            history.add_measurement(k as u16);
            assert_eq!(history.hour_len(), (k / 5).min(8), "after {k} writes");
        }
    }

    #[test]
    fn no_rollover_before_first_full_cycle() {
        let mut history = ValueHistory::<u16, 60, 24>::new();
        for v in 0..59u16 {
            history.add_measurement(v);
            assert_eq!(history.hour_len(), 0);
        }
        history.add_measurement(59);
        assert_eq!(history.hour_len(), 1);
    }

    #[test]
    fn evicting_the_maximum_rescans_correctly() {
        let mut history = ValueHistory::<u16, 3, 2>::new();
        history.add_measurement(50);
        history.add_measurement(2);
        history.add_measurement(1); // rollover: bucket = 17
        assert_eq!(history.max_value(), 50);
        // Overwrites the 50; max must fall back to the surviving bucket.
        history.add_measurement(3);
        assert_eq!(history.minutes().collect::<Vec<_>>(), [2, 1, 3]);
        assert_eq!(history.hours().collect::<Vec<_>>(), [17]);
        assert_eq!(history.max_value(), 17);
        assert_eq!(history.min_value(), 1);
    }

    #[test]
    fn extremes_match_brute_force_over_random_sequences() {
        let mut rng = Rng(0x1234_5678);
        for _ in 0..20 {
            let mut history = ValueHistory::<u16, 8, 4>::new();
            let mut reference = Reference::<u16, 8, 4>::new();
            for _ in 0..200 {
                // Small value range so extremes collide and get evicted often.
                let v = (rng.next() % 50) as u16;
                history.add_measurement(v);
                reference.add(v);
                assert_matches_reference(&history, &reference);
            }
        }
    }

    #[test]
    fn float_history_keeps_exact_means() {
        let mut history = ValueHistory::<f32, 4, 2>::new();
        for v in [1.0, 2.0, 3.0, 4.5] {
            history.add_measurement(v);
        }
        assert_eq!(history.hours().collect::<Vec<_>>(), [2.625]);
        assert_eq!(history.min_value(), 1.0);
        assert_eq!(history.max_value(), 4.5);
        assert_eq!(history.last_data(), 4.5);
    }

    #[test]
    fn reads_are_idempotent() {
        let mut history = ValueHistory::<u16, 4, 3>::new();
        for v in [9, 4, 11, 2, 6] {
            history.add_measurement(v);
        }
        let snapshot = (
            history.minutes().collect::<Vec<_>>(),
            history.hours().collect::<Vec<_>>(),
            history.min_value(),
            history.max_value(),
            history.last_data(),
        );
        let again = (
            history.minutes().collect::<Vec<_>>(),
            history.hours().collect::<Vec<_>>(),
            history.min_value(),
            history.max_value(),
            history.last_data(),
        );
        assert_eq!(snapshot, again);
    }

    #[test]
    fn footprint_is_fixed() {
        // All storage is inline; the type's size is the whole story and
        // does not depend on how much has been written.
        let size = core::mem::size_of::<ValueHistory<u16, 60, 24>>();
        let mut history = ValueHistory::<u16, 60, 24>::new();
        for v in 0..10_000u32 {
            history.add_measurement((v % 500) as u16);
        }
        assert_eq!(core::mem::size_of_val(&history), size);
    }
}
