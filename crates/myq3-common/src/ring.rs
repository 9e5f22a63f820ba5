// ring.rs — fixed-capacity sequence history
//
// Every history the client exposes to the presentation module (snapshots,
// parsed entities, user commands, reliable server commands) is a trailing
// window over a stream of strictly increasing sequence numbers. New records
// overwrite the oldest slot in place; a lookup tells the caller whether the
// record it asked for is still there.

use crate::common::ComError;

/// Outcome of looking up a sequence number that has been produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RingLookup<T> {
    /// A copy of the stored record.
    Found(T),
    /// The slot has been overwritten by newer history.
    Evicted,
    /// The sequence is inside the window but no record was ever stored for
    /// it (dropped packet, invalidated slot, or nothing written yet).
    NotYetProduced,
}

impl<T> RingLookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            RingLookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RingLookup::Found(_))
    }

    pub fn is_evicted(&self) -> bool {
        matches!(self, RingLookup::Evicted)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RingLookup<U> {
        match self {
            RingLookup::Found(v) => RingLookup::Found(f(v)),
            RingLookup::Evicted => RingLookup::Evicted,
            RingLookup::NotYetProduced => RingLookup::NotYetProduced,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    sequence: i32,
    record: T,
}

/// A bounded history indexed by sequence number.
///
/// Capacity is a power of two. The ring remembers which sequence each slot
/// holds, so a stale slot is never returned for a newer request.
#[derive(Debug, Clone)]
pub struct HistoryRing<T> {
    slots: Vec<Option<Slot<T>>>,
    mask: i32,
    latest: i32,
}

impl<T: Clone> HistoryRing<T> {
    /// Create an empty ring. `latest` starts at 0, so sequence 0 may be
    /// queried before anything was stored (it reports `NotYetProduced`).
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity <= i32::MAX as usize,
            "HistoryRing capacity {} is not a power of two",
            capacity
        );
        Self {
            slots: vec![None; capacity],
            mask: capacity as i32 - 1,
            latest: 0,
        }
    }

    #[inline]
    fn index(&self, sequence: i32) -> usize {
        (sequence & self.mask) as usize
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Highest sequence number stored so far.
    pub fn latest(&self) -> i32 {
        self.latest
    }

    /// Store `record` under `sequence`, overwriting whatever the slot held.
    pub fn put(&mut self, sequence: i32, record: T) {
        let idx = self.index(sequence);
        self.slots[idx] = Some(Slot { sequence, record });
        if sequence > self.latest {
            self.latest = sequence;
        }
    }

    /// Raise `latest` without storing a record, leaving a hole for every
    /// skipped sequence.
    pub fn advance_to(&mut self, sequence: i32) {
        if sequence > self.latest {
            self.latest = sequence;
        }
    }

    /// Forget the record stored for `sequence`, if the slot still holds it.
    pub fn invalidate(&mut self, sequence: i32) {
        let idx = self.index(sequence);
        if self.slots[idx].as_ref().is_some_and(|s| s.sequence == sequence) {
            self.slots[idx] = None;
        }
    }

    /// Drop every stored record. `latest` is kept so sequence numbering
    /// continues where it left off.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Drop every stored record and restart numbering at 0.
    pub fn reset(&mut self) {
        self.clear();
        self.latest = 0;
    }

    /// True if `sequence` has been produced and not yet pushed out of the window.
    pub fn is_retained(&self, sequence: i32) -> bool {
        sequence <= self.latest && (self.latest as i64 - sequence as i64) < self.slots.len() as i64
    }

    /// Look up `sequence`.
    ///
    /// Asking for a sequence that has not been produced yet means the caller
    /// and the producer disagree about the stream, which is an `ERR_DROP`.
    pub fn get(&self, sequence: i32) -> Result<RingLookup<T>, ComError> {
        if sequence > self.latest {
            return Err(ComError::drop(format!(
                "HistoryRing::get: {} > {}",
                sequence, self.latest
            )));
        }

        if !self.is_retained(sequence) {
            return Ok(RingLookup::Evicted);
        }

        match &self.slots[self.index(sequence)] {
            Some(slot) if slot.sequence == sequence => Ok(RingLookup::Found(slot.record.clone())),
            _ => Ok(RingLookup::NotYetProduced),
        }
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_found_within_window() {
        let mut ring = HistoryRing::new(4);
        for seq in 1..=4 {
            ring.put(seq, seq * 10);
        }
        assert_eq!(ring.latest(), 4);
        assert_eq!(ring.get(1).unwrap(), RingLookup::Found(10));
        assert_eq!(ring.get(4).unwrap(), RingLookup::Found(40));
    }

    #[test]
    fn test_evicted_after_wrap() {
        let mut ring = HistoryRing::new(4);
        for seq in 1..=9 {
            ring.put(seq, seq);
        }
        // latest - seq >= capacity
        assert_eq!(ring.get(5).unwrap(), RingLookup::Evicted);
        assert_eq!(ring.get(1).unwrap(), RingLookup::Evicted);
        assert_eq!(ring.get(6).unwrap(), RingLookup::Found(6));
    }

    #[test]
    fn test_request_past_latest_is_contract_violation() {
        let mut ring = HistoryRing::new(8);
        ring.put(1, 'a');
        ring.put(2, 'b');
        let err = ring.get(3).unwrap_err();
        assert!(matches!(err, ComError::Drop(_)));
        // distinct from an in-window hole
        ring.advance_to(5);
        assert_eq!(ring.get(4).unwrap(), RingLookup::NotYetProduced);
        assert!(ring.get(6).is_err());
    }

    #[test]
    fn test_empty_ring() {
        let ring: HistoryRing<u8> = HistoryRing::new(16);
        assert_eq!(ring.get(0).unwrap(), RingLookup::NotYetProduced);
        assert!(ring.get(1).is_err());
        assert_eq!(ring.get(-16).unwrap(), RingLookup::Evicted);
    }

    #[test]
    fn test_stale_slot_not_returned() {
        let mut ring = HistoryRing::new(4);
        ring.put(1, "one");
        // jump: slot for 5 aliases slot for 1, but 2..4 are holes
        ring.put(5, "five");
        assert_eq!(ring.get(1).unwrap(), RingLookup::Evicted);
        assert_eq!(ring.get(3).unwrap(), RingLookup::NotYetProduced);
        assert_eq!(ring.get(5).unwrap(), RingLookup::Found("five"));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut ring = HistoryRing::new(8);
        ring.put(1, 1u32);
        ring.put(2, 2u32);
        ring.invalidate(1);
        ring.invalidate(10); // slot 2 holds sequence 2, untouched
        assert_eq!(ring.get(1).unwrap(), RingLookup::NotYetProduced);
        assert_eq!(ring.get(2).unwrap(), RingLookup::Found(2));
        ring.clear();
        assert_eq!(ring.get(2).unwrap(), RingLookup::NotYetProduced);
        assert_eq!(ring.latest(), 2);
        ring.reset();
        assert_eq!(ring.latest(), 0);
    }

    #[test]
    fn test_lookup_helpers() {
        let l: RingLookup<i32> = RingLookup::Found(3);
        assert!(l.is_found());
        assert_eq!(l.clone().map(|v| v * 2), RingLookup::Found(6));
        assert_eq!(l.found(), Some(3));
        assert!(RingLookup::<i32>::Evicted.is_evicted());
        assert_eq!(RingLookup::<i32>::NotYetProduced.found(), None);
    }

    #[test]
    #[should_panic]
    fn test_capacity_must_be_power_of_two() {
        let _ring: HistoryRing<u8> = HistoryRing::new(12);
    }

    #[test]
    fn test_found_iff_within_capacity_random() {
        let mut rng = StdRng::seed_from_u64(0x51a9);
        for _ in 0..50 {
            let capacity = 1usize << rng.gen_range(0..7);
            let mut ring = HistoryRing::new(capacity);
            let count = rng.gen_range(1..300);
            for seq in 1..=count {
                ring.put(seq, seq);
            }
            for seq in 1..=count {
                let lookup = ring.get(seq).unwrap();
                if (count - seq) < capacity as i32 {
                    assert_eq!(lookup, RingLookup::Found(seq));
                } else {
                    assert_eq!(lookup, RingLookup::Evicted);
                }
            }
            assert!(ring.get(count + 1).is_err());
        }
    }
}
