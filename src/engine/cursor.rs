/// Monotonic cursor over an ordered, borrowed event slice.
///
/// Generic over the key so the same cursor walks tick-keyed and
/// time-keyed lists. The cursor is an index only; it never allocates
/// after construction.
#[derive(Debug)]
pub struct EventCursor<'a, E, K> {
    events: &'a [E],
    key_fn: fn(&E) -> K,
    /// Index of the current event; `None` while before all events.
    index: Option<usize>,
}

impl<'a, E, K: PartialOrd + Copy> EventCursor<'a, E, K> {
    /// `events` must be sorted by `key_fn`.
    pub fn new(events: &'a [E], key_fn: fn(&E) -> K) -> Self {
        Self {
            events,
            key_fn,
            index: None,
        }
    }

    /// The event under the cursor, or `None` before the first event.
    pub fn current(&self) -> Option<&'a E> {
        self.index.map(|i| &self.events[i])
    }

    fn next_index(&self) -> usize {
        self.index.map_or(0, |i| i + 1)
    }

    /// Walk forward over every event keyed at or before `key`. Returns
    /// true iff the position changed.
    pub fn advance_to(&mut self, key: K) -> bool {
        let mut moved = false;
        while let Some(event) = self.events.get(self.next_index()) {
            if (self.key_fn)(event) > key {
                break;
            }
            self.index = Some(self.next_index());
            moved = true;
        }
        moved
    }

    /// Advance by at most one event. Returns the newly selected event
    /// when the cursor moved, `None` when the next event is still ahead
    /// of `key` (the current selection is unchanged).
    pub fn advance_one_if_ready(&mut self, key: K) -> Option<&'a E> {
        let next = self.next_index();
        let event = self.events.get(next)?;
        if (self.key_fn)(event) > key {
            return None;
        }
        self.index = Some(next);
        Some(event)
    }

    /// Place the cursor before all events.
    pub fn reset_to_start(&mut self) {
        self.index = None;
    }

    /// Lower bound: select the last event keyed at or before `key`, or
    /// before-start when every event is ahead of it.
    pub fn reset_to(&mut self, key: K) {
        let count = self.events.partition_point(|e| (self.key_fn)(e) <= key);
        self.index = count.checked_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ev {
        tick: u32,
    }

    fn events() -> Vec<Ev> {
        [0u32, 100, 200, 200, 400]
            .iter()
            .map(|&tick| Ev { tick })
            .collect()
    }

    fn key(e: &Ev) -> u32 {
        e.tick
    }

    #[test]
    fn starts_before_all_events() {
        let list = events();
        let cursor = EventCursor::new(&list, key);
        assert!(cursor.current().is_none());
    }

    #[test]
    fn advance_to_walks_past_equal_keys() {
        let list = events();
        let mut cursor = EventCursor::new(&list, key);
        assert!(cursor.advance_to(200));
        assert_eq!(cursor.current().map(|e| e.tick), Some(200));
        // Both tick-200 events were consumed.
        assert!(!cursor.advance_to(250));
        assert!(cursor.advance_to(400));
        assert_eq!(cursor.current().map(|e| e.tick), Some(400));
    }

    #[test]
    fn advance_to_reports_no_movement() {
        let list = events();
        let mut cursor = EventCursor::new(&list, key);
        cursor.advance_to(100);
        assert!(!cursor.advance_to(150));
        assert_eq!(cursor.current().map(|e| e.tick), Some(100));
    }

    #[test]
    fn advance_one_steps_singly() {
        let list = events();
        let mut cursor = EventCursor::new(&list, key);
        assert_eq!(cursor.advance_one_if_ready(250).map(|e| e.tick), Some(0));
        assert_eq!(cursor.advance_one_if_ready(250).map(|e| e.tick), Some(100));
        assert_eq!(cursor.advance_one_if_ready(250).map(|e| e.tick), Some(200));
        assert_eq!(cursor.advance_one_if_ready(250).map(|e| e.tick), Some(200));
        assert!(cursor.advance_one_if_ready(250).is_none());
        assert_eq!(cursor.current().map(|e| e.tick), Some(200));
    }

    #[test]
    fn reset_to_is_lower_bound() {
        let list = events();
        let mut cursor = EventCursor::new(&list, key);
        cursor.reset_to(250);
        assert_eq!(cursor.current().map(|e| e.tick), Some(200));
        cursor.reset_to(400);
        assert_eq!(cursor.current().map(|e| e.tick), Some(400));
        cursor.reset_to(0);
        assert_eq!(cursor.current().map(|e| e.tick), Some(0));
    }

    #[test]
    fn reset_to_before_first_event() {
        let list = vec![Ev { tick: 100 }];
        let mut cursor = EventCursor::new(&list, key);
        cursor.advance_to(100);
        cursor.reset_to(50);
        assert!(cursor.current().is_none());
    }

    #[test]
    fn reset_to_start_rewinds() {
        let list = events();
        let mut cursor = EventCursor::new(&list, key);
        cursor.advance_to(400);
        cursor.reset_to_start();
        assert!(cursor.current().is_none());
    }

    #[test]
    fn reset_then_stepwise_advance_matches_reset_alone() {
        // resetTo(k) == resetTo(k) followed by monotone advance_to calls
        // up to k.
        let list = events();
        let mut a = EventCursor::new(&list, key);
        let mut b = EventCursor::new(&list, key);
        a.reset_to(300);

        b.reset_to(300);
        b.advance_to(100);
        b.advance_to(250);
        b.advance_to(300);
        assert_eq!(a.current(), b.current());
    }

    #[test]
    fn works_with_float_keys() {
        let list = [0.5f64, 1.0, 1.5];
        let mut cursor = EventCursor::new(&list, |t| *t);
        assert!(cursor.advance_to(1.2));
        assert_eq!(cursor.current(), Some(&1.0));
    }
}
