use std::collections::BTreeMap;

/// Host-side bookkeeping for one-shot timers that are still armed.
///
/// Each timer gets a key when armed; the host hands the key to the timer's
/// callback and calls [`TimerSet::complete`] when it fires, which releases the
/// timer resource.
#[derive(Debug)]
pub struct TimerSet<T> {
    armed: BTreeMap<u64, T>,
    next_key: u64,
}

impl<T> Default for TimerSet<T> {
    fn default() -> Self {
        Self {
            armed: BTreeMap::new(),
            next_key: 0,
        }
    }
}

impl<T> TimerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer built by `make`, which receives the key the callback must
    /// report back.
    pub fn insert_with(&mut self, make: impl FnOnce(u64) -> T) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.armed.insert(key, make(key));
        key
    }

    /// Takes a fired timer out of the set. `None` if it was already released.
    pub fn complete(&mut self, key: u64) -> Option<T> {
        self.armed.remove(&key)
    }

    /// Releases every armed timer.
    pub fn drain(&mut self) -> impl Iterator<Item = T> {
        std::mem::take(&mut self.armed).into_values()
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::TimerSet;

    #[test]
    fn fired_timers_are_released() {
        let mut timers = TimerSet::new();
        let first = timers.insert_with(|key| format!("reveal-{key}"));
        let second = timers.insert_with(|key| format!("dismiss-{key}"));
        assert_ne!(first, second);
        assert_eq!(timers.len(), 2);

        assert_eq!(timers.complete(first).as_deref(), Some("reveal-0"));
        assert_eq!(timers.complete(first), None);
        assert_eq!(timers.len(), 1);

        let rest: Vec<_> = timers.drain().collect();
        assert_eq!(rest, vec!["dismiss-1".to_string()]);
        assert!(timers.is_empty());
    }

    #[test]
    fn many_cycles_do_not_accumulate() {
        let mut timers = TimerSet::new();
        for _ in 0..1_000 {
            let reveal = timers.insert_with(|_| ());
            let dismiss = timers.insert_with(|_| ());
            timers.complete(reveal);
            timers.complete(dismiss);
        }
        assert!(timers.is_empty());
    }
}
