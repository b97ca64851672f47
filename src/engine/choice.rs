/// Source of uniform random picks.
///
/// Every random decision in the engine and in the order feed goes through
/// this trait so tests can script the exact sequence of picks.
pub trait Chooser {
    /// Returns an index in `0..len`. Never called with `len == 0`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Picks one element, consulting the chooser only when there is a real choice.
pub fn choose<'a, T, C>(chooser: &mut C, items: &'a [T]) -> Option<&'a T>
where
    C: Chooser + ?Sized,
{
    match items.len() {
        0 => None,
        1 => items.first(),
        len => items.get(chooser.pick(len).min(len - 1)),
    }
}

/// Replays a fixed script of picks, cycling when exhausted. Each scripted
/// value is reduced modulo the requested length.
#[derive(Debug, Clone)]
pub struct ScriptedChooser {
    script: Vec<usize>,
    cursor: usize,
}

impl ScriptedChooser {
    pub fn new(script: impl Into<Vec<usize>>) -> Self {
        Self {
            script: script.into(),
            cursor: 0,
        }
    }

    /// Number of picks served so far.
    pub const fn consumed(&self) -> usize {
        self.cursor
    }
}

impl Chooser for ScriptedChooser {
    fn pick(&mut self, len: usize) -> usize {
        if self.script.is_empty() {
            return 0;
        }
        let raw = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        raw % len
    }
}

/// Adapter for any `rand` generator.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct RngChooser<R>(pub R);

#[cfg(not(target_arch = "wasm32"))]
impl RngChooser<rand::rngs::StdRng> {
    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<R: rand::Rng> Chooser for RngChooser<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::{Chooser, RngChooser, ScriptedChooser, choose};

    #[test]
    fn scripted_chooser_cycles_and_wraps() {
        let mut chooser = ScriptedChooser::new([1, 5]);
        assert_eq!(chooser.pick(2), 1);
        assert_eq!(chooser.pick(2), 1);
        assert_eq!(chooser.pick(3), 1);
        assert_eq!(chooser.consumed(), 3);
    }

    #[test]
    fn single_candidate_skips_the_chooser() {
        let mut chooser = ScriptedChooser::new([1]);
        assert_eq!(choose(&mut chooser, &["only"]), Some(&"only"));
        assert_eq!(chooser.consumed(), 0);
        assert_eq!(choose::<&str, _>(&mut chooser, &[]), None);
        assert_eq!(choose(&mut chooser, &["a", "b"]), Some(&"b"));
        assert_eq!(chooser.consumed(), 1);
    }

    #[test]
    fn seeded_chooser_is_reproducible() {
        let mut first = RngChooser::seeded(7);
        let mut second = RngChooser::seeded(7);
        let a: Vec<usize> = (0..16).map(|_| first.pick(10)).collect();
        let b: Vec<usize> = (0..16).map(|_| second.pick(10)).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|&i| i < 10));
    }
}
