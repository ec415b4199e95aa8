/// Run state: the one-way termination flag and the score clock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GameState {
    terminated: bool,
    elapsed_ms: f64,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns `true` only on the transition.
    pub fn terminate(&mut self) -> bool {
        let first = !self.terminated;
        self.terminated = true;
        first
    }

    /// Adds played time; ignored once terminated.
    pub fn accumulate(&mut self, elapsed_ms: f64) {
        if !self.terminated && elapsed_ms > 0.0 {
            self.elapsed_ms += elapsed_ms;
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Score as `seconds.millis`, e.g. `12.045`.
    pub fn score_text(&self) -> String {
        let total = self.elapsed_ms.max(0.0) as u64;
        format!("{}.{:03}", total / 1000, total % 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_formatting() {
        let mut state = GameState::new();
        assert_eq!(state.score_text(), "0.000");
        state.accumulate(12_045.7);
        assert_eq!(state.score_text(), "12.045");
        state.accumulate(-50.0);
        assert_eq!(state.score_text(), "12.045");
    }

    #[test]
    fn test_termination_is_one_way() {
        let mut state = GameState::new();
        state.accumulate(1_000.0);
        assert!(state.terminate());
        assert!(!state.terminate());
        assert!(state.is_terminated());

        state.accumulate(500.0);
        assert_eq!(state.elapsed_ms(), 1_000.0);
    }
}
