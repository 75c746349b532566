//! Builds the in-progress assistant message from streamed fragments

use crate::error::{Error, Result};

/// Concatenates fragments in arrival order until finalized
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    buffer: String,
    finalized: bool,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return the cumulative text
    pub fn apply_delta(&mut self, fragment: &str) -> Result<&str> {
        if self.finalized {
            return Err(Error::AccumulatorFinalized);
        }
        self.buffer.push_str(fragment);
        Ok(&self.buffer)
    }

    /// Seal the message and return the completed text
    pub fn finalize(&mut self) -> Result<String> {
        if self.finalized {
            return Err(Error::AccumulatorFinalized);
        }
        self.finalized = true;
        Ok(self.buffer.clone())
    }

    /// Current cumulative text
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// True until the first non-empty fragment lands
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_in_arrival_order() {
        let mut acc = DeltaAccumulator::new();
        assert_eq!(acc.apply_delta("Bon").unwrap(), "Bon");
        assert_eq!(acc.apply_delta("jour").unwrap(), "Bonjour");
        assert_eq!(acc.apply_delta("!").unwrap(), "Bonjour!");
        assert_eq!(acc.finalize().unwrap(), "Bonjour!");
    }

    #[test]
    fn test_finalized_equals_concatenation() {
        let fragments = ["✅ ", "Nouvelle ", "user story", " créée", ": ", "X", "", "\n"];
        let mut acc = DeltaAccumulator::new();
        for f in fragments {
            acc.apply_delta(f).unwrap();
        }
        assert_eq!(acc.finalize().unwrap(), fragments.concat());
    }

    #[test]
    fn test_delta_after_finalize_is_reported() {
        let mut acc = DeltaAccumulator::new();
        acc.apply_delta("done").unwrap();
        acc.finalize().unwrap();

        assert!(matches!(acc.apply_delta(" more"), Err(Error::AccumulatorFinalized)));
        assert_eq!(acc.text(), "done");
        assert!(acc.is_finalized());
    }

    #[test]
    fn test_double_finalize_is_reported() {
        let mut acc = DeltaAccumulator::new();
        acc.finalize().unwrap();
        assert!(matches!(acc.finalize(), Err(Error::AccumulatorFinalized)));
    }

    #[test]
    fn test_finalize_empty() {
        let mut acc = DeltaAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.finalize().unwrap(), "");
    }
}
