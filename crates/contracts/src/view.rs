//! Read-only window onto the ledger handed to contracts during validation.

/// What a contract may observe about the chain it is validating for.
pub trait LedgerView {
    /// Number of blocks currently in the chain.
    fn height(&self) -> u64;
}

/// A fixed snapshot, handy for exercising contracts outside an engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticView {
    pub height: u64,
}

impl StaticView {
    pub fn at_height(height: u64) -> Self {
        Self { height }
    }
}

impl LedgerView for StaticView {
    fn height(&self) -> u64 {
        self.height
    }
}
