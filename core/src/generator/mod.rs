use crate::*;
use serde::{Deserialize, Serialize};

pub use random::*;
pub(crate) use start_rule::*;

mod random;
mod start_rule;

pub trait MinefieldGenerator {
    fn generate(self, config: &GameConfig) -> Result<MineLayout>;
}

/// First-click fairness policy, applied right before the first cell is opened.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartRule {
    /// Keep the generated layout, the first click may detonate.
    AsIs,
    /// Move a mine away from the first clicked cell.
    NoBomb,
    /// Clear the first clicked cell and all its neighbors, so it opens as a zero.
    EmptyCell,
}

impl Default for StartRule {
    fn default() -> Self {
        Self::EmptyCell
    }
}
