use serde::{Deserialize, Serialize};

/// Canonical player-visible state stored by the gameplay engine.
///
/// Flag, mark and open are mutually exclusive by construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineCell {
    Hidden,
    Flagged,
    /// Player is unsure, only reachable when marks are enabled.
    Marked,
    Revealed,
}

impl EngineCell {
    pub const fn is_unrevealed(self) -> bool {
        !self.is_revealed()
    }

    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed)
    }

    pub const fn is_flagged(self) -> bool {
        matches!(self, Self::Flagged)
    }

    pub const fn is_marked(self) -> bool {
        matches!(self, Self::Marked)
    }

    /// Next label in the closed-cell cycle, `None` for revealed cells.
    pub const fn next_label(self, marks: bool) -> Option<Self> {
        match (self, marks) {
            (Self::Hidden, _) => Some(Self::Flagged),
            (Self::Flagged, true) => Some(Self::Marked),
            (Self::Flagged, false) => Some(Self::Hidden),
            (Self::Marked, _) => Some(Self::Hidden),
            (Self::Revealed, _) => None,
        }
    }
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::Hidden
    }
}
