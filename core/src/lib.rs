#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::ops::{BitOr, Index};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use engine::*;
pub use error::*;
pub use export::*;
pub use generator::*;
pub use tile::*;
pub use types::*;

mod engine;
mod error;
mod export;
mod generator;
mod tile;
mod types;

/// Player-facing rules that do not change the board geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub start_rule: StartRule,
    /// Enables the "uncertain" question mark as a third label state.
    pub marks: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            start_rule: StartRule::EmptyCell,
            marks: true,
        }
    }
}

/// Classic board sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Beginner,
    Intermediate,
    Expert,
}

impl Preset {
    pub const fn size(self) -> Coord2 {
        match self {
            Self::Beginner => (9, 9),
            Self::Intermediate => (16, 16),
            Self::Expert => (16, 30),
        }
    }

    pub const fn mines(self) -> CellCount {
        match self {
            Self::Beginner => 10,
            Self::Intermediate => 40,
            Self::Expert => 99,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// `(rows, cols)`
    pub size: Coord2,
    pub mines: CellCount,
    #[serde(default)]
    pub rules: Rules,
    /// Fixed seed for reproducible layouts, a random one is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord2, mines: CellCount) -> Self {
        Self {
            size,
            mines,
            rules: Rules {
                start_rule: StartRule::EmptyCell,
                marks: true,
            },
            seed: None,
        }
    }

    pub fn new(size: Coord2, mines: CellCount) -> Result<Self> {
        let config = Self::new_unchecked(size, mines);
        config.validate()?;
        Ok(config)
    }

    pub const fn preset(preset: Preset) -> Self {
        Self::new_unchecked(preset.size(), preset.mines())
    }

    /// Parses and validates a JSON config, `rules` and `seed` may be omitted.
    pub fn from_json(input: &str) -> core::result::Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        if let Err(err) = config.validate() {
            log::warn!("Rejected game config {:?}: {}", config, err);
            return Err(err.into());
        }
        Ok(config)
    }

    pub const fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    pub const fn with_start_rule(mut self, start_rule: StartRule) -> Self {
        self.rules.start_rule = start_rule;
        self
    }

    pub const fn with_marks(mut self, marks: bool) -> Self {
        self.rules.marks = marks;
        self
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }

    pub fn validate(&self) -> Result<()> {
        validate_size(self.size)?;
        if self.mines == 0 {
            return Err(GameError::NoMines);
        }
        if self.mines >= self.total_cells() {
            return Err(GameError::TooManyMines);
        }
        Ok(())
    }
}

pub(crate) fn validate_size((rows, cols): Coord2) -> Result<()> {
    if rows < 2 || cols < 2 {
        Err(GameError::BoardTooSmall)
    } else {
        Ok(())
    }
}

/// Mine placement plus the derived adjacency layer, always kept in lockstep.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MineLayout {
    mine_mask: Array2<bool>,
    adjacent: Array2<u8>,
    mine_count: CellCount,
}

impl MineLayout {
    /// Wraps a mine mask, rejecting shapes that do not fit in `Coord2`.
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Result<Self> {
        let (rows, cols) = mine_mask.dim();
        if Coord::try_from(rows).is_err() || Coord::try_from(cols).is_err() {
            return Err(GameError::InvalidBoardShape);
        }
        let mine_count = mine_mask.iter().filter(|&&is_mine| is_mine).count();
        let mine_count = CellCount::try_from(mine_count).map_err(|_| GameError::InvalidBoardShape)?;
        let adjacent = Array2::zeros(mine_mask.dim());
        let mut layout = Self {
            mine_mask,
            adjacent,
            mine_count,
        };
        layout.recalculate_adjacent();
        Ok(layout)
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= size.0 || coords.1 >= size.1 {
                return Err(GameError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Self::from_mine_mask(mine_mask)
    }

    /// Checks the layout can host a game: big enough and with a safe cell.
    pub fn validate(&self) -> Result<()> {
        validate_size(self.size())?;
        if self.mine_count >= self.total_cells() {
            return Err(GameError::TooManyMines);
        }
        Ok(())
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let size = self.size();
        if coords.0 < size.0 && coords.1 < size.1 {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.mine_mask)
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        let (rows, cols) = self.size();
        mult(rows, cols)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        self.adjacent[coords.to_nd_index()]
    }

    pub fn mine_mask(&self) -> &Array2<bool> {
        &self.mine_mask
    }

    pub fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.mine_mask.iter_neighbors(coords)
    }

    /// Unmined positions, skipping anything in `excluded`.
    pub(crate) fn safe_cells_except(&self, excluded: &[Coord2]) -> Vec<Coord2> {
        let (rows, cols) = self.size();
        (0..rows)
            .flat_map(|row| (0..cols).map(move |col| (row, col)))
            .filter(|&pos| !self[pos] && !excluded.contains(&pos))
            .collect()
    }

    /// Moves a mine and recomputes every adjacency count.
    pub(crate) fn relocate_mine(&mut self, from: Coord2, to: Coord2) {
        debug_assert!(self[from] && !self[to]);
        log::trace!("Relocating mine {:?} -> {:?}", from, to);
        self.mine_mask[from.to_nd_index()] = false;
        self.mine_mask[to.to_nd_index()] = true;
        self.recalculate_adjacent();
    }

    fn recalculate_adjacent(&mut self) {
        let (rows, cols) = self.size();
        for row in 0..rows {
            for col in 0..cols {
                let count = self
                    .mine_mask
                    .iter_neighbor_cells((row, col))
                    .filter(|&is_mine| is_mine)
                    .count();
                self.adjacent[(row, col).to_nd_index()] = count as u8;
            }
        }
    }
}

impl Index<Coord2> for MineLayout {
    type Output = bool;

    fn index(&self, (row, col): Coord2) -> &Self::Output {
        &self.mine_mask[(row as usize, col as usize)]
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LabelOutcome {
    NoChange,
    Changed,
}

impl LabelOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OpenOutcome {
    NoChange,
    /// Only labels changed, a closed cell was chorded.
    Labeled,
    Revealed,
    HitMine,
    Won,
}

impl OpenOutcome {
    pub const fn has_update(self) -> bool {
        use OpenOutcome::*;
        match self {
            NoChange => false,
            Labeled => true,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }
}

impl From<LabelOutcome> for OpenOutcome {
    fn from(outcome: LabelOutcome) -> Self {
        match outcome {
            LabelOutcome::NoChange => Self::NoChange,
            LabelOutcome::Changed => Self::Labeled,
        }
    }
}

impl BitOr for OpenOutcome {
    type Output = OpenOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        use OpenOutcome::*;
        match (self, rhs) {
            (HitMine, _) => HitMine,
            (_, HitMine) => HitMine,
            (Won, _) => Won,
            (_, Won) => Won,
            (Revealed, _) => Revealed,
            (_, Revealed) => Revealed,
            (Labeled, _) => Labeled,
            (_, Labeled) => Labeled,
            (NoChange, NoChange) => NoChange,
        }
    }
}
