use alloc::collections::BTreeSet;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// What a renderer should draw for one cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellCode {
    /// Opened cell with its adjacent mine count.
    Opened(u8),
    Closed,
    Flagged,
    Marked,
    /// Marked cell held under an open-press.
    MarkedPressed,
    /// Unflagged mine disclosed after a loss.
    Mined,
    /// Flag on a safe cell disclosed after a loss.
    IncorrectFlag,
    Detonated,
    /// Closed cell held under an open-press.
    Pressed,
}

impl CellCode {
    /// Index into the sprite table: `0..=8` counts, then closed, flagged, marked, marked-pressed,
    /// mined, incorrect flag, detonated and pressed.
    pub const fn code(self) -> u8 {
        match self {
            Self::Opened(count) => count,
            Self::Closed => 9,
            Self::Flagged => 10,
            Self::Marked => 11,
            Self::MarkedPressed => 12,
            Self::Mined => 13,
            Self::IncorrectFlag => 14,
            Self::Detonated => 15,
            Self::Pressed => 16,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0..=8 => Self::Opened(code),
            9 => Self::Closed,
            10 => Self::Flagged,
            11 => Self::Marked,
            12 => Self::MarkedPressed,
            13 => Self::Mined,
            14 => Self::IncorrectFlag,
            15 => Self::Detonated,
            16 => Self::Pressed,
            _ => return None,
        })
    }
}

/// Gesture held down on a cell, before release.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressKind {
    Open,
    Label,
}

impl PlayEngine {
    /// Render code of one cell, disclosing mines and wrong flags once the game is lost.
    pub fn cell_code(&self, coords: Coord2) -> CellCode {
        use EngineCell::*;

        let cell = self.cell_at(coords);
        if let Revealed = cell {
            return CellCode::Opened(self.mine_layout().adjacent_mine_count(coords));
        }

        if !matches!(self.state(), SessionState::Lost) {
            return match cell {
                Flagged => CellCode::Flagged,
                Marked => CellCode::Marked,
                _ => CellCode::Closed,
            };
        }

        let mined = self.has_mine_at(coords);
        match (cell, mined) {
            _ if self.detonator() == Some(coords) => CellCode::Detonated,
            (Flagged, true) => CellCode::Flagged,
            (_, true) => CellCode::Mined,
            (Flagged, false) => CellCode::IncorrectFlag,
            (Marked, false) => CellCode::Marked,
            _ => CellCode::Closed,
        }
    }

    pub fn export_grid(&self) -> Array2<CellCode> {
        let (rows, cols) = self.size();
        Array2::from_shape_fn((usize::from(rows), usize::from(cols)), |(row, col)| {
            self.cell_code((row as Coord, col as Coord))
        })
    }

    /// Export with the cells under a held press drawn as pressed.
    pub fn export_grid_pressed(&self, coords: Coord2, kind: PressKind) -> Result<Array2<CellCode>> {
        let pressed = self.preview_press(coords, kind)?;
        let mut grid = self.export_grid();
        for pos in pressed {
            let code = &mut grid[pos.to_nd_index()];
            *code = match *code {
                CellCode::Marked => CellCode::MarkedPressed,
                CellCode::Closed => CellCode::Pressed,
                other => other,
            };
        }
        Ok(grid)
    }

    /// Cells that would be affected if the press at `coords` was released now.
    pub fn preview_press(&self, coords: Coord2, kind: PressKind) -> Result<BTreeSet<Coord2>> {
        let coords = self.mine_layout().validate_coords(coords)?;

        Ok(match (kind, self.cell_at(coords)) {
            (PressKind::Label, _) => BTreeSet::new(),
            (PressKind::Open, EngineCell::Revealed) => self
                .mine_layout()
                .iter_neighbors(coords)
                .filter(|&pos| matches!(self.cell_at(pos), EngineCell::Hidden | EngineCell::Marked))
                .collect(),
            (PressKind::Open, EngineCell::Flagged) => BTreeSet::new(),
            (PressKind::Open, _) => BTreeSet::from([coords]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const AS_IS: Rules = Rules {
        start_rule: StartRule::AsIs,
        marks: true,
    };

    fn engine_with(size: Coord2, mines: &[Coord2]) -> PlayEngine {
        PlayEngine::from_layout(MineLayout::from_mine_coords(size, mines).unwrap(), AS_IS).unwrap()
    }

    #[test]
    fn codes_round_trip_through_table() {
        for code in 0..=16 {
            assert_eq!(CellCode::from_code(code).map(CellCode::code), Some(code));
        }
        assert_eq!(CellCode::from_code(17), None);
        assert_eq!(CellCode::Opened(0).code(), 0);
        assert_eq!(CellCode::Detonated.code(), 15);
    }

    #[test]
    fn export_while_playing() {
        let mut engine = engine_with((3, 3), &[(0, 0), (2, 2)]);
        engine.open((1, 1)).unwrap();
        engine.label((0, 0)).unwrap();
        engine.label((0, 2)).unwrap();
        engine.label((0, 2)).unwrap();

        assert_eq!(engine.cell_code((1, 1)), CellCode::Opened(2));
        assert_eq!(engine.cell_code((0, 0)), CellCode::Flagged);
        assert_eq!(engine.cell_code((0, 2)), CellCode::Marked);
        // mines stay hidden until the game is lost
        assert_eq!(engine.cell_code((2, 2)), CellCode::Closed);

        let grid = engine.export_grid();
        assert_eq!(grid.dim(), (3, 3));
        assert_eq!(grid[[1, 1]], CellCode::Opened(2));
        assert_eq!(grid[[2, 2]], CellCode::Closed);
    }

    #[test]
    fn export_after_loss_discloses_board() {
        let mines = [(0, 0), (0, 1), (2, 2)];
        let mut engine = engine_with((3, 4), &mines);
        engine.open((1, 1)).unwrap();
        engine.label((0, 0)).unwrap();
        engine.label((1, 3)).unwrap();
        engine.label((2, 0)).unwrap();
        engine.label((2, 0)).unwrap();
        engine.open((0, 1)).unwrap();

        assert_eq!(engine.state(), SessionState::Lost);
        assert_eq!(engine.cell_code((0, 1)), CellCode::Detonated);
        assert_eq!(engine.cell_code((0, 0)), CellCode::Flagged);
        assert_eq!(engine.cell_code((2, 2)), CellCode::Mined);
        assert_eq!(engine.cell_code((1, 3)), CellCode::IncorrectFlag);
        assert_eq!(engine.cell_code((2, 0)), CellCode::Marked);
        assert_eq!(engine.cell_code((0, 3)), CellCode::Closed);
        assert_eq!(engine.cell_code((1, 1)), CellCode::Opened(3));
    }

    #[test]
    fn export_after_chord_loss_marks_uncovered_mine() {
        let mut engine = engine_with((3, 3), &[(0, 1)]);
        engine.open((1, 1)).unwrap();
        engine.label((0, 0)).unwrap();
        engine.reveal((1, 1)).unwrap();

        assert_eq!(engine.cell_code((0, 1)), CellCode::Detonated);
        assert_eq!(engine.cell_code((0, 0)), CellCode::IncorrectFlag);
        assert_eq!(engine.cell_code((1, 1)), CellCode::Opened(1));
    }

    #[test]
    fn export_after_win_shows_flags() {
        let mut engine = engine_with((2, 2), &[(1, 1)]);
        engine.label((0, 1)).unwrap();
        engine.label((0, 1)).unwrap();
        engine.open((0, 0)).unwrap();
        engine.open((0, 1)).unwrap();
        engine.open((1, 0)).unwrap();

        assert_eq!(engine.state(), SessionState::Won);
        assert_eq!(engine.cell_code((1, 1)), CellCode::Flagged);
    }

    #[test]
    fn preview_open_press_on_closed_cell() {
        let mut engine = engine_with((3, 3), &[(0, 0)]);
        assert_eq!(
            engine.preview_press((2, 2), PressKind::Open).unwrap(),
            BTreeSet::from([(2, 2)])
        );

        engine.label((2, 2)).unwrap();
        assert!(engine.preview_press((2, 2), PressKind::Open).unwrap().is_empty());
        assert!(engine.preview_press((1, 1), PressKind::Label).unwrap().is_empty());
    }

    #[test]
    fn preview_open_press_on_opened_cell() {
        let mut engine = engine_with((3, 3), &[(0, 0)]);
        engine.open((1, 1)).unwrap();
        engine.label((0, 0)).unwrap();
        engine.label((2, 2)).unwrap();
        engine.label((2, 2)).unwrap();
        let before = engine.export_grid();

        let pressed = engine.preview_press((1, 1), PressKind::Open).unwrap();

        let expected: BTreeSet<Coord2> =
            [(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1), (2, 2)].into_iter().collect();
        assert_eq!(pressed, expected);
        assert!(engine.preview_press((1, 1), PressKind::Label).unwrap().is_empty());
        assert_eq!(engine.export_grid(), before);
    }

    #[test]
    fn preview_rejects_out_of_bounds() {
        let engine = engine_with((3, 3), &[(0, 0)]);
        assert_eq!(
            engine.preview_press((0, 3), PressKind::Open),
            Err(GameError::InvalidCoords)
        );
    }

    #[test]
    fn pressed_export_overlays_preview() {
        let mut engine = engine_with((3, 3), &[(0, 0)]);
        engine.open((1, 1)).unwrap();
        engine.label((0, 0)).unwrap();
        engine.label((2, 2)).unwrap();
        engine.label((2, 2)).unwrap();

        let grid = engine.export_grid_pressed((1, 1), PressKind::Open).unwrap();

        assert_eq!(grid[[0, 0]], CellCode::Flagged);
        assert_eq!(grid[[2, 2]], CellCode::MarkedPressed);
        assert_eq!(grid[[1, 1]], CellCode::Opened(1));
        let pressed: Vec<_> = grid.iter().filter(|&&code| code == CellCode::Pressed).collect();
        assert_eq!(pressed.len(), 6);
    }
}
