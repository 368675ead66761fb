use super::*;
use alloc::vec::Vec;
use rand::prelude::*;
use rand::rngs::SmallRng;

impl StartRule {
    /// The rule that can actually be honoured for a first click at `start`.
    ///
    /// `EmptyCell` needs every mine to fit outside the click footprint, otherwise it degrades to
    /// `NoBomb`. `NoBomb` always fits since a valid layout has at least one safe cell.
    pub fn effective_for(self, layout: &MineLayout, start: Coord2) -> Self {
        match self {
            Self::EmptyCell => {
                let footprint = layout.iter_neighbors(start).count() as CellCount + 1;
                if layout.mine_count() >= layout.total_cells() - footprint {
                    log::debug!(
                        "Cannot clear {} cells around {:?} with {} mines, fallback to no bomb",
                        footprint,
                        start,
                        layout.mine_count()
                    );
                    Self::NoBomb
                } else {
                    Self::EmptyCell
                }
            }
            rule => rule,
        }
    }
}

/// Rearranges mines so the first click at `start` satisfies `rule`.
pub(crate) fn apply_start_rule(
    rule: StartRule,
    layout: &mut MineLayout,
    start: Coord2,
    rng: &mut SmallRng,
) {
    match rule.effective_for(layout, start) {
        StartRule::AsIs => {}
        StartRule::NoBomb => clear_cells(layout, &[start], rng),
        StartRule::EmptyCell => {
            let footprint: Vec<Coord2> = layout
                .iter_neighbors(start)
                .chain(core::iter::once(start))
                .collect();
            clear_cells(layout, &footprint, rng);
            debug_assert_eq!(layout.adjacent_mine_count(start), 0);
        }
    }
}

/// Moves every mine inside `area` to a uniformly picked safe cell outside of it.
fn clear_cells(layout: &mut MineLayout, area: &[Coord2], rng: &mut SmallRng) {
    while let Some(&mined) = area.iter().find(|&&pos| layout[pos]) {
        let targets = layout.safe_cells_except(area);
        if targets.is_empty() {
            // unreachable for rules that passed `effective_for`
            log::warn!("No room left to move the mine at {:?}", mined);
            return;
        }
        let target = targets[rng.random_range(0..targets.len())];
        layout.relocate_mine(mined, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint_is_clear(layout: &MineLayout, start: Coord2) -> bool {
        !layout[start] && layout.iter_neighbors(start).all(|pos| !layout[pos])
    }

    fn assert_consistent(layout: &MineLayout, mines: CellCount) {
        let (rows, cols) = layout.size();
        let counted = layout.mine_mask().iter().filter(|&&mine| mine).count();
        assert_eq!(counted, usize::from(mines));
        assert_eq!(layout.mine_count(), mines);
        for row in 0..rows {
            for col in 0..cols {
                assert_eq!(
                    layout.adjacent_mine_count((row, col)),
                    crate::tests::brute_force_adjacent(layout, (row, col))
                );
            }
        }
    }

    #[test]
    fn as_is_keeps_layout() {
        let mut layout = MineLayout::from_mine_coords((3, 3), &[(0, 0)]).unwrap();
        let before = layout.clone();
        let mut rng = SmallRng::seed_from_u64(1);
        apply_start_rule(StartRule::AsIs, &mut layout, (0, 0), &mut rng);
        assert_eq!(layout, before);
    }

    #[test]
    fn no_bomb_moves_single_mine() {
        for seed in 0..16 {
            let mut layout = MineLayout::from_mine_coords((3, 3), &[(1, 1), (0, 0)]).unwrap();
            let mut rng = SmallRng::seed_from_u64(seed);
            apply_start_rule(StartRule::NoBomb, &mut layout, (1, 1), &mut rng);
            assert!(!layout[(1, 1)]);
            assert!(layout[(0, 0)]);
            assert_consistent(&layout, 2);
        }
    }

    #[test]
    fn no_bomb_leaves_safe_start_untouched() {
        let mut layout = MineLayout::from_mine_coords((3, 3), &[(0, 0)]).unwrap();
        let before = layout.clone();
        let mut rng = SmallRng::seed_from_u64(3);
        apply_start_rule(StartRule::NoBomb, &mut layout, (2, 2), &mut rng);
        assert_eq!(layout, before);
    }

    #[test]
    fn empty_cell_clears_footprint() {
        let mines = [(0, 0), (0, 1), (1, 1), (2, 2), (4, 4), (3, 1)];
        for seed in 0..16 {
            for start in [(1, 1), (0, 0), (4, 2), (2, 4)] {
                let mut layout = MineLayout::from_mine_coords((5, 5), &mines).unwrap();
                let mut rng = SmallRng::seed_from_u64(seed);
                apply_start_rule(StartRule::EmptyCell, &mut layout, start, &mut rng);
                assert!(footprint_is_clear(&layout, start));
                assert_eq!(layout.adjacent_mine_count(start), 0);
                assert_consistent(&layout, 6);
            }
        }
    }

    #[test]
    fn empty_cell_falls_back_when_crowded() {
        // 16 cells, interior footprint of 9, 7 mines cannot fit outside it
        let mines = [(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (3, 3)];
        let layout = MineLayout::from_mine_coords((4, 4), &mines).unwrap();
        assert_eq!(StartRule::EmptyCell.effective_for(&layout, (1, 1)), StartRule::NoBomb);
        // a corner footprint is only 4 cells, so the same count fits
        assert_eq!(StartRule::EmptyCell.effective_for(&layout, (3, 0)), StartRule::EmptyCell);

        for seed in 0..16 {
            let mut layout = layout.clone();
            let mut rng = SmallRng::seed_from_u64(seed);
            apply_start_rule(StartRule::EmptyCell, &mut layout, (1, 1), &mut rng);
            assert!(!layout[(1, 1)]);
            assert_consistent(&layout, 7);
        }
    }

    #[test]
    fn empty_cell_threshold_is_exact() {
        // 3x3 interior footprint covers the whole board, any mine forces the fallback
        let layout = MineLayout::from_mine_coords((3, 3), &[(0, 0)]).unwrap();
        assert_eq!(StartRule::EmptyCell.effective_for(&layout, (1, 1)), StartRule::NoBomb);

        // 4x4 corner: footprint 4, 12 cells left, 11 mines fit and 12 would not
        let mines: Vec<Coord2> = (0..4)
            .flat_map(|row| (0..4).map(move |col| (row, col)))
            .filter(|&(row, col)| row >= 2 || col >= 2)
            .take(11)
            .collect();
        let layout = MineLayout::from_mine_coords((4, 4), &mines).unwrap();
        assert_eq!(StartRule::EmptyCell.effective_for(&layout, (0, 0)), StartRule::EmptyCell);

        let mines: Vec<Coord2> = (0..4)
            .flat_map(|row| (0..4).map(move |col| (row, col)))
            .filter(|&(row, col)| row >= 2 || col >= 2)
            .collect();
        let layout = MineLayout::from_mine_coords((4, 4), &mines).unwrap();
        assert_eq!(layout.mine_count(), 12);
        assert_eq!(StartRule::EmptyCell.effective_for(&layout, (0, 0)), StartRule::NoBomb);
    }
}
