use super::*;
use rand::prelude::*;
use rand::rngs::SmallRng;

/// Uniform generator: every placement of the requested mine count is equally likely.
#[derive(Debug)]
pub struct RandomMinefieldGenerator<'r> {
    rng: &'r mut SmallRng,
}

impl<'r> RandomMinefieldGenerator<'r> {
    pub fn new(rng: &'r mut SmallRng) -> Self {
        Self { rng }
    }
}

impl MinefieldGenerator for RandomMinefieldGenerator<'_> {
    fn generate(self, config: &GameConfig) -> Result<MineLayout> {
        validate_size(config.size)?;
        if config.mines >= config.total_cells() {
            return Err(GameError::TooManyMines);
        }

        let total_cells = usize::from(config.total_cells());
        let mines = usize::from(config.mines);

        let mut cells = alloc::vec![false; total_cells];
        cells[..mines].fill(true);
        cells.shuffle(self.rng);

        let mine_mask = Array2::from_shape_vec(config.size.to_nd_index(), cells)
            .map_err(|_| GameError::InvalidBoardShape)?;
        let layout = MineLayout::from_mine_mask(mine_mask)?;

        log::debug!(
            "Generated {}x{} minefield with {} mines",
            config.size.0,
            config.size.1,
            layout.mine_count()
        );
        Ok(layout)
    }
}
