use alloc::collections::{BTreeSet, VecDeque};
use core::num::Saturating;
use core::time::Duration;
use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use web_time::{Instant, SystemTime, UNIX_EPOCH};

use crate::*;

/// Valid transitions:
/// - New -> InProgress (first successful open)
/// - InProgress -> Won
/// - InProgress -> Lost
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    New,
    InProgress,
    Won,
    Lost,
}

impl SessionState {
    pub const fn is_new(self) -> bool {
        matches!(self, Self::New)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::New
    }
}

/// One game session: the mine layout, the player's view of it and the clock.
#[derive(Clone, Debug)]
pub struct PlayEngine {
    config: GameConfig,
    seed: u64,
    rng: SmallRng,
    mine_layout: MineLayout,
    board: Array2<EngineCell>,
    revealed_count: Saturating<CellCount>,
    flagged_count: Saturating<CellCount>,
    state: SessionState,
    detonator: Option<Coord2>,
    started_at: Option<Instant>,
    final_time: Option<Duration>,
}

impl PlayEngine {
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(random_seed);
        let mut rng = SmallRng::seed_from_u64(seed);
        let mine_layout = RandomMinefieldGenerator::new(&mut rng).generate(&config)?;
        Ok(Self::assemble(config, seed, rng, mine_layout))
    }

    /// Starts a session on a known layout, later games are generated with the same size and count.
    pub fn from_layout(mine_layout: MineLayout, rules: Rules) -> Result<Self> {
        mine_layout.validate()?;
        let seed = random_seed();
        let config = GameConfig {
            size: mine_layout.size(),
            mines: mine_layout.mine_count(),
            rules,
            seed: None,
        };
        Ok(Self::assemble(
            config,
            seed,
            SmallRng::seed_from_u64(seed),
            mine_layout,
        ))
    }

    fn assemble(config: GameConfig, seed: u64, rng: SmallRng, mine_layout: MineLayout) -> Self {
        log::debug!("New game {:?}, seed {}", config.size, seed);
        let size = mine_layout.size();
        Self {
            config,
            seed,
            rng,
            mine_layout,
            board: Array2::default(size.to_nd_index()),
            revealed_count: Saturating(0),
            flagged_count: Saturating(0),
            state: Default::default(),
            detonator: None,
            started_at: None,
            final_time: None,
        }
    }

    /// Throws away the current session and generates a fresh layout with the same parameters.
    pub fn new_game(&mut self) -> Result<()> {
        let mine_layout = RandomMinefieldGenerator::new(&mut self.rng).generate(&self.config)?;
        log::debug!("New game {:?}", self.config.size);
        self.board = Array2::default(mine_layout.size().to_nd_index());
        self.mine_layout = mine_layout;
        self.revealed_count = Saturating(0);
        self.flagged_count = Saturating(0);
        self.state = SessionState::New;
        self.detonator = None;
        self.started_at = None;
        self.final_time = None;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn size(&self) -> Coord2 {
        self.mine_layout.size()
    }

    pub fn rules(&self) -> Rules {
        self.config.rules
    }

    /// Seed the engine's generator started from, enough to replay the first layout.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn total_mines(&self) -> CellCount {
        self.mine_layout.mine_count()
    }

    /// Mines minus flags, negative when the player over-flags.
    pub fn mines_left(&self) -> isize {
        (self.mine_layout.mine_count() as isize) - (self.flagged_count.0 as isize)
    }

    pub fn cell_at(&self, coords: Coord2) -> EngineCell {
        self.board[coords.to_nd_index()]
    }

    pub fn mine_layout(&self) -> &MineLayout {
        &self.mine_layout
    }

    pub fn detonator(&self) -> Option<Coord2> {
        self.detonator
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.mine_layout.contains_mine(coords)
    }

    /// Time since the first open, frozen once the game ends.
    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.final_time) {
            (_, Some(final_time)) => final_time,
            (Some(started_at), None) => started_at.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed().as_secs()
    }

    /// Opens a closed cell, or chords an opened one.
    ///
    /// The first open of a session rearranges mines according to the start rule, unless it lands
    /// on a flag, in which case nothing happens at all.
    pub fn open(&mut self, coords: Coord2) -> Result<OpenOutcome> {
        use EngineCell::*;

        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        if self.state.is_new() {
            if self.cell_at(coords).is_flagged() {
                return Ok(OpenOutcome::NoChange);
            }
            self.start(coords);
        }

        let outcome = match self.cell_at(coords) {
            Revealed => self.chord_reveal(coords),
            Flagged => OpenOutcome::NoChange,
            Hidden | Marked => self.open_single_cell(coords),
        };
        Ok(self.conclude(outcome))
    }

    /// Cycles the label of a closed cell, opened cells are left alone.
    ///
    /// The win check still runs afterwards, but the outcome only describes the label change. Read
    /// `state()` for the session result.
    pub fn label(&mut self, coords: Coord2) -> Result<LabelOutcome> {
        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        let outcome = self.label_cell(coords);
        self.conclude(outcome.into());
        Ok(outcome)
    }

    /// Labels a closed cell, or opens all neighbors of an opened one once its flags add up.
    pub fn reveal(&mut self, coords: Coord2) -> Result<OpenOutcome> {
        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        let outcome = if self.cell_at(coords).is_revealed() {
            self.chord_reveal(coords)
        } else {
            self.label_cell(coords).into()
        };
        Ok(self.conclude(outcome))
    }

    /// Flags every closed neighbor of an opened cell when they can only be mines.
    ///
    /// As with `label`, the session result is only visible through `state()`.
    pub fn flag_neighbors(&mut self, coords: Coord2) -> Result<LabelOutcome> {
        use LabelOutcome::*;

        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        if !self.cell_at(coords).is_revealed() {
            return Ok(NoChange);
        }

        if self.mine_layout.adjacent_mine_count(coords) != self.count_unrevealed_neighbors(coords) {
            return Ok(NoChange);
        }

        let mut updated = false;
        for pos in self.mine_layout.iter_neighbors(coords) {
            if matches!(self.cell_at(pos), EngineCell::Hidden | EngineCell::Marked) {
                self.board[pos.to_nd_index()] = EngineCell::Flagged;
                self.flagged_count += 1;
                updated = true;
            }
        }

        let outcome = if updated { Changed } else { NoChange };
        self.conclude(outcome.into());
        Ok(outcome)
    }

    fn label_cell(&mut self, coords: Coord2) -> LabelOutcome {
        let cell = self.cell_at(coords);
        let Some(next) = cell.next_label(self.config.rules.marks) else {
            return LabelOutcome::NoChange;
        };

        if cell.is_flagged() {
            self.flagged_count -= 1;
        }
        if next.is_flagged() {
            self.flagged_count += 1;
        }
        self.board[coords.to_nd_index()] = next;
        LabelOutcome::Changed
    }

    fn chord_reveal(&mut self, coords: Coord2) -> OpenOutcome {
        if self.mine_layout.adjacent_mine_count(coords) != self.count_flagged_neighbors(coords) {
            return OpenOutcome::NoChange;
        }

        if let Some(offender) = self.misflag_offender(coords) {
            log::debug!("Chord at {:?} hit a wrong flag, mine at {:?}", coords, offender);
            self.lose(offender);
            return OpenOutcome::HitMine;
        }

        let mut outcome = OpenOutcome::NoChange;
        for pos in self.mine_layout.iter_neighbors(coords) {
            // an earlier neighbor may already have flooded this one
            if matches!(self.cell_at(pos), EngineCell::Hidden | EngineCell::Marked) {
                outcome = outcome | self.open_single_cell(pos);
            }
        }
        outcome
    }

    /// The mine a chord would set off when some flag around `coords` is misplaced.
    fn misflag_offender(&self, coords: Coord2) -> Option<Coord2> {
        let mut mismatched = self
            .mine_layout
            .iter_neighbors(coords)
            .filter(|&pos| self.cell_at(pos).is_flagged() != self.mine_layout[pos])
            .peekable();
        let first = *mismatched.peek()?;

        // flags add up to the count, so a wrong flag always leaves some mine uncovered
        Some(
            mismatched
                .find(|&pos| self.mine_layout[pos])
                .unwrap_or(first),
        )
    }

    fn open_single_cell(&mut self, coords: Coord2) -> OpenOutcome {
        if self.mine_layout[coords] {
            self.lose(coords);
            return OpenOutcome::HitMine;
        }

        self.reveal_cell(coords);
        if self.mine_layout.adjacent_mine_count(coords) == 0 {
            self.flood_fill(coords);
        }
        OpenOutcome::Revealed
    }

    /// Opens the connected zero region around `start` together with its numbered border.
    fn flood_fill(&mut self, start: Coord2) {
        let mut visited = BTreeSet::from([start]);
        let mut to_visit = VecDeque::from([start]);
        log::trace!("Starting flood-fill from {:?}", start);

        while let Some(visit_coords) = to_visit.pop_front() {
            self.reveal_cell(visit_coords);

            for pos in self.mine_layout.iter_neighbors(visit_coords) {
                if self.cell_at(pos).is_flagged() {
                    continue;
                }
                self.reveal_cell(pos);

                if self.mine_layout.adjacent_mine_count(pos) == 0 && visited.insert(pos) {
                    to_visit.push_back(pos);
                }
            }
        }
        log::trace!("Flood-fill from {:?} visited {} zero cells", start, visited.len());
    }

    fn reveal_cell(&mut self, coords: Coord2) {
        debug_assert!(!self.mine_layout[coords], "revealing a mine at {coords:?}");
        let cell = &mut self.board[coords.to_nd_index()];
        if cell.is_revealed() {
            return;
        }
        if cell.is_flagged() {
            self.flagged_count -= 1;
        }
        *cell = EngineCell::Revealed;
        self.revealed_count += 1;
    }

    fn start(&mut self, coords: Coord2) {
        apply_start_rule(
            self.config.rules.start_rule,
            &mut self.mine_layout,
            coords,
            &mut self.rng,
        );
        self.state = SessionState::InProgress;
        self.started_at = Some(Instant::now());
        log::debug!("Game started at {:?}", coords);
    }

    /// Win check that runs after every mutating action.
    fn conclude(&mut self, outcome: OpenOutcome) -> OpenOutcome {
        if matches!(self.state, SessionState::InProgress)
            && self.revealed_count == Saturating(self.mine_layout.safe_cell_count())
        {
            self.win();
            OpenOutcome::Won
        } else {
            outcome
        }
    }

    fn win(&mut self) {
        self.state = SessionState::Won;
        self.freeze_time();

        let mut flagged = 0;
        for (index, cell) in self.board.indexed_iter_mut() {
            let coords = (index.0 as Coord, index.1 as Coord);
            if self.mine_layout[coords] {
                *cell = EngineCell::Flagged;
            } else if cell.is_marked() {
                *cell = EngineCell::Hidden;
            }
            if cell.is_flagged() {
                flagged += 1;
            }
        }
        self.flagged_count = Saturating(flagged);
        log::debug!("Game won in {:?}", self.elapsed());
    }

    fn lose(&mut self, detonator: Coord2) {
        self.state = SessionState::Lost;
        self.detonator = Some(detonator);
        self.freeze_time();
        log::debug!("Game lost at {:?} after {:?}", detonator, self.elapsed());
    }

    fn freeze_time(&mut self) {
        self.final_time = Some(
            self.started_at
                .map(|started_at| started_at.elapsed())
                .unwrap_or_default(),
        );
    }

    fn count_flagged_neighbors(&self, coords: Coord2) -> u8 {
        self.board
            .iter_neighbor_cells(coords)
            .filter(|cell| cell.is_flagged())
            .count() as u8
    }

    fn count_unrevealed_neighbors(&self, coords: Coord2) -> u8 {
        self.board
            .iter_neighbor_cells(coords)
            .filter(|cell| cell.is_unrevealed())
            .count() as u8
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.state.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}

/// Seed drawn from the wall clock, logged so a layout can be replayed.
fn random_seed() -> u64 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_nanos() as u64)
        .unwrap_or_default();
    log::debug!("Drew random seed {}", seed);
    seed
}
