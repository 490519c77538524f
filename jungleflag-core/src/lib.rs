//! Jungle Flag game logic.
//!
//! A two-player, turn-based board game with hidden-piece combat and a
//! capture-the-flag win condition, played on a 7×7 board.
//!
//! # Board Layout
//!
//! ```text
//!   col:   0  1  2  3  4  5  6
//! row 0:   .  .  .  F2 .  .  .   ┐ Player2 placement rows
//! row 1:   .  .  .  .  .  .  .   ┘
//! row 2:   .  .  .  .  .  .  .
//! row 3:   .  .  .  .  .  .  .
//! row 4:   .  .  .  .  .  .  .
//! row 5:   .  .  .  .  .  .  .   ┐ Player1 placement rows
//! row 6:   .  .  .  F1 .  .  .   ┘
//! ```
//!
//! `F1`/`F2` are the flag home cells. Each side places 4 Elephants,
//! 4 Tigers, 4 Mice and 2 Scorpions on its own two rows; once both sides
//! have placed all 14 pieces the game starts and moves alternate. A piece
//! moves one step in any direction. Moving onto an enemy piece resolves
//! combat: Elephant beats Tiger beats Mouse beats Elephant, a Scorpion on
//! either side kills both combatants, and everything else is a one-for-one
//! trade of life points. Carrying the enemy flag back to your own flag home
//! wins the game.
//!
//! The engine is pure and synchronous: both operations mutate the session
//! in memory and return a result, with every failure reported as data and
//! the session left untouched. Callers are expected to serialize access to
//! a session; the engine itself never blocks or performs I/O.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Board edge length.
pub const BOARD_SIZE: u8 = 7;

const SIZE: usize = BOARD_SIZE as usize;

/// Player identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Player {
    #[serde(rename = "Player1")]
    One,
    #[serde(rename = "Player2")]
    Two,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Parse a wire name ("Player1" or "Player2", any case).
    pub fn parse(name: &str) -> Option<Player> {
        if name.eq_ignore_ascii_case("player1") {
            Some(Player::One)
        } else if name.eq_ignore_ascii_case("player2") {
            Some(Player::Two)
        } else {
            None
        }
    }
}

/// Piece type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum PieceType {
    Elephant,
    Tiger,
    Mouse,
    Scorpion,
}

impl PieceType {
    /// How many pieces of this type each side may place.
    #[inline]
    pub fn quota(self) -> u8 {
        match self {
            PieceType::Scorpion => 2,
            _ => 4,
        }
    }

    /// Wire name of this type.
    pub fn name(self) -> &'static str {
        match self {
            PieceType::Elephant => "Elephant",
            PieceType::Tiger => "Tiger",
            PieceType::Mouse => "Mouse",
            PieceType::Scorpion => "Scorpion",
        }
    }

    /// Parse a wire name, case-insensitively.
    pub fn parse(name: &str) -> Option<PieceType> {
        PieceType::all().find(|kind| name.eq_ignore_ascii_case(kind.name()))
    }

    /// Iterate over all piece types.
    pub fn all() -> impl Iterator<Item = PieceType> {
        [
            PieceType::Elephant,
            PieceType::Tiger,
            PieceType::Mouse,
            PieceType::Scorpion,
        ]
        .into_iter()
    }
}

/// Position on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

impl Pos {
    /// Create a position from row and column.
    #[inline]
    pub fn new(row: u8, col: u8) -> Pos {
        Pos { row, col }
    }

    /// Check that the position is on the board.
    #[inline]
    pub fn in_bounds(self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }
}

/// King-move adjacency: one step in any of the 8 directions.
/// A position is never adjacent to itself.
#[inline]
pub fn is_adjacent(from: Pos, to: Pos) -> bool {
    from != to && from.row.abs_diff(to.row) <= 1 && from.col.abs_diff(to.col) <= 1
}

/// The advantage triangle: Elephant beats Tiger, Tiger beats Mouse, Mouse
/// beats Elephant. Strictly one-directional; same types have no advantage
/// either way. Scorpions sit outside the triangle and are handled by the
/// instant-kill rule during combat.
#[inline]
pub fn attacker_beats_defender(attacker: PieceType, defender: PieceType) -> bool {
    matches!(
        (attacker, defender),
        (PieceType::Elephant, PieceType::Tiger)
            | (PieceType::Tiger, PieceType::Mouse)
            | (PieceType::Mouse, PieceType::Elephant)
    )
}

/// Which side a board row belongs to during placement.
/// Rows 0 and 1 are Player2's, rows 5 and 6 are Player1's, everything else
/// belongs to nobody.
#[inline]
pub fn side_for_row(row: u8) -> Option<Player> {
    match row {
        0 | 1 => Some(Player::Two),
        5 | 6 => Some(Player::One),
        _ => None,
    }
}

/// A piece on the board.
///
/// A piece occupies exactly one cell and is removed from it the moment its
/// lives reach zero; the board never holds a dead piece.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    pub owner: Player,
    pub kind: PieceType,
    pub lives: u8,
    pub has_enemy_flag: bool,
    pub revealed_to_p1: bool,
    pub revealed_to_p2: bool,
}

impl Piece {
    /// Lives a freshly placed piece starts with.
    pub const MAX_LIVES: u8 = 3;

    /// Create a full-life, unrevealed piece.
    pub fn new(owner: Player, kind: PieceType) -> Piece {
        Piece {
            owner,
            kind,
            lives: Piece::MAX_LIVES,
            has_enemy_flag: false,
            revealed_to_p1: false,
            revealed_to_p2: false,
        }
    }

    /// Lose one life, flooring at zero.
    #[inline]
    pub fn take_hit(&mut self) {
        self.lives = self.lives.saturating_sub(1);
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.lives == 0
    }

    /// Whether this piece's identity has been shown to the given viewer.
    /// A piece is always known to its own owner; these flags only track
    /// what the opponent has learned.
    #[inline]
    pub fn revealed_to(&self, viewer: Player) -> bool {
        match viewer {
            Player::One => self.revealed_to_p1,
            Player::Two => self.revealed_to_p2,
        }
    }

    /// Drop to zero lives outright.
    #[inline]
    fn kill(&mut self) {
        self.lives = 0;
    }

    /// Mark the piece as having fought: known to both sides from now on.
    fn reveal(&mut self) {
        self.revealed_to_p1 = true;
        self.revealed_to_p2 = true;
    }
}

/// The 7×7 board: at most one piece per cell.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Board {
    cells: [[Option<Piece>; SIZE]; SIZE],
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Board {
        Board {
            cells: [[None; SIZE]; SIZE],
        }
    }

    /// Get the piece at a position, if any.
    #[inline]
    pub fn piece(&self, pos: Pos) -> Option<&Piece> {
        self.cells[pos.row as usize][pos.col as usize].as_ref()
    }

    #[inline]
    fn piece_mut(&mut self, pos: Pos) -> Option<&mut Piece> {
        self.cells[pos.row as usize][pos.col as usize].as_mut()
    }

    /// Write a cell, replacing whatever was there.
    #[inline]
    fn set(&mut self, pos: Pos, piece: Option<Piece>) {
        self.cells[pos.row as usize][pos.col as usize] = piece;
    }

    /// Clear a cell and return the piece that occupied it.
    #[inline]
    fn take(&mut self, pos: Pos) -> Option<Piece> {
        self.cells[pos.row as usize][pos.col as usize].take()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// One side's flag: its fixed home cell and where it currently rests.
///
/// A flag is either on the board (`on_board` true, `pos` meaningful) or
/// carried by exactly one living piece, never both.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Flag {
    pub home: Pos,
    pub pos: Pos,
    pub on_board: bool,
}

impl Flag {
    fn at_home(home: Pos) -> Flag {
        Flag {
            home,
            pos: home,
            on_board: true,
        }
    }
}

/// Per-type placement counters for one side.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PlacementCounts {
    elephants: u8,
    tigers: u8,
    mice: u8,
    scorpions: u8,
}

impl PlacementCounts {
    /// How many pieces of the given type this side has placed.
    #[inline]
    pub fn placed(&self, kind: PieceType) -> u8 {
        match kind {
            PieceType::Elephant => self.elephants,
            PieceType::Tiger => self.tigers,
            PieceType::Mouse => self.mice,
            PieceType::Scorpion => self.scorpions,
        }
    }

    fn record(&mut self, kind: PieceType) {
        let slot = match kind {
            PieceType::Elephant => &mut self.elephants,
            PieceType::Tiger => &mut self.tigers,
            PieceType::Mouse => &mut self.mice,
            PieceType::Scorpion => &mut self.scorpions,
        };
        *slot += 1;
    }

    /// Whether this side has placed its full quota of every type.
    pub fn is_complete(&self) -> bool {
        PieceType::all().all(|kind| self.placed(kind) >= kind.quota())
    }
}

/// A pair of values, one per side.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PerPlayer<T> {
    pub one: T,
    pub two: T,
}

impl<T> PerPlayer<T> {
    #[inline]
    pub fn get(&self, side: Player) -> &T {
        match side {
            Player::One => &self.one,
            Player::Two => &self.two,
        }
    }

    #[inline]
    fn get_mut(&mut self, side: Player) -> &mut T {
        match side {
            Player::One => &mut self.one,
            Player::Two => &mut self.two,
        }
    }
}

/// Game lifecycle phase. Transitions are one-way:
/// Placement → InProgress → Finished.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum GameStatus {
    Placement,
    InProgress,
    Finished,
}

/// Why a `place_piece` call was rejected.
///
/// The session is left completely untouched whenever one of these is
/// returned: no board writes, no counter increments.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum PlaceError {
    #[error("Game is not in placement phase")]
    WrongPhase,
    /// Produced at the transport boundary when a piece type name fails to
    /// parse; `PieceType` itself has no invalid value.
    #[error("Invalid piece type")]
    InvalidPieceType,
    #[error("Position is outside the board")]
    OutOfBounds,
    #[error("You can place pieces only on your first two rows")]
    NotYourPlacementRow,
    #[error("There is already a piece on that square")]
    SquareOccupied,
    #[error("You have already placed all pieces of this type")]
    TypeQuotaExceeded,
}

/// Why a `move_piece` call was rejected. Same no-side-effect guarantee as
/// `PlaceError`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum MoveError {
    #[error("Game is not in progress")]
    WrongPhase,
    #[error("Move is outside the board")]
    OutOfBounds,
    #[error("Pieces can move only one step in any direction")]
    NotAdjacent,
    #[error("No piece at source square")]
    NoPieceAtSource,
    #[error("You can move only your own pieces")]
    NotYourPiece,
    #[error("You cannot capture your own piece")]
    CannotCaptureOwnPiece,
}

/// A complete game session.
///
/// All mutation goes through [`GameState::place_piece`],
/// [`GameState::move_piece`] and [`GameState::register_name`]; everything
/// else is read-only access for serialization.
#[derive(Clone, PartialEq, Debug)]
pub struct GameState {
    id: String,
    board: Board,
    current_player: Player,
    status: GameStatus,
    winner: Option<Player>,
    placed: PerPlayer<PlacementCounts>,
    flags: PerPlayer<Flag>,
    names: PerPlayer<String>,
}

impl GameState {
    /// Create a fresh session: empty board, placement phase, both flags at
    /// their home cells (the middle of each side's back row).
    pub fn new(id: String) -> GameState {
        GameState {
            id,
            board: Board::new(),
            current_player: Player::One,
            status: GameStatus::Placement,
            winner: None,
            placed: PerPlayer::default(),
            flags: PerPlayer {
                one: Flag::at_home(Pos::new(BOARD_SIZE - 1, BOARD_SIZE / 2)),
                two: Flag::at_home(Pos::new(0, BOARD_SIZE / 2)),
            },
            names: PerPlayer::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    #[inline]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    #[inline]
    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    #[inline]
    pub fn flag(&self, side: Player) -> &Flag {
        self.flags.get(side)
    }

    #[inline]
    pub fn name(&self, side: Player) -> &str {
        self.names.get(side)
    }

    /// Store a display name for one side. Names are presentation metadata;
    /// no rule reads them.
    pub fn register_name(&mut self, side: Player, name: &str) {
        *self.names.get_mut(side) = name.trim().to_string();
    }

    // ========== Placement ==========

    /// Place a new piece during the placement phase.
    ///
    /// The placing side is derived from the row, not from whose turn it is:
    /// both sides place independently and placement never alternates the
    /// turn. Once both sides have placed their full 14 pieces the game
    /// switches to InProgress with Player1 to move.
    pub fn place_piece(&mut self, pos: Pos, kind: PieceType) -> Result<(), PlaceError> {
        if self.status != GameStatus::Placement {
            return Err(PlaceError::WrongPhase);
        }
        if !pos.in_bounds() {
            return Err(PlaceError::OutOfBounds);
        }
        let side = side_for_row(pos.row).ok_or(PlaceError::NotYourPlacementRow)?;
        if self.board.piece(pos).is_some() {
            return Err(PlaceError::SquareOccupied);
        }
        if self.placed.get(side).placed(kind) >= kind.quota() {
            return Err(PlaceError::TypeQuotaExceeded);
        }

        self.board.set(pos, Some(Piece::new(side, kind)));
        self.placed.get_mut(side).record(kind);

        if self.placed.one.is_complete() && self.placed.two.is_complete() {
            self.status = GameStatus::InProgress;
            self.current_player = Player::One;
        }
        Ok(())
    }

    // ========== Movement & Combat ==========

    /// Move the current player's piece one step, resolving combat, flag
    /// pickup, victory and turn alternation.
    ///
    /// The whole operation is atomic: either every effect of the move is
    /// applied, or an error is returned and nothing changed.
    pub fn move_piece(&mut self, from: Pos, to: Pos) -> Result<(), MoveError> {
        if self.status != GameStatus::InProgress {
            return Err(MoveError::WrongPhase);
        }
        if !from.in_bounds() || !to.in_bounds() {
            return Err(MoveError::OutOfBounds);
        }
        if !is_adjacent(from, to) {
            return Err(MoveError::NotAdjacent);
        }
        let mover = *self.board.piece(from).ok_or(MoveError::NoPieceAtSource)?;
        if mover.owner != self.current_player {
            return Err(MoveError::NotYourPiece);
        }
        if let Some(target) = self.board.piece(to) {
            if target.owner == mover.owner {
                return Err(MoveError::CannotCaptureOwnPiece);
            }
        }

        // All checks passed; the move commits from here on.
        self.board.set(from, None);
        let mut attacker = mover;
        let mut defender = self.board.take(to);

        if let Some(def) = defender.as_mut() {
            // Both combatants are known to both sides for the rest of the
            // game, whatever the outcome.
            attacker.reveal();
            def.reveal();

            if attacker.kind == PieceType::Scorpion || def.kind == PieceType::Scorpion {
                // A Scorpion on either side kills both, lives ignored.
                attacker.kill();
                def.kill();
            } else if attacker_beats_defender(attacker.kind, def.kind) {
                def.take_hit();
            } else if attacker_beats_defender(def.kind, attacker.kind) {
                attacker.take_hit();
            } else {
                // No advantage either way: one-for-one trade.
                attacker.take_hit();
                def.take_hit();
            }
        }

        // Flag carriers that died drop their flag at the cell they died on;
        // recorded here, applied after the victory check.
        let dead_carrier_at_from =
            (attacker.is_dead() && attacker.has_enemy_flag).then_some(attacker.owner);
        let dead_carrier_at_to = defender
            .filter(|def| def.is_dead() && def.has_enemy_flag)
            .map(|def| def.owner);

        // Final occupancy. A surviving defender always keeps its square;
        // the attacker advances only if the defender died and the attacker
        // survived.
        let (at_from, at_to) = match defender {
            None => (None, Some(attacker)),
            Some(def) => match (attacker.is_dead(), def.is_dead()) {
                (true, true) => (None, None),
                (false, true) => (None, Some(attacker)),
                (true, false) => (None, Some(def)),
                (false, false) => (Some(attacker), Some(def)),
            },
        };
        self.board.set(from, at_from);
        self.board.set(to, at_to);

        // Flag pickup by whichever piece ended the move on `to`.
        if let Some(occupant) = self.board.piece(to).copied() {
            let enemy_flag = self.flags.get_mut(occupant.owner.opponent());
            if enemy_flag.on_board && enemy_flag.pos == to {
                enemy_flag.on_board = false;
                if let Some(piece) = self.board.piece_mut(to) {
                    piece.has_enemy_flag = true;
                }
            }
        }

        // Victory: a carrier reaching its own flag home ends the game on
        // the spot. No flag drop, no turn change after this.
        if let Some(occupant) = self.board.piece(to) {
            if occupant.has_enemy_flag && to == self.flags.get(occupant.owner).home {
                self.status = GameStatus::Finished;
                self.winner = Some(occupant.owner);
                return Ok(());
            }
        }

        if let Some(owner) = dead_carrier_at_from {
            let flag = self.flags.get_mut(owner.opponent());
            flag.on_board = true;
            flag.pos = from;
        }
        if let Some(owner) = dead_carrier_at_to {
            let flag = self.flags.get_mut(owner.opponent());
            flag.on_board = true;
            flag.pos = to;
        }

        self.current_player = self.current_player.opponent();
        Ok(())
    }
}
