//! Full-game exercise through the public API only: both sides place their
//! complete armies, the game starts, and an opening sequence is played out
//! including a multi-round fight.

use jungleflag_core::{
    GameState, GameStatus, MoveError, Piece, PieceType, PlaceError, Player, Pos,
};

fn place(game: &mut GameState, row: u8, col: u8, kind: PieceType) {
    game.place_piece(Pos::new(row, col), kind)
        .unwrap_or_else(|err| panic!("placing {kind:?} at ({row},{col}): {err}"));
}

fn mv(game: &mut GameState, from: (u8, u8), to: (u8, u8)) {
    game.move_piece(Pos::new(from.0, from.1), Pos::new(to.0, to.1))
        .unwrap_or_else(|err| panic!("moving {from:?} -> {to:?}: {err}"));
}

/// Fill one side's two rows completely: 4 Elephants and 3 Tigers on the
/// back row, then 1 Tiger, 4 Mice and 2 Scorpions on the front row.
fn place_full_side(game: &mut GameState, back: u8, front: u8) {
    for col in 0..4 {
        place(game, back, col, PieceType::Elephant);
    }
    for col in 4..7 {
        place(game, back, col, PieceType::Tiger);
    }
    place(game, front, 0, PieceType::Tiger);
    for col in 1..5 {
        place(game, front, col, PieceType::Mouse);
    }
    place(game, front, 5, PieceType::Scorpion);
    place(game, front, 6, PieceType::Scorpion);
}

#[test]
fn full_placement_then_opening_moves() {
    let mut game = GameState::new("integration".to_string());

    // No moves before both sides have finished placing.
    assert_eq!(
        game.move_piece(Pos::new(6, 0), Pos::new(5, 0)),
        Err(MoveError::WrongPhase)
    );

    place_full_side(&mut game, 0, 1); // Player2, rows 0 and 1
    assert_eq!(game.status(), GameStatus::Placement);

    place_full_side(&mut game, 6, 5); // Player1, rows 6 and 5
    assert_eq!(game.status(), GameStatus::InProgress);
    assert_eq!(game.current_player(), Player::One);

    // Placement is over for good.
    assert_eq!(
        game.place_piece(Pos::new(2, 0), PieceType::Mouse),
        Err(PlaceError::WrongPhase)
    );

    // Back-row pieces are boxed in behind the front row.
    assert_eq!(
        game.move_piece(Pos::new(6, 0), Pos::new(5, 0)),
        Err(MoveError::CannotCaptureOwnPiece)
    );

    // Player1's front-row tiger marches down the a-file while Player2
    // shuffles a scorpion out of the way on the other wing.
    mv(&mut game, (5, 0), (4, 0));
    assert_eq!(game.current_player(), Player::Two);

    // Out of turn: Player2 may not touch Player1's pieces.
    assert_eq!(
        game.move_piece(Pos::new(4, 0), Pos::new(3, 0)),
        Err(MoveError::NotYourPiece)
    );

    mv(&mut game, (1, 6), (2, 6));
    mv(&mut game, (4, 0), (3, 0));
    mv(&mut game, (2, 6), (3, 6));
    mv(&mut game, (3, 0), (2, 0));
    mv(&mut game, (3, 6), (4, 6));

    // The tiger reaches striking distance of the mouse on (1,1) and needs
    // three rounds of combat to take the square.
    mv(&mut game, (2, 0), (1, 1));
    {
        let tiger = game.board().piece(Pos::new(2, 0)).expect("tiger holds its square");
        let mouse = game.board().piece(Pos::new(1, 1)).expect("mouse survives the first hit");
        assert_eq!(tiger.owner, Player::One);
        assert_eq!(tiger.lives, Piece::MAX_LIVES);
        assert_eq!(mouse.owner, Player::Two);
        assert_eq!(mouse.lives, Piece::MAX_LIVES - 1);
        assert!(mouse.revealed_to(Player::One));
        assert!(tiger.revealed_to(Player::Two));
    }

    mv(&mut game, (4, 6), (4, 5));
    mv(&mut game, (2, 0), (1, 1));
    assert_eq!(
        game.board().piece(Pos::new(1, 1)).unwrap().lives,
        Piece::MAX_LIVES - 2
    );

    mv(&mut game, (4, 5), (4, 6));
    mv(&mut game, (2, 0), (1, 1));

    // Third hit kills the mouse and the tiger finally advances.
    assert!(game.board().piece(Pos::new(2, 0)).is_none());
    let tiger = game.board().piece(Pos::new(1, 1)).expect("tiger took the square");
    assert_eq!(tiger.owner, Player::One);
    assert_eq!(tiger.kind, PieceType::Tiger);
    assert_eq!(tiger.lives, Piece::MAX_LIVES);

    assert_eq!(game.current_player(), Player::Two);
    assert_eq!(game.status(), GameStatus::InProgress);
    assert_eq!(game.winner(), None);

    // Both flags still rest at home.
    assert!(game.flag(Player::One).on_board);
    assert!(game.flag(Player::Two).on_board);
    assert_eq!(game.flag(Player::One).pos, Pos::new(6, 3));
    assert_eq!(game.flag(Player::Two).pos, Pos::new(0, 3));
}
