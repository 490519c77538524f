//! Jungle Flag Web API
//!
//! Thin transport over the rules engine in `jungleflag-core`:
//!
//! - REST endpoints to create a game, fetch its state, place pieces, move
//!   them and register display names. Engine failures map 1:1 to
//!   `400 {"detail": ...}` responses; unknown game ids map to 404.
//! - A WebSocket per game (`/api/games/{id}/ws`) that receives the full
//!   serialized state after every committed mutation, so viewers never have
//!   to poll.
//!
//! Sessions live in memory only. Each game is guarded by its own mutex, so
//! operations on one game serialize while different games never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use jungleflag_core::{
    GameState, GameStatus, PieceType, PlaceError, Player, Pos, BOARD_SIZE,
};

// =============================================================================
// Game Registry
// =============================================================================

/// Capacity of each game's broadcast channel. A subscriber that falls more
/// than this many snapshots behind starts skipping intermediate states.
const BROADCAST_CAPACITY: usize = 32;

/// One game session plus its push channel.
struct GameEntry {
    state: Mutex<GameState>,
    events: broadcast::Sender<String>,
}

/// In-memory store of all game sessions, keyed by id.
#[derive(Default)]
struct GameStore {
    games: RwLock<HashMap<String, Arc<GameEntry>>>,
}

impl GameStore {
    /// Create a new session and return its id and entry.
    fn create(&self) -> (String, Arc<GameEntry>) {
        let id = new_game_id();
        let entry = Arc::new(GameEntry {
            state: Mutex::new(GameState::new(id.clone())),
            events: broadcast::channel(BROADCAST_CAPACITY).0,
        });
        self.games.write().unwrap().insert(id.clone(), entry.clone());
        (id, entry)
    }

    fn get(&self, id: &str) -> Option<Arc<GameEntry>> {
        self.games.read().unwrap().get(id).cloned()
    }
}

/// Shared application state.
type AppState = Arc<GameStore>;

/// Random 128-bit id, printed as 32 hex digits.
fn new_game_id() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePieceRequest {
    row: u8,
    col: u8,
    piece_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    from_row: u8,
    from_col: u8,
    to_row: u8,
    to_col: u8,
}

#[derive(Deserialize)]
struct RegisterRequest {
    side: String,
    name: String,
}

#[derive(Deserialize)]
struct ViewerQuery {
    viewer: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameStateModel {
    id: String,
    current_player: Player,
    status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<Player>,
    cells: Vec<Vec<Option<CellModel>>>,
    player1_flag: FlagModel,
    player2_flag: FlagModel,
    player1_name: String,
    player2_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CellModel {
    owner: Player,
    /// Omitted when the viewer has not learned this piece's identity yet.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<PieceType>,
    lives: u8,
    has_enemy_flag: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlagModel {
    row: u8,
    col: u8,
    on_board: bool,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Serialize)]
struct ErrorModel {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorModel>);

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorModel {
            detail: "Game not found".to_string(),
        }),
    )
}

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorModel {
            detail: detail.into(),
        }),
    )
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Convert a session to its serializable view.
///
/// The engine tracks per-viewer visibility but never redacts; deciding what
/// a given viewer may see happens here. With a `viewer` set, opponent
/// pieces that have not fought yet are serialized without their type and
/// with the carried-flag bit forced off. Lives stay as-is: an unrevealed
/// piece has never fought, so they are always full.
fn state_to_model(state: &GameState, viewer: Option<Player>) -> GameStateModel {
    let mut cells = Vec::with_capacity(BOARD_SIZE as usize);
    for row in 0..BOARD_SIZE {
        let mut cols = Vec::with_capacity(BOARD_SIZE as usize);
        for col in 0..BOARD_SIZE {
            cols.push(state.board().piece(Pos::new(row, col)).map(|piece| {
                let visible = match viewer {
                    None => true,
                    Some(side) => piece.owner == side || piece.revealed_to(side),
                };
                CellModel {
                    owner: piece.owner,
                    kind: visible.then_some(piece.kind),
                    lives: piece.lives,
                    has_enemy_flag: visible && piece.has_enemy_flag,
                }
            }));
        }
        cells.push(cols);
    }

    GameStateModel {
        id: state.id().to_string(),
        current_player: state.current_player(),
        status: state.status(),
        winner: state.winner(),
        cells,
        player1_flag: flag_to_model(state, Player::One),
        player2_flag: flag_to_model(state, Player::Two),
        player1_name: state.name(Player::One).to_string(),
        player2_name: state.name(Player::Two).to_string(),
    }
}

fn flag_to_model(state: &GameState, side: Player) -> FlagModel {
    let flag = state.flag(side);
    FlagModel {
        row: flag.pos.row,
        col: flag.pos.col,
        on_board: flag.on_board,
    }
}

/// Serialize the committed state and fan it out to this game's subscribers.
///
/// Called while the session lock is held, so subscribers can never observe
/// a half-applied move.
fn publish(entry: &GameEntry, state: &GameState) -> GameStateModel {
    let model = state_to_model(state, None);
    if let Ok(json) = serde_json::to_string(&model) {
        let _ = entry.events.send(json);
    }
    model
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn create_game(State(store): State<AppState>) -> Json<GameStateModel> {
    let (id, entry) = store.create();
    info!("created game {id}");
    let state = entry.state.lock().unwrap();
    Json(state_to_model(&state, None))
}

async fn get_game(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<GameStateModel>, ApiError> {
    let entry = store.get(&id).ok_or_else(not_found)?;
    let viewer = match &query.viewer {
        None => None,
        Some(name) => Some(Player::parse(name).ok_or_else(|| bad_request("Invalid side"))?),
    };
    let state = entry.state.lock().unwrap();
    Ok(Json(state_to_model(&state, viewer)))
}

async fn place_piece(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PlacePieceRequest>,
) -> Result<Json<GameStateModel>, ApiError> {
    let entry = store.get(&id).ok_or_else(not_found)?;
    let kind = PieceType::parse(&request.piece_type)
        .ok_or_else(|| bad_request(PlaceError::InvalidPieceType.to_string()))?;

    let mut state = entry.state.lock().unwrap();
    if let Err(err) = state.place_piece(Pos::new(request.row, request.col), kind) {
        debug!("game {id}: placement rejected: {err}");
        return Err(bad_request(err.to_string()));
    }
    if state.status() == GameStatus::InProgress {
        info!("game {id}: placement complete, game started");
    }
    Ok(Json(publish(&entry, &state)))
}

async fn move_piece(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<GameStateModel>, ApiError> {
    let entry = store.get(&id).ok_or_else(not_found)?;

    let mut state = entry.state.lock().unwrap();
    let from = Pos::new(request.from_row, request.from_col);
    let to = Pos::new(request.to_row, request.to_col);
    if let Err(err) = state.move_piece(from, to) {
        debug!("game {id}: move rejected: {err}");
        return Err(bad_request(err.to_string()));
    }
    if let Some(winner) = state.winner() {
        info!("game {id}: finished, won by {winner:?}");
    }
    Ok(Json(publish(&entry, &state)))
}

async fn register_player(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<GameStateModel>, ApiError> {
    let entry = store.get(&id).ok_or_else(not_found)?;
    let side = Player::parse(&request.side).ok_or_else(|| bad_request("Invalid side"))?;

    let mut state = entry.state.lock().unwrap();
    state.register_name(side, &request.name);
    Ok(Json(publish(&entry, &state)))
}

async fn watch_game(
    State(store): State<AppState>,
    Path(id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let entry = store.get(&id).ok_or_else(not_found)?;
    let receiver = entry.events.subscribe();
    Ok(upgrade.on_upgrade(move |socket| forward_events(socket, entry, receiver)))
}

/// Push loop for one subscriber: the current state immediately, then every
/// committed snapshot until the client goes away.
async fn forward_events(
    mut socket: WebSocket,
    entry: Arc<GameEntry>,
    mut receiver: broadcast::Receiver<String>,
) {
    let snapshot = {
        let state = entry.state.lock().unwrap();
        serde_json::to_string(&state_to_model(&state, None)).ok()
    };
    if let Some(json) = snapshot {
        if socket.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    loop {
        match receiver.recv().await {
            Ok(json) => {
                if socket.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("subscriber lagged, skipped {skipped} updates");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("logger init");

    let store: AppState = Arc::new(GameStore::default());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/games", post(create_game))
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/{id}/place", post(place_piece))
        .route("/api/games/{id}/move", post(move_piece))
        .route("/api/games/{id}/register", post(register_player))
        .route("/api/games/{id}/ws", get(watch_game))
        .route("/health", get(health))
        .layer(cors)
        .with_state(store);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
    info!("Jungle Flag API running on http://localhost:8000");
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_format() {
        let id = new_game_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_game_id());
    }

    #[test]
    fn test_place_request_parses_camel_case() {
        let request: PlacePieceRequest =
            serde_json::from_str(r#"{"row":6,"col":0,"pieceType":"Elephant"}"#).unwrap();
        assert_eq!(request.row, 6);
        assert_eq!(request.col, 0);
        assert_eq!(request.piece_type, "Elephant");

        let request: MoveRequest =
            serde_json::from_str(r#"{"fromRow":3,"fromCol":3,"toRow":3,"toCol":4}"#).unwrap();
        assert_eq!(request.from_row, 3);
        assert_eq!(request.to_col, 4);
    }

    #[test]
    fn test_model_maps_cells_and_flags() {
        let mut state = GameState::new("abc".to_string());
        state.place_piece(Pos::new(6, 0), PieceType::Elephant).unwrap();
        state.place_piece(Pos::new(0, 6), PieceType::Scorpion).unwrap();
        state.register_name(Player::One, "Roy");

        let model = state_to_model(&state, None);
        assert_eq!(model.id, "abc");
        assert_eq!(model.player1_name, "Roy");
        assert_eq!(model.cells.len(), BOARD_SIZE as usize);

        let cell = model.cells[6][0].as_ref().unwrap();
        assert_eq!(cell.owner, Player::One);
        assert_eq!(cell.kind, Some(PieceType::Elephant));
        assert_eq!(cell.lives, 3);
        assert!(model.cells[3][3].is_none());

        assert_eq!(model.player1_flag.row, 6);
        assert_eq!(model.player1_flag.col, 3);
        assert!(model.player1_flag.on_board);
        assert_eq!(model.player2_flag.row, 0);
    }

    #[test]
    fn test_viewer_redaction_hides_unrevealed_opponents() {
        let mut state = GameState::new("abc".to_string());
        state.place_piece(Pos::new(6, 0), PieceType::Elephant).unwrap();
        state.place_piece(Pos::new(0, 0), PieceType::Tiger).unwrap();

        let model = state_to_model(&state, Some(Player::One));
        // Own piece: fully visible.
        let own = model.cells[6][0].as_ref().unwrap();
        assert_eq!(own.kind, Some(PieceType::Elephant));
        // Opponent piece that never fought: owner visible, type hidden.
        let theirs = model.cells[0][0].as_ref().unwrap();
        assert_eq!(theirs.owner, Player::Two);
        assert_eq!(theirs.kind, None);
        assert!(!theirs.has_enemy_flag);

        // The unredacted view shows everything.
        let full = state_to_model(&state, None);
        assert_eq!(full.cells[0][0].as_ref().unwrap().kind, Some(PieceType::Tiger));
    }

    #[test]
    fn test_redacted_cell_omits_type_on_the_wire() {
        let mut state = GameState::new("abc".to_string());
        state.place_piece(Pos::new(0, 0), PieceType::Tiger).unwrap();

        let json =
            serde_json::to_string(&state_to_model(&state, Some(Player::One))).unwrap();
        assert!(!json.contains("Tiger"));
        // Winner is unset and stays off the wire entirely.
        assert!(!json.contains("winner"));
    }
}
