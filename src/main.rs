#[macro_use]
extern crate rocket;

use chrono::{DateTime, Utc};
use rocket::response::content;
use rocket::serde::json::Json;
use rocket::State;
use rocket_cors::{AllowedOrigins, CorsOptions};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use world_conquest::{
    combat::BattleReport,
    dice::RandomDice,
    error::{ConfigError, GameError},
    event::GameEvent,
    game::{Game, GameState},
    game_config::{GameConfig, PlayerConfig, MAX_PLAYERS, MIN_PLAYERS},
    interaction::CountRequest,
    territory::TerritoryId,
    trade::TradeOutcome,
};

const DEFAULT_COLOURS: [&str; MAX_PLAYERS] = [
    "#d62728", "#1f77b4", "#2ca02c", "#ff7f0e", "#9467bd", "#8c564b",
];

#[derive(Serialize, Debug)]
struct EventRecord {
    at: DateTime<Utc>,
    #[serde(flatten)]
    event: GameEvent,
}

#[derive(Serialize, Debug, Default)]
struct GameResponse {
    game_state: Option<GameState>,
    error: Option<String>,
    events: Vec<EventRecord>,
    prompt: Option<CountRequest>,
    battle: Option<BattleReport>,
    trade: Option<TradeOutcome>,
}

/// What a successful request produced besides the new state.
enum Outcome {
    Done,
    Prompt(CountRequest),
    Battle(BattleReport),
    Trade(TradeOutcome),
}

impl GameResponse {
    fn from_game(game: &mut Game, result: Result<Outcome, String>) -> Self {
        let at = Utc::now();
        let events = game
            .take_events()
            .into_iter()
            .map(|event| EventRecord { at, event })
            .collect();
        let mut response = GameResponse {
            game_state: Some(game.get_game_state()),
            events,
            ..Default::default()
        };
        match result {
            Ok(Outcome::Done) => {}
            Ok(Outcome::Prompt(prompt)) => response.prompt = Some(prompt),
            Ok(Outcome::Battle(report)) => response.battle = Some(report),
            Ok(Outcome::Trade(trade)) => response.trade = Some(trade),
            Err(e) => response.error = Some(e),
        }
        response
    }
}

#[derive(serde::Deserialize, Clone)]
struct DeployData {
    territory: String,
    num_armies: u16,
}

#[derive(serde::Deserialize, Clone)]
struct StartAttackData {
    from_territory: String,
    to_territory: String,
}

#[derive(serde::Deserialize, Clone)]
struct DiceData {
    num_dice: u16,
}

#[derive(serde::Deserialize, Clone)]
struct FortifyData {
    from_territory: String,
    to_territory: String,
    num_armies: u16,
}

#[derive(serde::Deserialize, Clone)]
struct PlayerData {
    name: String,
    colour: String,
}

#[derive(serde::Deserialize, Clone)]
struct NewGameData {
    config_file: Option<String>,
    num_players: Option<usize>,
    players: Option<Vec<PlayerData>>,
}

#[derive(Clone)]
enum Request {
    Deploy(DeployData),
    StartAttack(StartAttackData),
    DeclareAttackDice(DiceData),
    DeclareDefendDice(DiceData),
    Cancel,
    Fortify(FortifyData),
    TradeCards,
    AdvancePhase,
    NewGame(NewGameData),
    GetGameState,
}

struct RequestWithResponse {
    request: Request,
    response_sender: oneshot::Sender<GameResponse>,
}

struct SharedState {
    sender: mpsc::Sender<RequestWithResponse>,
}

#[derive(Serialize)]
struct ApiEndpoint {
    path: &'static str,
    method: &'static str,
    description: &'static str,
}

#[get("/")]
fn api_documentation() -> content::RawJson<String> {
    let endpoints = [
        ("/", "GET", "Shows this API documentation"),
        ("/game-state", "GET", "Get the current state of the game"),
        ("/new-game", "POST", "Start a new game with an optional data file and roster"),
        ("/deploy", "POST", "Claim or reinforce a territory"),
        ("/start_attack", "POST", "Select attacking and defending territories"),
        ("/declare_attack_dice", "POST", "Attacker declares the number of dice"),
        ("/declare_defend_dice", "POST", "Defender declares the number of dice; the battle is rolled"),
        ("/cancel", "POST", "Abandon the selected attack or fortify move"),
        ("/fortify", "POST", "Move troops between adjacent owned territories"),
        ("/trade_cards", "POST", "Trade in a card set during deployment"),
        ("/advance_phase", "POST", "Advance to the next phase or end the turn"),
    ]
    .into_iter()
    .map(|(path, method, description)| ApiEndpoint {
        path,
        method,
        description,
    })
    .collect::<Vec<_>>();

    content::RawJson(serde_json::to_string_pretty(&endpoints).unwrap_or_default())
}

#[post("/deploy", data = "<data>")]
async fn deploy(data: Json<DeployData>, state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::Deploy(data.into_inner())).await
}

#[post("/start_attack", data = "<data>")]
async fn start_attack(data: Json<StartAttackData>, state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::StartAttack(data.into_inner())).await
}

#[post("/declare_attack_dice", data = "<data>")]
async fn declare_attack_dice(data: Json<DiceData>, state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::DeclareAttackDice(data.into_inner())).await
}

#[post("/declare_defend_dice", data = "<data>")]
async fn declare_defend_dice(data: Json<DiceData>, state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::DeclareDefendDice(data.into_inner())).await
}

#[post("/cancel")]
async fn cancel(state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::Cancel).await
}

#[post("/fortify", data = "<data>")]
async fn fortify(data: Json<FortifyData>, state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::Fortify(data.into_inner())).await
}

#[post("/trade_cards")]
async fn trade_cards(state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::TradeCards).await
}

#[post("/advance_phase")]
async fn advance_phase(state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::AdvancePhase).await
}

#[post("/new-game", data = "<data>")]
async fn new_game(state: &State<SharedState>, data: Json<NewGameData>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::NewGame(data.into_inner())).await
}

#[get("/game-state")]
async fn game_state(state: &State<SharedState>) -> Json<GameResponse> {
    send_request_and_wait(state, Request::GetGameState).await
}

async fn send_request_and_wait(state: &State<SharedState>, request: Request) -> Json<GameResponse> {
    let (response_sender, response_receiver) = oneshot::channel();
    let sent = state
        .sender
        .send(RequestWithResponse {
            request,
            response_sender,
        })
        .await;
    if sent.is_err() {
        return Json(GameResponse {
            error: Some("game worker is not running".to_string()),
            ..Default::default()
        });
    }

    let response = response_receiver.await.unwrap_or_else(|_| GameResponse {
        error: Some("game worker dropped the request".to_string()),
        ..Default::default()
    });
    Json(response)
}

fn default_roster(num_players: usize) -> Vec<PlayerConfig> {
    let count = num_players.clamp(MIN_PLAYERS, MAX_PLAYERS);
    (0..count)
        .map(|i| PlayerConfig::new(&format!("Player {}", i + 1), DEFAULT_COLOURS[i]))
        .collect()
}

fn create_game(data: &NewGameData) -> Result<Game, ConfigError> {
    let config = match &data.config_file {
        Some(path) => GameConfig::load_from_file(path)?,
        None => GameConfig::default_map(),
    };
    let config = match &data.players {
        Some(players) => config.with_players(
            players
                .iter()
                .map(|p| PlayerConfig::new(&p.name, &p.colour))
                .collect(),
        ),
        None if config.players.is_empty() => {
            config.with_players(default_roster(data.num_players.unwrap_or(MAX_PLAYERS)))
        }
        None => config,
    };
    Game::new(config, Box::new(RandomDice::new()))
}

fn handle(game: &mut Game, request: Request) -> Result<Outcome, GameError> {
    match request {
        Request::Deploy(data) => {
            let territory = game.territory_id(&data.territory)?;
            game.deploy_troops(territory, data.num_armies)?;
            Ok(Outcome::Done)
        }
        Request::StartAttack(data) => {
            let (from, to) = lookup_pair(game, &data.from_territory, &data.to_territory)?;
            game.start_attack(from, to).map(Outcome::Prompt)
        }
        Request::DeclareAttackDice(data) => game.declare_attack_dice(data.num_dice).map(Outcome::Prompt),
        Request::DeclareDefendDice(data) => game.declare_defend_dice(data.num_dice).map(Outcome::Battle),
        Request::Cancel => game.cancel_pending().map(|_| Outcome::Done),
        Request::Fortify(data) => {
            let (from, to) = lookup_pair(game, &data.from_territory, &data.to_territory)?;
            game.fortify_positions(from, to, data.num_armies)?;
            Ok(Outcome::Done)
        }
        Request::TradeCards => game.trade_in_voluntary().map(Outcome::Trade),
        Request::AdvancePhase => game.advance_phase().map(|_| Outcome::Done),
        Request::NewGame(_) | Request::GetGameState => Ok(Outcome::Done),
    }
}

fn lookup_pair(game: &Game, from: &str, to: &str) -> Result<(TerritoryId, TerritoryId), GameError> {
    Ok((game.territory_id(from)?, game.territory_id(to)?))
}

async fn worker_task(mut receiver: mpsc::Receiver<RequestWithResponse>, game: Arc<Mutex<Game>>) {
    while let Some(RequestWithResponse {
        request,
        response_sender,
    }) = receiver.recv().await
    {
        let mut game = game.lock().await;
        let result = match request {
            Request::NewGame(data) => match create_game(&data) {
                Ok(new_game) => {
                    *game = new_game;
                    Ok(Outcome::Done)
                }
                Err(e) => Err(e.to_string()),
            },
            request => handle(&mut game, request).map_err(|e| e.to_string()),
        };
        if let Err(e) = &result {
            info!(error = %e, "request rejected");
        }
        let response = GameResponse::from_game(&mut game, result);
        if response_sender.send(response).is_err() {
            error!("client went away before the response was sent");
        }
    }
}

#[launch]
async fn rocket() -> _ {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let startup = NewGameData {
        config_file: std::env::var("WORLD_CONQUEST_CONFIG").ok(),
        num_players: None,
        players: None,
    };
    let game = match create_game(&startup) {
        Ok(game) => game,
        Err(e) => panic!("cannot create the initial game: {}", e),
    };

    let (sender, receiver) = mpsc::channel::<RequestWithResponse>(100);
    let game = Arc::new(Mutex::new(game));
    tokio::spawn(worker_task(receiver, game.clone()));

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .to_cors()
        .expect("Error creating CORS middleware");

    rocket::build()
        .manage(SharedState { sender })
        .mount(
            "/",
            routes![
                api_documentation,
                game_state,
                new_game,
                deploy,
                start_attack,
                declare_attack_dice,
                declare_defend_dice,
                cancel,
                fortify,
                trade_cards,
                advance_phase
            ],
        )
        .attach(cors)
}
