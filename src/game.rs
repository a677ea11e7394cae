use crate::board::Board;
use crate::card::Card;
use crate::combat::{max_attack_dice, max_defend_dice, AttackContext};
use crate::deck::Deck;
use crate::dice::DiceSource;
use crate::error::{ConfigError, GameError};
use crate::event::GameEvent;
use crate::game_config::GameConfig;
use crate::interaction::{CountKind, CountRequest};
use crate::player::{Player, PlayerId};
use crate::territory::TerritoryId;
use crate::trade::{has_tradeable_set, trade_value};
use crate::turn_phase::{PhaseEvent, TurnPhase};
use itertools::Itertools;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Serializable view of the game handed to presentation layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub current_player: String,
    pub current_player_id: PlayerId,
    pub round: usize,
    pub turn_phase: TurnPhase,
    pub conquered_territory: bool,
    pub troops_to_deploy: u16,
    pub sets_traded: u32,
    pub next_trade_value: u16,
    pub deck_size: usize,
    pub discard_size: usize,
    pub active_players: Vec<PlayerId>,
    pub winner: Option<PlayerId>,
    pub pending: Option<Pending>,
    pub possible_actions: Vec<Action>,
    pub players: Vec<Player>,
    pub board: Board,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FortifyContext {
    pub from: TerritoryId,
    pub to: TerritoryId,
}

/// Selection carried between a prompt and the answer to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Pending {
    Attack(AttackContext),
    Fortify(FortifyContext),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum Action {
    Claim {
        territory: TerritoryId,
    },
    Deploy {
        territory: TerritoryId,
        max_armies: u16,
    },
    TradeCards,
    Attack {
        from: TerritoryId,
        to: TerritoryId,
        max_dice: u16,
    },
    DeclareAttackDice {
        max_dice: u16,
    },
    DeclareDefendDice {
        max_dice: u16,
    },
    Fortify {
        from: TerritoryId,
        to: TerritoryId,
        max_armies: u16,
    },
    Cancel,
    EndPhase,
}

#[derive(Debug)]
pub struct Game {
    pub players: Vec<Player>,
    pub board: Board,
    pub active_players: Vec<PlayerId>,
    pub current_turn: usize,
    pub round: usize,
    pub turn_phase: TurnPhase,
    pub deck: Deck,
    pub discard_pile: Vec<Card>,
    pub sets_traded: u32,
    pub conquered_territory: bool,
    pub fortified: bool,
    pub pending: Option<Pending>,
    pub winner: Option<PlayerId>,
    pub(crate) dice: Box<dyn DiceSource>,
    events: Vec<GameEvent>,
}

impl Game {
    /// Sets up a game from validated game data.
    ///
    /// A roster without preassigned territories starts in the claiming phase
    /// with turn order decided by a die roll; otherwise play begins with the
    /// first player's Deploy phase.
    pub fn new(config: GameConfig, dice: Box<dyn DiceSource>) -> Result<Self, ConfigError> {
        config.validate()?;

        let board = config.to_board();
        let mut deck = config.to_deck();
        deck.remove_mission_cards();
        deck.shuffle(&mut thread_rng());

        let players = config
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut player = Player::new(PlayerId(i), p.name.trim(), &p.colour);
                player.cards.add_all(GameConfig::player_cards(p));
                player.troops_to_deploy = p.troops_to_deploy;
                player
            })
            .collect();

        let mut game = Self {
            players,
            board,
            active_players: Vec::new(),
            current_turn: 0,
            round: 0,
            turn_phase: TurnPhase::Start,
            deck,
            discard_pile: Vec::new(),
            sets_traded: 0,
            conquered_territory: false,
            fortified: false,
            pending: None,
            winner: None,
            dice,
            events: Vec::new(),
        };

        if config.has_preassigned_territories() {
            for (i, player_config) in config.players.iter().enumerate() {
                for holding in &player_config.territories {
                    let territory = game
                        .board
                        .find(&holding.name)
                        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                    game.set_owner(territory, PlayerId(i));
                    game.board.territory_mut(territory).troops = holding.armies;
                }
            }
            game.active_players = (0..game.players.len()).map(PlayerId).collect();
            game.enter_phase(PhaseEvent::SetupComplete);
        } else {
            let initial = initial_troops(game.players.len());
            for player in &mut game.players {
                player.troops_to_deploy = initial;
            }
            game.roll_for_turn_order();
            let first = game.current_player();
            game.notify(GameEvent::PhaseChanged {
                player: first,
                phase: TurnPhase::Start,
            });
        }

        info!(
            players = game.players.len(),
            territories = game.board.territories.len(),
            deck = game.deck.len(),
            phase = ?game.turn_phase,
            "game created"
        );
        Ok(game)
    }

    /// Every player rolls once; higher rolls go first and ties keep roster order.
    fn roll_for_turn_order(&mut self) {
        let rolls: Vec<(PlayerId, u16)> = self
            .players
            .iter()
            .map(|p| p.id)
            .collect::<Vec<_>>()
            .into_iter()
            .map(|id| (id, self.dice.roll()))
            .collect();
        let ordered: Vec<(PlayerId, u16)> = rolls
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect();

        self.active_players = ordered.iter().map(|(id, _)| *id).collect();
        self.current_turn = 0;
        self.notify(GameEvent::TurnOrderDecided {
            order: self.active_players.clone(),
            rolls: ordered.iter().map(|(_, roll)| *roll).collect(),
        });
    }

    pub fn current_player(&self) -> PlayerId {
        self.active_players[self.current_turn]
    }

    pub fn current_phase(&self) -> TurnPhase {
        self.turn_phase
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players.get(id.0).ok_or(GameError::UnknownPlayer(id.0))
    }

    pub(crate) fn current_player_mut(&mut self) -> &mut Player {
        let id = self.current_player();
        &mut self.players[id.0]
    }

    pub fn territory_id(&self, name: &str) -> Result<TerritoryId, GameError> {
        self.board.find(name)
    }

    /// Moves ownership of `territory` to `player`, keeping both sides of the
    /// relation in step.
    pub(crate) fn set_owner(&mut self, territory: TerritoryId, player: PlayerId) {
        if let Some(previous) = self.board.territory(territory).owner {
            self.players[previous.0].territories.remove(&territory);
        }
        self.board.territory_mut(territory).owner = Some(player);
        self.players[player.0].territories.insert(territory);
    }

    pub(crate) fn notify(&mut self, event: GameEvent) {
        debug!(?event, "notify");
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Reinforcements for `player_id` at the start of their turn.
    pub fn calculate_reinforcements(&self, player_id: PlayerId) -> u16 {
        let player = &self.players[player_id.0];
        let continent_bonus: u16 = self
            .board
            .continents_held(&player.territories)
            .iter()
            .map(|c| self.board.continent(*c).bonus_armies)
            .sum();
        player.base_reinforcements() + continent_bonus
    }

    /// Places troops for the current player.
    ///
    /// In the Start phase this claims an empty territory (or, once the map is
    /// full, reinforces an owned one) with exactly one troop and passes the
    /// turn on. In the Deploy phase any amount up to the remaining pool may
    /// go to an owned territory; spending the last troop moves on to Attack.
    pub fn deploy_troops(&mut self, territory: TerritoryId, amount: u16) -> Result<(), GameError> {
        match self.turn_phase {
            TurnPhase::Start => self.place_initial_troop(territory, amount),
            TurnPhase::Deploy => self.reinforce(territory, amount),
            _ => Err(GameError::InvalidTransition(
                "troops can only be deployed during the start or deploy phase".to_string(),
            )),
        }
    }

    pub fn deploy_request(&self) -> Result<CountRequest, GameError> {
        let player = self.current_player();
        match self.turn_phase {
            TurnPhase::Start => Ok(CountRequest {
                kind: CountKind::DeployTroops,
                player,
                min: 1,
                max: 1,
            }),
            TurnPhase::Deploy => Ok(CountRequest {
                kind: CountKind::DeployTroops,
                player,
                min: 1,
                max: self.players[player.0].troops_to_deploy,
            }),
            _ => Err(GameError::InvalidTransition(
                "it's not a deployment phase".to_string(),
            )),
        }
    }

    fn place_initial_troop(&mut self, territory_id: TerritoryId, amount: u16) -> Result<(), GameError> {
        CountRequest {
            kind: CountKind::DeployTroops,
            player: self.current_player(),
            min: 1,
            max: 1,
        }
        .check(amount)?;

        let player_id = self.current_player();
        let territory = self.board.get_territory(territory_id)?;
        let (owner, name) = (territory.owner, territory.name.clone());
        match owner {
            None => {
                self.set_owner(territory_id, player_id);
                self.notify(GameEvent::TerritoryClaimed {
                    player: player_id,
                    territory: territory_id,
                });
            }
            Some(owner) if owner == player_id && self.board.all_territories_owned() => {}
            Some(_) if !self.board.all_territories_owned() => {
                return Err(GameError::InvalidTarget(format!(
                    "{} is taken while unclaimed territories remain",
                    name
                )))
            }
            Some(_) => {
                return Err(GameError::InvalidTarget(format!(
                    "{} belongs to another player",
                    name
                )))
            }
        }

        self.board.territory_mut(territory_id).troops += 1;
        self.current_player_mut().troops_to_deploy -= 1;
        self.notify(GameEvent::TroopsDeployed {
            player: player_id,
            territory: territory_id,
            amount: 1,
        });

        if self.players.iter().all(|p| p.troops_to_deploy == 0) {
            self.current_turn = 0;
            info!("initial placement complete");
            self.enter_phase(PhaseEvent::SetupComplete);
            return Ok(());
        }

        // Next player in order who still has troops to place.
        for step in 1..=self.active_players.len() {
            let candidate = (self.current_turn + step) % self.active_players.len();
            if self.players[self.active_players[candidate].0].troops_to_deploy > 0 {
                self.current_turn = candidate;
                break;
            }
        }
        Ok(())
    }

    fn reinforce(&mut self, territory_id: TerritoryId, amount: u16) -> Result<(), GameError> {
        let player_id = self.current_player();
        let available = self.players[player_id.0].troops_to_deploy;
        if amount == 0 {
            return Err(GameError::OutOfRange {
                value: amount,
                min: 1,
                max: available,
            });
        }
        if amount > available {
            return Err(GameError::InsufficientTroops {
                requested: amount,
                available,
            });
        }
        let territory = self.board.get_territory(territory_id)?;
        if !territory.is_owned_by(player_id) {
            return Err(GameError::InvalidTransition(format!(
                "{} does not belong to {} and claiming is over",
                territory.name, player_id
            )));
        }

        self.board.territory_mut(territory_id).troops += amount;
        self.current_player_mut().troops_to_deploy -= amount;
        debug!(player = %player_id, territory = %territory_id, amount, "troops deployed");
        self.notify(GameEvent::TroopsDeployed {
            player: player_id,
            territory: territory_id,
            amount,
        });

        if self.players[player_id.0].troops_to_deploy == 0 {
            self.advance_phase()?;
        }
        Ok(())
    }

    /// Selects a fortify move and asks for the number of troops.
    pub fn begin_fortify(&mut self, from: TerritoryId, to: TerritoryId) -> Result<CountRequest, GameError> {
        let max = self.validate_fortify(from, to)?;
        self.pending = Some(Pending::Fortify(FortifyContext { from, to }));
        Ok(CountRequest {
            kind: CountKind::FortifyTroops,
            player: self.current_player(),
            min: 0,
            max,
        })
    }

    pub fn confirm_fortify(&mut self, amount: u16) -> Result<(), GameError> {
        match self.pending {
            Some(Pending::Fortify(FortifyContext { from, to })) => self.fortify_positions(from, to, amount),
            _ => Err(GameError::InvalidTransition(
                "no fortify move has been selected".to_string(),
            )),
        }
    }

    /// Moves `amount` troops between two adjacent owned territories. Only one
    /// such move is allowed per turn.
    pub fn fortify_positions(&mut self, from: TerritoryId, to: TerritoryId, amount: u16) -> Result<(), GameError> {
        let available = self.validate_fortify(from, to)?;
        if amount > available {
            return Err(GameError::InsufficientTroops {
                requested: amount,
                available,
            });
        }

        self.board.territory_mut(from).troops -= amount;
        self.board.territory_mut(to).troops += amount;
        self.fortified = true;
        self.pending = None;

        let player = self.current_player();
        info!(player = %player, from = %from, to = %to, amount, "fortified");
        self.notify(GameEvent::Fortified {
            player,
            from,
            to,
            amount,
        });
        Ok(())
    }

    fn validate_fortify(&self, from: TerritoryId, to: TerritoryId) -> Result<u16, GameError> {
        if self.turn_phase != TurnPhase::Fortify {
            return Err(GameError::InvalidTransition(
                "it's not the fortification phase".to_string(),
            ));
        }
        if self.fortified {
            return Err(GameError::InvalidTransition(
                "troops were already moved this turn".to_string(),
            ));
        }
        let player = self.current_player();
        let source = self.board.get_territory(from)?;
        let target = self.board.get_territory(to)?;
        if !source.is_owned_by(player) || !target.is_owned_by(player) {
            return Err(GameError::InvalidTarget(
                "one or both territories do not belong to the player".to_string(),
            ));
        }
        if from == to || !source.is_adjacent(to) {
            return Err(GameError::InvalidTarget(format!(
                "{} is not adjacent to {}",
                target.name, source.name
            )));
        }
        Ok(source.available_troops())
    }

    /// Abandons a selected attack or fortify move before any counts were
    /// confirmed. An attack whose dice were already declared cannot be
    /// withdrawn.
    pub fn cancel_pending(&mut self) -> Result<(), GameError> {
        match self.pending {
            Some(Pending::Attack(AttackContext {
                attack_dice: Some(_),
                ..
            })) => Err(GameError::InvalidTransition(
                "dice were already requested for this attack".to_string(),
            )),
            Some(_) => {
                self.pending = None;
                Ok(())
            }
            None => Err(GameError::InvalidTransition("nothing to cancel".to_string())),
        }
    }

    /// True while every owned territory has troops, every empty territory is
    /// unowned, and players' territory sets agree with the board.
    pub fn ownership_consistent(&self) -> bool {
        let board_side = self
            .board
            .territories
            .iter()
            .all(|t| (t.troops >= 1) == t.owner.is_some());
        let player_side = self
            .players
            .iter()
            .all(|p| p.territories == self.board.territories_owned_by(p.id));
        board_side && player_side
    }

    pub fn get_game_state(&self) -> GameState {
        let players = self
            .players
            .iter()
            .map(|p| {
                let mut player = p.clone();
                player.total_armies = self.board.troops_owned_by(p.id);
                player.continents = self.board.continents_held(&p.territories);
                player
            })
            .collect();
        let current = self.current_player();

        GameState {
            current_player: self.players[current.0].name.clone(),
            current_player_id: current,
            round: self.round,
            turn_phase: self.turn_phase,
            conquered_territory: self.conquered_territory,
            troops_to_deploy: self.players[current.0].troops_to_deploy,
            sets_traded: self.sets_traded,
            next_trade_value: trade_value(self.sets_traded),
            deck_size: self.deck.len(),
            discard_size: self.discard_pile.len(),
            active_players: self.active_players.clone(),
            winner: self.winner,
            pending: self.pending,
            possible_actions: self.get_possible_actions(),
            players,
            board: self.board.clone(),
        }
    }

    pub fn get_possible_actions(&self) -> Vec<Action> {
        match (self.turn_phase, self.pending) {
            (TurnPhase::EndGame, _) => vec![],
            (TurnPhase::Start, _) => self.get_possible_claims(),
            (TurnPhase::Deploy, _) => {
                let mut actions = self.get_possible_reinforcements();
                if has_tradeable_set(&self.players[self.current_player().0].cards) {
                    actions.push(Action::TradeCards);
                }
                actions
            }
            (TurnPhase::Attack, Some(Pending::Attack(context))) => match context.attack_dice {
                None => vec![
                    Action::DeclareAttackDice {
                        max_dice: max_attack_dice(self.board.territory(context.attacker).troops),
                    },
                    Action::Cancel,
                ],
                Some(_) => vec![Action::DeclareDefendDice {
                    max_dice: max_defend_dice(self.board.territory(context.defender).troops),
                }],
            },
            (TurnPhase::Attack, _) => self.get_possible_attacks(),
            (TurnPhase::Fortify, _) => self.get_possible_fortifications(),
        }
    }

    fn get_possible_claims(&self) -> Vec<Action> {
        let player = self.current_player();
        let all_owned = self.board.all_territories_owned();
        self.board
            .territories
            .iter()
            .filter(|t| t.owner.is_none() || (all_owned && t.is_owned_by(player)))
            .map(|t| Action::Claim { territory: t.id })
            .collect()
    }

    fn get_possible_reinforcements(&self) -> Vec<Action> {
        let player = &self.players[self.current_player().0];
        if player.troops_to_deploy == 0 {
            return vec![];
        }
        player
            .territories
            .iter()
            .map(|&territory| Action::Deploy {
                territory,
                max_armies: player.troops_to_deploy,
            })
            .collect()
    }

    fn get_possible_attacks(&self) -> Vec<Action> {
        let player = self.current_player();
        let mut actions = Vec::new();
        for &from in &self.players[player.0].territories {
            let territory = self.board.territory(from);
            let max_dice = max_attack_dice(territory.troops);
            if max_dice == 0 {
                continue;
            }
            for &to in &territory.adjacent_territories {
                let target = self.board.territory(to);
                if target.owner.is_some() && !target.is_owned_by(player) {
                    actions.push(Action::Attack { from, to, max_dice });
                }
            }
        }
        actions.push(Action::EndPhase);
        actions
    }

    fn get_possible_fortifications(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.fortified {
            let player = self.current_player();
            for &from in &self.players[player.0].territories {
                let territory = self.board.territory(from);
                let max_armies = territory.available_troops();
                if max_armies == 0 {
                    continue;
                }
                for &to in &territory.adjacent_territories {
                    if self.board.territory(to).is_owned_by(player) {
                        actions.push(Action::Fortify { from, to, max_armies });
                    }
                }
            }
        }
        if let Some(Pending::Fortify(_)) = self.pending {
            actions.push(Action::Cancel);
        }
        actions.push(Action::EndPhase);
        actions
    }
}

/// Troops each player places during the claiming phase.
pub fn initial_troops(player_count: usize) -> u16 {
    40u16.saturating_sub((player_count.saturating_sub(2) as u16) * 5)
}
