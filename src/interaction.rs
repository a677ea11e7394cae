use crate::combat::BattleReport;
use crate::error::GameError;
use crate::game::Game;
use crate::player::PlayerId;
use crate::territory::TerritoryId;
use serde::{Deserialize, Serialize};

/// How often `attack_with` asks the defender before giving up.
pub const MAX_DEFEND_PROMPTS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CountKind {
    AttackDice,
    DefendDice,
    DeployTroops,
    FortifyTroops,
}

/// A request for one user-chosen integer in `min..=max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountRequest {
    pub kind: CountKind,
    pub player: PlayerId,
    pub min: u16,
    pub max: u16,
}

impl CountRequest {
    pub fn check(&self, value: u16) -> Result<u16, GameError> {
        if (self.min..=self.max).contains(&value) {
            Ok(value)
        } else {
            Err(GameError::OutOfRange {
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Whoever answers the engine's questions: a UI, a script or a bot.
pub trait Interaction {
    fn request_count(&mut self, request: &CountRequest) -> u16;
}

impl<F> Interaction for F
where
    F: FnMut(&CountRequest) -> u16,
{
    fn request_count(&mut self, request: &CountRequest) -> u16 {
        self(request)
    }
}

impl Game {
    /// Runs a whole attack, asking `ui` for both dice counts.
    pub fn attack_with(
        &mut self,
        from: TerritoryId,
        to: TerritoryId,
        ui: &mut dyn Interaction,
    ) -> Result<BattleReport, GameError> {
        let request = self.start_attack(from, to)?;
        let defend = match self.declare_attack_dice(ui.request_count(&request)) {
            Ok(defend) => defend,
            Err(err) => {
                self.pending = None;
                return Err(err);
            }
        };
        // The attack cannot be withdrawn any more, so the defender is asked
        // again on an out of range answer. After the last attempt the attack
        // stays pending until `declare_defend_dice` gets a valid count.
        let mut attempts = 1;
        loop {
            match self.declare_defend_dice(ui.request_count(&defend)) {
                Err(GameError::OutOfRange { .. }) if attempts < MAX_DEFEND_PROMPTS => attempts += 1,
                result => return result,
            }
        }
    }

    pub fn fortify_with(
        &mut self,
        from: TerritoryId,
        to: TerritoryId,
        ui: &mut dyn Interaction,
    ) -> Result<u16, GameError> {
        let request = self.begin_fortify(from, to)?;
        let amount = ui.request_count(&request);
        match self.confirm_fortify(amount) {
            Ok(()) => Ok(amount),
            Err(err) => {
                self.pending = None;
                Err(err)
            }
        }
    }

    pub fn deploy_with(&mut self, territory: TerritoryId, ui: &mut dyn Interaction) -> Result<u16, GameError> {
        let request = self.deploy_request()?;
        let amount = ui.request_count(&request);
        self.deploy_troops(territory, amount)?;
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        let request = CountRequest {
            kind: CountKind::AttackDice,
            player: PlayerId(0),
            min: 1,
            max: 3,
        };
        assert_eq!(request.check(3), Ok(3));
        assert_eq!(
            request.check(0),
            Err(GameError::OutOfRange { value: 0, min: 1, max: 3 })
        );
    }

    #[test]
    fn closures_answer_requests() {
        let mut ui = |request: &CountRequest| request.max;
        let request = CountRequest {
            kind: CountKind::DefendDice,
            player: PlayerId(1),
            min: 1,
            max: 2,
        };
        assert_eq!(ui.request_count(&request), 2);
    }
}
