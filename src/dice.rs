use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::fmt::Debug;

/// Source of die faces in `1..=6`.
pub trait DiceSource: Debug + Send {
    fn roll(&mut self) -> u16;

    fn roll_many(&mut self, count: u16) -> Vec<u16> {
        (0..count).map(|_| self.roll()).collect()
    }
}

#[derive(Debug)]
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceSource for RandomDice {
    fn roll(&mut self) -> u16 {
        self.rng.gen_range(1..=6)
    }
}

/// Replays a fixed sequence of faces, then falls back to sixes.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDice {
    faces: VecDeque<u16>,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u16>) -> Self {
        Self {
            faces: faces.into_iter().collect(),
        }
    }

    pub fn push(&mut self, faces: impl IntoIterator<Item = u16>) {
        self.faces.extend(faces);
    }

    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> u16 {
        self.faces.pop_front().unwrap_or(6).clamp(1, 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_dice_stay_in_range() {
        let mut dice = RandomDice::seeded(7);
        assert!(dice.roll_many(500).iter().all(|&face| (1..=6).contains(&face)));
    }

    #[test]
    fn scripted_dice_replay_in_order() {
        let mut dice = ScriptedDice::new([3, 1, 5]);
        assert_eq!(dice.roll_many(3), vec![3, 1, 5]);
        assert_eq!(dice.roll(), 6);
    }
}
