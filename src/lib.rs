// lib.rs
pub mod board;
pub mod card;
pub mod combat;
pub mod continent;
pub mod deck;
pub mod dice;
pub mod error;
pub mod event;
pub mod game;
pub mod game_config;
pub mod interaction;
pub mod player;
pub mod territory;
pub mod trade;
pub mod turn_phase;
