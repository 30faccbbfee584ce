pub mod game_service;
pub mod match_engine;
pub mod night_resolver;
pub mod room_service;
pub mod vote_resolver;
pub mod win_evaluator;

pub use game_service::GameError;
