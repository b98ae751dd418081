pub mod account;
pub mod candidate;
pub mod events;
pub mod game_record;
pub mod queue;
pub mod reward;
pub mod room;
pub mod transaction;
