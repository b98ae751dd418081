pub mod connect;
pub mod default;
pub mod disconnect;
pub mod find_match;
pub mod game_over;
pub mod join_room;
pub mod make_move;
