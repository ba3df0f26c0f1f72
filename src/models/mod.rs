pub mod common;
pub mod fixture;
pub mod player;
