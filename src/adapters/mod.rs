pub mod cli;
pub mod discord;
