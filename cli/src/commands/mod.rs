//! CLI Commands

mod connect;
mod decrypt;
mod demo;
mod info;
mod init;
mod players;
mod vote;

pub use decrypt::DecryptCommand;
pub use demo::DemoCommand;
pub use info::InfoCommand;
pub use init::InitCommand;
pub use players::PlayersCommand;
pub use vote::VoteCommand;
