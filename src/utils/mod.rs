pub mod members;
pub mod messages;
pub mod nicknames;
