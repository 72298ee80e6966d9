pub mod bot_rooms;
pub mod manager;
pub mod room;
