//! Sumo Arena Server Library
//!
//! Authoritative multiplayer server for a real-time sumo arena game:
//! players push each other with directional impulses and the last one
//! left inside the circle wins. The server owns physics, room
//! membership, and match lifecycle; clients are thin renderers speaking
//! JSON over WebSocket.

pub mod config;
pub mod game;
pub mod lobby;
pub mod metrics;
pub mod net;
pub mod util;
