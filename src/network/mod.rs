//! Network module - Handles the TCP game sessions
//!
//! Provides:
//! - Server that advertises itself and accepts sessions
//! - Client that requests a session and plays its rounds
//! - Fixed-size packet connections shared by both

mod server;
mod client;
mod connection;

pub use server::*;
pub use client::*;
pub use connection::*;
