//! Identity administration server: process wiring shared by the binary and its tests.

pub mod server;

pub use server::Server;
