// ChatLog - lib.rs
//
// Library entry point, exposing the store, diff engine, and reconciler for
// the `chatlog` binary, integration tests, and embedding in other programs.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
