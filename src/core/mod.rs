// ChatLog - core/mod.rs
//
// Core business logic layer: message model, list diff, reconciler.
// Dependencies: standard library, serde, chrono, tracing.
// Must NOT depend on: app, platform, locks, or threads.

pub mod diff;
pub mod model;
pub mod reconciler;
