// ChatLog - app/mod.rs
//
// Application layer: the shared store, subscriptions, the background
// reconciler, and the producer/view collaborators.
// Dependencies: core layer, util.
// Must NOT depend on: platform specifics beyond the validated AppConfig.

pub mod clock;
pub mod compose;
pub mod reconcile;
pub mod state;
pub mod store;
pub mod view;
