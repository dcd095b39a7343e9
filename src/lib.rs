//! booty: declarative workstation provisioning.
//!
//! Targets declare how to check and how to install a piece of system state.
//! Recipes are reusable, parameterized setup/check templates. Dependencies
//! order the install pass, and a failed target skips everything that
//! depends on it.

pub mod cli;
pub mod core;
pub mod journal;
pub mod transport;
