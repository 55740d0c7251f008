//! FreeDesk firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;
pub mod tasks;

// The ESP-IDF-only pieces live behind cfg attributes inside these modules;
// on the host they compile to simulation stubs.
pub mod adapters;
pub mod drivers;
