//! iOS battery bridge library.
//!
//! Exposes battery level and battery state sensors for iOS devices
//! registered with a home-automation hub.

pub mod config;
pub mod error;
pub mod hub;
pub mod input;
pub mod ios;
