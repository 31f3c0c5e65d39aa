//! Failsafe daemon library.
//!
//! The daemon owns the single `SystemState`, mutates it through the
//! controller, drives timed recovery through the scheduler, and exposes the
//! IPC surface consumed by `failsafectl`.

pub mod auth;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod persist;
pub mod rpc;
pub mod scheduler;
