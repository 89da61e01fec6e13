//! Football prediction pool: tournament fixtures with a resolving bracket,
//! player predictions, fixed and relative (fsnorm) scoring and a leaderboard.
//!
//! The binary wires these together with a periodic update job and a
//! read-only HTTP dashboard; a chat transport drives [`pool::PoolEngine`]
//! the same way.

pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod pool;
pub mod results;
pub mod scoring;
pub mod tournament;
