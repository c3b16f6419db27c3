//! Reservation hold-queue engine for a multi-tenant library system.
//!
//! When every copy of a title is loaned out, patrons join a per-title FIFO
//! waiting list. A returned copy promotes the oldest waiting hold into a
//! bounded pickup window; if the window lapses the hold is forfeited and the
//! next patron in line is promoted automatically.

pub mod catalog;
pub mod core;
pub mod gateway;
pub mod hold;
pub mod scheduler;
pub mod utils;
