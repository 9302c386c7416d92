//! Watch a local directory, deploy it to static hosting on changes and show the
//! status in the menu bar.
//!
//! ## How it works
//!
//! `syncbar` is run by a menu bar app (xbar, SwiftBar) every few seconds. Every
//! run is one **poll**: it fingerprints the directory with a **check**, compares
//! it to the **state** saved by the previous run, starts or continues a
//! **deploy**, and prints the **rendered** menu.
//!
//! ```ignore
//! +-------+       +-------+       +--------+       +--------+
//! | check | ----> | state | ----> | deploy | ----> | render |
//! +-------+       +-------+       +--------+       +--------+
//! ```
//!
//! The state machine goes `IDLE -> NEEDS_DEPLOY -> DEPLOYING -> IDLE`, one step
//! per run, so the menu shows a queued and a running deploy before the upload.
//! In `watch` mode the polls are started by **triggers** in a single long running
//! process instead.
//!

/// A check is a process that fingerprints the directory or tests the network.
pub mod checks;
/// The configuration file, overridden by the command line.
pub mod config;
/// A deploy uploads the directory to the hosting provider.
pub mod deploy;
/// The state machine, one step per invocation.
pub mod poll;
/// Rendering the status in the menu bar format.
pub mod render;
/// The state shared by the invocations.
pub mod state;
/// A trigger is a long running background process, which initiates the polls
/// (e.g. [on a schedule](triggers::schedule::ScheduleTrigger) or
/// [once](triggers::once::OnceTrigger)).
pub mod triggers;

/// The watch loop, that polls on every trigger.
pub mod start;
