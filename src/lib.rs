//! hnskim - a terminal Hacker News reader.
//!
//! The interesting part is the asynchronous state core:
//!
//! - [`deferred`] - "not started / in progress / resolved" values
//! - [`command`] - side-effect descriptions and the dispatcher that runs them
//! - [`app`] - the story list state machine and its event fold
//! - [`hn`] - the Hacker News API seam and its HTTP client
//!
//! [`ui`] draws state snapshots and feeds key presses back as events.

pub mod app;
pub mod command;
pub mod config;
pub mod deferred;
pub mod hn;
pub mod ui;
pub mod util;
