//! Hacker News API collaborators.
//!
//! This module provides everything the state machine needs from the outside
//! world, and nothing more:
//!
//! - **Types**: [`Category`], [`ItemId`], [`StoryItem`]
//! - **Seam**: the [`StorySource`] trait (story index + story detail fetch)
//! - **Client**: [`HnClient`], the `reqwest` implementation of the seam
//!
//! # Architecture
//!
//! - [`types`] - Categories and decoded story records
//! - [`client`] - HTTP fetching with timeout, size limit and JSON decoding
//!
//! Both fetch operations classify every failure (transport, HTTP status,
//! oversized body, decode) as a [`FetchError`]. A caller sees either a fully
//! decoded value or an error, never a partially populated record.

mod client;
mod types;

pub use client::{FetchError, HnClient, StorySource, DEFAULT_BASE_URL};
pub use types::{Category, ItemId, StoryItem, MAX_STORIES};
