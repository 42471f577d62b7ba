//! Channel Pulse - watches a video channel and reports to a Telegram chat.
//!
//! # Overview
//!
//! A poll loop reads the channel's public statistics and private analytics
//! once a minute. Subscriber and per-video view increases are announced as
//! they happen; every ten minutes a digest summarizes the channel against the
//! previous digest. The chat receiving all of this is bound by sending
//! `/start` to the bot.
//!
//! When the platform quota runs out the loop backs off for an hour instead of
//! hammering the API.
//!
//! # Modules
//!
//! - [`model`]: Snapshots, analytics windows, baselines and change events
//! - [`data_sources`]: YouTube Data and Analytics API clients
//! - [`detector`]: Change detection between consecutive polls
//! - [`report`]: Digest rendering
//! - [`cache`]: 24-hour cache for analytics windows
//! - [`baseline`]: Persistence of the last digest's counters
//! - [`storage`]: SQLite storage layer
//! - [`engine`]: The poll loop
//! - [`telegram`]: Bot API client and update types
//! - [`api`]: Webhook handlers
//! - [`auth`]: OAuth access tokens for the YouTube APIs
//!
//! # API Endpoints
//!
//! - `POST /telegram/webhook` - Bot updates (`/start`)
//! - `GET /health` - Health check

pub mod api;
pub mod auth;
pub mod baseline;
pub mod cache;
pub mod config;
pub mod data_sources;
pub mod detector;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod report;
pub mod storage;
pub mod telegram;
