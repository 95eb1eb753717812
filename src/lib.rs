//! # Trendscout
//!
//! A trend retrieval and ranking engine for social content platforms.
//!
//! Trendscout discovers recently-published content about a keyword across
//! reddit, youtube, and twitter. Each query is answered from the local
//! SQLite store when possible (vector similarity, with a lexical fallback
//! when no embedding can be produced) and fails over to a live concurrent
//! fetch across the platform adapters. Results are ranked by a
//! recency-decayed popularity score ("momentum") and newly seen content is
//! persisted idempotently in the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌────────────┐
//! │  Adapters    │──▶│  Orchestrator │◀──│  SQLite    │
//! │ reddit/yt/tw │   │ tiered search │   │ vec + LIKE │
//! └──────────────┘   └──────┬────────┘   └─────┬──────┘
//!                           │                  ▲
//!             ┌─────────────┤                  │
//!             ▼             ▼            background
//!        ┌──────────┐  ┌──────────┐       upsert
//!        │   CLI    │  │   HTTP   │──────────┘
//!        │ (trends) │  │  (axum)  │
//!        └──────────┘  └──────────┘
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! trends init                               # create database
//! trends search "ai" --platforms reddit,youtube --timeframe 24h
//! trends trending --window 24h              # most-queried keywords
//! trends serve                              # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`momentum`] | Recency-decayed popularity scoring |
//! | [`traits`] | Platform adapter trait and fan-out registry |
//! | [`connector_reddit`] | Reddit adapter |
//! | [`connector_youtube`] | YouTube adapter |
//! | [`connector_twitter`] | Twitter adapter |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persistence gateway over SQLite |
//! | [`search`] | Tiered retrieval orchestrator |
//! | [`ingest`] | Background persistence of fetched content |
//! | [`server`] | HTTP API server |

pub mod config;
pub mod connector_reddit;
pub mod connector_twitter;
pub mod connector_youtube;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod momentum;
pub mod search;
pub mod server;
pub mod store;
pub mod traits;
