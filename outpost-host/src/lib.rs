//! # outpost-host — Host Integration for Outpost
//!
//! This crate wires the host-agnostic `outpost-core` library to a running
//! game host. The host supplies two capabilities, a key/value store and an
//! entity query; everything else is built here.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Game host                │
//! │   tick loop ─┬─ scan(observer)           │
//! │              └─ conquer_at(player, pos)  │
//! │  ┌────────────────────────────────────┐  │
//! │  │           outpost-host             │  │
//! │  │  ┌────────────┐  ┌──────────────┐  │  │
//! │  │  │  Scanner   │  │    Gate      │  │  │
//! │  │  └─────┬──────┘  └──────┬───────┘  │  │
//! │  │        ▼                ▼          │  │
//! │  │    ┌──────────────────────────┐    │  │
//! │  │    │       outpost-core       │    │  │
//! │  │    └──────────────────────────┘    │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `addon` — the assembled [`Outpost`] value, config and store loading
//! - `scanner` — timed detection runs feeding the village cache
//! - `gate` — conquest reward checks
//! - `logging` — tracing subscriber setup

pub mod addon;
pub mod gate;
pub mod logging;
pub mod scanner;

pub use addon::{load_config, open_store, Outpost};
pub use gate::ConquestOutcome;
pub use scanner::{DiscoveryScanner, ScanReport};
