//! AION Core
//!
//! Off-chain service for shielded deposits: keeps the ledger's Merkle root in
//! step with its append-only commitment list, stores depositors' notes and
//! serves inclusion proofs.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        AION Service                          │
//! │                                                              │
//! │  ┌─────────────┐   trigger / sync_now   ┌─────────────────┐  │
//! │  │  HTTP API   │ ─────────────────────► │  Sync Service   │  │
//! │  │  (axum)     │                        │  (one worker)   │  │
//! │  └──────┬──────┘                        └────────┬────────┘  │
//! │         │ notes                                  │ passes    │
//! │         ▼                                        ▼           │
//! │  ┌─────────────┐                        ┌─────────────────┐  │
//! │  │ Note Store  │                        │ Root            │  │
//! │  │ (RocksDB)   │                        │ Synchronizer    │  │
//! │  └─────────────┘                        └────────┬────────┘  │
//! │                                                  │           │
//! └──────────────────────────────────────────────────┼───────────┘
//!                                                    ▼
//!                                        Ledger (memory | JSON-RPC)
//! ```

pub mod api;
pub mod config;
pub mod ledger;
pub mod storage;
pub mod sync;
