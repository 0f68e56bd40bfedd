//! Client-side runtime for the fraud risk-scoring demo dashboard: persisted
//! session preferences, a bounded request-history ledger, an API gateway
//! client, a read-only access gate, and a pure bar-chart layout engine.

pub mod access;
pub mod api;
pub mod chart;
pub mod config;
pub mod history;
pub mod logging;
pub mod session;
pub mod store;
