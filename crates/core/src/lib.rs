//! Functional core for skymail.
//!
//! Holds the domain types, error kinds, storage and collaborator traits, and
//! the pure helpers (token codes, expiry and freshness checks, city name
//! canonicalisation). Nothing in this crate performs network or disk I/O.

pub mod integrations;
pub mod storage;
pub mod subscription;
