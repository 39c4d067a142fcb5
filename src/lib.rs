//! # undokv
//!
//! A versioned, in-memory index overlay on top of a persistent ordered
//! key/value store.
//!
//! An [`idx::Index`] is an ordered collection of uniquely-identified
//! records together with a stack of undo states. Opening an undo session
//! stages a batch of inserts, modifications and deletions, which can then
//! be committed, discarded, or collapsed into the enclosing batch, nested
//! to arbitrary depth. A [`dbs::Database`] coordinates several indexes so
//! that they progress through revisions in lockstep, and wraps the
//! external key/value store behind the [`kvs`] adapter boundary.
//!
//! This is the foundational data layer for systems which must evaluate
//! speculative sequences of transactions and roll back to a previous
//! logical revision on conflict.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod dbs;
pub mod err;
pub mod idx;
pub mod kvs;
