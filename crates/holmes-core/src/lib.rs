//! Core types and trait definitions for the Holmes review engine.
//!
//! A review is one inspection pass over a monitored page. This crate owns the
//! review state machine, the fact/violation ledgers, and the day-boundary rule
//! the page reconciler applies. It has no HTTP or database
//! dependencies; storage backends implement [`store::ReviewStore`].

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures where they matter.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod error;
pub mod limiter;
pub mod page;
pub mod reconcile;
pub mod review;
pub mod store;
pub mod worker;

pub use error::{Classify, Error, ErrorClass, Result};
