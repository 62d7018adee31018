//! End-to-end tests for the cache engine.
//!
//! These drive a full engine (executor, policies and tiers together) through realistic
//! scenarios, concurrent load and injected faults.


pub mod support;
