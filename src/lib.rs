//! mailsweep — rule-driven triage for a Gmail mailbox.
//!
//! Fetched message metadata is matched against declarative rules
//! (`criteria` + `all`/`any` combinator) and matched messages receive
//! idempotent actions (mark-as-read, move to label) through the provider
//! API. First matching rule wins per record; failures are isolated per
//! action and reported in a run summary.

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod rules;
pub mod store;
