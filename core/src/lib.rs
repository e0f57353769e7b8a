//! Engagement-milestone engine.
//!
//! Watches behavioural counters reported by the calculator UI, decides
//! when an upsell prompt (modal or banner) should surface, and caps how
//! often modals interrupt the user. State survives restarts through a
//! string-keyed durable store.
//!
//! Start at [`engine::MilestoneEngine`].

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod frequency;
pub mod persistence;
pub mod presentation;
pub mod registry;
pub mod stats;
pub mod store;
pub mod types;
