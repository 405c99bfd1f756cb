//! rspp-mock
//!
//! Deterministic and dynamically-controllable [`rspp_core::Adapter`]
//! implementations for tests: a static mock driven by scripted fixtures, and
//! a dynamic mock whose behavior a test can reconfigure mid-run through a
//! [`DynamicMockController`].

mod dynamic;
mod static_adapter;

pub use dynamic::{DynamicMockAdapter, DynamicMockController, MockBehavior, StreamBehavior};
pub use static_adapter::StaticMockAdapter;
