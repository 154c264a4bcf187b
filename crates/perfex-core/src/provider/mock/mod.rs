//! In-memory counter backend for tests and demo mode.

mod provider;
mod scenarios;

pub use provider::MockProvider;
