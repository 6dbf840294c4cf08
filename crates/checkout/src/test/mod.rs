//! Shared wiring for service-level tests.

pub mod helpers;

pub use context::TestContext;
pub use helpers::StubGateway;
