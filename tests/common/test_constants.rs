//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Region used for hosts created by integration tests.
pub const TEST_REGION: &str = "westeurope";

/// Tunnel token handed to test hosts.
pub const TEST_TOKEN: &str = "integration-s3cret";

/// Image configured for test provisioners.
pub const TEST_IMAGE: &str = "registry.example/inlets:test";
