// tests/common/mod.rs

// The suites share their bootstrap through the test-utils crate; this
// module only re-exports the pieces every test file starts with.
pub use termrun_test_utils::init_tracing;
