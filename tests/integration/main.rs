//! Integration tests for the token lifecycle over an in-memory store.

mod helpers;

mod config_test;
mod invalidation_test;
mod rotation_test;
mod scenario_test;
mod session_test;
mod verification_test;
