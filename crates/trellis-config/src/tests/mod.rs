//! Unit tests for configuration discovery and materialization.

mod environment_tests;
mod settings_tests;
mod source_tests;
mod support;
