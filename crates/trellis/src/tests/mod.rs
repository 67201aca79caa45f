//! Test suites for the assembly engine.

mod behaviour;
mod support;
