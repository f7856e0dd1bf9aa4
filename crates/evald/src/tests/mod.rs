//! Test suites for the evaluation daemon.

mod support;
mod unit;
