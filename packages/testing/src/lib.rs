#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in the event channel workspace.

mod call_counter;
mod watchdog;

pub use call_counter::*;
pub use watchdog::*;
