//! Command implementations behind the `portal` binary.

mod key;
mod request;
pub mod services;

pub use key::{KEY_NAMES, backoff_schedule, key_for};
pub use request::{parse_header_arg, parse_param, run_mutation, run_query};
pub use services::{Services, build_services};
