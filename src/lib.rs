#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::dbg_macro,
    clippy::doc_markdown,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::filter_map_next,
    clippy::fn_params_excessive_bools,
    clippy::implicit_clone,
    clippy::inefficient_to_string,
    clippy::large_types_passed_by_value,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_same_arms,
    clippy::match_wild_err_arm,
    clippy::mem_forget,
    clippy::mut_mut,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::todo,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::verbose_file_reads,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]

mod admin;
pub mod cli;
mod config;
mod dispatcher;
mod error;
mod job;
mod keys;
mod master;
mod materializer;
mod producer;
mod scheduler;
mod spawn;
mod store;
mod unit;

#[cfg(test)]
mod test_helper;

pub use crate::admin::{Admin, LogKind, LogView};
pub use crate::config::Config;
pub use crate::dispatcher::{DispatchError, Dispatcher};
pub use crate::error::ForemanError;
pub use crate::job::{DelayEnvelope, JobPayload, LogEntry};
pub use crate::keys::KeyLayout;
pub use crate::master::{Master, MasterOutcome};
pub use crate::materializer::DelayMaterializer;
pub use crate::producer::{AddOutcome, Lane, Producer};
pub use crate::scheduler::Scheduler;
pub use crate::spawn::{OsSpawn, Spawn};
pub use crate::store::Store;
pub use crate::unit::{UnitKind, WorkerUnit};
