#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod agent;
pub mod app;
pub mod brain;
pub mod canvas;
pub mod cli;
pub mod config;
#[doc(hidden)]
pub mod diagnostics;
pub mod error;
#[doc(hidden)]
pub mod observability;
#[doc(hidden)]
pub mod platform;
pub mod snapshot;
pub mod transport;

pub use agent::{AgentRuntime, AgentScheduler, AgentState};
pub use brain::{Action, Brain};
pub use config::Config;
pub use error::AgentError;
