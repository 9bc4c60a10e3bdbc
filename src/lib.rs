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

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod observability;
pub mod operation;
pub mod poller;
pub mod problem;
pub mod scrapi;
pub mod statement;

pub use config::{EngineArgs, ScrapiConfig};
pub use engine::{TransparencyEngine, create_engine};
pub use error::{ConfigError, Result, ScrapiError, StatementError};
pub use operation::{OperationRecord, OperationStatus, RegistrationOutcome, Resolution};
pub use poller::{PollOutcome, PollPolicy, PollState, RegistrationPoller, SyncRegistration};
pub use problem::ProblemDetails;
pub use scrapi::Scrapi;
pub use statement::{Receipt, SignedStatement};
