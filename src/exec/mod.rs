// src/exec/mod.rs

//! Process execution layer.
//!
//! Providers that wrap external tools (CSS compiler, arbitrary dev servers,
//! transformation commands) run them through [`process`], which forwards
//! output to tracing and the narrator and handles cooperative shutdown.

pub mod process;

pub use process::{CommandLine, ProcessSpec, run_to_completion, supervise};
