//! Class loading and verification core of a Java virtual machine.
//!
//! Class bytes come from plain class files, JAR archives or JDK JMOD modules.
//! They are parsed, format-checked and post-processed into [`runtime::Klass`]
//! entries held in the process-wide method area. Methods are resolved lazily
//! into the global method table by [`runtime::fetch_method_and_cp`].

pub mod class;
pub mod config;
pub mod consts;
pub mod descriptor;
pub mod error;
pub mod runtime;
pub mod string_pool;

pub use error::{Error, ExceptionKind, ExitCode, Result};
