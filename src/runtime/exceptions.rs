//! Hooks through which the core reports Java exceptions to its host.

use std::{process, sync::LazyLock};

use log::error;
use parking_lot::RwLock;

use crate::error::{Error, ExceptionKind, ExitCode};

/// Returns `true` when the exception was thrown into running Java code and
/// control will not come back to the caller in any meaningful way.
pub type ThrowHandler = fn(ExceptionKind, &str) -> bool;

static THROW_HANDLER: LazyLock<RwLock<ThrowHandler>> =
    LazyLock::new(|| RwLock::new(log_exception));

fn log_exception(kind: ExceptionKind, msg: &str) -> bool {
    error!("{kind}: {msg}");
    false
}

pub fn set_throw_handler(handler: ThrowHandler) {
    *THROW_HANDLER.write() = handler;
}

pub fn throw_exception(kind: ExceptionKind, msg: &str) -> bool {
    let handler = *THROW_HANDLER.read();
    handler(kind, msg)
}

/// Reports `err` through the throw handler and hands it back for the caller to return.
pub fn throw_error(err: Error) -> Error {
    throw_exception(err.kind(), &err.to_string());
    err
}

pub fn minimal_abort(kind: ExceptionKind, msg: &str) -> ! {
    error!("aborting on {kind}: {msg}");
    eprintln!("{kind}: {msg}");
    process::exit(ExitCode::JvmException.into())
}
