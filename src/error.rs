//! Crate-level errors.
//!
//! # Error Hierarchy
//!
//! The crate uses a two-layer error hierarchy:
//!
//! ## Mesh Layer (`crate::mesh::error`)
//!
//! - [`MeshError`]: membership, consensus submission, and handshake errors
//! - Has `to_api_error()` for mapping into the administrative surface
//!
//! ## Dispatcher Layer (`crate::events`)
//!
//! - [`RegistrationError`]: handler registration configuration errors
//!   (capability mismatches, invalid `include` values, unsupported versions)
//!
//! ## Conversion
//!
//! Both subsystem errors convert into the top-level [`Error`] via `From`
//! impls, so integration code can use a single [`Result`] alias.
//!
//! [`MeshError`]: crate::mesh::MeshError
//! [`RegistrationError`]: crate::events::RegistrationError

use std::{io, result};

use thiserror::Error as ThisError;

use crate::events::RegistrationError;
use crate::mesh::MeshError;

pub type Result<T> = result::Result<T, Error>;

/// Top-level controller error.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Mesh membership or consistency error.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// Event handler registration error.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// I/O error from the surrounding process plumbing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid controller configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
