// -*- mode: rust; -*-
//
// This file is part of spake25519.
// See LICENSE for licensing information.

//! Errors which may occur while running the SPAKE2 protocol.

use core::fmt;
use core::fmt::Display;

/// Errors raised by a [`Spake2Context`](crate::spake2::Spake2Context).
///
/// The error set is small and fixed: the protocol never retries
/// internally, and every failure is surfaced to the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Spake2Error {
    /// An operation was called in a state that does not permit it,
    /// including any use of a destroyed context.
    InvalidState,
    /// The peer's message did not have the expected length.
    InvalidArgument,
    /// The peer's 32-byte message does not decode to a curve point.
    InvalidPoint,
}

impl Display for Spake2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Spake2Error::InvalidState => write!(f, "operation not permitted in the current state"),
            Spake2Error::InvalidArgument => write!(f, "peer message is not 32 bytes"),
            Spake2Error::InvalidPoint => write!(f, "point received from peer was not on the curve"),
        }
    }
}

impl std::error::Error for Spake2Error {}
