// -*- mode: rust; -*-
//
// This file is part of spake25519.
// Portions derived from curve25519-dalek:
// Copyright (c) 2016-2021 isis lovecruft
// Copyright (c) 2016-2020 Henry de Valence
// See LICENSE for licensing information.

//! # spake25519
//!
//! A pure-Rust implementation of the SPAKE2 password-authenticated key
//! exchange over the edwards25519 curve, wire-compatible with
//! BoringSSL's `SPAKE2_CTX` implementation.
//!
//! Each party constructs a [`Spake2Context`] with its role and the two
//! identity strings, sends the 32-byte output of
//! [`generate_message`](Spake2Context::generate_message), and feeds the
//! peer's message to
//! [`process_message`](Spake2Context::process_message) to obtain a
//! 64-byte shared secret.  The secrets agree exactly when both sides
//! used the same password and identities.
//!
//! The curve arithmetic underneath — field elements in the ten-limb
//! "ref10" representation, four mixed point models, and constant-time
//! table-driven scalar multiplication — is exposed through the
//! [`edwards`], [`scalar`], and [`constants`] modules for callers that
//! need the group without the protocol.
//!
//! # Security notes
//!
//! Scalar multiplications, table lookups, and conditional moves on
//! secret data are constant-time with respect to the secrets.  Point
//! decoding and identity handling are variable-time; they operate only
//! on peer-controlled public data.  Deriving a shared secret is not
//! key confirmation — see the [`spake2`] module documentation.

#![deny(missing_docs)]
#![allow(clippy::needless_range_loop)]

#[macro_use]
mod macros;

pub mod constants;
mod curve_models;
pub mod edwards;
pub mod errors;
mod field;
pub mod scalar;
pub mod spake2;
pub mod traits;
mod window;

pub use crate::errors::Spake2Error;
pub use crate::spake2::{Spake2Context, Spake2Role};
