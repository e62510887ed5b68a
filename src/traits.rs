// -*- mode: rust; -*-
//
// This file is part of spake25519.
// Portions derived from curve25519-dalek:
// Copyright (c) 2016-2021 isis lovecruft
// Copyright (c) 2016-2020 Henry de Valence
// See LICENSE for licensing information.

//! Module for common traits.

use subtle::ConstantTimeEq;

/// Trait for getting the identity element of a point type.
pub trait Identity {
    /// Returns the identity element of the curve.
    /// Can be used as a constructor.
    fn identity() -> Self;
}

/// Trait for testing if a curve point is equivalent to the identity point.
pub trait IsIdentity {
    /// Return true if this element is the identity element of the curve.
    fn is_identity(&self) -> bool;
}

/// Implement generic identity equality testing for a point representation
/// which has constant-time equality testing and a defined identity
/// constructor.
impl<T> IsIdentity for T
where
    T: ConstantTimeEq + Identity,
{
    fn is_identity(&self) -> bool {
        self.ct_eq(&T::identity()).into()
    }
}

/// A point built by group operations satisfies the curve equation by
/// construction; this check exists for debugging the intermediate
/// representations.  Not constant-time.
pub(crate) trait ValidityCheck {
    /// Checks whether the point is on the curve.
    fn is_valid(&self) -> bool;
}
