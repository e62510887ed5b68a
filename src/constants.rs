// -*- mode: rust; -*-
//
// This file is part of spake25519.
// Portions derived from curve25519-dalek:
// Copyright (c) 2016-2021 isis lovecruft
// Copyright (c) 2016-2020 Henry de Valence
// See LICENSE for licensing information.

//! This module contains various constants (such as curve parameters
//! and useful field elements like `sqrt(-1)`), as well as the
//! precomputed table of basepoint multiples.
//!
//! Field constants are in the ten-limb radix-\\(2^{25.5}\\)
//! representation, scalar constants in the five-limb 52-bit
//! representation.

use once_cell::sync::Lazy;

use crate::edwards::EdwardsBasepointTable;
use crate::edwards::EdwardsPoint;
use crate::field::FieldElement;
use crate::scalar::UnpackedScalar;

/// Edwards `d` value, equal to `-121665/121666 mod p`.
pub(crate) const EDWARDS_D: FieldElement = FieldElement([
    56195235, 13857412, 51736253,  6949390,   114729,
    24766616, 60832955, 30306712, 48412415, 21499315,
]);

/// Edwards `2*d` value, equal to `2*(-121665/121666) mod p`.
pub(crate) const EDWARDS_D2: FieldElement = FieldElement([
    45281625, 27714825, 36363642, 13898781,  229458,
    15978800, 54557047, 27058993, 29715967,  9444199,
]);

/// Precomputed value of one of the square roots of -1 (mod p).
pub(crate) const SQRT_M1: FieldElement = FieldElement([
    34513072, 25610706,  9377949,  3500415, 12389472,
    33281959, 41962654, 31548777,   326685, 11406482,
]);

/// `L` is the order of the base point,
/// i.e. \\(\ell = 2^{252} + 27742317777372353535851937790883648493\\).
pub(crate) const L: UnpackedScalar = UnpackedScalar([
    0x0002631a5cf5d3ed,
    0x000dea2f79cd6581,
    0x000000000014def9,
    0x0000000000000000,
    0x0000100000000000,
]);

/// `L` * `LFACTOR` = -1 (mod 2^52)
pub(crate) const LFACTOR: u64 = 0x51da312547e1b;

/// `R` = R % L where R = 2^260
pub(crate) const R: UnpackedScalar = UnpackedScalar([
    0x000f48bd6721e6ed,
    0x0003bab5ac67e45a,
    0x000fffffeb35e51b,
    0x000fffffffffffff,
    0x00000fffffffffff,
]);

/// `RR` = (R^2) % L where R = 2^260
pub(crate) const RR: UnpackedScalar = UnpackedScalar([
    0x0009d265e952d13b,
    0x000d63c715bea69f,
    0x0005be65cb687604,
    0x0003dceec73d217f,
    0x000009411b7c309a,
]);

/// The little-endian bytes of the group order \\( \ell \\) itself.
///
/// The SPAKE2 password-scalar adjustment adds small multiples of
/// \\( \ell \\) to an unreduced 256-bit scalar, so it consumes the
/// order in packed form.
pub(crate) const BASEPOINT_ORDER_BYTES: [u8; 32] = [
    0xed, 0xd3, 0xf5, 0x5c, 0x1a, 0x63, 0x12, 0x58,
    0xd6, 0x9c, 0xf7, 0xa2, 0xde, 0xf9, 0xde, 0x14,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10,
];

/// The Ed25519 basepoint, as an `EdwardsPoint`.
///
/// This is called `_POINT` to distinguish it from
/// `ED25519_BASEPOINT_TABLE`, which should be used for scalar
/// multiplication (it's much faster).
pub const ED25519_BASEPOINT_POINT: EdwardsPoint = EdwardsPoint {
    X: FieldElement([
        52811034, 25909283, 16144682, 17082669, 27570973,
        30858332, 40966398,  8378388, 20764389,  8758491,
    ]),
    Y: FieldElement([
        40265304, 26843545, 13421772, 20132659, 26843545,
         6710886, 53687091, 13421772, 40265318, 26843545,
    ]),
    Z: FieldElement([1, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
    T: FieldElement([
        28827043, 27438313, 39759291,   244362,  8635006,
        11264893, 19351346, 13413597, 16611511, 27139452,
    ]),
};

/// A radix-16 table of multiples of the Ed25519 basepoint, built on
/// first use.
///
/// The table contents are a pure function of
/// [`ED25519_BASEPOINT_POINT`]; construction costs 32 rows of eight
/// additions each and is paid once per process.
pub static ED25519_BASEPOINT_TABLE: Lazy<EdwardsBasepointTable> =
    Lazy::new(|| EdwardsBasepointTable::create(&ED25519_BASEPOINT_POINT));

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::FieldElement;
    use crate::traits::ValidityCheck;

    #[test]
    fn test_sqrt_minus_one() {
        let minus_one = FieldElement::MINUS_ONE;
        let sqrt_m1_sq = SQRT_M1.square();
        assert_eq!(minus_one, sqrt_m1_sq);
    }

    #[test]
    fn test_d_vs_ratio() {
        // Test that d = -121665/121666
        let a = -(&FieldElement([121665, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
        let b = FieldElement([121666, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let d = &a * &b.invert();
        let d2 = &d + &d;
        assert_eq!(d, EDWARDS_D);
        assert_eq!(d2, EDWARDS_D2);
    }

    #[test]
    fn basepoint_is_valid() {
        assert!(ED25519_BASEPOINT_POINT.is_valid());
    }

    #[test]
    fn l_bytes_match_unpacked_order() {
        assert_eq!(L.to_bytes(), BASEPOINT_ORDER_BYTES);
    }
}
