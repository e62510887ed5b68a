// -*- mode: rust; -*-
//
// This file is part of spake25519.
// Portions derived from curve25519-dalek:
// Copyright (c) 2016-2021 isis lovecruft
// Copyright (c) 2016-2020 Henry de Valence
// See LICENSE for licensing information.

//! Code for fixed-window functionality: the signed-radix-16 lookup
//! table used by both scalar-multiplication ladders, and the 15-entry
//! table of bit-column multiples used to compute the SPAKE2 password
//! masks.

#![allow(non_snake_case)]

use core::fmt::Debug;

use subtle::Choice;
use subtle::ConditionallyNegatable;
use subtle::ConditionallySelectable;
use subtle::ConstantTimeEq;

use zeroize::Zeroize;

use crate::curve_models::AffineNielsPoint;
use crate::curve_models::ProjectiveNielsPoint;
use crate::edwards::EdwardsPoint;
use crate::traits::Identity;

/// A lookup table of precomputed multiples of a point \\(P\\), used to
/// compute \\( xP \\) for \\( -8 \leq x \leq 8 \\).
///
/// The computation of \\( xP \\) is done in constant time by the
/// `select` function.
///
/// Since `LookupTable` does not implement `Index`, it's more difficult
/// to accidentally read the table in a secret-dependent position.
#[derive(Copy, Clone)]
pub(crate) struct LookupTable<T>(pub(crate) [T; 8]);

impl<T> LookupTable<T>
where
    T: Identity + ConditionallySelectable + ConditionallyNegatable,
{
    /// Given \\(-8 \leq x \leq 8\\), return \\(xP\\) in constant time.
    pub(crate) fn select(&self, x: i8) -> T {
        debug_assert!(x >= -8);
        debug_assert!(x <= 8);

        // Compute xabs = |x|
        let xmask = (x as i16) >> 7;
        let xabs = ((x as i16) + xmask) ^ xmask;

        // Set t = 0 * P = identity
        let mut t = T::identity();
        for j in 1..9 {
            // Copy `points[j-1] == j*P` onto `t` in constant time if `|x| == j`.
            let c = (xabs as u16).ct_eq(&(j as u16));
            t.conditional_assign(&self.0[j - 1], c);
        }
        // Now t == |x| * P.

        let neg_mask = Choice::from((xmask & 1) as u8);
        t.conditional_negate(neg_mask);
        // Now t == x * P.

        t
    }
}

impl<T: Copy + Default> Default for LookupTable<T> {
    fn default() -> LookupTable<T> {
        LookupTable([T::default(); 8])
    }
}

impl<T: Debug> Debug for LookupTable<T> {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "LookupTable({:?})", &self.0)
    }
}

impl<'a> From<&'a EdwardsPoint> for LookupTable<ProjectiveNielsPoint> {
    fn from(P: &'a EdwardsPoint) -> Self {
        let mut points = [P.as_projective_niels(); 8];
        for j in 0..7 {
            points[j + 1] = (P + &points[j]).as_extended().as_projective_niels();
        }
        LookupTable(points)
    }
}

impl<'a> From<&'a EdwardsPoint> for LookupTable<AffineNielsPoint> {
    fn from(P: &'a EdwardsPoint) -> Self {
        let mut points = [P.as_affine_niels(); 8];
        for j in 0..7 {
            points[j + 1] = (P + &points[j]).as_extended().as_affine_niels()
        }
        LookupTable(points)
    }
}

impl<T> Zeroize for LookupTable<T>
where
    T: Copy + Default + Zeroize,
{
    fn zeroize(&mut self) {
        for x in self.0.iter_mut() {
            x.zeroize();
        }
    }
}

/// A table of 15 multiples of a mask base point \\(P\\), holding
/// $$
/// \[b\_3 2\^{192} + b\_2 2\^{128} + b\_1 2\^{64} + b\_0\] P
/// $$
/// at index \\( (b\_3 b\_2 b\_1 b\_0)\_2 - 1 \\) for each nonzero
/// choice of the four bits.
///
/// Walking a 256-bit scalar one bit-column at a time against this
/// table multiplies with 64 doublings and 64 mixed additions, a quarter
/// of the doublings a plain ladder would need, while the table stays
/// small enough to build at startup.  This is the layout of the SPAKE2
/// `M` and `N` tables, whose entries this construction reproduces
/// bit-for-bit.
#[derive(Copy, Clone)]
pub(crate) struct MaskPointTable([AffineNielsPoint; 15]);

impl MaskPointTable {
    /// Precompute the table of bit-column multiples of `point`.
    ///
    /// Runs in variable time; mask base points are public constants.
    pub(crate) fn create(point: &EdwardsPoint) -> MaskPointTable {
        // multiples[j] = 2^(64*j) * P
        let mut multiples = [*point; 4];
        for j in 0..3 {
            multiples[j + 1] = multiples[j].mul_by_pow_2(64);
        }

        let mut table = [AffineNielsPoint::identity(); 15];
        for i in 1..16usize {
            let mut sum = EdwardsPoint::identity();
            for (j, multiple) in multiples.iter().enumerate() {
                if (i >> j) & 1 == 1 {
                    sum = &sum + multiple;
                }
            }
            table[i - 1] = sum.as_affine_niels();
        }
        MaskPointTable(table)
    }

    /// Given \\(0 \leq index \leq 15\\), return the table entry for
    /// `index` (the identity for 0) in constant time over all entries.
    pub(crate) fn select(&self, index: u8) -> AffineNielsPoint {
        debug_assert!(index < 16);

        let mut e = AffineNielsPoint::identity();
        for j in 1..16u8 {
            e.conditional_assign(&self.0[(j - 1) as usize], index.ct_eq(&j));
        }
        e
    }

    /// Compute `a * P` where `P` is the table's base point and `a` is an
    /// unreduced 256-bit little-endian scalar.
    ///
    /// At bit offset `i`, the bits of `a` at positions `i`, `64+i`,
    /// `128+i` and `192+i` form the index of the table entry to add, so
    /// the loop does 64 doublings and 64 additions in total.  The scalar
    /// is secret: the table read is a constant-time select and there are
    /// no scalar-dependent branches.
    pub(crate) fn scalar_mul(&self, a: &[u8; 32]) -> EdwardsPoint {
        let mut h = EdwardsPoint::identity();
        for i in (0..64).rev() {
            let mut index: u8 = 0;
            for j in 0..4 {
                let bit = 1 & (a[(8 * j) + (i >> 3)] >> (i & 7));
                index |= bit << j;
            }

            let e = self.select(index);
            h = h.double();
            h = (&h + &e).as_extended();
        }
        h
    }
}

impl Debug for MaskPointTable {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        write!(f, "MaskPointTable({:?})", &self.0)
    }
}
