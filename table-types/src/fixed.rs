//! fixed-point numerical types

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// shared between Fixed and F2Dot14
macro_rules! fixed_impl {
    ($name:ident, $bits:literal, $fract_bits:literal, $ty:ty) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(transparent)]
        #[doc = concat!(stringify!($bits), "-bit signed fixed point number with ", stringify!($fract_bits), " bits of fraction." )]
        pub struct $name($ty);

        impl $name {
            /// Minimum value.
            pub const MIN: Self = Self(<$ty>::MIN);

            /// Maximum value.
            pub const MAX: Self = Self(<$ty>::MAX);

            /// This type's smallest representable value
            pub const EPSILON: Self = Self(1);

            /// Representation of 0.0.
            pub const ZERO: Self = Self(0);

            /// Representation of 1.0.
            pub const ONE: Self = Self(1 << $fract_bits);

            const INT_MASK: $ty = !0 << $fract_bits;
            const FRACT_BITS: usize = $fract_bits;

            /// Creates a new fixed point value from the underlying bit representation.
            #[inline(always)]
            pub const fn from_bits(bits: $ty) -> Self {
                Self(bits)
            }

            /// Returns the underlying bit representation of the value.
            #[inline(always)]
            pub const fn to_bits(self) -> $ty {
                self.0
            }

            /// Creates a fixed point value from an integer, saturating on overflow.
            pub fn from_i32(int: i32) -> Self {
                let bits = (int as i64) << $fract_bits;
                Self(bits.clamp(<$ty>::MIN as i64, <$ty>::MAX as i64) as $ty)
            }

            /// Returns the largest integer less than or equal to the number.
            pub fn floor(self) -> Self {
                Self(self.0 & Self::INT_MASK)
            }

            /// Returns the fractional part of the number.
            pub fn fract(self) -> Self {
                Self(self.0 - self.floor().0)
            }

            /// Returns the absolute value of the number.
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            /// Saturating addition.
            pub fn saturating_add(self, other: Self) -> Self {
                Self(self.0.saturating_add(other.0))
            }

            /// Saturating subtraction.
            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }

            /// Returns the value as an `f64`.
            ///
            /// This operation is lossless: all representable values can be
            /// round-tripped.
            pub fn to_f64(self) -> f64 {
                let int = ((self.0 & Self::INT_MASK) >> Self::FRACT_BITS) as f64;
                let fract = (self.0 & !Self::INT_MASK) as f64 / Self::ONE.0 as f64;
                int + fract
            }

            /// Creates a fixed point value from an `f64`.
            ///
            /// This operation is lossy; the float will be rounded to the nearest
            /// representable value.
            pub fn from_f64(x: f64) -> Self {
                Self((x * Self::ONE.0 as f64).round() as $ty)
            }
        }

        impl Add for $name {
            type Output = Self;
            #[inline(always)]
            fn add(self, other: Self) -> Self {
                // same overflow semantics as std: panic in debug, wrap in release
                Self(self.0 + other.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, other: Self) {
                *self = *self + other;
            }
        }

        impl Sub for $name {
            type Output = Self;
            #[inline(always)]
            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, other: Self) {
                *self = *self - other;
            }
        }

        impl Neg for $name {
            type Output = Self;
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        //hack: we can losslessly go to float, so use those fmt impls
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.to_f64().fmt(f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.to_f64().fmt(f)
            }
        }

        crate::raw::newtype_scalar!($name, [u8; $bits / 8]);
    };
}

fixed_impl!(F2Dot14, 16, 14, i16);
fixed_impl!(Fixed, 32, 16, i32);

impl From<F2Dot14> for Fixed {
    fn from(src: F2Dot14) -> Fixed {
        Fixed::from_bits((src.to_bits() as i32) << 2)
    }
}

#[cfg(test)]
mod tests {
    #![allow(overflowing_literals)] // we want to specify byte values directly
    use super::*;
    use crate::Scalar;

    #[test]
    fn f2dot14_floats() {
        // Examples from https://docs.microsoft.com/en-us/typography/opentype/spec/otff#data-types
        assert_eq!(F2Dot14(0x7fff), F2Dot14::from_f64(1.999939));
        assert_eq!(F2Dot14(0x7000), F2Dot14::from_f64(1.75));
        assert_eq!(F2Dot14(0x0001), F2Dot14::from_f64(0.0000610356));
        assert_eq!(F2Dot14(0x0000), F2Dot14::from_f64(0.0));
        assert_eq!(F2Dot14(0xffff), F2Dot14::from_f64(-0.000061));
        assert_eq!(F2Dot14(0x8000), F2Dot14::from_f64(-2.0));
    }

    #[test]
    fn roundtrip_f2dot14() {
        for i in i16::MIN..=i16::MAX {
            let val = F2Dot14(i);
            assert_eq!(val, F2Dot14::from_f64(val.to_f64()));
        }
    }

    #[test]
    fn fixed_floats() {
        assert_eq!(Fixed(0x7fff_0000), Fixed::from_f64(32767.));
        assert_eq!(Fixed(0x7000_0001), Fixed::from_f64(28672.00001525879));
        assert_eq!(Fixed(0x0001_0000), Fixed::from_f64(1.0));
        assert_eq!(Fixed(0x0000_0000), Fixed::from_f64(0.0));
        assert_eq!(
            Fixed(i32::from_be_bytes([0xff; 4])),
            Fixed::from_f64(-0.000015259)
        );
    }

    #[test]
    fn fixed_raw_bytes() {
        let one_and_a_half = Fixed::from_f64(1.5);
        assert_eq!(one_and_a_half.to_raw(), [0x00, 0x01, 0x80, 0x00]);
        assert_eq!(Fixed::from_raw([0xFF, 0xFF, 0x00, 0x00]), Fixed::from_i32(-1));
        assert_eq!(F2Dot14::from_raw([0x40, 0x00]), F2Dot14::ONE);
    }

    #[test]
    fn widen_f2dot14() {
        assert_eq!(Fixed::from(F2Dot14::from_f64(-1.25)), Fixed::from_f64(-1.25));
        assert_eq!(Fixed::from_i32(i32::MAX), Fixed::MAX);
    }
}
