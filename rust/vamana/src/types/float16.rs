//! 16-bit element types.
//!
//! Both wrap a type from the `half` crate and go through f32 for distance
//! computation and for the textual format. A value printed and parsed back
//! is bit-identical, since every 16-bit value is exact in f32.

use super::VectorElement;
use std::fmt;
use std::str::FromStr;

macro_rules! half_element {
    ($(#[$doc:meta])* $name:ident, $inner:ty) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Default, PartialEq, PartialOrd)]
        #[repr(transparent)]
        pub struct $name($inner);

        impl $name {
            pub const ZERO: Self = Self(<$inner>::ZERO);

            #[inline(always)]
            pub fn from_f32(v: f32) -> Self {
                Self(<$inner>::from_f32(v))
            }

            #[inline(always)]
            pub fn to_f32(self) -> f32 {
                self.0.to_f32()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_f32())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.to_f32(), f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseFloatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<f32>().map(Self::from_f32)
            }
        }

        impl From<f32> for $name {
            #[inline(always)]
            fn from(v: f32) -> Self {
                Self::from_f32(v)
            }
        }

        impl VectorElement for $name {
            #[inline(always)]
            fn to_f32(self) -> f32 {
                self.0.to_f32()
            }

            #[inline(always)]
            fn from_f32(v: f32) -> Self {
                Self(<$inner>::from_f32(v))
            }

            #[inline(always)]
            fn zero() -> Self {
                Self::ZERO
            }
        }
    };
}

half_element!(
    /// IEEE 754-2008 binary16: ~3 decimal digits, range up to 65504.
    Float16,
    half::f16
);

half_element!(
    /// Brain float: the f32 exponent range with a 7-bit mantissa.
    BFloat16,
    half::bf16
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_loss_is_bounded() {
        for v in [0.0f32, 1.0, -1.0, 0.5, 100.0, -100.0] {
            assert!((Float16::from_f32(v).to_f32() - v).abs() < 0.01 * v.abs().max(1.0));
            assert!((BFloat16::from_f32(v).to_f32() - v).abs() < 0.01 * v.abs().max(1.0));
        }
        // Outside the binary16 range.
        assert!(Float16::from_f32(1.0e6).to_f32().is_infinite());
        assert_eq!(BFloat16::from_f32(1.0e6).to_f32().log10().round(), 6.0);
    }

    #[test]
    fn test_text_is_exact() {
        let x = Float16::from_f32(0.333);
        assert_eq!(x.to_string().parse::<Float16>().unwrap(), x);
        let y = BFloat16::from_f32(-2.71828);
        assert_eq!(y.to_string().parse::<BFloat16>().unwrap(), y);
        assert!("x".parse::<Float16>().is_err());
    }

    #[test]
    fn test_debug_names_the_type() {
        assert_eq!(format!("{:?}", Float16::from_f32(1.5)), "Float16(1.5)");
        assert_eq!(format!("{:?}", BFloat16::ZERO), "BFloat16(0)");
    }
}
