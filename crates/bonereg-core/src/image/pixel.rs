//! Pixel type tags.
//!
//! Voxel values are always stored as f32 tensors. The tag records which
//! element type the values represent so filters can cast results back.

use serde::{Deserialize, Serialize};

/// Logical element type of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PixelType {
    UInt8,
    UInt16,
    UInt32,
    Int16,
    Int32,
    #[default]
    Float32,
}

impl PixelType {
    /// Whether the type holds integer values.
    pub fn is_integer(&self) -> bool {
        !matches!(self, PixelType::Float32)
    }

    /// Representable value range.
    pub fn range(&self) -> (f64, f64) {
        match self {
            PixelType::UInt8 => (u8::MIN as f64, u8::MAX as f64),
            PixelType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
            PixelType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
            PixelType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            PixelType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            PixelType::Float32 => (f32::MIN as f64, f32::MAX as f64),
        }
    }

    /// Convert a value to this type: clamp to the range, then truncate
    /// toward zero for integer types.
    pub fn cast(&self, value: f32) -> f32 {
        if !self.is_integer() {
            return value;
        }
        if value.is_nan() {
            return 0.0;
        }
        let (lo, hi) = self.range();
        (value as f64).clamp(lo, hi).trunc() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_integer_types() {
        assert_eq!(PixelType::UInt8.cast(300.7), 255.0);
        assert_eq!(PixelType::UInt8.cast(-4.0), 0.0);
        assert_eq!(PixelType::Int16.cast(-12.9), -12.0);
        assert_eq!(PixelType::Int16.cast(12.9), 12.0);
        assert_eq!(PixelType::UInt32.cast(f32::NAN), 0.0);
    }

    #[test]
    fn test_cast_float_is_identity() {
        assert_eq!(PixelType::Float32.cast(-1.25), -1.25);
        assert!(!PixelType::Float32.is_integer());
    }
}
