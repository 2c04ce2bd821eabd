//! Mapping between on-disk NIfTI data type codes and the component type and
//! pixel layout of a decoded image.

use crate::error::{NiftiError, Result};
use crate::typedef::NiftiType;
use num_traits::FromPrimitive;
use tracing::debug;

/// Numeric type of a single pixel component.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ComponentType {
    /// Unsigned 8-bit integer.
    UChar,
    /// Signed 8-bit integer.
    Char,
    /// Unsigned 16-bit integer.
    UShort,
    /// Signed 16-bit integer.
    Short,
    /// Unsigned 32-bit integer.
    UInt,
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit "long" integer.
    ULong,
    /// Signed 32-bit "long" integer.
    Long,
    /// Unsigned 64-bit integer.
    ULongLong,
    /// Signed 64-bit integer.
    LongLong,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Not determined.
    Unknown,
}

impl Default for ComponentType {
    fn default() -> Self {
        ComponentType::Unknown
    }
}

/// How the components of a pixel are laid out.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum PixelLayout {
    /// One component per pixel.
    Scalar,
    /// Three 8-bit color channels.
    Rgb,
    /// Four 8-bit color channels.
    Rgba,
    /// A fixed-length vector of components.
    Vector,
    /// A real and an imaginary component.
    Complex,
}

impl Default for PixelLayout {
    fn default() -> Self {
        PixelLayout::Scalar
    }
}

/// The result of classifying an on-disk data type.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PixelType {
    /// Numeric type of each component.
    pub component_type: ComponentType,
    /// Layout of the components.
    pub layout: PixelLayout,
    /// Number of components per pixel.
    pub components: usize,
}

impl PixelType {
    const fn scalar(component_type: ComponentType) -> Self {
        PixelType {
            component_type,
            layout: PixelLayout::Scalar,
            components: 1,
        }
    }
}

/// Classify an on-disk data type.
///
/// Returns `None` for types without an in-memory counterpart (64-bit
/// integers, complex numbers, long doubles, RGBA). Such files are not
/// rejected here: the caller is expected to treat them as not handled.
pub fn classify(data_type: NiftiType) -> Option<PixelType> {
    use ComponentType::*;
    let pixel = match data_type {
        NiftiType::Int8 => PixelType::scalar(Char),
        NiftiType::Uint8 => PixelType::scalar(UChar),
        NiftiType::Int16 => PixelType::scalar(Short),
        NiftiType::Uint16 => PixelType::scalar(UShort),
        NiftiType::Int32 => PixelType::scalar(Int),
        NiftiType::Uint32 => PixelType::scalar(UInt),
        NiftiType::Float32 => PixelType::scalar(Float),
        NiftiType::Float64 => PixelType::scalar(Double),
        NiftiType::Rgb24 => PixelType {
            component_type: UChar,
            layout: PixelLayout::Rgb,
            components: 3,
        },
        other => {
            debug!(data_type = ?other, "data type is not handled");
            return None;
        }
    };
    Some(pixel)
}

/// Classify a raw `datatype` header field. Unknown codes are not handled.
pub fn classify_code(code: i16) -> Option<PixelType> {
    match NiftiType::from_i16(code) {
        Some(data_type) => classify(data_type),
        None => {
            debug!(code, "unrecognized data type code");
            None
        }
    }
}

/// The on-disk data type for the given component type and pixel layout.
///
/// The 32-bit `Long` and `ULong` aliases are stored as 32-bit integers.
///
/// # Errors
///
/// - `NiftiError::UnsupportedPixelLayout` if the layout is neither scalar nor
///   RGB.
/// - `NiftiError::UnsupportedComponentType` if the component type has no
///   on-disk equivalent for that layout.
pub fn to_nifti(component_type: ComponentType, layout: PixelLayout) -> Result<NiftiType> {
    use ComponentType::*;
    match layout {
        PixelLayout::Scalar => match component_type {
            Char => Ok(NiftiType::Int8),
            UChar => Ok(NiftiType::Uint8),
            Short => Ok(NiftiType::Int16),
            UShort => Ok(NiftiType::Uint16),
            Int | Long => Ok(NiftiType::Int32),
            UInt | ULong => Ok(NiftiType::Uint32),
            Float => Ok(NiftiType::Float32),
            Double => Ok(NiftiType::Float64),
            ULongLong | LongLong | Unknown => {
                Err(NiftiError::UnsupportedComponentType(component_type))
            }
        },
        PixelLayout::Rgb => match component_type {
            UChar => Ok(NiftiType::Rgb24),
            _ => Err(NiftiError::UnsupportedComponentType(component_type)),
        },
        other => Err(NiftiError::UnsupportedPixelLayout(other)),
    }
}

/// Name of the storage type of an on-disk data type, as recorded in an
/// image's metadata dictionary.
pub fn storage_type_name(data_type: NiftiType) -> &'static str {
    match data_type {
        NiftiType::Int8 => "char",
        NiftiType::Uint8 => "unsigned char",
        NiftiType::Int16 => "short",
        NiftiType::Uint16 => "unsigned short",
        NiftiType::Int32 => "int",
        NiftiType::Uint32 => "unsigned int",
        NiftiType::Int64 => "long long",
        NiftiType::Uint64 => "unsigned long long",
        NiftiType::Float32 => "float",
        NiftiType::Float64 => "double",
        NiftiType::Float128 => "long double",
        NiftiType::Rgb24 => "RGB",
        NiftiType::Rgba32 => "RGBA",
        NiftiType::Complex64 | NiftiType::Complex128 | NiftiType::Complex256 => "complex",
    }
}
