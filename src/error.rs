//! Types for error handling go here.

use crate::datatype::{ComponentType, PixelLayout};
use quick_error::quick_error;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all errors in this crate.
    #[derive(Debug)]
    pub enum NiftiError {
        /// The header of the given file could not be decoded.
        HeaderRead(path: PathBuf, err: Box<NiftiError>) {
            display("{} is not recognized as a NIfTI file: {}", path.display(), err)
            source(&**err)
        }
        /// Read an invalid NIfTI-1 or Analyze 7.5 header.
        InvalidFormat {
            display("Invalid NIfTI-1 file")
        }
        /// The file name does not end in a NIfTI extension.
        InvalidFilename(path: PathBuf) {
            display("Bad NIfTI file name {}", path.display())
        }
        /// The component type has no on-disk equivalent.
        UnsupportedComponentType(t: ComponentType) {
            display("Unsupported component type {:?}", t)
        }
        /// The pixel layout has no on-disk equivalent.
        UnsupportedPixelLayout(p: PixelLayout) {
            display("Unsupported pixel layout {:?}", p)
        }
        /// The spatial transform built from the image geometry is not invertible.
        DegenerateGeometry {
            display("Degenerate image geometry: spatial transform is not invertible")
        }
        /// An invalid code was found in a header field.
        InvalidCode(typename: &'static str, code: i16) {
            display("invalid code `{}` for header field {}", code, typename)
        }
        /// The header's `dim` field is inconsistent.
        InconsistentDim(index: u8, value: u16) {
            display("Inconsistent value `{}` in header field dim[{}] ({})", value, index, match *index {
                0 if *value > 7 => "must not be higher than 7",
                0 => "must not be zero",
                _ => "must be positive",
            })
        }
        /// The header describes more voxel data than can be addressed.
        VolumeTooLarge {
            display("Volume size does not fit in memory")
        }
        /// The voxel buffer does not fit the expected number of elements.
        IncompatibleLength(got: usize, expected: usize) {
            display("Voxel buffer has {} elements, but {} were expected", got, expected)
        }
        /// Description length must be lower than or equal to 80 bytes
        IncorrectDescriptionLength(len: usize) {
            display("Description length ({} bytes) is greater than 80 bytes.", len)
        }
        /// The volume file of a header/data pair could not be opened.
        MissingVolumeFile(err: IOError) {
            display("Volume file not found: {}", err)
            source(err)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("{}", err)
        }
    }
}

/// Alias type for results originating from this crate.
pub type Result<T> = ::std::result::Result<T, NiftiError>;
