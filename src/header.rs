//! This module defines the `NiftiHeader` struct, which is used
//! to provide important information about NIFTI-1 volumes.
//!
//! Headers without a NIfTI magic code are read as Analyze 7.5 headers,
//! in which case neither of the two spatial transforms is available.

use crate::affine::{fill_positive, from_affine_and_translation, quaternion_to_affine, Affine4};
use crate::error::{NiftiError, Result};
use crate::typedef::{Analyze75Orientation, NiftiType, Unit, XForm};
use crate::util::{is_gz_file, validate_dim};
use byteordered::{ByteOrdered, Endianness};
use flate2::bufread::GzDecoder;
use nalgebra::{Matrix3, Vector3};
use num_traits::FromPrimitive;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::Deref;
use std::path::Path;

/// Magic code for NIFTI-1 header files (extention ".hdr[.gz]").
pub const MAGIC_CODE_NI1: &[u8; 4] = b"ni1\0";
/// Magic code for full NIFTI-1 files (extention ".nii[.gz]").
pub const MAGIC_CODE_NIP1: &[u8; 4] = b"n+1\0";

/// Size of the NIfTI-1 header in bytes, also its `sizeof_hdr` value.
pub const HEADER_SIZE: usize = 348;

/// Offset of the Analyze 7.5 `hist.orient` byte, shared with the first
/// byte of the NIfTI-1 `qform_code`.
const ANALYZE_ORIENT_OFFSET: usize = 252;

/// The NIFTI-1 header data type.
/// All fields are public and named after the specification's header file.
/// The type of each field was adjusted according to their use and
/// array limitations.
///
/// # Examples
///
/// ```no_run
/// use nifti_geometry::NiftiHeader;
/// # use nifti_geometry::Result;
///
/// # fn run() -> Result<()> {
/// let hdr1 = NiftiHeader::from_file("0000.hdr")?;
/// let hdr2 = NiftiHeader::from_file("0001.hdr.gz")?;
/// let hdr3 = NiftiHeader::from_file("4321.nii.gz")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    /// Header size, must be 348
    pub sizeof_hdr: i32,
    /// Unused in NIFTI-1
    pub data_type: [u8; 10],
    /// Unused in NIFTI-1
    pub db_name: [u8; 18],
    /// Unused in NIFTI-1
    pub extents: i32,
    /// Unused in NIFTI-1
    pub session_error: i16,
    /// Unused in NIFTI-1
    pub regular: u8,
    /// MRI slice ordering
    pub dim_info: u8,
    /// Data array dimensions
    pub dim: [u16; 8],
    /// 1st intent parameter
    pub intent_p1: f32,
    /// 2nd intent parameter
    pub intent_p2: f32,
    /// 3rd intent parameter
    pub intent_p3: f32,
    /// NIFTI_INTENT_* code
    pub intent_code: i16,
    /// Defines the data type!
    pub datatype: i16,
    /// Number of bits per voxel
    pub bitpix: i16,
    /// First slice index
    pub slice_start: i16,
    /// Grid spacings, `pixdim[0]` holds the quaternion handedness factor
    pub pixdim: [f32; 8],
    /// Offset into .nii file to reach the volume
    pub vox_offset: f32,
    /// Data scaling: slope
    pub scl_slope: f32,
    /// Data scaling: offset
    pub scl_inter: f32,
    /// Last slice index
    pub slice_end: i16,
    /// Slice timing order
    pub slice_code: u8,
    /// Units of pixdim[1..4]
    pub xyzt_units: u8,
    /// Max display intensity
    pub cal_max: f32,
    /// Min display intensity
    pub cal_min: f32,
    /// Time for 1 slice
    pub slice_duration: f32,
    /// Time axis shift
    pub toffset: f32,
    /// Unused in NIFTI-1
    pub glmax: i32,
    /// Unused in NIFTI-1
    pub glmin: i32,

    /// Any text you like
    pub descrip: Vec<u8>,
    /// Auxiliary filename
    pub aux_file: [u8; 24],
    /// NIFTI_XFORM_* code
    pub qform_code: i16,
    /// NIFTI_XFORM_* code
    pub sform_code: i16,
    /// Quaternion b param
    pub quatern_b: f32,
    /// Quaternion c param
    pub quatern_c: f32,
    /// Quaternion d param
    pub quatern_d: f32,
    /// Quaternion x shift
    pub quatern_x: f32,
    /// Quaternion y shift
    pub quatern_y: f32,
    /// Quaternion z shift
    pub quatern_z: f32,

    /// 1st row affine transform
    pub srow_x: [f32; 4],
    /// 2nd row affine transform
    pub srow_y: [f32; 4],
    /// 3rd row affine transform
    pub srow_z: [f32; 4],

    /// 'name' or meaning of data
    pub intent_name: [u8; 16],

    /// Magic code. Must be `b"ni1\0"` or `b"n+1\0"` for NIfTI-1 headers.
    pub magic: [u8; 4],

    /// Analyze 7.5 orientation byte. Headers with a NIfTI magic code
    /// always carry the "unknown" orientation here: byte 252 belongs to
    /// `qform_code` in NIfTI-1, so it says nothing about orientation.
    pub legacy_orient: u8,

    /// Original data Endianness
    pub endianness: Endianness,
}

impl Default for NiftiHeader {
    fn default() -> NiftiHeader {
        NiftiHeader {
            sizeof_hdr: HEADER_SIZE as i32,
            data_type: [0; 10],
            db_name: [0; 18],
            extents: 0,
            session_error: 0,
            regular: 0,
            dim_info: 0,
            dim: [1, 0, 0, 0, 0, 0, 0, 0],
            intent_p1: 0.,
            intent_p2: 0.,
            intent_p3: 0.,
            intent_code: 0,
            datatype: 0,
            bitpix: 0,
            slice_start: 0,
            pixdim: [1.; 8],
            vox_offset: 352.,
            scl_slope: 0.,
            scl_inter: 0.,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: 0,
            cal_max: 0.,
            cal_min: 0.,
            slice_duration: 0.,
            toffset: 0.,
            glmax: 0,
            glmin: 0,

            descrip: vec![0; 80],
            aux_file: [0; 24],
            qform_code: 0,
            sform_code: 0,
            quatern_b: 0.,
            quatern_c: 0.,
            quatern_d: 0.,
            quatern_x: 0.,
            quatern_y: 0.,
            quatern_z: 0.,

            srow_x: [0.; 4],
            srow_y: [0.; 4],
            srow_z: [0.; 4],

            intent_name: [0; 16],

            magic: *MAGIC_CODE_NIP1,

            legacy_orient: Analyze75Orientation::Unknown as u8,

            endianness: Endianness::Little,
        }
    }
}

impl NiftiHeader {
    /// Retrieve a NIFTI header, along with its byte order, from a file in the file system.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            NiftiHeader::from_reader(GzDecoder::new(file))
        } else {
            NiftiHeader::from_reader(file)
        }
    }

    /// Read a NIfTI-1 header, along with its byte order, from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// NIFTI header.
    pub fn from_reader<S: Read>(mut input: S) -> Result<NiftiHeader> {
        let mut raw = [0u8; HEADER_SIZE];
        input.read_exact(&mut raw)?;
        parse_header(&raw)
    }

    /// Whether this header carries a NIfTI-1 magic code. When `false`, the
    /// header was read as an Analyze 7.5 header.
    pub fn is_nifti(&self) -> bool {
        &self.magic == MAGIC_CODE_NI1 || &self.magic == MAGIC_CODE_NIP1
    }

    /// Whether the voxel data follows the header in the same file.
    pub fn is_single_file(&self) -> bool {
        &self.magic == MAGIC_CODE_NIP1
    }

    /// Retrieve and validate the dimensions of the volume. Unlike how NIfTI-1
    /// stores dimensions, the returned slice does not include `dim[0]` and is
    /// clipped to the effective number of dimensions.
    ///
    /// # Error
    ///
    /// `NiftiError::InconsistentDim` if `dim[0]` does not represent a valid
    /// dimensionality, or any of the real dimensions are zero.
    pub fn dim(&self) -> Result<&[u16]> {
        validate_dim(&self.dim)
    }

    /// Get the data type as a validated enum.
    pub fn data_type(&self) -> Result<NiftiType> {
        FromPrimitive::from_i16(self.datatype)
            .ok_or(NiftiError::InvalidCode("datatype", self.datatype))
    }

    /// Get the spatial units type as a validated unit enum.
    pub fn xyzt_to_space(&self) -> Result<Unit> {
        let space_code = self.xyzt_units & 0o0007;
        FromPrimitive::from_u8(space_code)
            .ok_or(NiftiError::InvalidCode("xyzt units (space)", i16::from(space_code)))
    }

    /// Get the time units type as a validated unit enum.
    pub fn xyzt_to_time(&self) -> Result<Unit> {
        let time_code = self.xyzt_units & 0o0070;
        FromPrimitive::from_u8(time_code)
            .ok_or(NiftiError::InvalidCode("xyzt units (time)", i16::from(time_code)))
    }

    /// Get the qform coordinate mapping method as a validated enum.
    pub fn qform(&self) -> Result<XForm> {
        FromPrimitive::from_i16(self.qform_code)
            .ok_or(NiftiError::InvalidCode("qform", self.qform_code))
    }

    /// Get the sform coordinate mapping method as a validated enum.
    pub fn sform(&self) -> Result<XForm> {
        FromPrimitive::from_i16(self.sform_code)
            .ok_or(NiftiError::InvalidCode("sform", self.sform_code))
    }

    /// Get the Analyze 7.5 orientation. Out of range codes are read as
    /// `Analyze75Orientation::Unknown`.
    pub fn analyze75_orientation(&self) -> Analyze75Orientation {
        FromPrimitive::from_u8(self.legacy_orient).unwrap_or(Analyze75Orientation::Unknown)
    }

    /// The quaternion handedness factor stored in `pixdim[0]`: `-1` if
    /// negative, `1` otherwise.
    pub fn qfac(&self) -> f64 {
        if self.pixdim[0] < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// The voxel-to-millimeter transform described by the quaternion
    /// parameters, the quaternion offsets and the grid spacings.
    ///
    /// Non-positive and non-finite grid spacings are taken as `1`.
    pub fn qform_affine(&self) -> Affine4 {
        let quaternion = fill_positive(Vector3::new(
            f64::from(self.quatern_b),
            f64::from(self.quatern_c),
            f64::from(self.quatern_d),
        ));
        let rotation = quaternion_to_affine(quaternion);
        let spacing = |d: f32| if d > 0.0 && d.is_finite() { f64::from(d) } else { 1.0 };
        let scaling = Matrix3::from_diagonal(&Vector3::new(
            spacing(self.pixdim[1]),
            spacing(self.pixdim[2]),
            spacing(self.pixdim[3]) * self.qfac(),
        ));
        let translation = Vector3::new(
            f64::from(self.quatern_x),
            f64::from(self.quatern_y),
            f64::from(self.quatern_z),
        );
        from_affine_and_translation(&(rotation * scaling), &translation)
    }

    /// The voxel-to-millimeter transform stored row by row in
    /// `srow_x`, `srow_y` and `srow_z`.
    pub fn sform_affine(&self) -> Affine4 {
        let [x, y, z] = [self.srow_x, self.srow_y, self.srow_z];
        let f = f64::from;
        #[rustfmt::skip]
        let affine = Affine4::new(
            f(x[0]), f(x[1]), f(x[2]), f(x[3]),
            f(y[0]), f(y[1]), f(y[2]), f(y[3]),
            f(z[0]), f(z[1]), f(z[2]), f(z[3]),
            0.0, 0.0, 0.0, 1.0,
        );
        affine
    }

    /// Ensure that the current `descrip` field is valid and is exactly equal to 80 bytes.
    pub fn validate_description(&mut self) -> Result<()> {
        let len = self.descrip.len();
        if len > 80 {
            Err(NiftiError::IncorrectDescriptionLength(len))
        } else {
            if len < 80 {
                self.descrip.extend((len..80).map(|_| 0));
            }
            Ok(())
        }
    }

    /// Safely set the `descrip` field using a buffer.
    pub fn set_description<D>(&mut self, description: D) -> Result<()>
    where
        D: Into<Vec<u8>>,
        D: Deref<Target = [u8]>,
    {
        let len = description.len();
        if len < 80 {
            let mut descrip = vec![0; 80];
            descrip[..len].copy_from_slice(&description);
            self.descrip = descrip;
            Ok(())
        } else if len == 80 {
            self.descrip = description.into();
            Ok(())
        } else {
            Err(NiftiError::IncorrectDescriptionLength(len))
        }
    }

    /// Safely set the `descrip` field using a  &str.
    pub fn set_description_str<T>(&mut self, description: T) -> Result<()>
    where
        T: Into<String>,
    {
        self.set_description(description.into().as_bytes())
    }

    /// The `descrip` field as text, up to its first nul byte. Bytes which
    /// are not valid UTF-8 are replaced.
    pub fn description_str(&self) -> String {
        let end = self
            .descrip
            .iter()
            .position(|&b| b == 0)
            .unwrap_or_else(|| self.descrip.len());
        String::from_utf8_lossy(&self.descrip[..end]).into_owned()
    }
}

/// Pick the byte order in which `dim[0]` is a valid rank, falling back to
/// the one in which `sizeof_hdr` reads 348.
fn detect_endianness(raw: &[u8; HEADER_SIZE]) -> Result<Endianness> {
    let dim0 = [raw[40], raw[41]];
    let sizeof_hdr = [raw[0], raw[1], raw[2], raw[3]];
    if (1..=7).contains(&i16::from_le_bytes(dim0)) {
        Ok(Endianness::Little)
    } else if (1..=7).contains(&i16::from_be_bytes(dim0)) {
        Ok(Endianness::Big)
    } else if i32::from_le_bytes(sizeof_hdr) == HEADER_SIZE as i32 {
        Ok(Endianness::Little)
    } else if i32::from_be_bytes(sizeof_hdr) == HEADER_SIZE as i32 {
        Ok(Endianness::Big)
    } else {
        Err(NiftiError::InvalidFormat)
    }
}

fn parse_header(raw: &[u8; HEADER_SIZE]) -> Result<NiftiHeader> {
    let endianness = detect_endianness(raw)?;
    let mut h = NiftiHeader {
        endianness,
        ..NiftiHeader::default()
    };
    let mut input = ByteOrdered::runtime(&raw[..], endianness);

    h.sizeof_hdr = input.read_i32()?;
    input.read_exact(&mut h.data_type)?;
    input.read_exact(&mut h.db_name)?;
    h.extents = input.read_i32()?;
    h.session_error = input.read_i16()?;
    h.regular = input.read_u8()?;
    h.dim_info = input.read_u8()?;
    for v in &mut h.dim {
        *v = input.read_u16()?;
    }
    h.intent_p1 = input.read_f32()?;
    h.intent_p2 = input.read_f32()?;
    h.intent_p3 = input.read_f32()?;
    h.intent_code = input.read_i16()?;
    h.datatype = input.read_i16()?;
    h.bitpix = input.read_i16()?;
    h.slice_start = input.read_i16()?;
    for v in &mut h.pixdim {
        *v = input.read_f32()?;
    }
    h.vox_offset = input.read_f32()?;
    h.scl_slope = input.read_f32()?;
    h.scl_inter = input.read_f32()?;
    h.slice_end = input.read_i16()?;
    h.slice_code = input.read_u8()?;
    h.xyzt_units = input.read_u8()?;
    h.cal_max = input.read_f32()?;
    h.cal_min = input.read_f32()?;
    h.slice_duration = input.read_f32()?;
    h.toffset = input.read_f32()?;
    h.glmax = input.read_i32()?;
    h.glmin = input.read_i32()?;

    // descrip is 80-elem vec already
    input.read_exact(h.descrip.as_mut_slice())?;
    input.read_exact(&mut h.aux_file)?;
    h.qform_code = input.read_i16()?;
    h.sform_code = input.read_i16()?;
    h.quatern_b = input.read_f32()?;
    h.quatern_c = input.read_f32()?;
    h.quatern_d = input.read_f32()?;
    h.quatern_x = input.read_f32()?;
    h.quatern_y = input.read_f32()?;
    h.quatern_z = input.read_f32()?;
    for v in &mut h.srow_x {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_y {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_z {
        *v = input.read_f32()?;
    }
    input.read_exact(&mut h.intent_name)?;
    input.read_exact(&mut h.magic)?;

    debug_assert_eq!(h.descrip.len(), 80);

    // byte 252 is the low or high byte of `qform_code` here
    if h.is_nifti() {
        return Ok(h);
    }
    if h.sizeof_hdr != HEADER_SIZE as i32 {
        return Err(NiftiError::InvalidFormat);
    }

    // Analyze 7.5: the transform fields hold unrelated history data
    h.legacy_orient = raw[ANALYZE_ORIENT_OFFSET];
    h.qform_code = 0;
    h.sform_code = 0;
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn raw_header(endianness: Endianness) -> Vec<u8> {
        let header = NiftiHeader {
            dim: [3, 4, 5, 6, 1, 1, 1, 1],
            datatype: NiftiType::Int16 as i16,
            bitpix: 16,
            pixdim: [1., 0.5, 0.5, 2., 1., 1., 1., 1.],
            endianness,
            ..NiftiHeader::default()
        };
        let mut out = Vec::new();
        crate::writer::write_header(&mut out, &header, endianness).unwrap();
        out
    }

    #[test]
    fn detects_both_byte_orders() {
        for &e in &[Endianness::Little, Endianness::Big] {
            let h = NiftiHeader::from_reader(&raw_header(e)[..]).unwrap();
            assert_eq!(h.endianness, e);
            assert_eq!(h.dim().unwrap(), &[4, 5, 6]);
            assert_eq!(h.data_type().unwrap(), NiftiType::Int16);
            assert_eq!(h.pixdim[1], 0.5);
        }
    }

    #[test]
    fn analyze_header_keeps_orientation_byte() {
        let mut raw = raw_header(Endianness::Little);
        raw[344..348].copy_from_slice(&[0, 0, 0, 0]);
        raw[ANALYZE_ORIENT_OFFSET] = Analyze75Orientation::SagittalUnflipped as u8;
        let h = NiftiHeader::from_reader(&raw[..]).unwrap();
        assert!(!h.is_nifti());
        assert_eq!(h.qform_code, 0);
        assert_eq!(h.sform_code, 0);
        assert_eq!(h.analyze75_orientation(), Analyze75Orientation::SagittalUnflipped);
    }

    #[test]
    fn nifti_header_has_no_orientation_byte() {
        let mut raw = raw_header(Endianness::Little);
        raw[ANALYZE_ORIENT_OFFSET] = Analyze75Orientation::CoronalUnflipped as u8;
        let h = NiftiHeader::from_reader(&raw[..]).unwrap();
        assert!(h.is_nifti());
        assert_eq!(h.qform_code, Analyze75Orientation::CoronalUnflipped as i16);
        assert_eq!(h.analyze75_orientation(), Analyze75Orientation::Unknown);
    }

    #[test]
    fn garbage_is_invalid() {
        let raw = vec![0xFFu8; HEADER_SIZE];
        assert!(matches!(
            NiftiHeader::from_reader(&raw[..]),
            Err(NiftiError::InvalidFormat)
        ));
    }

    #[test]
    fn short_input_is_io_error() {
        let raw = raw_header(Endianness::Little);
        assert!(matches!(
            NiftiHeader::from_reader(&raw[..100]),
            Err(NiftiError::Io(_))
        ));
    }

    #[test]
    #[rustfmt::skip]
    fn qform_with_flipped_handedness() {
        let header = NiftiHeader {
            qform_code: 1,
            pixdim: [-1.0, 0.9375, 0.9375, 3.0, 0.0, 0.0, 0.0, 0.0],
            quatern_b: 0.0,
            quatern_c: 1.0,
            quatern_d: 0.0,
            quatern_x: 59.557503,
            quatern_y: 73.172,
            quatern_z: 43.4291,
            ..NiftiHeader::default()
        };

        let real_affine = Affine4::new(
            -0.9375, 0.0,    0.0, 59.557503,
            0.0,     0.9375, 0.0, 73.172,
            0.0,     0.0,    3.0, 43.4291,
            0.0,     0.0,    0.0, 1.0
        );
        assert_abs_diff_eq!(header.qform_affine(), real_affine, epsilon = 1e-5);
    }

    #[test]
    #[rustfmt::skip]
    fn sform_rows() {
        let header = NiftiHeader {
            sform_code: 4,
            srow_x: [-2., 0., 0., 90.],
            srow_y: [0., 2., 0., -126.],
            srow_z: [0., 0., 2., -72.],
            ..NiftiHeader::default()
        };
        let real_affine = Affine4::new(
            -2.0, 0.0, 0.0, 90.0,
            0.0,  2.0, 0.0, -126.0,
            0.0,  0.0, 2.0, -72.0,
            0.0,  0.0, 0.0, 1.0,
        );
        assert_eq!(header.sform_affine(), real_affine);
    }

    #[test]
    fn description() {
        let mut header = NiftiHeader::default();
        header.set_description_str("FSL3.2beta").unwrap();
        assert_eq!(header.descrip.len(), 80);
        assert_eq!(header.description_str(), "FSL3.2beta");
        assert!(header.set_description(vec![b'a'; 81]).is_err());
    }
}
