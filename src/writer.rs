//! Utility functions to write NIfTI-1 images.

use crate::error::{NiftiError, Result};
use crate::header::{NiftiHeader, HEADER_SIZE, MAGIC_CODE_NI1, MAGIC_CODE_NIP1};
use crate::object::volume_size;
use crate::util::{file_kind, is_gz_file, pair_paths, voxel_count, FileKind};
use crate::volume::VoxelBuffer;
use byteordered::{ByteOrdered, Endianness};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Offset of the voxel data in a single file without extensions: the
/// header followed by an empty extender.
const SINGLE_FILE_VOX_OFFSET: f32 = 352.;

/// Options and flags which can be used to configure how a NIfTI image is
/// written.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// Where to write the output image. A ".hdr" or ".img" name writes a
    /// header/data pair, any name ending in ".gz" is compressed.
    path: PathBuf,
    /// Compression level used for ".gz" outputs.
    compression: Compression,
}

impl WriterOptions {
    /// Creates a new set of options for writing a NIfTI image to `path`.
    pub fn new<P>(path: P) -> WriterOptions
    where
        P: AsRef<Path>,
    {
        WriterOptions {
            path: path.as_ref().to_owned(),
            compression: Compression::fast(),
        }
    }

    /// Sets the compression level used for gzipped outputs.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// The output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the header and voxel buffer.
    ///
    /// The magic code and `vox_offset` of the header are set according to
    /// the kind of output. The header is always written in little endian.
    ///
    /// # Errors
    ///
    /// - `NiftiError::InvalidFilename` if the output name has no NIfTI
    ///   extension. Nothing is written in that case.
    /// - `NiftiError::IncompatibleLength` if the buffer does not hold as many
    ///   values as the header's dimensions call for.
    pub fn write(&self, header: &NiftiHeader, buffer: &VoxelBuffer) -> Result<()> {
        let kind =
            file_kind(&self.path).ok_or_else(|| NiftiError::InvalidFilename(self.path.clone()))?;
        check_buffer_length(header, buffer)?;

        let mut header = header.clone();
        header.sizeof_hdr = HEADER_SIZE as i32;
        header.validate_description()?;

        match kind {
            FileKind::Single => {
                header.magic = *MAGIC_CODE_NIP1;
                header.vox_offset = SINGLE_FILE_VOX_OFFSET;
                debug!(path = %self.path.display(), "writing single file image");
                self.with_output(&self.path, |out| {
                    write_header(&mut *out, &header, Endianness::Little)?;
                    write_extender(&mut *out)?;
                    buffer.write_le(out)
                })
            }
            FileKind::Pair => {
                let (hdr_path, img_path) = pair_paths(&self.path)
                    .ok_or_else(|| NiftiError::InvalidFilename(self.path.clone()))?;
                header.magic = *MAGIC_CODE_NI1;
                header.vox_offset = 0.;
                debug!(
                    header = %hdr_path.display(),
                    volume = %img_path.display(),
                    "writing header/data pair"
                );
                self.with_output(&hdr_path, |out| {
                    write_header(&mut *out, &header, Endianness::Little)?;
                    write_extender(out)
                })?;
                self.with_output(&img_path, |out| buffer.write_le(out))
            }
        }
    }

    fn with_output<F>(&self, path: &Path, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        let mut writer = BufWriter::new(File::create(path)?);
        if is_gz_file(path) {
            let mut e = GzEncoder::new(&mut writer, self.compression);
            f(&mut e)?;
            let _ = e.finish()?;
        } else {
            f(&mut writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn check_buffer_length(header: &NiftiHeader, buffer: &VoxelBuffer) -> Result<()> {
    let expected = match buffer {
        VoxelBuffer::Raw(_) => volume_size(header)?,
        _ => voxel_count(&header.dim)?,
    };
    if buffer.len() != expected {
        return Err(NiftiError::IncompatibleLength(buffer.len(), expected));
    }
    Ok(())
}

/// Write the 348 bytes of a NIfTI-1 header in the given byte order.
pub(crate) fn write_header<W>(writer: W, header: &NiftiHeader, endianness: Endianness) -> Result<()>
where
    W: Write,
{
    let mut writer = ByteOrdered::runtime(writer, endianness);

    writer.write_i32(header.sizeof_hdr)?;
    writer.write_all(&header.data_type)?;
    writer.write_all(&header.db_name)?;
    writer.write_i32(header.extents)?;
    writer.write_i16(header.session_error)?;
    writer.write_u8(header.regular)?;
    writer.write_u8(header.dim_info)?;
    for s in &header.dim {
        writer.write_u16(*s)?;
    }
    writer.write_f32(header.intent_p1)?;
    writer.write_f32(header.intent_p2)?;
    writer.write_f32(header.intent_p3)?;
    writer.write_i16(header.intent_code)?;
    writer.write_i16(header.datatype)?;
    writer.write_i16(header.bitpix)?;
    writer.write_i16(header.slice_start)?;
    for f in &header.pixdim {
        writer.write_f32(*f)?;
    }
    writer.write_f32(header.vox_offset)?;
    writer.write_f32(header.scl_slope)?;
    writer.write_f32(header.scl_inter)?;
    writer.write_i16(header.slice_end)?;
    writer.write_u8(header.slice_code)?;
    writer.write_u8(header.xyzt_units)?;
    writer.write_f32(header.cal_max)?;
    writer.write_f32(header.cal_min)?;
    writer.write_f32(header.slice_duration)?;
    writer.write_f32(header.toffset)?;
    writer.write_i32(header.glmax)?;
    writer.write_i32(header.glmin)?;

    let mut descrip = [0u8; 80];
    let len = header.descrip.len().min(80);
    descrip[..len].copy_from_slice(&header.descrip[..len]);
    writer.write_all(&descrip)?;
    writer.write_all(&header.aux_file)?;
    writer.write_i16(header.qform_code)?;
    writer.write_i16(header.sform_code)?;
    for f in &[
        header.quatern_b,
        header.quatern_c,
        header.quatern_d,
        header.quatern_x,
        header.quatern_y,
        header.quatern_z,
    ] {
        writer.write_f32(*f)?;
    }
    for f in header.srow_x.iter().chain(&header.srow_y).chain(&header.srow_z) {
        writer.write_f32(*f)?;
    }
    writer.write_all(&header.intent_name)?;
    writer.write_all(&header.magic)?;
    Ok(())
}

/// Empty 4 bytes after the header: no extensions follow.
fn write_extender<W: Write>(mut writer: W) -> Result<()> {
    writer.write_all(&[0u8; 4])?;
    Ok(())
}
