//! Module for retrieving complete NIfTI-1 and Analyze 7.5 objects.

use crate::error::{NiftiError, Result};
use crate::header::{NiftiHeader, HEADER_SIZE};
use crate::util::{is_gz_file, pair_paths, volume_file_candidates, voxel_count};
use crate::volume::{read_volume_bytes, VoxelBuffer};
use flate2::bufread::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Data type for a NIfTI object that is fully contained in memory: a header
/// and its decoded voxel buffer.
#[derive(Debug, PartialEq, Clone)]
pub struct InMemNiftiObject {
    header: NiftiHeader,
    volume: VoxelBuffer,
}

/// Open a file for reading, decompressing it if its name ends in ".gz".
fn open_file<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>> {
    let gz = is_gz_file(&path);
    let file = BufReader::new(File::open(path)?);
    if gz {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Read only the header of the image at `path`. For a header/data pair,
/// either file name may be given.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
    open_header(path).map(|(_, header, _)| header)
}

/// Open the header file of the image at `path` and read its header, leaving
/// the stream right after it.
pub(crate) fn open_header<P: AsRef<Path>>(
    path: P,
) -> Result<(PathBuf, NiftiHeader, Box<dyn Read>)> {
    let path = path.as_ref();
    let hdr_path = pair_paths(path)
        .map(|(hdr, _)| hdr)
        .unwrap_or_else(|| path.to_owned());
    let mut stream = open_file(&hdr_path)?;
    let header = NiftiHeader::from_reader(&mut stream)?;
    Ok((hdr_path, header, stream))
}

/// Number of bytes of voxel data described by the header. The element size
/// follows the data type; `bitpix` is only used for unknown data type codes.
pub(crate) fn volume_size(header: &NiftiHeader) -> Result<usize> {
    let nvox = voxel_count(&header.dim)?;
    let element_size = match header.data_type() {
        Ok(data_type) => data_type.size_of(),
        Err(_) => usize::from(header.bitpix.max(0) as u16) / 8,
    };
    if usize::from(header.bitpix.max(0) as u16) != element_size * 8 {
        debug!(
            bitpix = header.bitpix,
            datatype = header.datatype,
            "bitpix does not match the data type"
        );
    }
    nvox.checked_mul(element_size).ok_or(NiftiError::VolumeTooLarge)
}

impl InMemNiftiObject {
    /// Retrieve the full contents of a NIfTI object.
    /// The given file system path is used as reference.
    /// If the file only contains the header, this method will
    /// look for the corresponding volume file with the extension ".img",
    /// or ".img.gz" if the former wasn't found (or the other way around for
    /// gzipped headers).
    ///
    /// # Errors
    ///
    /// - `NiftiError::MissingVolumeFile` if the header names a separate
    ///   volume file which could not be found.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<InMemNiftiObject> {
        let (hdr_path, header, stream) = open_header(path)?;
        Self::from_header_file(&hdr_path, header, stream)
    }

    /// Read the volume of an image whose header was already read from
    /// `hdr_path` through `stream`.
    pub(crate) fn from_header_file(
        hdr_path: &Path,
        header: NiftiHeader,
        stream: Box<dyn Read>,
    ) -> Result<InMemNiftiObject> {
        if header.is_single_file() {
            debug!(path = %hdr_path.display(), "reading single file volume");
            return Self::from_header_and_stream(header, stream);
        }

        let mut last_err = None;
        for img_path in volume_file_candidates(hdr_path) {
            match open_file(&img_path) {
                Ok(stream) => {
                    debug!(volume = %img_path.display(), "reading volume file");
                    return Self::from_header_and_stream(header, stream);
                }
                Err(NiftiError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    last_err = Some(e)
                }
                Err(NiftiError::Io(e)) => return Err(NiftiError::MissingVolumeFile(e)),
                Err(e) => return Err(e),
            }
        }
        Err(NiftiError::MissingVolumeFile(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no volume file name")
        })))
    }

    /// Retrieve a NIfTI object as separate header and volume files.
    /// This method is useful when file names are not conventional for a
    /// NIfTI file pair.
    pub fn from_file_pair<P, Q>(hdr_path: P, vol_path: Q) -> Result<InMemNiftiObject>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let header = NiftiHeader::from_file(hdr_path)?;
        let stream = open_file(vol_path).map_err(|e| match e {
            NiftiError::Io(e) => NiftiError::MissingVolumeFile(e),
            e => e,
        })?;
        Self::from_header_and_stream(header, stream)
    }

    /// Retrieve a single file NIfTI object from a stream of data.
    pub fn from_reader<R: Read>(mut source: R) -> Result<InMemNiftiObject> {
        let header = NiftiHeader::from_reader(&mut source)?;
        Self::from_header_and_stream(header, source)
    }

    /// Read the voxel data following a header. In a single file, everything
    /// between the header and `vox_offset` (extender and extensions) is
    /// skipped.
    fn from_header_and_stream<R: Read>(header: NiftiHeader, mut source: R) -> Result<Self> {
        if header.is_single_file() {
            let skip = (header.vox_offset.max(0.) as u64).saturating_sub(HEADER_SIZE as u64);
            let skipped = io::copy(&mut (&mut source).take(skip), &mut io::sink())?;
            if skipped < skip {
                return Err(NiftiError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "volume data starts past the end of the file",
                )));
            }
        }
        let nbytes = volume_size(&header)?;
        let volume = match header.data_type() {
            Ok(data_type) => {
                VoxelBuffer::from_reader(source, nbytes, data_type, header.endianness)?
            }
            Err(_) => VoxelBuffer::Raw(read_volume_bytes(source, nbytes)?),
        };
        Ok(InMemNiftiObject { header, volume })
    }

    /// Obtain a reference to the NIfTI header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Obtain a reference to the object's volume.
    pub fn volume(&self) -> &VoxelBuffer {
        &self.volume
    }

    /// Split the object into its header and volume.
    pub fn into_parts(self) -> (NiftiHeader, VoxelBuffer) {
        (self.header, self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::NiftiType;
    use crate::writer::WriterOptions;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn header() -> NiftiHeader {
        NiftiHeader {
            dim: [3, 2, 2, 2, 1, 1, 1, 1],
            datatype: NiftiType::Int16 as i16,
            bitpix: 16,
            ..NiftiHeader::default()
        }
    }

    #[test]
    fn single_file_gz() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.nii.gz");
        let data = VoxelBuffer::I16((0..8).collect());
        WriterOptions::new(&path).write(&header(), &data).unwrap();
        let obj = InMemNiftiObject::from_file(&path).unwrap();
        assert_eq!(obj.volume(), &data);
        assert_eq!(obj.header().dim, header().dim);
    }

    #[test]
    fn pair_from_either_name() {
        let dir = tempdir().unwrap();
        let data = VoxelBuffer::I16((0..8).rev().collect());
        WriterOptions::new(dir.path().join("a.hdr"))
            .write(&header(), &data)
            .unwrap();
        for name in &["a.hdr", "a.img"] {
            let obj = InMemNiftiObject::from_file(dir.path().join(name)).unwrap();
            assert_eq!(obj.volume(), &data);
        }
    }

    #[test]
    fn missing_volume_file() {
        let dir = tempdir().unwrap();
        WriterOptions::new(dir.path().join("a.hdr"))
            .write(&header(), &VoxelBuffer::I16(vec![0; 8]))
            .unwrap();
        std::fs::remove_file(dir.path().join("a.img")).unwrap();
        assert!(matches!(
            InMemNiftiObject::from_file(dir.path().join("a.hdr")),
            Err(NiftiError::MissingVolumeFile(_))
        ));
    }

    #[test]
    fn truncated_volume() {
        let mut bytes = Vec::new();
        crate::writer::write_header(&mut bytes, &header(), byteordered::Endianness::Little)
            .unwrap();
        bytes.extend_from_slice(&[0; 4 + 10]);
        assert!(InMemNiftiObject::from_reader(&bytes[..]).is_err());
        bytes.extend_from_slice(&[0; 6]);
        let obj = InMemNiftiObject::from_reader(&bytes[..]).unwrap();
        assert_eq!(obj.volume(), &VoxelBuffer::I16(vec![0; 8]));
    }

    #[test]
    fn oversized_dims() {
        let header = NiftiHeader {
            dim: [7, 32767, 32767, 32767, 32767, 32767, 32767, 32767],
            ..header()
        };
        let mut bytes = Vec::new();
        crate::writer::write_header(&mut bytes, &header, byteordered::Endianness::Little)
            .unwrap();
        bytes.extend_from_slice(&[0; 4 + 64]);
        assert!(matches!(
            InMemNiftiObject::from_reader(&bytes[..]),
            Err(NiftiError::VolumeTooLarge)
        ));

        // fits in memory arithmetic, but not in the stream
        let header = NiftiHeader {
            dim: [3, 32767, 32767, 32767, 1, 1, 1, 1],
            ..header
        };
        let mut bytes = Vec::new();
        crate::writer::write_header(&mut bytes, &header, byteordered::Endianness::Little)
            .unwrap();
        bytes.extend_from_slice(&[0; 4 + 64]);
        assert!(matches!(
            InMemNiftiObject::from_reader(&bytes[..]),
            Err(NiftiError::Io(_)) | Err(NiftiError::VolumeTooLarge)
        ));
    }

    #[test]
    fn element_size_follows_data_type() {
        let header = NiftiHeader {
            bitpix: 8,
            ..header()
        };
        let mut bytes = Vec::new();
        crate::writer::write_header(&mut bytes, &header, byteordered::Endianness::Little)
            .unwrap();
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend((1..=8i16).flat_map(|v| v.to_le_bytes().to_vec()));
        let obj = InMemNiftiObject::from_reader(&bytes[..]).unwrap();
        assert_eq!(obj.volume(), &VoxelBuffer::I16((1..=8).collect()));
    }
}
