//! Private utility module
use crate::error::{NiftiError, Result};
use std::path::{Path, PathBuf};

/// The two kinds of file containers defined by the NIfTI-1 format.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileKind {
    /// Header, extensions and voxel data in one ".nii" or ".nii.gz" file.
    Single,
    /// Header in a ".hdr" file and voxel data in a ".img" file (either of
    /// them possibly gzipped).
    Pair,
}

const SINGLE_EXTENSIONS: &[&str] = &[".nii", ".nii.gz"];
const PAIR_EXTENSIONS: &[&str] = &[".hdr", ".img", ".hdr.gz", ".img.gz"];

fn file_name_lowercase<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase())
}

/// Find the NIfTI extension at the end of the given path, if any, and
/// whether there is anything in front of it.
fn split_extension(name: &str) -> Option<(&'static str, bool)> {
    SINGLE_EXTENSIONS
        .iter()
        .chain(PAIR_EXTENSIONS)
        // longest match first, so that ".nii.gz" wins over a bare ".gz"
        .filter(|ext| name.ends_with(*ext))
        .max_by_key(|ext| ext.len())
        .map(|ext| (*ext, name.len() > ext.len()))
}

/// Classify a path by its NIfTI extension.
/// Returns `None` if the extension is not one of ".nii", ".nii.gz",
/// ".hdr", ".img", ".hdr.gz" or ".img.gz" (case insensitive).
pub fn file_kind<P: AsRef<Path>>(path: P) -> Option<FileKind> {
    let name = file_name_lowercase(path)?;
    let (ext, _) = split_extension(&name)?;
    if SINGLE_EXTENSIONS.contains(&ext) {
        Some(FileKind::Single)
    } else {
        Some(FileKind::Pair)
    }
}

/// Check whether the path names a NIfTI file completely: a recognized
/// extension preceded by a non-empty prefix.
pub fn is_complete_filename<P: AsRef<Path>>(path: P) -> bool {
    file_name_lowercase(path)
        .and_then(|name| split_extension(&name).map(|(_, has_prefix)| has_prefix))
        .unwrap_or(false)
}

/// Check whether the file's name ends in ".gz".
pub fn is_gz_file<P: AsRef<Path>>(path: P) -> bool {
    file_name_lowercase(path)
        .map(|name| name.ends_with(".gz"))
        .unwrap_or(false)
}

/// Replace the NIfTI extension of `path` with `ext`, keeping the
/// ".gz" suffix if `path` had one.
fn with_pair_extension(path: &Path, ext: &str, gz: bool) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    let (old_ext, has_prefix) = split_extension(&lower)?;
    if !has_prefix {
        return None;
    }
    let stem = &name[..name.len() - old_ext.len()];
    let new_name = if gz {
        format!("{}{}.gz", stem, ext)
    } else {
        format!("{}{}", stem, ext)
    };
    Some(path.with_file_name(new_name))
}

/// Resolve the header and volume file paths of a header/data pair from
/// either of the two file names.
///
/// Returns `None` if the path is not a complete pair file name.
pub fn pair_paths<P: AsRef<Path>>(path: P) -> Option<(PathBuf, PathBuf)> {
    let path = path.as_ref();
    if file_kind(path) != Some(FileKind::Pair) {
        return None;
    }
    let gz = is_gz_file(path);
    Some((
        with_pair_extension(path, ".hdr", gz)?,
        with_pair_extension(path, ".img", gz)?,
    ))
}

/// Candidate volume files for the given header path, in the order in which
/// they should be tried: same compression first, then the other one.
pub fn volume_file_candidates<P: AsRef<Path>>(hdr_path: P) -> Vec<PathBuf> {
    let path = hdr_path.as_ref();
    let gz = is_gz_file(path);
    [gz, !gz]
        .iter()
        .filter_map(|&gz| with_pair_extension(path, ".img", gz))
        .collect()
}

/// Validate a raw N-dimensional index or shape, returning the part of
/// `dim` in use.
pub fn validate_dim(raw_dim: &[u16; 8]) -> Result<&[u16]> {
    let ndim = validate_dimensionality(raw_dim)?;
    let o = &raw_dim[1..=ndim];
    if let Some(i) = o.iter().position(|&x| x == 0) {
        return Err(NiftiError::InconsistentDim(i as u8 + 1, raw_dim[i + 1]));
    }
    Ok(o)
}

/// Number of voxels in a raw shape.
///
/// # Errors
///
/// - `NiftiError::InconsistentDim` if the shape is not valid.
/// - `NiftiError::VolumeTooLarge` if the count does not fit in `usize`.
pub fn voxel_count(raw_dim: &[u16; 8]) -> Result<usize> {
    validate_dim(raw_dim)?
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(usize::from(d)))
        .ok_or(NiftiError::VolumeTooLarge)
}

/// Validate a raw volume dimensionality (`dim[0]`).
pub fn validate_dimensionality(raw_dim: &[u16; 8]) -> Result<usize> {
    if raw_dim[0] == 0 || raw_dim[0] > 7 {
        return Err(NiftiError::InconsistentDim(0, raw_dim[0]));
    }
    Ok(usize::from(raw_dim[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_extensions() {
        assert_eq!(file_kind("a.nii"), Some(FileKind::Single));
        assert_eq!(file_kind("dir/a.NII.GZ"), Some(FileKind::Single));
        assert_eq!(file_kind("a.hdr"), Some(FileKind::Pair));
        assert_eq!(file_kind("a.img.gz"), Some(FileKind::Pair));
        assert_eq!(file_kind("a.dat"), None);
        assert_eq!(file_kind("a.gz"), None);
        assert_eq!(file_kind("nii"), None);
    }

    #[test]
    fn complete_filenames() {
        assert!(is_complete_filename("brain.nii.gz"));
        assert!(is_complete_filename("/tmp/brain.img"));
        assert!(!is_complete_filename(".nii"));
        assert!(!is_complete_filename("brain.dat"));
        assert!(!is_complete_filename("/tmp/"));
    }

    #[test]
    fn gz_files() {
        assert!(is_gz_file("/tmp/brain.nii.gz"));
        assert!(is_gz_file("/tmp/brain.GZ"));
        assert!(!is_gz_file("/tmp/brain.nii"));
    }

    #[test]
    fn pairs() {
        assert_eq!(
            pair_paths("dir/brain.img"),
            Some((PathBuf::from("dir/brain.hdr"), PathBuf::from("dir/brain.img")))
        );
        assert_eq!(
            pair_paths("brain.hdr.gz"),
            Some((PathBuf::from("brain.hdr.gz"), PathBuf::from("brain.img.gz")))
        );
        assert_eq!(pair_paths("brain.nii"), None);
        assert_eq!(
            volume_file_candidates("brain.hdr"),
            vec![PathBuf::from("brain.img"), PathBuf::from("brain.img.gz")]
        );
    }

    #[test]
    fn dims() {
        assert_eq!(validate_dim(&[3, 4, 5, 6, 0, 0, 0, 0]).unwrap(), &[4, 5, 6]);
        assert!(validate_dim(&[0, 4, 5, 6, 0, 0, 0, 0]).is_err());
        assert!(validate_dim(&[8, 4, 5, 6, 1, 1, 1, 1]).is_err());
        assert!(validate_dim(&[3, 4, 0, 6, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn voxel_counts() {
        assert_eq!(voxel_count(&[3, 4, 5, 6, 0, 0, 0, 0]).unwrap(), 120);
        assert!(matches!(
            voxel_count(&[7, 32767, 32767, 32767, 32767, 32767, 32767, 32767]),
            Err(NiftiError::VolumeTooLarge)
        ));
        assert!(matches!(
            voxel_count(&[2, 4, 0, 1, 1, 1, 1, 1]),
            Err(NiftiError::InconsistentDim(2, 0))
        ));
    }
}
