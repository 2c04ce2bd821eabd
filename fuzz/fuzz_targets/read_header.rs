#![no_main]
use libfuzzer_sys::fuzz_target;
use nifti_geometry::NiftiHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = NiftiHeader::from_reader(data) {
        let _ = header.dim();
        let _ = header.data_type();
        let _ = header.qform();
        let _ = header.sform();
        let _ = header.xyzt_to_space();
        let _ = header.xyzt_to_time();
        let _ = header.analyze75_orientation();
        let _ = header.qform_affine();
        let _ = header.sform_affine();
        let _ = header.description_str();
        let _ = header.clone().validate_description();
    }
});
