#![no_main]
use libfuzzer_sys::fuzz_target;
use nifti_geometry::{InMemNiftiObject, NiftiHeader, NiftiImageIo, OrientationPolicy};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = NiftiHeader::from_reader(data) {
        let _ = NiftiImageIo::new().ingest_header(&header);
        let _ = NiftiImageIo::new()
            .orientation_policy(OrientationPolicy::Exact)
            .ingest_header(&header);
    }
    let _ = InMemNiftiObject::from_reader(data);
});
