//! Test helpers for writing request and configuration files.

use camino::{Utf8Path, Utf8PathBuf};
use chargesite_core::test_support::{SAMPLE_LAT, SAMPLE_LON, sample_ring};
use tempfile::TempDir;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture file");
}

/// Temporary directory exposed as a UTF-8 root.
pub(super) fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

/// JSON site request around the shared sample point.
pub(super) fn site_request_json(lat: f64) -> String {
    serde_json::json!({
        "polygon": sample_ring(),
        "point": { "lat": lat, "lon": SAMPLE_LON },
    })
    .to_string()
}

/// A request that validates.
pub(super) fn valid_site_request_json() -> String {
    site_request_json(SAMPLE_LAT)
}
