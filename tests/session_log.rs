//! The session logger owns process-wide state, so it gets its own test binary.

use pixelsketch::{log_info, log_warn, logger};

#[test]
fn init_opens_the_log_and_records_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("PixelSketch").join("pixelsketch.log");
    assert!(logger::log_path().is_none());

    logger::init_at(&path);
    assert_eq!(logger::log_path(), Some(&path));

    log_info!("Pen stroke ({} cells)", 4);
    log_warn!("Rejected grid size {}x{}", 0, 3);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("PixelSketch session started"));
    assert!(text.contains("[INFO] Pen stroke (4 cells)"));
    assert!(text.contains("[WARN] Rejected grid size 0x3"));
}
