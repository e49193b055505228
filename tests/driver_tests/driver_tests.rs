//! Tests for GPIO drivers
//!
//! These tests verify:
//! - The memory driver records writes and simulated inputs
//! - The sysfs driver exports pins, sets directions once and reads values
//! - Sysfs failures surface as driver errors

use std::fs;
use std::path::{Path, PathBuf};

use gpiosysv::driver::{GpioDriver, MemoryDriver, SysfsDriver};
use gpiosysv::{GpioError, PinId, PinValue, ERROR_SENTINEL};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn pin(id: u8) -> PinId {
    PinId::new(id).unwrap()
}

/// Fake sysfs tree with the given pins already exported
fn setup_sysfs(exported: &[u8]) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().to_path_buf();
    fs::write(base.join("export"), "").unwrap();
    for id in exported {
        let dir = base.join(format!("gpio{}", id));
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("direction"), "in").unwrap();
        fs::write(dir.join("value"), "0").unwrap();
    }
    (temp_dir, base)
}

fn read(base: &Path, id: u8, file: &str) -> String {
    fs::read_to_string(base.join(format!("gpio{}", id)).join(file)).unwrap()
}

// =============================================================================
// Memory Driver Tests
// =============================================================================

#[test]
fn test_memory_driver_starts_low() {
    let driver = MemoryDriver::new();
    for id in PinId::MIN..=PinId::MAX {
        assert_eq!(driver.get_input_pin(pin(id)).unwrap(), PinValue::Low);
    }
    assert!(driver.writes().is_empty());
}

#[test]
fn test_memory_driver_records_writes() {
    let driver = MemoryDriver::new();
    driver.set_output_pin(pin(4), PinValue::High).unwrap();
    driver.set_output_pin(pin(4), PinValue::Low).unwrap();
    driver.set_output_pin(pin(40), PinValue::High).unwrap();

    assert_eq!(
        driver.writes(),
        vec![
            (pin(4), PinValue::High),
            (pin(4), PinValue::Low),
            (pin(40), PinValue::High),
        ]
    );
    assert_eq!(driver.level(pin(40)), PinValue::High);

    driver.clear_writes();
    assert!(driver.writes().is_empty());
    assert_eq!(driver.level(pin(40)), PinValue::High);
}

#[test]
fn test_memory_driver_simulated_input() {
    let driver = MemoryDriver::new();
    driver.set_input(pin(9), PinValue::High);

    assert_eq!(driver.get_input_pin(pin(9)).unwrap(), PinValue::High);
    assert!(driver.writes().is_empty());
}

// =============================================================================
// Sysfs Driver Tests
// =============================================================================

#[test]
fn test_sysfs_write_sets_direction_and_value() {
    let (_temp, base) = setup_sysfs(&[17]);
    let driver = SysfsDriver::with_base(&base);

    driver.set_output_pin(pin(17), PinValue::High).unwrap();

    assert_eq!(read(&base, 17, "direction"), "out");
    assert_eq!(read(&base, 17, "value"), "1");
}

#[test]
fn test_sysfs_direction_written_once() {
    let (_temp, base) = setup_sysfs(&[17]);
    let driver = SysfsDriver::with_base(&base);

    driver.set_output_pin(pin(17), PinValue::High).unwrap();

    // Anything else touching the direction file is not overwritten again
    fs::write(base.join("gpio17").join("direction"), "marker").unwrap();
    driver.set_output_pin(pin(17), PinValue::Low).unwrap();

    assert_eq!(read(&base, 17, "direction"), "marker");
    assert_eq!(read(&base, 17, "value"), "0");
}

#[test]
fn test_sysfs_read_value() {
    let (_temp, base) = setup_sysfs(&[5]);
    fs::write(base.join("gpio5").join("value"), "1\n").unwrap();

    let driver = SysfsDriver::with_base(&base);
    assert_eq!(driver.get_input_pin(pin(5)).unwrap(), PinValue::High);

    // Reading an exported pin leaves its direction alone
    assert_eq!(read(&base, 5, "direction"), "in");
}

#[test]
fn test_sysfs_reads_back_driven_output() {
    let (_temp, base) = setup_sysfs(&[6]);
    let driver = SysfsDriver::with_base(&base);

    driver.set_output_pin(pin(6), PinValue::High).unwrap();
    assert_eq!(driver.get_input_pin(pin(6)).unwrap(), PinValue::High);
    assert_eq!(read(&base, 6, "direction"), "out");
}

#[test]
fn test_sysfs_exports_missing_pin() {
    let (_temp, base) = setup_sysfs(&[]);
    let driver = SysfsDriver::with_base(&base);

    // No kernel to create gpio23/, so the direction write fails after export
    let err = driver.set_output_pin(pin(23), PinValue::High).unwrap_err();

    assert_eq!(fs::read_to_string(base.join("export")).unwrap(), "23");
    match err {
        GpioError::Driver { pin, .. } => assert_eq!(pin, 23),
        other => panic!("expected driver error, got {:?}", other),
    }
}

#[test]
fn test_sysfs_garbage_value_is_error() {
    let (_temp, base) = setup_sysfs(&[8]);
    fs::write(base.join("gpio8").join("value"), "maybe").unwrap();

    let driver = SysfsDriver::with_base(&base);
    let err = driver.get_input_pin(pin(8)).unwrap_err();
    assert_eq!(err.code(), ERROR_SENTINEL);
}

#[test]
fn test_sysfs_missing_tree_is_error() {
    let driver = SysfsDriver::with_base("/nonexistent/gpio/tree");
    assert!(driver.set_output_pin(pin(3), PinValue::High).is_err());
    assert!(driver.get_input_pin(pin(3)).is_err());
}
