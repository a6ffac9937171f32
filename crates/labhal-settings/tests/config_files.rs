//! Config file round trips

use labhal_communication::SerialParity;
use labhal_settings::{Config, SettingsError};
use tempfile::tempdir;

fn sample() -> Config {
    let mut config = Config::default();
    config.transport.port = "/dev/ttyUSB1".to_string();
    config.transport.baud_rate = 115200;
    config.transport.parity = SerialParity::Even;
    config.line_ending = "\r\n".to_string();
    config.device.vendor_id = 0x0403;
    config.device.product_id = 0x6001;
    config.device.serial_number = "FT[0-9A-Z]+".to_string();
    config.device.refresh_interval_ms = 250;
    config
}

#[test]
fn test_toml_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("labhal.toml");

    sample().save_to_file(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[transport]"));
    assert!(content.contains("parity = \"even\""));

    assert_eq!(Config::load_from_file(&path).unwrap(), sample());
}

#[test]
fn test_json_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("labhal.json");

    sample().save_to_file(&path).unwrap();
    let loaded = Config::load_from_file(&path).unwrap();

    assert_eq!(loaded, sample());
    let identity = loaded.device.identity().unwrap();
    assert!(identity.serial_number.matches("FT4ZKQ1"));
}

#[test]
fn test_invalid_file_is_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("labhal.toml");
    std::fs::write(&path, "[transport]\nbaud_rate = 0\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidSetting { key, .. } if key == "transport.baud_rate"));
}

#[test]
fn test_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("labhal.json");
    std::fs::write(&path, "{ \"transport\": ").unwrap();

    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::JsonError(_))
    ));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::IoError(_))
    ));
}
