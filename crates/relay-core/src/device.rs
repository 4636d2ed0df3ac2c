//! Device identity generation and persistence.

use std::{fs, io, path::Path};

use chrono::Utc;
use uuid::Uuid;

/// Prefix marking ids generated by this client.
pub const DEVICE_ID_PREFIX: &str = "cli-";

/// Generate a fresh opaque device id.
pub fn generate_device_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{DEVICE_ID_PREFIX}{millis}-{}", &suffix[..12])
}

/// Load the persisted device id from `path`, generating and persisting one on
/// first use. The id survives restarts so the backend sees a stable device.
pub fn load_or_create_device_id(path: &Path) -> io::Result<String> {
    if let Ok(existing) = fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_owned());
        }
    }

    let id = generate_device_id();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &id)?;
    Ok(id)
}

/// Human-readable device name reported to `/api/sync`.
pub fn device_display_name() -> String {
    format!("{} terminal", std::env::consts::OS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix_and_are_unique() {
        let a = generate_device_id();
        let b = generate_device_id();
        assert!(a.starts_with(DEVICE_ID_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn persists_id_across_loads() {
        let dir = tempfile::tempdir().expect("tempdir should be creatable");
        let path = dir.path().join("device-id");

        let first = load_or_create_device_id(&path).expect("first load should create");
        let second = load_or_create_device_id(&path).expect("second load should reuse");
        assert_eq!(first, second);
    }

    #[test]
    fn regenerates_when_file_is_blank() {
        let dir = tempfile::tempdir().expect("tempdir should be creatable");
        let path = dir.path().join("device-id");
        fs::write(&path, "  \n").expect("seed write should work");

        let id = load_or_create_device_id(&path).expect("load should regenerate");
        assert!(id.starts_with(DEVICE_ID_PREFIX));
    }
}
