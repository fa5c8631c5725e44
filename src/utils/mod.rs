pub mod test_helpers;

use uuid::Uuid;

/// Builds a scratch-storage name unique to the current request, so that
/// concurrent requests never collide on disk.
pub fn scratch_name(prefix: &str, extension: Option<&str>) -> String {
    let stamp = chrono::Utc::now().timestamp_millis();
    let nonce = Uuid::new_v4().simple();
    match extension {
        Some(ext) => format!("{prefix}-{stamp}-{nonce}.{ext}"),
        None => format!("{prefix}-{stamp}-{nonce}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_names_are_unique_and_prefixed() {
        let a = scratch_name("file", Some("zip"));
        let b = scratch_name("file", Some("zip"));
        assert_ne!(a, b);
        assert!(a.starts_with("file-"));
        assert!(a.ends_with(".zip"));
        assert!(!scratch_name("extracted", None).contains('.'));
    }
}
