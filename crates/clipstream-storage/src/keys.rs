//! Object key construction for uploaded files.

/// Replace any character outside `[A-Za-z0-9.-]` with an underscore so the
/// key is safe for the backend and for URLs without encoding surprises.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Object key for an upload: `uploads/{campaign}/{timestamp_millis}-{name}`.
/// Files without a campaign land under `uncategorized`. The timestamp prefix
/// keeps repeated uploads of the same file name from colliding.
pub fn object_key(campaign_id: Option<&str>, file_name: &str, timestamp_millis: i64) -> String {
    let campaign = campaign_id.filter(|c| !c.is_empty()).unwrap_or("uncategorized");
    format!(
        "uploads/{}/{}-{}",
        campaign,
        timestamp_millis,
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_chars() {
        assert_eq!(sanitize_file_name("my video (final).mp4"), "my_video__final_.mp4");
        assert_eq!(sanitize_file_name("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name("ünïcode.mov"), "_n_code.mov");
    }

    #[test]
    fn key_includes_campaign_and_timestamp() {
        let key = object_key(Some("spring-launch"), "promo.mp4", 1700000000000);
        assert_eq!(key, "uploads/spring-launch/1700000000000-promo.mp4");
    }

    #[test]
    fn key_defaults_to_uncategorized() {
        let key = object_key(None, "promo.mp4", 1);
        assert_eq!(key, "uploads/uncategorized/1-promo.mp4");
        let key = object_key(Some(""), "promo.mp4", 1);
        assert_eq!(key, "uploads/uncategorized/1-promo.mp4");
    }
}
