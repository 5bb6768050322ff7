//! Cache key helpers

/// `category:identifier[:sub_key]`
pub fn generate_cache_key(category: &str, identifier: &str, sub_key: Option<&str>) -> String {
    let mut parts = vec![category, identifier];
    if let Some(sub) = sub_key.filter(|s| !s.is_empty()) {
        parts.push(sub);
    }
    parts.join(":")
}

/// Only successful responses that carry data are worth caching.
pub fn should_cache(status: u16, has_data: bool) -> bool {
    (200..300).contains(&status) && has_data
}
