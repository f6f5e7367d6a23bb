//! Stored form of a task's dependency list (a JSON array of titles).

/// Serialize a dependency list for storage.
pub fn encode_dependencies(dependencies: &[String]) -> String {
    serde_json::to_string(dependencies).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a stored dependency list. Absent or malformed values yield an empty list.
pub fn decode_dependencies(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Option<Vec<String>>>(raw) {
        Ok(deps) => deps.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Discarding malformed stored dependency list: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_order_and_content() {
        let deps = vec![
            "Write \"draft\"".to_string(),
            "Research, part 2".to_string(),
            "Ünïcödé".to_string(),
            "Research, part 2".to_string(),
        ];
        let stored = encode_dependencies(&deps);
        assert_eq!(decode_dependencies(Some(&stored)), deps);
    }

    #[test]
    fn empty_list_round_trips() {
        assert_eq!(encode_dependencies(&[]), "[]");
        assert!(decode_dependencies(Some("[]")).is_empty());
    }

    #[test]
    fn malformed_values_become_empty() {
        assert!(decode_dependencies(None).is_empty());
        assert!(decode_dependencies(Some("")).is_empty());
        assert!(decode_dependencies(Some("null")).is_empty());
        assert!(decode_dependencies(Some("[\"unterminated")).is_empty());
        assert!(decode_dependencies(Some("{\"a\":1}")).is_empty());
        assert!(decode_dependencies(Some("[1, 2]")).is_empty());
    }
}
