//! Diagram-node identifiers.
//!
//! draw.io cell ids end up in `source`/`target` references and in derived
//! edge/label ids, so they are kept free of separators that the rest of the
//! serializer relies on.

/// Identifier used when a device label is missing entirely.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Characters removed from a label when turning it into an identifier.
const STRIPPED_CHARS: [char; 4] = [' ', ':', '.', '-'];

/// Normalize a raw device label into a diagram-node identifier.
///
/// Surrounding whitespace is trimmed, then spaces, colons, periods and
/// hyphens are deleted outright (`"FS-108E 1"` becomes `"FS108E1"`).
/// A missing or blank label maps to [`UNKNOWN_IDENTITY`].
pub fn normalize(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return UNKNOWN_IDENTITY.to_string();
    };

    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();
    // Deleting a leading hyphen can expose whitespace ("-\tx").
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        UNKNOWN_IDENTITY.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_label() {
        assert_eq!(normalize(None), "unknown");
        assert_eq!(normalize(Some("")), "unknown");
        assert_eq!(normalize(Some("  - . ")), "unknown");
    }

    #[test]
    fn test_strips_unsafe_characters() {
        assert_eq!(normalize(Some("FGT60F0000000001")), "FGT60F0000000001");
        assert_eq!(normalize(Some("  S108EN-1234 ")), "S108EN1234");
        assert_eq!(normalize(Some("Core Switch 1")), "CoreSwitch1");
        assert_eq!(normalize(Some("00:09:0f:aa:bb:cc")), "00090faabbcc");
        assert_eq!(normalize(Some("ap.floor-2")), "apfloor2");
    }

    #[test]
    fn test_keeps_other_characters() {
        assert_eq!(normalize(Some("Unknown_SW_0")), "Unknown_SW_0");
        assert_eq!(normalize(Some("port/1")), "port/1");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["FG-UNKNOWN", " Sw-A ", "a.b:c d-e", "", "x\t-\ty", "-\tx", "Unknown_AP_3"] {
            let once = normalize(Some(raw));
            assert_eq!(normalize(Some(once.as_str())), once, "not idempotent for {:?}", raw);
        }
    }
}
