use super::links::CandidateLink;
use std::collections::HashSet;

/// Collapse candidate links into one link per unordered endpoint pair.
///
/// The first candidate seen for a pair wins, including its port labels, so
/// the input must be in resolution order.
pub fn dedup_links(candidates: Vec<CandidateLink>) -> Vec<CandidateLink> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let total = candidates.len();

    let unique: Vec<CandidateLink> = candidates
        .into_iter()
        .filter(|link| {
            let (a, b) = link.endpoint_key();
            seen.insert((a.to_string(), b.to_string()))
        })
        .collect();

    tracing::debug!(
        "Deduplicated {} candidate links into {} unique links",
        total,
        unique.len()
    );
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(from: &str, to: &str, from_port: Option<&str>, to_port: Option<&str>) -> CandidateLink {
        CandidateLink {
            from: from.to_string(),
            to: to.to_string(),
            from_port: from_port.map(String::from),
            to_port: to_port.map(String::from),
        }
    }

    #[test]
    fn test_reverse_direction_collapses() {
        let unique = dedup_links(vec![
            link("S2", "S1", Some("p2"), Some("p1")),
            link("S1", "S2", Some("p1"), Some("p2")),
        ]);
        assert_eq!(unique, vec![link("S2", "S1", Some("p2"), Some("p1"))]);
    }

    #[test]
    fn test_first_seen_labels_win() {
        let unique = dedup_links(vec![
            link("S2", "S1", Some("p2"), Some("p1")),
            link("S2", "S1", Some("p3"), Some("p4")),
            link("S2", "S1", None, None),
        ]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].from_port.as_deref(), Some("p2"));
        assert_eq!(unique[0].to_port.as_deref(), Some("p1"));
    }

    #[test]
    fn test_distinct_pairs_kept_in_order() {
        let unique = dedup_links(vec![
            link("FGT", "S1", None, None),
            link("S1", "S2", None, None),
            link("S1", "FGT", None, None),
            link("S2", "FP1", None, None),
        ]);
        let pairs: Vec<(&str, &str)> = unique.iter().map(|l| (l.from.as_str(), l.to.as_str())).collect();
        assert_eq!(pairs, vec![("FGT", "S1"), ("S1", "S2"), ("S2", "FP1")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_links(Vec::new()).is_empty());
    }
}
