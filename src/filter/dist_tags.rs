//! Distribution tag reconciliation
//!
//! After versions are hidden, every tag pointing at a version that is gone is
//! moved to the newest survivor by publish time. When no survivor has a
//! readable publish time the lexicographically smallest identifier is used, and
//! when nothing survives the tag is deleted.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::filter::publish_time::parse_publish_time;

/// Change applied to a tag whose target was hidden
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TagRepair {
    Repoint { from: Value, to: String },
    Delete { from: Value },
}

/// Plan repairs for the tags in `dist_tags` that no longer resolve.
///
/// Tags are returned in their original order. Tags that still resolve are not
/// included.
pub fn plan_tag_repairs(
    dist_tags: &Map<String, Value>,
    versions: &Map<String, Value>,
    removed: &HashSet<&str>,
    time: Option<&Map<String, Value>>,
) -> IndexMap<String, TagRepair> {
    let resolves = |target: &Value| {
        target
            .as_str()
            .is_some_and(|t| versions.contains_key(t) && !removed.contains(t))
    };

    let dangling: Vec<(&String, &Value)> = dist_tags
        .iter()
        .filter(|(_, target)| !resolves(target))
        .collect();
    if dangling.is_empty() {
        return IndexMap::new();
    }

    let survivors = || {
        versions
            .keys()
            .map(String::as_str)
            .filter(|v| !removed.contains(v))
    };
    let replacement = newest_by_publish_time(survivors(), time).or_else(|| survivors().min());

    dangling
        .into_iter()
        .map(|(tag, target)| {
            let repair = match replacement {
                Some(to) => TagRepair::Repoint {
                    from: target.clone(),
                    to: to.to_string(),
                },
                None => TagRepair::Delete {
                    from: target.clone(),
                },
            };
            (tag.clone(), repair)
        })
        .collect()
}

/// The candidate with the latest readable publish time.
///
/// Ties go to the candidate seen first. Candidates without a readable time are
/// skipped.
pub fn newest_by_publish_time<'a>(
    candidates: impl IntoIterator<Item = &'a str>,
    time: Option<&Map<String, Value>>,
) -> Option<&'a str> {
    let time = time?;

    candidates
        .into_iter()
        .filter_map(|v| time.get(v).and_then(parse_publish_time).map(|t| (v, t)))
        .fold(None, |newest, (v, t)| match newest {
            Some((_, newest_t)) if newest_t >= t => newest,
            _ => Some((v, t)),
        })
        .map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn newest_by_publish_time_picks_latest_timestamp() {
        let time = object(json!({
            "1.0.0": "2024-01-01T00:00:00.000Z",
            "1.1.0": "2024-02-01T00:00:00.000Z",
            "0.9.0": "2023-06-01T00:00:00.000Z"
        }));

        let newest = newest_by_publish_time(["1.0.0", "1.1.0", "0.9.0"], Some(&time));

        assert_eq!(newest, Some("1.1.0"));
    }

    #[test]
    fn newest_by_publish_time_breaks_ties_by_first_seen() {
        let time = object(json!({
            "b": "2024-01-01T00:00:00.000Z",
            "a": "2024-01-01T00:00:00.000Z"
        }));

        assert_eq!(newest_by_publish_time(["b", "a"], Some(&time)), Some("b"));
        assert_eq!(newest_by_publish_time(["a", "b"], Some(&time)), Some("a"));
    }

    #[test]
    fn newest_by_publish_time_skips_unreadable_times() {
        let time = object(json!({
            "1.0.0": "2020-01-01T00:00:00.000Z",
            "2.0.0": "garbage",
            "3.0.0": 17
        }));

        let newest = newest_by_publish_time(["1.0.0", "2.0.0", "3.0.0", "4.0.0"], Some(&time));

        assert_eq!(newest, Some("1.0.0"));
    }

    #[test]
    fn newest_by_publish_time_without_time_map_is_none() {
        assert_eq!(newest_by_publish_time(["1.0.0"], None), None);
    }

    #[test]
    fn repoints_dangling_tag_to_newest_survivor() {
        let versions = object(json!({"1.0.0": {}, "1.1.0": {}, "2.0.0": {}}));
        let time = object(json!({
            "1.0.0": "2024-01-01T00:00:00.000Z",
            "1.1.0": "2024-02-01T00:00:00.000Z",
            "2.0.0": "2024-03-01T00:00:00.000Z"
        }));
        let tags = object(json!({"latest": "2.0.0", "legacy": "1.0.0"}));
        let removed = HashSet::from(["2.0.0"]);

        let repairs = plan_tag_repairs(&tags, &versions, &removed, Some(&time));

        assert_eq!(repairs.len(), 1);
        assert_eq!(
            repairs.get("latest"),
            Some(&TagRepair::Repoint {
                from: json!("2.0.0"),
                to: "1.1.0".to_string()
            })
        );
    }

    #[test]
    fn falls_back_to_smallest_identifier_without_readable_times() {
        let versions = object(json!({"zeta": {}, "alpha": {}, "gamma": {}, "new": {}}));
        let time = object(json!({"new": "2024-03-01T00:00:00.000Z"}));
        let tags = object(json!({"latest": "new"}));
        let removed = HashSet::from(["new"]);

        let repairs = plan_tag_repairs(&tags, &versions, &removed, Some(&time));

        assert_eq!(
            repairs.get("latest"),
            Some(&TagRepair::Repoint {
                from: json!("new"),
                to: "alpha".to_string()
            })
        );
    }

    #[test]
    fn deletes_tags_when_nothing_survives() {
        let versions = object(json!({"1.0.0": {}}));
        let tags = object(json!({"latest": "1.0.0", "next": "1.0.0"}));
        let removed = HashSet::from(["1.0.0"]);

        let repairs = plan_tag_repairs(&tags, &versions, &removed, None);

        assert_eq!(
            repairs.into_iter().collect::<Vec<_>>(),
            vec![
                (
                    "latest".to_string(),
                    TagRepair::Delete {
                        from: json!("1.0.0")
                    }
                ),
                (
                    "next".to_string(),
                    TagRepair::Delete {
                        from: json!("1.0.0")
                    }
                ),
            ]
        );
    }

    #[test]
    fn non_string_targets_are_dangling() {
        let versions = object(json!({"1.0.0": {}, "2.0.0": {}}));
        let tags = object(json!({"latest": 2, "beta": null}));
        let removed = HashSet::from(["2.0.0"]);

        let repairs = plan_tag_repairs(&tags, &versions, &removed, None);

        assert_eq!(repairs.len(), 2);
        assert!(repairs.values().all(|repair| matches!(
            repair,
            TagRepair::Repoint { to, .. } if to == "1.0.0"
        )));
    }

    #[test]
    fn resolving_tags_need_no_repair() {
        let versions = object(json!({"1.0.0": {}, "2.0.0": {}}));
        let tags = object(json!({"latest": "1.0.0"}));
        let removed = HashSet::from(["2.0.0"]);

        let repairs = plan_tag_repairs(&tags, &versions, &removed, None);

        assert!(repairs.is_empty());
    }
}
