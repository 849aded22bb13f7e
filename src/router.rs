//! Catalog model selection and per-architecture source ranking

use std::cmp::Ordering;

use crate::catalog::{ModelCatalog, SensorCatalog, SourceKind};
use crate::device::DeviceProfile;

/// Compare dotted numeric versions segment by segment.
///
/// Missing trailing segments count as zero and non-numeric segments parse as
/// zero, so `"14.10"` is newer than `"14.5"` and `"14"` equals `"14.0.0"`.
pub fn compare_version(a: &str, b: &str) -> Ordering {
    let left: Vec<u64> = a.split('.').map(|s| s.trim().parse().unwrap_or(0)).collect();
    let right: Vec<u64> = b.split('.').map(|s| s.trim().parse().unwrap_or(0)).collect();

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn contains_version(model: &ModelCatalog, version: &str) -> bool {
    let above_min = model.os_min.as_deref().map_or(true, |min| compare_version(version, min) != Ordering::Less);
    let below_max = model.os_max.as_deref().map_or(true, |max| compare_version(version, max) != Ordering::Greater);
    above_min && below_max
}

/// Order candidates so the most specific entry sorts first: a present, lower
/// `osMax` before a higher one, a missing `osMax` last, ties broken by the
/// higher `osMin`.
fn specificity(a: &ModelCatalog, b: &ModelCatalog) -> Ordering {
    let by_max = match (&a.os_max, &b.os_max) {
        (Some(x), Some(y)) => compare_version(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_max.then_with(|| match (&a.os_min, &b.os_min) {
        (Some(x), Some(y)) => compare_version(y, x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Pick the catalog entry describing `device`, if any.
pub fn select_model<'a>(catalog: &'a SensorCatalog, device: &DeviceProfile) -> Option<&'a ModelCatalog> {
    catalog
        .models
        .iter()
        .filter(|m| m.model_identifier == device.model_identifier)
        .filter(|m| contains_version(m, &device.os_version))
        .min_by(|a, b| specificity(a, b))
}

/// Every entry for the device's model, regardless of OS range
pub fn models_for<'a>(
    catalog: &'a SensorCatalog,
    device: &'a DeviceProfile,
) -> impl Iterator<Item = &'a ModelCatalog> + 'a {
    catalog.models.iter().filter(move |m| m.model_identifier == device.model_identifier)
}

/// Preference of a source kind on the given architecture; lower is preferred.
pub fn source_rank(kind: SourceKind, is_apple_silicon: bool) -> u8 {
    if is_apple_silicon {
        match kind {
            SourceKind::IoReport => 0,
            SourceKind::IoHwSensor => 1,
            SourceKind::Smc => 2,
            SourceKind::Derived => 3,
        }
    } else {
        match kind {
            SourceKind::IoHwSensor => 0,
            SourceKind::Smc => 1,
            SourceKind::IoReport => 2,
            SourceKind::Derived => 3,
        }
    }
}

/// Order items for a last-write-wins merge: least preferred first, so the
/// preferred source kind overwrites the others on overlapping keys.
pub fn order_for_merge<T>(mut items: Vec<(SourceKind, T)>, is_apple_silicon: bool) -> Vec<T> {
    items.sort_by_key(|(kind, _)| std::cmp::Reverse(source_rank(*kind, is_apple_silicon)));
    items.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SUPPORTED_SCHEMA_VERSION;

    fn model(id: &str, os_min: Option<&str>, os_max: Option<&str>) -> ModelCatalog {
        ModelCatalog {
            model_identifier: id.to_string(),
            os_min: os_min.map(str::to_string),
            os_max: os_max.map(str::to_string),
            sensors: Vec::new(),
        }
    }

    fn device(model: &str, os: &str) -> DeviceProfile {
        DeviceProfile::new(model, os, true)
    }

    #[test]
    fn test_compare_version_is_numeric() {
        assert_eq!(compare_version("14.10", "14.5"), Ordering::Greater);
        assert_eq!(compare_version("2", "10"), Ordering::Less);
        assert_eq!(compare_version("14", "14.0.0"), Ordering::Equal);
        assert_eq!(compare_version("13.6.1", "13.6"), Ordering::Greater);
    }

    #[test]
    fn test_select_model_prefers_tightest_os_max() {
        let catalog = SensorCatalog {
            schema_version: SUPPORTED_SCHEMA_VERSION,
            models: vec![
                model("Mac14,2", Some("13.0"), None),
                model("Mac14,2", Some("13.0"), Some("15.0")),
                model("Mac14,2", Some("12.0"), Some("14.2")),
            ],
        };

        let selected = select_model(&catalog, &device("Mac14,2", "14.1")).unwrap();
        assert_eq!(selected.os_max.as_deref(), Some("14.2"));

        // 14.5 falls outside the 14.2 cap, so the next tightest wins
        let selected = select_model(&catalog, &device("Mac14,2", "14.5")).unwrap();
        assert_eq!(selected.os_max.as_deref(), Some("15.0"));

        let selected = select_model(&catalog, &device("Mac14,2", "16.0")).unwrap();
        assert_eq!(selected.os_max, None);
    }

    #[test]
    fn test_select_model_breaks_ties_on_higher_os_min() {
        let catalog = SensorCatalog {
            schema_version: SUPPORTED_SCHEMA_VERSION,
            models: vec![model("Mac14,2", Some("12.0"), Some("15.0")), model("Mac14,2", Some("14.0"), Some("15.0"))],
        };
        let selected = select_model(&catalog, &device("Mac14,2", "14.3")).unwrap();
        assert_eq!(selected.os_min.as_deref(), Some("14.0"));
    }

    #[test]
    fn test_select_model_unknown_model() {
        let catalog = SensorCatalog {
            schema_version: SUPPORTED_SCHEMA_VERSION,
            models: vec![model("Mac14,2", None, None)],
        };
        assert!(select_model(&catalog, &device("Mac15,3", "14.0")).is_none());
        assert!(select_model(&catalog, &device("Mac14,2", "14.0")).is_some());
    }

    #[test]
    fn test_source_rank_per_architecture() {
        assert!(source_rank(SourceKind::IoReport, true) < source_rank(SourceKind::IoHwSensor, true));
        assert!(source_rank(SourceKind::IoHwSensor, true) < source_rank(SourceKind::Smc, true));
        assert!(source_rank(SourceKind::IoHwSensor, false) < source_rank(SourceKind::Smc, false));
        assert!(source_rank(SourceKind::Smc, false) < source_rank(SourceKind::IoReport, false));
        assert_eq!(source_rank(SourceKind::Derived, true), 3);
        assert_eq!(source_rank(SourceKind::Derived, false), 3);
    }

    #[test]
    fn test_order_for_merge_puts_preferred_last() {
        let items = vec![(SourceKind::IoHwSensor, "hid"), (SourceKind::Smc, "smc"), (SourceKind::IoReport, "ioreport")];
        assert_eq!(order_for_merge(items.clone(), true), vec!["smc", "hid", "ioreport"]);
        assert_eq!(order_for_merge(items, false), vec!["ioreport", "smc", "hid"]);
    }
}
