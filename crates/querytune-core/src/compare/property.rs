use proptest::prelude::*;

use super::*;
use crate::metrics::{JoinOperations, MetricsSnapshot, ScanOperations};

fn arb_snapshot() -> impl Strategy<Value = MetricsSnapshot> {
    (
        0..1_000_000_000_000_000u64,
        0..1_000_000_000_000u64,
        prop::option::of(0..1_000_000_000_000_000u64),
        prop::option::of(prop_oneof![Just(0.0), 1.0..1.0e12f64]),
    )
        .prop_map(|(size, rows, scan, join)| MetricsSnapshot {
            total_size_bytes: size,
            row_count: rows,
            scan_operations: scan.map(|total_size| ScanOperations { total_size }),
            join_operations: join.map(|total_cost| JoinOperations { total_cost }),
            ..Default::default()
        })
}

/// Values that never count as a usable denominator
fn arb_unusable() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(-0.0),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
        -1.0e12..0.0f64,
    ]
}

/// A breakdown given either as a bare number or as a nested map
fn breakdown_value(value: f64, nested: bool, field: &str) -> MetricValue {
    if nested {
        MetricsMap::new().with(field, value).into()
    } else {
        value.into()
    }
}

fn arb_map<S, F>(value: F) -> impl Strategy<Value = MetricsMap>
where
    S: Strategy<Value = f64>,
    F: Fn() -> S,
{
    (
        value(),
        value(),
        prop::option::of((value(), any::<bool>())),
        prop::option::of((value(), any::<bool>())),
    )
        .prop_map(|(size, rows, scan, join)| {
            let mut map = MetricsMap::new()
                .with("total_size_bytes", size)
                .with("row_count", rows);
            if let Some((scan, nested)) = scan {
                map.insert("scan_operations", breakdown_value(scan, nested, "total_size"));
            }
            if let Some((join, nested)) = join {
                map.insert("join_operations", breakdown_value(join, nested, "total_cost"));
            }
            map
        })
}

proptest! {
    #[test]
    fn self_comparison_is_neutral(snapshot in arb_snapshot()) {
        let map = snapshot.to_metrics_map();
        let cmp = compare_performance(&map, &map);

        prop_assert_eq!(cmp.comprehensive_cost_ratio, 1.0);
        prop_assert_eq!(cmp.size_ratio, 1.0);
        prop_assert_eq!(cmp.row_ratio, 1.0);
        prop_assert_eq!(cmp.improvement_level, ImprovementLevel::Neutral);
        prop_assert_eq!(cmp.recommendation, Recommendation::UseOriginal);
        prop_assert!(!cmp.is_improved);
        prop_assert_eq!(&compare_performance(&map, &map), &cmp);
    }

    #[test]
    fn comparison_is_deterministic(original in arb_snapshot(), optimized in arb_snapshot()) {
        let (original, optimized) = (original.to_metrics_map(), optimized.to_metrics_map());
        let first = compare_performance(&original, &optimized);
        let second = compare_performance(&original.clone(), &optimized.clone());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unusable_denominators_are_neutral(
        original in arb_map(arb_unusable),
        optimized in arb_map(|| prop::num::f64::ANY),
    ) {
        let cmp = compare_performance(&original, &optimized);

        prop_assert_eq!(cmp.size_ratio, 1.0);
        prop_assert_eq!(cmp.row_ratio, 1.0);
        prop_assert_eq!(cmp.comprehensive_cost_ratio, 1.0);
        prop_assert_eq!(cmp.original_total_size, 0);
        prop_assert_eq!(cmp.improvement_level, ImprovementLevel::Neutral);
        prop_assert!(!cmp.is_improved);
    }

    #[test]
    fn verdict_follows_ratios(original in arb_snapshot(), optimized in arb_snapshot()) {
        let cmp = compare_performance(&original.to_metrics_map(), &optimized.to_metrics_map());

        prop_assert!(cmp.comprehensive_cost_ratio.is_finite());
        prop_assert!(cmp.comprehensive_cost_ratio >= 0.0);
        prop_assert_eq!(
            cmp.recommendation == Recommendation::UseOptimized,
            cmp.comprehensive_cost_ratio < MODERATE_THRESHOLD
        );
        prop_assert_eq!(
            cmp.is_improved,
            cmp.size_ratio < IMPROVEMENT_THRESHOLD || cmp.row_ratio < IMPROVEMENT_THRESHOLD
        );
    }
}
