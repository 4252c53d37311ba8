//! Property tests for level resolution, points and the record path.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use steadfast_progression::prelude::*;

fn contiguous_levels(widths: &[u64]) -> Vec<Level> {
    let mut levels = Vec::with_capacity(widths.len() + 1);
    let mut min = 0u64;
    for (i, width) in widths.iter().enumerate() {
        let level = u32::try_from(i + 1).expect("small table");
        levels.push(Level::new(level, format!("L{level}"), min, min + width - 1));
        min += width;
    }
    let top = u32::try_from(widths.len() + 1).expect("small table");
    levels.push(Level::top(top, "Top", min));
    levels
}

fn builtin_engine() -> ProgressionEngine {
    ProgressionEngine::new(Arc::new(Catalog::builtin().expect("builtin catalog")))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every point total resolves to exactly one band that contains it.
    #[test]
    fn prop_every_total_resolves_to_one_level(
        widths in prop::collection::vec(1u64..500, 0..8),
        points in 0u64..6000,
    ) {
        let table = LevelTable::new(contiguous_levels(&widths)).expect("valid table");
        let level = table.resolve(points).expect("covered");
        prop_assert!(level.contains(points));
        let matching = table.levels().iter().filter(|l| l.contains(points)).count();
        prop_assert_eq!(matching, 1);
    }

    #[test]
    fn prop_builtin_levels_cover_everything(points in any::<u64>()) {
        let engine = builtin_engine();
        let level = engine.resolve_level(points).expect("covered");
        prop_assert!(level.contains(points));
        let progress = engine.progress_to_next(points, level.level).expect("known level");
        prop_assert!((0.0..=100.0).contains(&progress));
    }

    /// Points scale linearly with magnitude for every known kind.
    #[test]
    fn prop_points_are_linear(kind_idx in 0usize..ActionKind::ALL.len(), magnitude in 0u64..1_000_000) {
        let calc = PointsCalculator::default();
        let kind = ActionKind::ALL[kind_idx].as_str();
        let once = calc.compute_points_once(kind).expect("known kind");
        prop_assert_eq!(calc.compute_points(kind, magnitude).expect("known kind"), once * magnitude);
    }

    /// Replaying arbitrary actions keeps totals monotonic, the level derived,
    /// and never returns the same achievement twice.
    #[test]
    fn prop_record_path_invariants(
        actions in prop::collection::vec((0usize..ActionKind::ALL.len(), 1u64..60, 0i64..3), 1..40),
    ) {
        let engine = builtin_engine();
        let mut stats = UserStats::new();
        let mut now = Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).single().expect("valid date");
        let mut seen = BTreeSet::new();

        for (kind_idx, magnitude, day_step) in actions {
            now += Duration::days(day_step);
            let event = ActionEvent::of(UserId::new("p1"), ActionKind::ALL[kind_idx], now)
                .with_magnitude(magnitude);
            let outcome = engine.record_action(&stats, &event).expect("valid action");
            let next = outcome.updated_stats;

            prop_assert!(next.total_points() >= stats.total_points());
            prop_assert!(next.prayer_minutes() >= stats.prayer_minutes());
            prop_assert!(next.verses_read() >= stats.verses_read());
            prop_assert!(next.achievements().is_superset(stats.achievements()));
            prop_assert_eq!(
                next.current_level(),
                engine.resolve_level(next.total_points()).expect("covered").level
            );
            for unlocked in &outcome.unlocked_achievements {
                prop_assert!(seen.insert(unlocked.id().to_string()), "{} returned twice", unlocked.id());
            }
            for status in engine.achievement_overview(&next) {
                let before = stats
                    .achievement_record(&status.definition.id)
                    .map_or(0.0, |r| r.progress);
                prop_assert!(status.record.progress >= before);
            }
            stats = next;
        }
    }

    /// Task progress never exceeds its target and never decreases.
    #[test]
    fn prop_task_progress_clamped(deltas in prop::collection::vec(0i64..40, 1..20), target in 1u64..100) {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).single().expect("valid date");
        let template = ChallengeTemplate::new(
            "september",
            "September",
            ChallengeCategory::Devotion,
            Difficulty::Easy,
            start,
            start + Duration::days(29),
        )
        .with_task(TaskTemplate::new("pray", TaskType::Prayer, target));
        let mut challenge = template.instantiate();
        let mut last = 0;

        for delta in deltas {
            let outcome = challenge
                .advance("pray", delta, start + Duration::days(1))
                .expect("valid advance");
            let task = challenge.task("pray").expect("task");
            prop_assert!(task.progress <= target);
            prop_assert!(task.progress >= last);
            prop_assert_eq!(task.completed, task.progress >= target);
            prop_assert_eq!(outcome.challenge_completed, challenge.completed);
            last = task.progress;
        }
    }
}
