//! Built-in catalog tables.

use chrono::{DateTime, TimeZone, Utc};

use crate::achievement::{AchievementCategory, AchievementDefinition, SpecialCondition, UnlockRule};
use crate::challenge::{ChallengeCategory, ChallengeTemplate, Difficulty, TaskTemplate, TaskType};
use crate::error::{EngineError, EngineResult};
use crate::level::Level;
use crate::reward::{Reward, RewardKind};
use crate::stats::{StatMetric, StreakKind, Timeframe};

pub(crate) fn levels() -> Vec<Level> {
    vec![
        Level::new(1, "Seeker", 0, 99),
        Level::new(2, "Believer", 100, 249).with_perk("daily_verse"),
        Level::new(3, "Disciple", 250, 499).with_perk("prayer_journal"),
        Level::new(4, "Servant", 500, 999).with_perk("community_groups"),
        Level::new(5, "Shepherd", 1000, 1999).with_perk("lead_groups"),
        Level::new(6, "Elder", 2000, 3999).with_perk("custom_challenges"),
        Level::top(7, "Saint", 4000).with_perk("mentor_badge"),
    ]
}

fn count(metric: StatMetric, target: u64) -> UnlockRule {
    UnlockRule::Count { metric, target }
}

fn streak(streak: StreakKind, target: u32) -> UnlockRule {
    UnlockRule::Streak { streak, target }
}

fn within(metric: StatMetric, target: u64, timeframe: Timeframe) -> UnlockRule {
    UnlockRule::Time {
        metric,
        target,
        timeframe: Some(timeframe),
    }
}

pub(crate) fn achievements() -> Vec<AchievementDefinition> {
    use AchievementCategory::{Challenge, Community, Consistency, Milestone, Prayer, Reading};

    vec![
        // Prayer
        AchievementDefinition::new(
            "first_prayer",
            "First Prayer",
            Prayer,
            UnlockRule::Special(SpecialCondition::FirstAction {
                kind: "prayer_minute".into(),
            }),
        )
        .with_description("Spend your first minute in prayer")
        .with_points(10),
        AchievementDefinition::new(
            "prayer_warrior",
            "Prayer Warrior",
            Prayer,
            count(StatMetric::PrayerMinutes, 100),
        )
        .with_description("Pray for 100 minutes in total")
        .with_points(50)
        .with_reward(Reward::title("Prayer Warrior", "Shown beside your name")),
        AchievementDefinition::new(
            "prayer_marathon",
            "Prayer Marathon",
            Prayer,
            within(StatMetric::PrayerMinutes, 60, Timeframe::Daily),
        )
        .with_description("Pray for an hour in a single day")
        .with_points(40),
        AchievementDefinition::new(
            "devoted_intercessor",
            "Devoted Intercessor",
            Prayer,
            count(StatMetric::PrayerMinutes, 1000),
        )
        .with_description("Pray for 1000 minutes in total")
        .with_points(200)
        .with_reward(Reward::badge("Golden Censer", "For a thousand minutes of prayer")),
        // Reading
        AchievementDefinition::new(
            "first_verse",
            "First Verse",
            Reading,
            UnlockRule::Special(SpecialCondition::FirstAction {
                kind: "verse_read".into(),
            }),
        )
        .with_description("Read your first verse")
        .with_points(10),
        AchievementDefinition::new(
            "scripture_scholar",
            "Scripture Scholar",
            Reading,
            count(StatMetric::VersesRead, 100),
        )
        .with_description("Read 100 verses")
        .with_points(75),
        AchievementDefinition::new(
            "weekly_reader",
            "Weekly Reader",
            Reading,
            within(StatMetric::VersesRead, 50, Timeframe::Weekly),
        )
        .with_description("Read 50 verses in one week")
        .with_points(40),
        // Community
        AchievementDefinition::new(
            "helping_hand",
            "Helping Hand",
            Community,
            count(StatMetric::ConnectionsHelped, 1),
        )
        .with_description("Help someone in the community")
        .with_points(15),
        AchievementDefinition::new(
            "community_pillar",
            "Community Pillar",
            Community,
            count(StatMetric::ConnectionsHelped, 25),
        )
        .with_description("Help or connect with 25 people")
        .with_points(100)
        .with_reward(Reward::title("Pillar", "Shown beside your name")),
        // Consistency
        AchievementDefinition::new(
            "faithful_week",
            "Faithful Week",
            Consistency,
            streak(StreakKind::Prayer, 7),
        )
        .with_description("Pray seven days in a row")
        .with_points(70),
        AchievementDefinition::new(
            "steadfast_month",
            "Steadfast",
            Consistency,
            streak(StreakKind::Prayer, 30),
        )
        .with_description("Pray thirty days in a row")
        .with_points(300)
        .with_reward(Reward::title("Steadfast", "Shown beside your name"))
        .with_reward(Reward::labelled(
            RewardKind::Blessing,
            "Steadfast Blessing",
            "A blessing for a month of faithfulness",
        )),
        AchievementDefinition::new(
            "daily_bread",
            "Daily Bread",
            Consistency,
            streak(StreakKind::Reading, 7),
        )
        .with_description("Read scripture seven days in a row")
        .with_points(70),
        AchievementDefinition::new(
            "well_rounded",
            "Well Rounded",
            Consistency,
            UnlockRule::Special(SpecialCondition::AllStreaks { days: 3 }),
        )
        .with_description("Keep every streak alive for three days")
        .with_points(50),
        // Challenges and milestones
        AchievementDefinition::new(
            "challenge_champion",
            "Challenge Champion",
            Challenge,
            count(StatMetric::ChallengesCompleted, 5),
        )
        .with_description("Complete five challenges")
        .with_points(150)
        .with_reward(Reward::labelled(
            RewardKind::Feature,
            "custom_challenges",
            "Create your own challenges",
        )),
        AchievementDefinition::new(
            "rising_disciple",
            "Rising Disciple",
            Milestone,
            UnlockRule::Special(SpecialCondition::ReachLevel { level: 3 }),
        )
        .with_description("Reach the Disciple level")
        .with_points(25),
    ]
}

fn utc(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> EngineResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
        .single()
        .ok_or_else(|| EngineError::invariant(format!("invalid date {year}-{month}-{day}")))
}

pub(crate) fn challenges() -> EngineResult<Vec<ChallengeTemplate>> {
    Ok(vec![
        ChallengeTemplate::new(
            "advent_2026",
            "Advent Devotion",
            ChallengeCategory::Seasonal,
            Difficulty::Medium,
            utc(2026, 12, 1, 0, 0, 0)?,
            utc(2026, 12, 24, 23, 59, 59)?,
        )
        .with_description("Prepare your heart through Advent")
        .with_task(
            TaskTemplate::new("advent_prayer", TaskType::Prayer, 240)
                .with_description("Pray for 240 minutes"),
        )
        .with_task(
            TaskTemplate::new("advent_reading", TaskType::Reading, 100)
                .with_description("Read 100 verses"),
        )
        .with_task(
            TaskTemplate::new("advent_service", TaskType::Service, 5)
                .with_description("Help five people"),
        )
        .with_reward(Reward::points(200, "Advent completion bonus"))
        .with_reward(Reward::badge("Advent Star", "Completed Advent Devotion")),
        ChallengeTemplate::new(
            "new_year_word_2027",
            "A Word for the New Year",
            ChallengeCategory::Scripture,
            Difficulty::Easy,
            utc(2027, 1, 1, 0, 0, 0)?,
            utc(2027, 1, 31, 23, 59, 59)?,
        )
        .with_task(
            TaskTemplate::new("january_reading", TaskType::Reading, 150)
                .with_description("Read 150 verses in January"),
        )
        .with_task(
            TaskTemplate::new("january_sharing", TaskType::Sharing, 3)
                .with_description("Share three verses"),
        )
        .with_reward(Reward::points(100, "New Year bonus")),
        ChallengeTemplate::new(
            "lent_2027",
            "Forty Days of Lent",
            ChallengeCategory::Seasonal,
            Difficulty::Hard,
            utc(2027, 2, 10, 0, 0, 0)?,
            utc(2027, 3, 27, 23, 59, 59)?,
        )
        .with_description("Forty days of prayer, scripture and service")
        .with_task(
            TaskTemplate::new("lent_prayer", TaskType::Prayer, 600)
                .with_description("Pray for 600 minutes"),
        )
        .with_task(
            TaskTemplate::new("lent_reading", TaskType::Reading, 200)
                .with_description("Read 200 verses"),
        )
        .with_task(
            TaskTemplate::new("lent_connection", TaskType::Connection, 10)
                .with_description("Reach out to ten people"),
        )
        .with_reward(Reward::points(400, "Lent completion bonus"))
        .with_reward(Reward::title("Faithful Through Lent", "Shown beside your name")),
    ])
}
