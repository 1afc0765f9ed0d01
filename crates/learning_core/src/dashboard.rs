//! Illustrative learner statistics derived from the enrolled-title list alone.
//!
//! Nothing here is persisted; every figure is recomputed on read.

use serde::Serialize;
use utoipa::ToSchema;

const HOURS_PER_COURSE: usize = 10;
const CARD_LIMIT: usize = 5;
const PROGRESS_LIMIT: usize = 6;

// (enrollments needed, title, description)
const MILESTONES: [(usize, &str, &str); 3] = [
    (1, "Standout Beginner", "Completed a first project"),
    (3, "Active Learner", "Completed 3 projects"),
    (5, "Rising Expert", "Completed 5 projects"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkillTier {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillTier {
    pub fn for_enrollments(count: usize) -> Self {
        match count {
            0 => SkillTier::Beginner,
            1..=3 => SkillTier::Intermediate,
            4..=6 => SkillTier::Advanced,
            _ => SkillTier::Expert,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_enrolled: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub hours_spent: usize,
    pub completion_rate: usize,
    pub skill_level: SkillTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CourseCard {
    pub position: usize,
    pub title: String,
    pub progress_percentage: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TitleProgress {
    pub title: String,
    pub progress: usize,
    pub hours_spent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Achievement {
    pub title: String,
    pub description: String,
    /// Enrollments needed to unlock it.
    pub threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LearningProgress {
    pub overall_progress: usize,
    pub by_title: Vec<TitleProgress>,
    pub trend: Trend,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub courses: Vec<CourseCard>,
    pub has_more: bool,
    pub progress: LearningProgress,
}

fn step_percentage(index: usize) -> usize {
    ((index + 1) * 20).min(100)
}

pub fn stats(titles: &[String]) -> DashboardStats {
    let total = titles.len();
    let completed = total / 2;
    let completion_rate = if total == 0 { 0 } else { completed * 100 / total };
    DashboardStats {
        total_enrolled: total,
        completed,
        in_progress: total - completed,
        hours_spent: total * HOURS_PER_COURSE,
        completion_rate,
        skill_level: SkillTier::for_enrollments(total),
    }
}

/// Milestones unlocked by the number of enrolled titles, lowest first.
pub fn achievements(enrolled: usize) -> Vec<Achievement> {
    MILESTONES
        .iter()
        .filter(|(threshold, _, _)| enrolled >= *threshold)
        .map(|(threshold, title, description)| Achievement {
            title: title.to_string(),
            description: description.to_string(),
            threshold: *threshold,
        })
        .collect()
}

pub fn progress(titles: &[String]) -> LearningProgress {
    let by_title = titles
        .iter()
        .take(PROGRESS_LIMIT)
        .enumerate()
        .map(|(i, title)| TitleProgress {
            title: title.clone(),
            progress: step_percentage(i),
            hours_spent: (i + 1) * 5,
        })
        .collect();

    LearningProgress {
        overall_progress: (titles.len() * 10).min(100),
        by_title,
        trend: if titles.is_empty() {
            Trend::Steady
        } else {
            Trend::Rising
        },
        achievements: achievements(titles.len()),
    }
}

pub fn dashboard(titles: &[String]) -> Dashboard {
    let courses = titles
        .iter()
        .take(CARD_LIMIT)
        .enumerate()
        .map(|(i, title)| CourseCard {
            position: i + 1,
            title: title.clone(),
            progress_percentage: step_percentage(i),
        })
        .collect();

    Dashboard {
        stats: stats(titles),
        courses,
        has_more: titles.len() > CARD_LIMIT,
        progress: progress(titles),
    }
}
