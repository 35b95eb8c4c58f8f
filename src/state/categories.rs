//! Category rollups derived from the timer collection

use serde::{Deserialize, Serialize};

use super::timer::Timer;

/// Categories offered by the creation form. Not enforced by the store.
pub const AVAILABLE_CATEGORIES: [&str; 5] = ["Workout", "Study", "Break", "Personal", "Office"];

/// Per-category counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: usize,
    pub running: usize,
    pub completed: usize,
}

/// Distinct categories in first-seen order
pub fn categories(timers: &[Timer]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for timer in timers {
        if !seen.iter().any(|c| c == &timer.category) {
            seen.push(timer.category.clone());
        }
    }
    seen
}

pub fn count_for(timers: &[Timer], category: &str) -> usize {
    timers.iter().filter(|t| t.category == category).count()
}

/// One summary per category, in first-seen order
pub fn summaries(timers: &[Timer]) -> Vec<CategorySummary> {
    categories(timers)
        .into_iter()
        .map(|category| {
            let members = timers.iter().filter(|t| t.category == category);
            let (running, completed) = members.fold((0, 0), |(r, c), t| {
                (r + usize::from(t.running), c + usize::from(t.completed))
            });
            CategorySummary {
                total: count_for(timers, &category),
                category,
                running,
                completed,
            }
        })
        .collect()
}
