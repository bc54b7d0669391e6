//! Systems table columns
//!
//! Each column is a closed variant carrying its table key, title, backend
//! sort key and a pure cell formatter, so no key lookup can go unchecked.

use crate::client::{ROS_API_ROOT, SYSTEMS_API_ROOT};
use crate::models::SystemRecord;
use serde::{Deserialize, Serialize};

/// Width of the score bar in characters
const SCORE_BAR_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    DisplayName,
    CpuScore,
    MemoryScore,
    IoScore,
    RecommendationCount,
    State,
}

/// Visual hint attached to a formatted cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Normal,
    /// Nothing to act on (a system without recommendations)
    Good,
    /// Value missing from the record
    Muted,
}

/// A rendered table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub text: String,
    pub tone: Tone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Normal,
            link: None,
        }
    }

    fn missing() -> Self {
        Self {
            text: "-".to_string(),
            tone: Tone::Muted,
            link: None,
        }
    }
}

impl Column {
    /// Columns in table order
    pub const ALL: [Column; 6] = [
        Column::DisplayName,
        Column::CpuScore,
        Column::MemoryScore,
        Column::IoScore,
        Column::RecommendationCount,
        Column::State,
    ];

    /// Key the table widget uses for this column
    pub fn key(&self) -> &'static str {
        match self {
            Column::DisplayName => "display_name",
            Column::CpuScore => "display_performance_score.cpu_score",
            Column::MemoryScore => "display_performance_score.memory_score",
            Column::IoScore => "display_performance_score.io_score",
            Column::RecommendationCount => "recommendation_count",
            Column::State => "state",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Column::DisplayName => "Name",
            Column::CpuScore => "CPU score",
            Column::MemoryScore => "Memory score",
            Column::IoScore => "I/O score",
            Column::RecommendationCount => "Recommendations",
            Column::State => "State",
        }
    }

    /// Value of the `order_by` query parameter
    pub fn sort_key(&self) -> &'static str {
        match self {
            Column::DisplayName => "display_name",
            Column::CpuScore => "cpu_score",
            Column::MemoryScore => "memory_score",
            Column::IoScore => "io_score",
            Column::RecommendationCount => "recommendation_count",
            Column::State => "state",
        }
    }

    /// Look a column up by its table key or its sort key
    pub fn from_key(key: &str) -> Option<Column> {
        Column::ALL
            .into_iter()
            .find(|column| column.key() == key || column.sort_key() == key)
    }

    pub fn format(&self, system: &SystemRecord) -> Cell {
        match self {
            Column::DisplayName => system_name(system),
            Column::CpuScore => score_progress(system.cpu_score()),
            Column::MemoryScore => score_progress(system.memory_score()),
            Column::IoScore => score_progress(system.io_score()),
            Column::RecommendationCount => recommendations(system.recommendation_count()),
            Column::State => system
                .state()
                .map(Cell::plain)
                .unwrap_or_else(Cell::missing),
        }
    }
}

/// Detail link of a system
pub fn system_link(inventory_id: &str) -> String {
    format!("{}{}/{}", ROS_API_ROOT, SYSTEMS_API_ROOT, inventory_id)
}

fn system_name(system: &SystemRecord) -> Cell {
    let name = system.display_name().unwrap_or(&system.inventory_id);
    Cell {
        text: name.to_string(),
        tone: Tone::Normal,
        link: Some(system_link(&system.inventory_id)),
    }
}

/// Horizontal bar for a 0-100 score
fn score_progress(score: Option<f64>) -> Cell {
    let Some(score) = score else {
        return Cell::missing();
    };
    let clamped = score.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * SCORE_BAR_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(SCORE_BAR_WIDTH - filled)
    );
    Cell::plain(format!("{} {:>3}%", bar, clamped.round() as u32))
}

fn recommendations(count: Option<u32>) -> Cell {
    match count {
        Some(0) => Cell {
            text: "0".to_string(),
            tone: Tone::Good,
            link: None,
        },
        Some(n) => Cell::plain(n.to_string()),
        None => Cell::missing(),
    }
}
