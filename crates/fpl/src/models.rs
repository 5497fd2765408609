//! Typed views of the FPL API payloads.
//!
//! Only the fields the tools read are modelled; everything else is ignored.
//! Missing fields fall back to defaults because the API omits some of them
//! early in a season.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// `/bootstrap-static/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bootstrap {
    #[serde(default)]
    pub elements: Vec<Player>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub events: Vec<Gameweek>,
}

impl Bootstrap {
    pub fn player(&self, id: u32) -> Option<&Player> {
        self.elements.iter().find(|p| p.id == id)
    }

    /// Team short name, or `?` for an unknown id.
    pub fn team_name(&self, id: u32) -> &str {
        self.teams
            .iter()
            .find(|t| t.id == id)
            .map_or("?", |t| t.short_name.as_str())
    }

    pub fn current_gameweek(&self) -> Option<&Gameweek> {
        self.events.iter().find(|e| e.is_current)
    }

    pub fn next_gameweek(&self) -> Option<&Gameweek> {
        self.events.iter().find(|e| e.is_next)
    }

    /// First player whose web, second or first name contains `query`,
    /// ignoring case.
    pub fn find_player(&self, query: &str) -> Option<&Player> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.elements.iter().find(|p| {
            p.web_name.to_lowercase().contains(&query)
                || p.second_name.to_lowercase().contains(&query)
                || p.first_name.to_lowercase().contains(&query)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Player {
    pub id: u32,
    pub web_name: String,
    pub first_name: String,
    pub second_name: String,
    pub team: u32,
    pub element_type: u8,
    /// Points per match over the recent window, as a decimal string.
    pub form: String,
    /// Price in tenths of a million.
    pub now_cost: u32,
    pub total_points: i32,
    pub minutes: u32,
    pub goals_scored: u32,
    pub assists: u32,
    pub clean_sheets: u32,
    pub expected_goals: Option<String>,
    pub expected_assists: Option<String>,
    pub expected_goal_involvements: Option<String>,
    pub selected_by_percent: String,
    pub news: String,
    pub chance_of_playing_next_round: Option<u32>,
}

impl Player {
    pub fn price(&self) -> f64 {
        tenths(self.now_cost as i64)
    }

    pub fn form_value(&self) -> f64 {
        self.form.parse().unwrap_or(0.0)
    }

    pub fn position(&self) -> Option<Position> {
        Position::from_element_type(self.element_type)
    }

    pub fn xg(&self) -> f64 {
        decimal(self.expected_goals.as_deref())
    }

    pub fn xa(&self) -> f64 {
        decimal(self.expected_assists.as_deref())
    }

    pub fn xgi(&self) -> f64 {
        decimal(self.expected_goal_involvements.as_deref())
    }

    pub fn goal_involvements(&self) -> u32 {
        self.goals_scored + self.assists
    }

    pub fn position_label(&self) -> &'static str {
        self.position().map_or("?", Position::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gameweek {
    pub id: u32,
    pub name: String,
    pub deadline_time: Option<String>,
    pub finished: bool,
    pub is_current: bool,
    pub is_next: bool,
    pub average_entry_score: Option<i32>,
    pub highest_score: Option<i32>,
    pub most_selected: Option<u32>,
    pub most_captained: Option<u32>,
    pub most_vice_captained: Option<u32>,
    pub top_element: Option<u32>,
    pub chip_plays: Vec<Value>,
}

/// `/fixtures/?event={gw}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    pub team_h_difficulty: Option<u8>,
    pub team_a_difficulty: Option<u8>,
    pub kickoff_time: Option<String>,
    pub finished: bool,
    pub team_h_score: Option<u32>,
    pub team_a_score: Option<u32>,
}

/// `/element-summary/{id}/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ElementSummary {
    pub fixtures: Vec<Value>,
    pub history: Vec<Value>,
}

impl ElementSummary {
    /// This season's per-gameweek rows. Rows that do not decode are skipped.
    pub fn gameweeks(&self) -> Vec<PlayerGameweek> {
        self.history
            .iter()
            .filter_map(|row| PlayerGameweek::deserialize(row).ok())
            .collect()
    }
}

/// One row of an element summary's `history`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerGameweek {
    pub round: u32,
    pub minutes: u32,
    pub total_points: i32,
    pub goals_scored: u32,
    pub assists: u32,
    pub expected_goals: Option<String>,
    pub expected_assists: Option<String>,
}

/// `/event/{gw}/live/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiveGameweek {
    pub elements: Vec<LiveElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiveElement {
    pub id: u32,
    pub stats: LiveStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiveStats {
    pub total_points: i32,
    pub minutes: u32,
}

/// `/entry/{team_id}/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub name: String,
    pub player_first_name: String,
    pub player_last_name: String,
    pub summary_overall_points: Option<i64>,
    pub summary_overall_rank: Option<i64>,
}

/// `/entry/{team_id}/event/{gw}/picks/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Picks {
    pub picks: Vec<Pick>,
    pub active_chip: Option<String>,
    pub entry_history: EntryEvent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pick {
    pub element: u32,
    /// Squad slot; 12 to 15 are the bench.
    pub position: u8,
    pub multiplier: u8,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    pub points: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryEvent {
    pub points: Option<i32>,
    pub bank: i64,
    pub value: i64,
    pub event_transfers: u32,
    pub event_transfers_cost: u32,
}

/// `/entry/{team_id}/history/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct History {
    pub current: Vec<HistoryRow>,
    pub past: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HistoryRow {
    pub event: u32,
    pub points: i32,
    pub total_points: i32,
    pub rank: Option<i64>,
    pub overall_rank: Option<i64>,
    pub bank: i64,
    pub value: i64,
    pub event_transfers: u32,
    pub event_transfers_cost: u32,
    pub points_on_bench: i32,
}

/// One entry of `/entry/{team_id}/transfers/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Transfer {
    pub element_in: u32,
    pub element_in_cost: i64,
    pub element_out: u32,
    pub element_out_cost: i64,
    pub event: Option<u32>,
    pub time: Option<String>,
}

/// Playing position (the API's `element_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const LABELS: [&'static str; 4] = ["GKP", "DEF", "MID", "FWD"];

    pub fn from_element_type(element_type: u8) -> Option<Self> {
        match element_type {
            1 => Some(Self::Goalkeeper),
            2 => Some(Self::Defender),
            3 => Some(Self::Midfielder),
            4 => Some(Self::Forward),
            _ => None,
        }
    }

    pub fn element_type(self) -> u8 {
        match self {
            Self::Goalkeeper => 1,
            Self::Defender => 2,
            Self::Midfielder => 3,
            Self::Forward => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        Self::LABELS[usize::from(self.element_type() - 1)]
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GKP" => Ok(Self::Goalkeeper),
            "DEF" => Ok(Self::Defender),
            "MID" => Ok(Self::Midfielder),
            "FWD" => Ok(Self::Forward),
            other => Err(format!("unknown position '{other}', use GKP/DEF/MID/FWD")),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The API sends expected stats as decimal strings.
fn decimal(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0.0)
}

/// Convert an API amount in tenths of a million to millions.
pub fn tenths(amount: i64) -> f64 {
    amount as f64 / 10.0
}
