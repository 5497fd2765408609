//! Behaviour metrics: how a player scores, not only how much.
//!
//! Everything here is computed from the bootstrap payload and a player's
//! per-gameweek rows. [`Behaviour::assess`] bundles the four metric groups
//! with the archetype they map to.

use crate::models::{Bootstrap, Pick, Player, PlayerGameweek};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};

/// Gameweeks considered by default when measuring explosiveness.
pub const DEFAULT_WINDOW: usize = 10;

const HAUL_POINTS: i32 = 10;
const BLANK_POINTS: i32 = 2;
const INJURY_WORDS: [&str; 5] = ["injury", "knock", "hamstring", "groin", "muscle"];

/// Points distribution over the recent gameweeks a player appeared in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Explosiveness {
    pub avg_points: f64,
    pub std_points: f64,
    pub max_points: i32,
    /// Share of appearances with 10 or more points.
    pub haul_rate: f64,
    /// Share of appearances with 2 or fewer points.
    pub blank_rate: f64,
    pub gws_used: usize,
}

impl Explosiveness {
    pub fn over(history: &[PlayerGameweek], window: usize) -> Self {
        let points = recent_points(history, window);
        if points.is_empty() {
            return Self::default();
        }

        let n = points.len() as f64;
        let avg = points.iter().map(|&p| f64::from(p)).sum::<f64>() / n;
        let variance = points
            .iter()
            .map(|&p| (f64::from(p) - avg).powi(2))
            .sum::<f64>()
            / n;
        let rate = |hit: fn(i32) -> bool| round2(points.iter().filter(|&&p| hit(p)).count() as f64 / n);

        Self {
            avg_points: round2(avg),
            std_points: round2(variance.sqrt()),
            max_points: points.iter().copied().max().unwrap_or_default(),
            haul_rate: rate(|p| p >= HAUL_POINTS),
            blank_rate: rate(|p| p <= BLANK_POINTS),
            gws_used: points.len(),
        }
    }
}

/// Points from the last `window` gameweeks with minutes, oldest first.
pub fn recent_points(history: &[PlayerGameweek], window: usize) -> Vec<i32> {
    let played: Vec<i32> = history
        .iter()
        .filter(|gw| gw.minutes > 0)
        .map(|gw| gw.total_points)
        .collect();
    played[played.len().saturating_sub(window)..].to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionFlag {
    Overperforming,
    Underperforming,
    InLine,
}

impl RegressionFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overperforming => "overperforming",
            Self::Underperforming => "underperforming",
            Self::InLine => "in_line",
        }
    }
}

/// Season goals and assists against their expected values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Regression {
    pub season_goals: u32,
    pub season_xg: f64,
    pub season_assists: u32,
    pub season_xa: f64,
    pub delta_goals_vs_xg: f64,
    pub delta_assists_vs_xa: f64,
    pub regression_flag: RegressionFlag,
}

impl Regression {
    pub fn for_player(player: &Player) -> Self {
        let delta_goals = round2(f64::from(player.goals_scored) - player.xg());
        let delta_assists = round2(f64::from(player.assists) - player.xa());
        let regression_flag = if delta_goals > 1.5 || delta_assists > 1.0 {
            RegressionFlag::Overperforming
        } else if delta_goals < -1.5 || delta_assists < -1.0 {
            RegressionFlag::Underperforming
        } else {
            RegressionFlag::InLine
        };

        Self {
            season_goals: player.goals_scored,
            season_xg: round2(player.xg()),
            season_assists: player.assists,
            season_xa: round2(player.xa()),
            delta_goals_vs_xg: delta_goals,
            delta_assists_vs_xa: delta_assists,
            regression_flag,
        }
    }
}

/// Attacking output of one club, summed over its players.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClubOutput {
    pub goals: u32,
    pub xgi: f64,
}

/// Club totals keyed by team id.
pub fn club_output(bootstrap: &Bootstrap) -> HashMap<u32, ClubOutput> {
    let mut totals: HashMap<u32, ClubOutput> = HashMap::new();
    for player in &bootstrap.elements {
        let club = totals.entry(player.team).or_default();
        club.goals += player.goals_scored;
        club.xgi += player.xgi();
    }
    totals
}

/// How much of a club's attack runs through one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Talisman {
    pub team_goals: u32,
    pub player_goal_involvements: u32,
    pub player_goals_share: f64,
    pub team_xgi: f64,
    pub player_xgi: f64,
    pub player_xgi_share: f64,
    /// Mean of the two shares.
    pub talisman_index: f64,
}

impl Talisman {
    pub fn with_club(player: &Player, club: ClubOutput) -> Self {
        let involvements = player.goal_involvements();
        let goals_share = share(f64::from(involvements), f64::from(club.goals));
        let xgi_share = share(player.xgi(), club.xgi);
        Self {
            team_goals: club.goals,
            player_goal_involvements: involvements,
            player_goals_share: round3(goals_share),
            team_xgi: round2(club.xgi),
            player_xgi: round2(player.xgi()),
            player_xgi_share: round3(xgi_share),
            talisman_index: round3((goals_share + xgi_share) / 2.0),
        }
    }

    pub fn for_player(bootstrap: &Bootstrap, player: &Player) -> Self {
        let club = bootstrap
            .elements
            .iter()
            .filter(|p| p.team == player.team)
            .fold(ClubOutput::default(), |mut club, p| {
                club.goals += p.goals_scored;
                club.xgi += p.xgi();
                club
            });
        Self::with_club(player, club)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
}

/// Nailedness, injury and rotation risk, folded into a 0 to 100 score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reliability {
    /// Share of elapsed gameweeks with 60 or more minutes.
    pub nailedness_score: f64,
    pub starts: usize,
    pub appearances: usize,
    pub total_gws_elapsed: usize,
    pub injury_risk: Risk,
    pub rotation_risk: Risk,
    pub reliability_score: u32,
}

impl Reliability {
    pub fn assess(player: &Player, history: &[PlayerGameweek]) -> Self {
        let total = history.len();
        if total == 0 {
            return Self {
                nailedness_score: 0.0,
                starts: 0,
                appearances: 0,
                total_gws_elapsed: 0,
                injury_risk: Risk::High,
                rotation_risk: Risk::High,
                reliability_score: 0,
            };
        }

        let starts = history.iter().filter(|gw| gw.minutes >= 60).count();
        let appearances = history.iter().filter(|gw| gw.minutes > 0).count();
        let nailedness = round2(starts as f64 / total as f64);
        let appearance_rate = appearances as f64 / total as f64;

        let news = player.news.to_lowercase();
        let injury_risk = match player.chance_of_playing_next_round {
            Some(chance) if chance < 50 => Risk::High,
            Some(chance) if chance < 75 => Risk::Medium,
            _ if INJURY_WORDS.iter().any(|word| news.contains(word)) => Risk::Medium,
            _ => Risk::Low,
        };

        let rotation_risk = if nailedness >= 0.8 && appearance_rate >= 0.85 {
            Risk::Low
        } else if nailedness >= 0.55 {
            Risk::Medium
        } else {
            Risk::High
        };

        let injury_bonus = match injury_risk {
            Risk::Low => 20.0,
            Risk::Medium => 10.0,
            Risk::High => 0.0,
        };
        let score = nailedness * 60.0 + appearance_rate * 20.0 + injury_bonus;

        Self {
            nailedness_score: nailedness,
            starts,
            appearances,
            total_gws_elapsed: total,
            injury_risk,
            rotation_risk,
            reliability_score: score.round().clamp(0.0, 100.0) as u32,
        }
    }
}

/// Archetype label plus the tags it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Archetype {
    pub label: &'static str,
    pub tags: Vec<&'static str>,
}

impl Archetype {
    pub fn has(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }
}

pub fn classify(
    explosiveness: &Explosiveness,
    regression: &Regression,
    talisman: &Talisman,
    reliability: &Reliability,
) -> Archetype {
    let mut tags = Vec::new();

    tags.push(
        if explosiveness.haul_rate >= 0.25 && explosiveness.std_points >= 3.5 {
            "explosive"
        } else if explosiveness.blank_rate <= 0.2 && explosiveness.std_points <= 2.5 {
            "consistent"
        } else if explosiveness.haul_rate >= 0.15 {
            "semi-explosive"
        } else {
            "steady"
        },
    );

    if talisman.talisman_index >= 0.25 {
        tags.push("talisman");
    } else if talisman.talisman_index >= 0.15 {
        tags.push("key_player");
    }

    match regression.regression_flag {
        RegressionFlag::Overperforming => tags.push("overperforming"),
        RegressionFlag::Underperforming => tags.push("underperforming"),
        RegressionFlag::InLine => {}
    }

    if reliability.reliability_score >= 80 {
        tags.push("nailed");
    } else if reliability.reliability_score < 50 {
        tags.push("rotation_risk");
    }
    if reliability.injury_risk != Risk::Low {
        tags.push("injury_concern");
    }

    let has = |tag: &str| tags.iter().any(|t| *t == tag);
    let label = if has("explosive") && has("talisman") {
        "explosive talisman"
    } else if has("explosive") {
        "explosive differential"
    } else if has("consistent") && has("nailed") {
        "consistent grinder"
    } else if has("consistent") {
        "safe pick"
    } else if has("overperforming") {
        "overperforming finisher"
    } else if has("underperforming") && has("talisman") {
        "underperforming talisman (buy-low)"
    } else if has("underperforming") {
        "underperforming asset (buy-low candidate)"
    } else if has("talisman") {
        "team talisman"
    } else if has("rotation_risk") {
        "rotation risk"
    } else if has("semi-explosive") {
        "boom-or-bust"
    } else {
        "functional asset"
    };

    Archetype { label, tags }
}

/// Every behaviour metric for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Behaviour {
    pub explosiveness: Explosiveness,
    pub regression: Regression,
    pub talisman: Talisman,
    pub reliability: Reliability,
    pub archetype: Archetype,
}

impl Behaviour {
    pub fn assess(bootstrap: &Bootstrap, player: &Player, history: &[PlayerGameweek]) -> Self {
        let explosiveness = Explosiveness::over(history, DEFAULT_WINDOW);
        let regression = Regression::for_player(player);
        let talisman = Talisman::for_player(bootstrap, player);
        let reliability = Reliability::assess(player, history);
        let archetype = classify(&explosiveness, &regression, &talisman, &reliability);
        Self {
            explosiveness,
            regression,
            talisman,
            reliability,
            archetype,
        }
    }

    /// The short form attached to squad rows and replacement candidates.
    pub fn compact(&self) -> Value {
        json!({
            "archetype": self.archetype.label,
            "tags": self.archetype.tags,
            "volatility_std": self.explosiveness.std_points,
            "haul_rate": self.explosiveness.haul_rate,
            "blank_rate": self.explosiveness.blank_rate,
            "regression_flag": self.regression.regression_flag,
            "reliability_score": self.reliability.reliability_score,
            "talisman_index": self.talisman.talisman_index,
        })
    }

    fn summary(&self, name: &str) -> String {
        let e = &self.explosiveness;
        let mut parts = vec![format!("{name} is classified as {}.", self.archetype.label)];
        if self.archetype.has("explosive") {
            parts.push(format!(
                "Haul rate {:.0}% with high variance (std {:.1}).",
                e.haul_rate * 100.0,
                e.std_points
            ));
        }
        if self.archetype.has("consistent") {
            parts.push(format!(
                "Averages {:.1} pts/GW with low variance (std {:.1}).",
                e.avg_points, e.std_points
            ));
        }
        if self.archetype.has("talisman") {
            parts.push(format!(
                "Talisman index {:.2}, central to the team's attack.",
                self.talisman.talisman_index
            ));
        }
        let r = &self.regression;
        if r.regression_flag != RegressionFlag::InLine {
            parts.push(format!(
                "Currently {} vs xG/xA (goals {:+.1}, assists {:+.1}).",
                r.regression_flag.as_str(),
                r.delta_goals_vs_xg,
                r.delta_assists_vs_xa
            ));
        }
        parts.push(format!(
            "Reliability score: {}/100.",
            self.reliability.reliability_score
        ));
        parts.join(" ")
    }
}

fn player_ref(bootstrap: &Bootstrap, player: &Player) -> Value {
    json!({
        "id": player.id,
        "name": player.web_name,
        "team": bootstrap.team_name(player.team),
        "position": player.position_label(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Shaping
// ─────────────────────────────────────────────────────────────────────────────

pub fn archetype_report(bootstrap: &Bootstrap, player: &Player, history: &[PlayerGameweek]) -> Value {
    let behaviour = Behaviour::assess(bootstrap, player, history);
    json!({
        "player": player_ref(bootstrap, player),
        "archetype": behaviour.archetype.label,
        "tags": behaviour.archetype.tags,
        "metrics": {
            "explosiveness": behaviour.explosiveness,
            "regression": behaviour.regression,
            "talisman": behaviour.talisman,
            "reliability": behaviour.reliability,
        },
        "summary": behaviour.summary(&player.web_name),
    })
}

pub fn volatility_profile(
    bootstrap: &Bootstrap,
    player: &Player,
    history: &[PlayerGameweek],
    window: usize,
) -> Value {
    let stats = Explosiveness::over(history, window);
    // Coefficient of variation, with a floor of 1 point on the mean.
    let mean = if stats.avg_points > 0.0 { stats.avg_points } else { 1.0 };
    let volatility = (stats.std_points / mean * 50.0 + stats.haul_rate * 30.0 + stats.blank_rate * 20.0)
        .round()
        .min(100.0);

    json!({
        "player": player_ref(bootstrap, player),
        "window_gws": window,
        "points_per_gw": recent_points(history, window),
        "stats": {
            "avg_points": stats.avg_points,
            "std_points": stats.std_points,
            "max_points": stats.max_points,
            "haul_rate": stats.haul_rate,
            "blank_rate": stats.blank_rate,
            "volatility_score": volatility as u32,
        },
    })
}

/// Players carrying the largest share of their club's attack.
pub fn talisman_table(bootstrap: &Bootstrap, limit: usize, min_minutes: u32) -> Value {
    let clubs = club_output(bootstrap);
    let mut rows: Vec<(&Player, Talisman)> = bootstrap
        .elements
        .iter()
        .filter(|p| p.minutes >= min_minutes)
        .map(|p| {
            let club = clubs.get(&p.team).copied().unwrap_or_default();
            (p, Talisman::with_club(p, club))
        })
        .collect();
    rows.sort_by(|a, b| b.1.talisman_index.total_cmp(&a.1.talisman_index));

    let rows: Vec<Value> = rows
        .into_iter()
        .take(limit)
        .map(|(p, t)| {
            let notes = if t.player_goals_share > t.player_xgi_share + 0.05 {
                "outperforming xGI share, slight regression risk"
            } else if t.player_xgi_share > t.player_goals_share + 0.05 {
                "underlying xGI share higher, upside potential"
            } else {
                ""
            };
            json!({
                "name": p.web_name,
                "team": bootstrap.team_name(p.team),
                "position": p.position_label(),
                "talisman_index": t.talisman_index,
                "attacking_share": t.player_goals_share,
                "xgi_share": t.player_xgi_share,
                "goals": p.goals_scored,
                "assists": p.assists,
                "minutes": p.minutes,
                "notes": notes,
            })
        })
        .collect();
    Value::Array(rows)
}

/// Behavioural risk across a squad. `histories` is keyed by player id;
/// players without an entry are assessed on an empty history.
pub fn squad_risk(
    bootstrap: &Bootstrap,
    picks: &[Pick],
    histories: &HashMap<u32, Vec<PlayerGameweek>>,
    gameweek: u32,
) -> Value {
    let mut per_player = Vec::with_capacity(picks.len());
    let mut clubs: BTreeMap<&str, usize> = BTreeMap::new();
    let mut explosive = 0;
    let mut consistent = 0;
    let mut high_risk = Vec::new();
    let mut overperformers = Vec::new();

    for pick in picks {
        let Some(player) = bootstrap.player(pick.element) else {
            continue;
        };
        let history = histories.get(&player.id).map_or(&[][..], Vec::as_slice);
        let behaviour = Behaviour::assess(bootstrap, player, history);
        let archetype = &behaviour.archetype;

        *clubs.entry(bootstrap.team_name(player.team)).or_default() += 1;
        if archetype.has("explosive") || archetype.has("semi-explosive") {
            explosive += 1;
        }
        if archetype.has("consistent") || archetype.has("steady") {
            consistent += 1;
        }
        if behaviour.reliability.reliability_score < 50 || behaviour.reliability.injury_risk == Risk::High {
            high_risk.push(player.web_name.clone());
        }
        if behaviour.regression.regression_flag == RegressionFlag::Overperforming {
            overperformers.push(player.web_name.clone());
        }

        per_player.push(json!({
            "name": player.web_name,
            "position": player.position_label(),
            "team": bootstrap.team_name(player.team),
            "archetype": archetype.label,
            "tags": archetype.tags,
            "reliability_score": behaviour.reliability.reliability_score,
            "talisman_index": behaviour.talisman.talisman_index,
            "avg_points": behaviour.explosiveness.avg_points,
            "regression_flag": behaviour.regression.regression_flag,
            "on_bench": pick.position > 11,
        }));
    }

    let mut concentration: Vec<(&str, usize)> = clubs.into_iter().collect();
    concentration.sort_by(|a, b| b.1.cmp(&a.1));

    let mut notes = Vec::new();
    if explosive >= 8 {
        notes.push("Very aggressive squad: high ceiling but volatile week to week.".to_string());
    } else if consistent >= 8 {
        notes.push("Very conservative squad: steady floor but limited ceiling.".to_string());
    } else {
        notes.push(format!(
            "Balanced mix: {explosive} explosive, {consistent} consistent picks."
        ));
    }
    let heavy: Vec<String> = concentration
        .iter()
        .filter(|(_, count)| *count >= 3)
        .map(|(team, count)| format!("{team}({count})"))
        .collect();
    if !heavy.is_empty() {
        notes.push(format!(
            "Heavy exposure to: {}. A bad gameweek for those clubs hurts.",
            heavy.join(", ")
        ));
    }
    if !high_risk.is_empty() {
        notes.push(format!(
            "High-risk players: {}. Consider bench cover or replacements.",
            high_risk.join(", ")
        ));
    }
    if !overperformers.is_empty() {
        notes.push(format!(
            "Regression watch: {} overperforming vs xG/xA.",
            overperformers.join(", ")
        ));
    }

    json!({
        "gameweek": gameweek,
        "per_player": per_player,
        "summary": {
            "explosive_count": explosive,
            "consistent_count": consistent,
            "high_risk_players": high_risk,
            "club_concentration": concentration
                .iter()
                .map(|(team, count)| json!({ "team": team, "count": count }))
                .collect::<Vec<_>>(),
            "portfolio_notes": notes.join(" "),
        },
    })
}

fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
