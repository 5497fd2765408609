//! Squad planning: fixture runs, the pitch view, dream teams, transfer
//! plans and replacement shortlists.

use crate::behaviour::{Behaviour, round2};
use crate::error::{Error, Result};
use crate::models::{Bootstrap, Entry, Fixture, LiveGameweek, Picks, Player, PlayerGameweek, Position, tenths};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const LAST_GAMEWEEK: u32 = 38;
const NEUTRAL_DIFFICULTY: f64 = 3.0;
const MAX_PER_CLUB: usize = 3;
const HIT_COST: u32 = 4;

/// One side of an upcoming fixture, seen from a team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamFixture {
    pub gw: u32,
    pub opponent: String,
    pub difficulty: u8,
    pub is_home: bool,
}

/// Unfinished fixtures in a gameweek window, grouped by team.
#[derive(Debug, Clone, Default)]
pub struct FixtureMap {
    by_team: HashMap<u32, Vec<TeamFixture>>,
}

impl FixtureMap {
    /// Fixtures from gameweek `first` to `last`, inclusive.
    pub fn upcoming(bootstrap: &Bootstrap, fixtures: &[Fixture], first: u32, last: u32) -> Self {
        let mut by_team: HashMap<u32, Vec<TeamFixture>> = HashMap::new();
        for fixture in fixtures.iter().filter(|f| !f.finished) {
            let Some(gw) = fixture.event.filter(|gw| (first..=last).contains(gw)) else {
                continue;
            };
            let sides = [
                (fixture.team_h, fixture.team_a, fixture.team_h_difficulty, true),
                (fixture.team_a, fixture.team_h, fixture.team_a_difficulty, false),
            ];
            for (team, opponent, difficulty, is_home) in sides {
                by_team.entry(team).or_default().push(TeamFixture {
                    gw,
                    opponent: bootstrap.team_name(opponent).to_string(),
                    difficulty: difficulty.unwrap_or(3),
                    is_home,
                });
            }
        }
        for run in by_team.values_mut() {
            run.sort_by_key(|f| f.gw);
        }
        Self { by_team }
    }

    pub fn for_team(&self, team: u32) -> &[TeamFixture] {
        self.by_team.get(&team).map_or(&[], Vec::as_slice)
    }

    /// Mean difficulty, or 3 when the team has no fixtures in the window.
    pub fn avg_difficulty(&self, team: u32) -> f64 {
        let run = self.for_team(team);
        if run.is_empty() {
            return NEUTRAL_DIFFICULTY;
        }
        run.iter().map(|f| f64::from(f.difficulty)).sum::<f64>() / run.len() as f64
    }

    /// Short form such as `BOU(H), ARS(A)`.
    pub fn describe(&self, team: u32, limit: usize) -> String {
        let run = self.for_team(team);
        if run.is_empty() {
            return "-".to_string();
        }
        run.iter()
            .take(limit)
            .map(|f| format!("{}({})", f.opponent, if f.is_home { 'H' } else { 'A' }))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pitch view
// ─────────────────────────────────────────────────────────────────────────────

/// The squad split into starters and bench, each with its next fixture.
pub fn structured_squad(
    bootstrap: &Bootstrap,
    entry: &Entry,
    picks: &Picks,
    gameweek: u32,
    fixtures: &FixtureMap,
) -> Value {
    let mut starters = Vec::new();
    let mut bench = Vec::new();
    for pick in &picks.picks {
        let player = bootstrap.player(pick.element);
        let row = json!({
            "element_id": pick.element,
            "name": player.map_or("?", |p| p.web_name.as_str()),
            "position": player.map_or("?", Player::position_label),
            "team": player.map_or("?", |p| bootstrap.team_name(p.team)),
            "price": player.map_or(0.0, Player::price),
            "form": player.map_or("0.0", |p| p.form.as_str()),
            "total_points": player.map_or(0, |p| p.total_points),
            "is_captain": pick.is_captain,
            "is_vice_captain": pick.is_vice_captain,
            "multiplier": pick.multiplier,
            "pick_position": pick.position,
            "next_fixture": player.map_or_else(|| "-".to_string(), |p| fixtures.describe(p.team, 1)),
        });
        if pick.position <= 11 {
            starters.push(row);
        } else {
            bench.push(row);
        }
    }

    let history = &picks.entry_history;
    let manager = format!("{} {}", entry.player_first_name, entry.player_last_name);
    json!({
        "gameweek": gameweek,
        "manager": manager.trim(),
        "team_name": entry.name,
        "overall_points": entry.summary_overall_points,
        "overall_rank": entry.summary_overall_rank,
        "bank": tenths(history.bank),
        "squad_value": tenths(history.value),
        "transfers_made": history.event_transfers,
        "active_chip": picks.active_chip,
        "starters": starters,
        "bench": bench,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Dream team
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Scored<'a> {
    player: &'a Player,
    position: Position,
    points: i32,
}

fn squad_limit(position: Position) -> usize {
    match position {
        Position::Goalkeeper => 2,
        Position::Defender | Position::Midfielder => 5,
        Position::Forward => 3,
    }
}

/// The highest-scoring legal 15 for a finished or live gameweek.
///
/// Picks greedily by points with 2/5/5/3 per position and at most three
/// players per club, then fields the best XI in a legal formation. The
/// captain's points count twice.
pub fn dream_team(bootstrap: &Bootstrap, live: &LiveGameweek, gameweek: u32) -> Result<Value> {
    let mut pool: Vec<Scored<'_>> = live
        .elements
        .iter()
        .filter_map(|element| {
            let player = bootstrap.player(element.id)?;
            let points = element.stats.total_points;
            if player.minutes == 0 && points == 0 {
                return None;
            }
            Some(Scored {
                player,
                position: player.position()?,
                points,
            })
        })
        .collect();
    pool.sort_by(|a, b| b.points.cmp(&a.points));

    let mut per_position: HashMap<u8, usize> = HashMap::new();
    let mut per_club: HashMap<u32, usize> = HashMap::new();
    let mut squad = Vec::with_capacity(15);
    for candidate in pool {
        let taken = per_position.entry(candidate.position.element_type()).or_default();
        let club = per_club.entry(candidate.player.team).or_default();
        if *taken >= squad_limit(candidate.position) || *club >= MAX_PER_CLUB {
            continue;
        }
        *taken += 1;
        *club += 1;
        squad.push(candidate);
        if squad.len() == 15 {
            break;
        }
    }
    if squad.len() < 15 {
        return Err(Error::NotFound(format!(
            "only {} eligible players in gameweek {gameweek}, not enough for a full squad",
            squad.len()
        )));
    }

    let xi = best_xi(&squad);
    let xi_ids: HashSet<u32> = xi.iter().map(|s| s.player.id).collect();
    let mut bench: Vec<Scored<'_>> = squad
        .iter()
        .copied()
        .filter(|s| !xi_ids.contains(&s.player.id))
        .collect();
    bench.sort_by_key(|s| (s.position == Position::Goalkeeper, -s.points));

    let mut ranked = xi.clone();
    ranked.sort_by(|a, b| b.points.cmp(&a.points));
    let captain = ranked[0].player.id;
    let vice = ranked.get(1).map_or(captain, |s| s.player.id);

    let row = |s: &Scored<'_>| {
        json!({
            "name": s.player.web_name,
            "position": s.position.as_str(),
            "team": bootstrap.team_name(s.player.team),
            "price": s.player.price(),
            "points": s.points,
            "is_captain": s.player.id == captain,
            "is_vice_captain": s.player.id == vice,
        })
    };

    Ok(json!({
        "gameweek": gameweek,
        "starters": xi.iter().map(row).collect::<Vec<_>>(),
        "bench": bench.iter().map(row).collect::<Vec<_>>(),
        "captain": ranked[0].player.web_name,
        "vice_captain": ranked.get(1).unwrap_or(&ranked[0]).player.web_name,
        "total_points": xi.iter().map(|s| s.points).sum::<i32>() + ranked[0].points,
        "bench_points": bench.iter().map(|s| s.points).sum::<i32>(),
    }))
}

/// One goalkeeper, at least 3/2/1 outfielders, the rest by points up to
/// 5 defenders, 5 midfielders and 3 forwards.
fn best_xi<'a>(squad: &[Scored<'a>]) -> Vec<Scored<'a>> {
    let mut by_points = squad.to_vec();
    by_points.sort_by(|a, b| b.points.cmp(&a.points));
    let of = |position: Position| by_points.iter().copied().filter(move |s| s.position == position);

    let mut xi: Vec<Scored<'a>> = of(Position::Goalkeeper).take(1).collect();
    let mut rest = Vec::new();
    for (position, minimum) in [
        (Position::Defender, 3),
        (Position::Midfielder, 2),
        (Position::Forward, 1),
    ] {
        let players: Vec<_> = of(position).collect();
        xi.extend(players.iter().take(minimum));
        rest.extend(players.into_iter().skip(minimum));
    }

    rest.sort_by(|a, b| b.points.cmp(&a.points));
    for candidate in rest {
        if xi.len() >= 11 {
            break;
        }
        let fielded = xi.iter().filter(|s| s.position == candidate.position).count();
        if fielded < squad_limit(candidate.position) {
            xi.push(candidate);
        }
    }
    xi
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfer plans
// ─────────────────────────────────────────────────────────────────────────────

/// How far ahead a transfer plan looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    NextGameweek,
    FiveGameweeks,
}

impl Horizon {
    pub const LABELS: [&'static str; 2] = ["1gw", "5gw"];

    /// Gameweeks considered after `current`, inclusive.
    pub fn window(self, current: u32) -> (u32, u32) {
        let first = current + 1;
        match self {
            Self::NextGameweek => (first, first),
            Self::FiveGameweeks => (first, (first + 4).min(LAST_GAMEWEEK)),
        }
    }
}

impl FromStr for Horizon {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1gw" => Ok(Self::NextGameweek),
            "5gw" => Ok(Self::FiveGameweeks),
            other => Err(Error::InvalidArgument(format!(
                "unknown horizon '{other}', use 1gw or 5gw"
            ))),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NextGameweek => "1gw",
            Self::FiveGameweeks => "5gw",
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    player: &'a Player,
    score: f64,
}

/// Up to three plans of one, two or three transfers.
///
/// `risk` runs from 0 (free transfer only) to 100 (hits allowed, up to three
/// moves). The weakest squad players by form, fixtures, minutes and fitness
/// are swapped for the best affordable player in the same position.
pub fn transfer_plans(
    bootstrap: &Bootstrap,
    picks: &Picks,
    fixtures: &FixtureMap,
    horizon: Horizon,
    window: (u32, u32),
    risk: u8,
) -> Value {
    let bank = tenths(picks.entry_history.bank);
    let squad_ids: HashSet<u32> = picks.picks.iter().map(|p| p.element).collect();
    let mut club_counts: HashMap<u32, usize> = HashMap::new();
    let mut squad: Vec<Candidate<'_>> = Vec::new();
    for pick in &picks.picks {
        let Some(player) = bootstrap.player(pick.element) else {
            continue;
        };
        *club_counts.entry(player.team).or_default() += 1;
        let mut keep = player.form_value() * 2.0 + (5.0 - fixtures.avg_difficulty(player.team)) * 1.5;
        if player.minutes < 200 {
            keep -= 2.0;
        }
        if player.chance_of_playing_next_round.is_some_and(|c| c < 75) {
            keep -= 3.0;
        }
        if !player.news.is_empty() {
            keep -= 1.0;
        }
        squad.push(Candidate { player, score: keep });
    }
    squad.sort_by(|a, b| a.score.total_cmp(&b.score));

    let mut targets: HashMap<u8, Vec<Candidate<'_>>> = HashMap::new();
    for player in &bootstrap.elements {
        if squad_ids.contains(&player.id) || player.minutes < 90 {
            continue;
        }
        let price = player.price();
        let per_million = if price > 0.0 { f64::from(player.total_points) / price } else { 0.0 };
        let score = player.form_value() * 2.0
            + (5.0 - fixtures.avg_difficulty(player.team)) * 1.5
            + per_million * 0.5;
        targets
            .entry(player.element_type)
            .or_default()
            .push(Candidate { player, score });
    }
    for list in targets.values_mut() {
        list.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    let allow_hits = risk >= 50;
    let max_transfers = match risk {
        0..30 => 1,
        30..70 => 2,
        _ => 3,
    };
    let (first, last) = window;
    let data_used = format!("Form, fixture difficulty (GW{first}-{last}), price, minutes");

    let mut plans = Vec::new();
    for count in 1..=max_transfers {
        let hit = (count - 1) * HIT_COST;
        if hit > 0 && !allow_hits {
            continue;
        }

        let mut moves = Vec::new();
        let mut freed = 0.0;
        let mut used = HashSet::new();
        let mut clubs = club_counts.clone();
        for out in squad.iter().take(count as usize) {
            let budget = bank + out.player.price() + freed;
            let replacement = targets
                .get(&out.player.element_type)
                .into_iter()
                .flatten()
                .find(|target| {
                    let same_club = target.player.team == out.player.team;
                    !used.contains(&target.player.id)
                        && target.player.price() <= budget
                        && (same_club || clubs.get(&target.player.team).copied().unwrap_or(0) < MAX_PER_CLUB)
                });
            let Some(target) = replacement else {
                continue;
            };

            used.insert(target.player.id);
            freed += out.player.price() - target.player.price();
            *clubs.entry(out.player.team).or_default() -= 1;
            *clubs.entry(target.player.team).or_default() += 1;
            moves.push((out.player, target.player));
        }
        // A plan that could not fill every slot repeats a smaller one.
        if moves.len() < count as usize {
            continue;
        }

        let form_gain: f64 = moves
            .iter()
            .map(|(out, into)| into.form_value() - out.form_value())
            .sum();
        let upside = ((form_gain * 3.0 - f64::from(hit)).max(0.0) * 10.0).round() / 10.0;
        let mut confidence = if hit > 0 { "Low-Medium" } else { "Medium" }.to_string();
        if horizon == Horizon::FiveGameweeks {
            confidence.push_str(" (fixtures-weighted)");
        }

        plans.push(json!({
            "plan_name": format!(
                "Plan {}: {count} transfer{}",
                plans.len() + 1,
                if count > 1 { "s" } else { "" }
            ),
            "transfers": moves
                .iter()
                .map(|(out, into)| json!({
                    "out": out.web_name,
                    "out_team": bootstrap.team_name(out.team),
                    "out_price": out.price(),
                    "out_form": out.form_value(),
                    "in": into.web_name,
                    "in_team": bootstrap.team_name(into.team),
                    "in_price": into.price(),
                    "in_form": into.form_value(),
                    "in_fixtures": fixtures.describe(into.team, 5),
                }))
                .collect::<Vec<_>>(),
            "hit_cost": hit,
            "expected_upside_score": upside,
            "net_cost": round1(moves.iter().map(|(out, into)| into.price() - out.price()).sum()),
            "remaining_bank": round1(bank + freed),
            "rationale": format!(
                "{} move targeting form and fixture advantage. Total form gain: {form_gain:+.1}.",
                if horizon == Horizon::NextGameweek { "Short-term" } else { "Medium-term" }
            ),
            "data_used": data_used,
            "confidence": confidence,
            "risk_warning": if hit > 0 {
                "Hits can backfire if new players blank."
            } else {
                "Single free transfer, low risk."
            },
        }));
    }

    if plans.is_empty() {
        plans.push(json!({
            "plan_name": "No transfers recommended",
            "rationale": "Your squad looks strong for the selected horizon. Roll the transfer.",
            "confidence": "High",
            "risk_warning": "None",
            "data_used": format!("Form, fixture difficulty (GW{first}-{last})"),
        }));
    }
    Value::Array(plans)
}

// ─────────────────────────────────────────────────────────────────────────────
// Replacements
// ─────────────────────────────────────────────────────────────────────────────

/// How much a replacement search favours safety over upside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

struct Weights {
    form: f64,
    fixture: f64,
    reliability: f64,
    upside: f64,
}

impl RiskLevel {
    pub const LABELS: [&'static str; 3] = ["low", "medium", "high"];

    fn weights(self) -> Weights {
        match self {
            Self::Low => Weights { form: 1.5, fixture: 2.0, reliability: 3.0, upside: 0.5 },
            Self::Medium => Weights { form: 2.0, fixture: 1.5, reliability: 1.5, upside: 1.5 },
            Self::High => Weights { form: 2.5, fixture: 1.0, reliability: 0.5, upside: 3.0 },
        }
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::InvalidArgument(format!(
                "unknown risk level '{other}', use low, medium or high"
            ))),
        }
    }
}

/// A replacement search for one outgoing player.
#[derive(Debug)]
pub struct ReplacementQuery<'a> {
    pub out: &'a Player,
    pub max_price: f64,
    pub horizon_gws: usize,
    pub risk: RiskLevel,
    pub limit: usize,
    /// Players already owned; never suggested.
    pub squad: &'a HashSet<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReplacementScores {
    pub overall_score: f64,
    pub upside_score: f64,
    pub safety_score: f64,
}

/// Same-position players under the price cap, best overall score first.
pub fn rank_replacements<'a>(
    bootstrap: &'a Bootstrap,
    fixtures: &FixtureMap,
    query: &ReplacementQuery<'_>,
) -> Vec<(&'a Player, ReplacementScores)> {
    let weights = query.risk.weights();
    let mut ranked: Vec<(&Player, ReplacementScores)> = bootstrap
        .elements
        .iter()
        .filter(|p| {
            p.element_type == query.out.element_type
                && p.id != query.out.id
                && !query.squad.contains(&p.id)
                && p.price() <= query.max_price
                && p.minutes >= 90
        })
        .map(|p| {
            let form = p.form_value();
            let ease = (5.0 - fixtures.avg_difficulty(p.team)).max(0.0);
            let price = p.price();
            let per_million = if price > 0.0 { f64::from(p.total_points) / price } else { 0.0 };
            let doubtful = p.chance_of_playing_next_round.is_some_and(|c| c < 75);
            let penalty = if doubtful { 2.0 } else { 0.0 };

            let scores = ReplacementScores {
                safety_score: ease * weights.fixture + per_million.min(10.0) * 0.3 - penalty,
                upside_score: form * weights.form + ease * weights.fixture * 0.5 + per_million * 0.5,
                overall_score: form * weights.form
                    + ease * weights.fixture
                    + per_million.min(10.0) * 0.5
                    + if doubtful { 0.0 } else { weights.reliability }
                    + form * weights.upside * 0.3,
            };
            (p, scores)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.overall_score.total_cmp(&a.1.overall_score));
    ranked.truncate(query.limit);
    ranked
}

/// The outgoing player and the ranked candidates, with behaviour attached
/// for every player whose history is in `histories`.
pub fn replacement_report(
    bootstrap: &Bootstrap,
    fixtures: &FixtureMap,
    query: &ReplacementQuery<'_>,
    ranked: &[(&Player, ReplacementScores)],
    histories: &HashMap<u32, Vec<PlayerGameweek>>,
) -> Value {
    let run = |team: u32| -> Vec<&TeamFixture> {
        fixtures.for_team(team).iter().take(query.horizon_gws).collect()
    };
    let behaviour = |player: &Player| match histories.get(&player.id) {
        Some(history) => Behaviour::assess(bootstrap, player, history).compact(),
        None => json!({ "archetype": "unknown", "tags": [] }),
    };

    let out = query.out;
    let out_difficulty = fixtures.avg_difficulty(out.team);
    let out_player = json!({
        "id": out.id,
        "name": out.web_name,
        "team": bootstrap.team_name(out.team),
        "position": out.position_label(),
        "price": out.price(),
        "form": out.form_value(),
        "total_points": out.total_points,
        "minutes": out.minutes,
        "xG": out.expected_goals,
        "xA": out.expected_assists,
        "fixtures": run(out.team),
        "fixture_avg_difficulty": round2(out_difficulty),
        "behaviour": behaviour(out),
    });

    let candidates: Vec<Value> = ranked
        .iter()
        .map(|(p, scores)| {
            let difficulty = fixtures.avg_difficulty(p.team);
            json!({
                "id": p.id,
                "name": p.web_name,
                "team": bootstrap.team_name(p.team),
                "position": p.position_label(),
                "price": p.price(),
                "stats": {
                    "form": p.form_value(),
                    "total_points": p.total_points,
                    "minutes": p.minutes,
                    "xG": p.expected_goals,
                    "xA": p.expected_assists,
                    "selected_by": p.selected_by_percent,
                },
                "fixtures": run(p.team),
                "fixture_avg_difficulty": round2(difficulty),
                "scores": {
                    "overall_score": round2(scores.overall_score),
                    "upside_score": round2(scores.upside_score),
                    "safety_score": round2(scores.safety_score),
                },
                "deltas_vs_out": {
                    "form_delta": round2(p.form_value() - out.form_value()),
                    "fixture_difficulty_delta": round2(out_difficulty - difficulty),
                    "price_delta": round1(p.price() - out.price()),
                },
                "behaviour": behaviour(p),
            })
        })
        .collect();

    json!({ "out_player": out_player, "candidates": candidates })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
