//! FPL tools for the agent's registry.
//!
//! Each tool fetches what it needs through [`FplClient`] and hands the
//! decoded payloads to a pure shaping function, so the JSON the model sees
//! can be tested without the network.

use crate::behaviour::{archetype_report, squad_risk, talisman_table, volatility_profile};
use crate::client::FplClient;
use crate::error::{Error, Result};
use crate::models::{
    Bootstrap, ElementSummary, Entry, Fixture, History, Picks, Player, PlayerGameweek, Position,
    Transfer, tenths,
};
use crate::planning::{
    FixtureMap, Horizon, LAST_GAMEWEEK, ReplacementQuery, RiskLevel, dream_team,
    rank_replacements, replacement_report, structured_squad, transfer_plans,
};
use futures::future::{join_all, try_join_all};
use runtime::{
    BoxError, InputSchema, Param, ParamType, RegistryError, ToolArguments, ToolHandler,
    ToolRegistry, ToolSpec,
};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::iter;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state behind every FPL tool.
#[derive(Debug)]
pub struct FplContext {
    client: FplClient,
    team_id: Option<u64>,
}

impl FplContext {
    pub fn new(client: FplClient, team_id: Option<u64>) -> Self {
        Self { client, team_id }
    }

    pub fn team_id(&self) -> Option<u64> {
        self.team_id
    }

    fn require_team_id(&self) -> Result<u64> {
        self.team_id.ok_or(Error::MissingTeamId)
    }

    /// The configured squad for a gameweek, or nothing when it can't be read.
    async fn owned_players(&self, gameweek: Option<u32>) -> HashSet<u32> {
        let (Some(team_id), Some(gameweek)) = (self.team_id, gameweek) else {
            return HashSet::new();
        };
        match self.client.picks(team_id, gameweek).await {
            Ok(picks) => picks.picks.iter().map(|p| p.element).collect(),
            Err(error) => {
                warn!(team_id, %error, "squad unavailable, owned players not excluded");
                HashSet::new()
            }
        }
    }

    async fn top_players_by_form(&self, args: ToolArguments) -> Result<Value> {
        let top_n = count(&args, "top_n", 10);
        info!(top_n, "get_top_players_by_form");
        let bootstrap = self.client.bootstrap().await?;
        Ok(top_by_form(&bootstrap, top_n))
    }

    async fn player_details(&self, args: ToolArguments) -> Result<Value> {
        let query = args.str("player_name").unwrap_or_default();
        info!(player_name = query, "get_player_details");
        let bootstrap = self.client.bootstrap().await?;
        let player = find_player(&bootstrap, query)?;
        let summary = self.client.player_summary(player.id).await?;
        Ok(player_card(&bootstrap, player, &summary))
    }

    async fn current_gameweek_info(&self, _args: ToolArguments) -> Result<Value> {
        info!("get_current_gameweek_info");
        let bootstrap = self.client.bootstrap().await?;
        Ok(gameweek_info(&bootstrap))
    }

    async fn fixtures_for_gameweek(&self, args: ToolArguments) -> Result<Value> {
        let gameweek = gameweek_arg(&args)?
            .ok_or_else(|| Error::InvalidArgument("a gameweek number is required".into()))?;
        info!(gameweek, "get_fixtures_for_gameweek");
        let (bootstrap, fixtures) =
            tokio::try_join!(self.client.bootstrap(), self.client.fixtures(gameweek))?;
        Ok(fixture_list(&bootstrap, &fixtures))
    }

    async fn best_value_players(&self, args: ToolArguments) -> Result<Value> {
        let position = args
            .str("position")
            .unwrap_or("MID")
            .parse::<Position>()
            .map_err(Error::InvalidArgument)?;
        let top_n = count(&args, "top_n", 10);
        info!(%position, top_n, "get_best_value_players");
        let bootstrap = self.client.bootstrap().await?;
        Ok(best_value(&bootstrap, position, top_n))
    }

    async fn my_team(&self, args: ToolArguments) -> Result<Value> {
        let team_id = self.require_team_id()?;
        let bootstrap = self.client.bootstrap().await?;
        let gameweek = match gameweek_arg(&args)? {
            Some(gameweek) => gameweek,
            None => current_gameweek(&bootstrap)?,
        };
        info!(team_id, gameweek, "get_my_team");
        let (picks, entry) = tokio::try_join!(
            self.client.picks(team_id, gameweek),
            self.client.entry(team_id)
        )?;
        Ok(squad(&bootstrap, &entry, &picks, gameweek))
    }

    async fn my_season_history(&self, _args: ToolArguments) -> Result<Value> {
        let team_id = self.require_team_id()?;
        info!(team_id, "get_my_season_history");
        let history = self.client.entry_history(team_id).await?;
        Ok(season_history(&history))
    }

    async fn my_transfers(&self, _args: ToolArguments) -> Result<Value> {
        let team_id = self.require_team_id()?;
        info!(team_id, "get_my_transfers");
        let (bootstrap, transfers) =
            tokio::try_join!(self.client.bootstrap(), self.client.transfers(team_id))?;
        Ok(transfer_list(&bootstrap, &transfers))
    }

    async fn my_team_structured(&self, args: ToolArguments) -> Result<Value> {
        let team_id = self.require_team_id()?;
        let bootstrap = self.client.bootstrap().await?;
        let gameweek = match gameweek_arg(&args)? {
            Some(gameweek) => gameweek,
            None => current_gameweek(&bootstrap)?,
        };
        info!(team_id, gameweek, "get_my_team_structured");
        let (picks, entry, fixtures) = tokio::try_join!(
            self.client.picks(team_id, gameweek),
            self.client.entry(team_id),
            self.client.all_fixtures()
        )?;
        let upcoming = FixtureMap::upcoming(&bootstrap, &fixtures, gameweek, LAST_GAMEWEEK);
        Ok(structured_squad(&bootstrap, &entry, &picks, gameweek, &upcoming))
    }

    async fn dream_team_full15(&self, args: ToolArguments) -> Result<Value> {
        let gameweek = gameweek_arg(&args)?
            .ok_or_else(|| Error::InvalidArgument("a gameweek number is required".into()))?;
        info!(gameweek, "get_dream_team_full15");
        let (bootstrap, live) =
            tokio::try_join!(self.client.bootstrap(), self.client.live_gameweek(gameweek))?;
        dream_team(&bootstrap, &live, gameweek)
    }

    async fn recommend_transfers(&self, args: ToolArguments) -> Result<Value> {
        let team_id = self.require_team_id()?;
        let horizon: Horizon = args.str("horizon").unwrap_or("1gw").parse()?;
        let risk = risk_arg(&args)?;
        info!(team_id, %horizon, risk, "recommend_transfers");

        let bootstrap = self.client.bootstrap().await?;
        let current = current_gameweek(&bootstrap)?;
        let (first, last) = horizon.window(current);
        let (picks, fixtures) = tokio::try_join!(
            self.client.picks(team_id, current),
            self.client.all_fixtures()
        )?;
        let upcoming = FixtureMap::upcoming(&bootstrap, &fixtures, first, last);
        Ok(json!({
            "current_gameweek": current,
            "horizon": horizon.to_string(),
            "gameweeks": format!("GW{first}-{last}"),
            "risk": risk,
            "bank": tenths(picks.entry_history.bank),
            "plans": transfer_plans(&bootstrap, &picks, &upcoming, horizon, (first, last), risk),
        }))
    }

    async fn player_archetype(&self, args: ToolArguments) -> Result<Value> {
        let query = args.str("player_name").unwrap_or_default();
        info!(player_name = query, "classify_player_archetype");
        let bootstrap = self.client.bootstrap().await?;
        let player = find_player(&bootstrap, query)?;
        let summary = self.client.player_summary(player.id).await?;
        Ok(archetype_report(&bootstrap, player, &summary.gameweeks()))
    }

    async fn player_volatility(&self, args: ToolArguments) -> Result<Value> {
        let query = args.str("player_name").unwrap_or_default();
        let window = count(&args, "window_gws", 8);
        info!(player_name = query, window, "get_player_volatility_profile");
        let bootstrap = self.client.bootstrap().await?;
        let player = find_player(&bootstrap, query)?;
        let summary = self.client.player_summary(player.id).await?;
        Ok(volatility_profile(&bootstrap, player, &summary.gameweeks(), window))
    }

    async fn talismans(&self, args: ToolArguments) -> Result<Value> {
        let limit = count(&args, "limit", 15);
        let min_minutes = args
            .i64("min_minutes")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(900);
        info!(limit, min_minutes, "find_talisman_players");
        let bootstrap = self.client.bootstrap().await?;
        Ok(talisman_table(&bootstrap, limit, min_minutes))
    }

    async fn squad_risk_profile(&self, args: ToolArguments) -> Result<Value> {
        let team_id = self.require_team_id()?;
        let bootstrap = self.client.bootstrap().await?;
        let gameweek = match gameweek_arg(&args)? {
            Some(gameweek) => gameweek,
            None => current_gameweek(&bootstrap)?,
        };
        info!(team_id, gameweek, "analyze_squad_risk_profile");
        let picks = self.client.picks(team_id, gameweek).await?;
        let histories: HashMap<u32, Vec<PlayerGameweek>> =
            try_join_all(picks.picks.iter().map(|pick| async move {
                let summary = self.client.player_summary(pick.element).await?;
                Ok::<_, Error>((pick.element, summary.gameweeks()))
            }))
            .await?
            .into_iter()
            .collect();
        Ok(squad_risk(&bootstrap, &picks.picks, &histories, gameweek))
    }

    async fn suggest_replacements(&self, args: ToolArguments) -> Result<Value> {
        let query = args.str("player_name").unwrap_or_default();
        let max_price = args
            .f64("max_price")
            .ok_or_else(|| Error::InvalidArgument("max_price is required".into()))?;
        let horizon_gws = count(&args, "horizon_gws", 3).clamp(1, 5);
        let risk: RiskLevel = args.str("risk_level").unwrap_or("medium").parse()?;
        let limit = count(&args, "limit", 10);
        info!(player_name = query, max_price, horizon_gws, limit, "suggest_replacements_for_player");

        let bootstrap = self.client.bootstrap().await?;
        let out = find_player(&bootstrap, query)?;
        let current = bootstrap.current_gameweek().map(|gw| gw.id);
        let owned = self.owned_players(current).await;

        let first = current.unwrap_or(0) + 1;
        let last = (first + horizon_gws as u32 - 1).min(LAST_GAMEWEEK);
        let fixtures = match self.client.all_fixtures().await {
            Ok(fixtures) => FixtureMap::upcoming(&bootstrap, &fixtures, first, last),
            Err(error) => {
                warn!(%error, "fixtures unavailable, scoring without them");
                FixtureMap::default()
            }
        };

        let request = ReplacementQuery {
            out,
            max_price,
            horizon_gws,
            risk,
            limit,
            squad: &owned,
        };
        let ranked = rank_replacements(&bootstrap, &fixtures, &request);

        let ids: Vec<u32> = iter::once(out.id)
            .chain(ranked.iter().map(|(p, _)| p.id))
            .collect();
        let summaries = join_all(ids.iter().map(|&id| async move {
            (id, self.client.player_summary(id).await)
        }))
        .await;
        let histories: HashMap<u32, Vec<PlayerGameweek>> = summaries
            .into_iter()
            .filter_map(|(id, summary)| match summary {
                Ok(summary) => Some((id, summary.gameweeks())),
                Err(error) => {
                    warn!(id, %error, "player history unavailable");
                    None
                }
            })
            .collect();

        Ok(replacement_report(&bootstrap, &fixtures, &request, &ranked, &histories))
    }
}

/// Register every FPL tool, in a fixed order.
pub fn register_all(
    registry: &mut ToolRegistry,
    ctx: Arc<FplContext>,
) -> std::result::Result<(), RegistryError> {
    let top_n = || {
        Param::optional("top_n", ParamType::Integer)
            .describe("How many players to return")
            .range(1.0, 50.0)
            .default_value(10)
    };

    registry.register(ToolSpec::new(
        "get_top_players_by_form",
        "Top N players ranked by current form (points per match over the recent window). \
         Useful for captaincy candidates and differentials.",
        InputSchema::new().param(top_n()),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.top_players_by_form(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_player_details",
        "Look up a player by (partial) name and return their season stats, \
         next five fixtures and last five results.",
        InputSchema::new().param(
            Param::required("player_name", ParamType::String)
                .describe("Full or partial player name, e.g. \"Saka\""),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.player_details(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_current_gameweek_info",
        "Current and next gameweek: deadline, average and highest score, \
         most captained player and chip plays.",
        InputSchema::new(),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.current_gameweek_info(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_fixtures_for_gameweek",
        "All fixtures for a gameweek with difficulty ratings, kickoff times and scores.",
        InputSchema::new().param(
            Param::required("gameweek", ParamType::Integer)
                .describe("Gameweek number")
                .range(1.0, 38.0),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.fixtures_for_gameweek(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_best_value_players",
        "Best value players (total points per £m) for a position.",
        InputSchema::new()
            .param(
                Param::optional("position", ParamType::String)
                    .describe("One of GKP, DEF, MID, FWD")
                    .one_of(Position::LABELS)
                    .default_value("MID"),
            )
            .param(top_n()),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.best_value_players(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_my_team",
        "The user's squad for a gameweek (default: current) with captaincy, bench, \
         prices and points, plus rank, bank and squad value.",
        InputSchema::new().param(
            Param::optional("gameweek", ParamType::Integer)
                .describe("Gameweek number; defaults to the current gameweek")
                .range(1.0, 38.0),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.my_team(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_my_season_history",
        "The user's gameweek-by-gameweek points, rank, bank, value and transfers this \
         season, plus past season summaries.",
        InputSchema::new(),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.my_season_history(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_my_transfers",
        "Every transfer the user made this season: player in, player out, prices and time.",
        InputSchema::new(),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.my_transfers(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_my_team_structured",
        "The user's squad laid out as starting XI and bench, each player with their \
         next fixture, plus bank, squad value and active chip.",
        InputSchema::new().param(
            Param::optional("gameweek", ParamType::Integer)
                .describe("Gameweek number; defaults to the current gameweek")
                .range(1.0, 38.0),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.my_team_structured(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_dream_team_full15",
        "The highest-scoring legal 15-man squad for a gameweek (2 GKP, 5 DEF, 5 MID, \
         3 FWD, max 3 per club) with the best XI, bench and a captain whose points count twice.",
        InputSchema::new().param(
            Param::required("gameweek", ParamType::Integer)
                .describe("Gameweek number")
                .range(1.0, 38.0),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.dream_team_full15(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "recommend_transfers",
        "Transfer plans for the user's squad: the weakest players by form, fixtures and \
         fitness swapped for affordable upgrades. Higher risk allows points hits and more moves.",
        InputSchema::new()
            .param(
                Param::optional("horizon", ParamType::String)
                    .describe("1gw for the next gameweek, 5gw for the next five")
                    .one_of(Horizon::LABELS)
                    .default_value("1gw"),
            )
            .param(
                Param::optional("risk", ParamType::Integer)
                    .describe("0 is conservative, 100 is aggressive")
                    .range(0.0, 100.0)
                    .default_value(50),
            ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.recommend_transfers(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "classify_player_archetype",
        "Behavioural profile of a player: explosiveness, finishing luck against xG/xA, \
         share of club output and reliability, summarised as an archetype label and tags.",
        InputSchema::new().param(
            Param::required("player_name", ParamType::String)
                .describe("Full or partial player name"),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.player_archetype(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "get_player_volatility_profile",
        "How boom-or-bust a player is over recent appearances: points spread, haul and \
         blank rates and a 0-100 volatility score.",
        InputSchema::new()
            .param(
                Param::required("player_name", ParamType::String)
                    .describe("Full or partial player name"),
            )
            .param(
                Param::optional("window_gws", ParamType::Integer)
                    .describe("How many recent appearances to use")
                    .range(1.0, 38.0)
                    .default_value(8),
            ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.player_volatility(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "find_talisman_players",
        "Players carrying their club's attack, ranked by share of club goals and expected \
         goal involvements.",
        InputSchema::new()
            .param(
                Param::optional("limit", ParamType::Integer)
                    .describe("How many players to return")
                    .range(1.0, 50.0)
                    .default_value(15),
            )
            .param(
                Param::optional("min_minutes", ParamType::Integer)
                    .describe("Ignore players with fewer minutes this season")
                    .range(0.0, 3420.0)
                    .default_value(900),
            ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.talismans(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "analyze_squad_risk_profile",
        "Behavioural risk across the user's squad: volatile and injury-prone players, \
         finishing luck, club exposure and an overall profile.",
        InputSchema::new().param(
            Param::optional("gameweek", ParamType::Integer)
                .describe("Gameweek number; defaults to the current gameweek")
                .range(1.0, 38.0),
        ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.squad_risk_profile(args).await
        }),
    ))?;

    registry.register(ToolSpec::new(
        "suggest_replacements_for_player",
        "Ranked same-position replacements for a player under a price cap, scored on form, \
         fixtures, value and fitness, with behaviour profiles and deltas against the outgoing player.",
        InputSchema::new()
            .param(
                Param::required("player_name", ParamType::String)
                    .describe("The player to replace"),
            )
            .param(
                Param::required("max_price", ParamType::Number)
                    .describe("Highest price to consider, in £m"),
            )
            .param(
                Param::optional("horizon_gws", ParamType::Integer)
                    .describe("How many upcoming gameweeks of fixtures to weigh")
                    .range(1.0, 5.0)
                    .default_value(3),
            )
            .param(
                Param::optional("risk_level", ParamType::String)
                    .describe("low favours safety, high favours upside")
                    .one_of(RiskLevel::LABELS)
                    .default_value("medium"),
            )
            .param(
                Param::optional("limit", ParamType::Integer)
                    .describe("How many candidates to return")
                    .range(1.0, 30.0)
                    .default_value(10),
            ),
        handler(&ctx, |ctx: Arc<FplContext>, args| async move {
            ctx.suggest_replacements(args).await
        }),
    ))?;

    Ok(())
}

fn handler<F, Fut>(ctx: &Arc<FplContext>, f: F) -> impl ToolHandler + 'static
where
    F: Fn(Arc<FplContext>, ToolArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    move |args: ToolArguments| {
        let call = f(Arc::clone(&ctx), args);
        async move { call.await.map_err(BoxError::from) }
    }
}

fn count(args: &ToolArguments, name: &str, default: usize) -> usize {
    args.i64(name)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

fn gameweek_arg(args: &ToolArguments) -> Result<Option<u32>> {
    args.i64("gameweek")
        .map(|gw| {
            u32::try_from(gw)
                .ok()
                .filter(|gw| (1..=LAST_GAMEWEEK).contains(gw))
                .ok_or_else(|| Error::InvalidArgument(format!("gameweek {gw} does not exist")))
        })
        .transpose()
}

fn risk_arg(args: &ToolArguments) -> Result<u8> {
    let risk = args.i64("risk").unwrap_or(50);
    u8::try_from(risk)
        .ok()
        .filter(|risk| *risk <= 100)
        .ok_or_else(|| Error::InvalidArgument(format!("risk must be 0-100, got {risk}")))
}

fn current_gameweek(bootstrap: &Bootstrap) -> Result<u32> {
    bootstrap
        .current_gameweek()
        .map(|gw| gw.id)
        .ok_or_else(|| Error::NotFound("could not determine the current gameweek".into()))
}

fn find_player<'a>(bootstrap: &'a Bootstrap, query: &str) -> Result<&'a Player> {
    bootstrap
        .find_player(query)
        .ok_or_else(|| Error::NotFound(format!("no player found matching '{query}'")))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Shaping
// ─────────────────────────────────────────────────────────────────────────────

pub fn top_by_form(bootstrap: &Bootstrap, top_n: usize) -> Value {
    let mut players: Vec<&Player> = bootstrap.elements.iter().collect();
    players.sort_by(|a, b| b.form_value().total_cmp(&a.form_value()));

    let rows: Vec<Value> = players
        .into_iter()
        .take(top_n)
        .map(|p| {
            json!({
                "name": p.web_name,
                "team": bootstrap.team_name(p.team),
                "position": p.position_label(),
                "form": p.form,
                "price": p.price(),
                "total_points": p.total_points,
                "minutes": p.minutes,
                "selected_by": p.selected_by_percent,
            })
        })
        .collect();
    Value::Array(rows)
}

pub fn player_card(bootstrap: &Bootstrap, player: &Player, summary: &ElementSummary) -> Value {
    let recent_start = summary.history.len().saturating_sub(5);
    json!({
        "name": format!("{} {}", player.first_name, player.second_name),
        "web_name": player.web_name,
        "team": bootstrap.team_name(player.team),
        "position": player.position_label(),
        "price": player.price(),
        "total_points": player.total_points,
        "form": player.form,
        "goals": player.goals_scored,
        "assists": player.assists,
        "clean_sheets": player.clean_sheets,
        "minutes": player.minutes,
        "xG": player.expected_goals,
        "xA": player.expected_assists,
        "selected_by": player.selected_by_percent,
        "news": player.news,
        "chance_of_playing": player.chance_of_playing_next_round,
        "upcoming_fixtures": summary.fixtures.iter().take(5).collect::<Vec<_>>(),
        "recent_history": summary.history[recent_start..],
    })
}

pub fn gameweek_info(bootstrap: &Bootstrap) -> Value {
    let describe = |gw: Option<&crate::models::Gameweek>| {
        gw.map(|gw| {
            let mut value = json!(gw);
            if let Some(name) = gw
                .most_captained
                .and_then(|id| bootstrap.player(id))
                .map(|p| p.web_name.clone())
            {
                value["most_captained_name"] = json!(name);
            }
            value
        })
    };
    json!({
        "current_gameweek": describe(bootstrap.current_gameweek()),
        "next_gameweek": describe(bootstrap.next_gameweek()),
    })
}

pub fn fixture_list(bootstrap: &Bootstrap, fixtures: &[Fixture]) -> Value {
    let score = |goals: Option<u32>| goals.map_or_else(|| "?".to_string(), |g| g.to_string());
    let rows: Vec<Value> = fixtures
        .iter()
        .map(|f| {
            json!({
                "home": bootstrap.team_name(f.team_h),
                "away": bootstrap.team_name(f.team_a),
                "home_difficulty": f.team_h_difficulty,
                "away_difficulty": f.team_a_difficulty,
                "kickoff": f.kickoff_time,
                "finished": f.finished,
                "score": format!("{}-{}", score(f.team_h_score), score(f.team_a_score)),
            })
        })
        .collect();
    Value::Array(rows)
}

pub fn best_value(bootstrap: &Bootstrap, position: Position, top_n: usize) -> Value {
    let value = |p: &Player| {
        let price = p.price();
        if price > 0.0 {
            p.total_points as f64 / price
        } else {
            0.0
        }
    };

    let mut players: Vec<&Player> = bootstrap
        .elements
        .iter()
        .filter(|p| p.position() == Some(position) && p.minutes > 0)
        .collect();
    players.sort_by(|a, b| value(b).total_cmp(&value(a)));

    let rows: Vec<Value> = players
        .into_iter()
        .take(top_n)
        .map(|p| {
            json!({
                "name": p.web_name,
                "team": bootstrap.team_name(p.team),
                "price": p.price(),
                "total_points": p.total_points,
                "value": round2(value(p)),
                "form": p.form,
                "selected_by": p.selected_by_percent,
            })
        })
        .collect();
    Value::Array(rows)
}

pub fn squad(bootstrap: &Bootstrap, entry: &Entry, picks: &Picks, gameweek: u32) -> Value {
    let players: Vec<Value> = picks
        .picks
        .iter()
        .map(|pick| {
            let player = bootstrap.player(pick.element);
            json!({
                "name": player.map_or("?", |p| p.web_name.as_str()),
                "position": player.map_or("?", Player::position_label),
                "team": player.map_or("?", |p| bootstrap.team_name(p.team)),
                "price": player.map_or(0.0, Player::price),
                "form": player.map_or("0", |p| p.form.as_str()),
                "total_points": player.map_or(0, |p| p.total_points),
                "gw_points": pick.points,
                "is_captain": pick.is_captain,
                "is_vice_captain": pick.is_vice_captain,
                "on_bench": pick.position > 11,
                "multiplier": pick.multiplier,
            })
        })
        .collect();

    let history = &picks.entry_history;
    json!({
        "manager": format!("{} {}", entry.player_first_name, entry.player_last_name).trim(),
        "team_name": entry.name,
        "gameweek": gameweek,
        "overall_points": entry.summary_overall_points,
        "overall_rank": entry.summary_overall_rank,
        "gw_points": history.points,
        "bank": tenths(history.bank),
        "squad_value": tenths(history.value),
        "transfers_made": history.event_transfers,
        "transfer_cost": history.event_transfers_cost,
        "active_chip": picks.active_chip,
        "squad": players,
    })
}

pub fn season_history(history: &History) -> Value {
    let current: Vec<Value> = history
        .current
        .iter()
        .map(|gw| {
            json!({
                "gameweek": gw.event,
                "points": gw.points,
                "total_points": gw.total_points,
                "rank": gw.rank,
                "overall_rank": gw.overall_rank,
                "bank": tenths(gw.bank),
                "squad_value": tenths(gw.value),
                "transfers": gw.event_transfers,
                "transfer_cost": gw.event_transfers_cost,
                "bench_points": gw.points_on_bench,
            })
        })
        .collect();
    json!({ "current_season": current, "past_seasons": history.past })
}

pub fn transfer_list(bootstrap: &Bootstrap, transfers: &[Transfer]) -> Value {
    let name = |id: u32| {
        bootstrap
            .player(id)
            .map_or_else(|| format!("id:{id}"), |p| p.web_name.clone())
    };
    let rows: Vec<Value> = transfers
        .iter()
        .map(|t| {
            json!({
                "gameweek": t.event,
                "time": t.time,
                "player_in": name(t.element_in),
                "price_in": tenths(t.element_in_cost),
                "player_out": name(t.element_out),
                "price_out": tenths(t.element_out_cost),
            })
        })
        .collect();
    Value::Array(rows)
}
