//! Fantasy Premier League data for the Touchline agent.
//!
//! [`FplClient`] wraps the public FPL API; [`register_all`] turns it into the
//! tool set the agent offers the model.

mod behaviour;
mod client;
mod error;
pub mod models;
mod planning;
mod tools;

pub use behaviour::{
    Archetype, Behaviour, Explosiveness, Regression, RegressionFlag, Reliability, Risk, Talisman,
    archetype_report, classify, squad_risk, talisman_table, volatility_profile,
};
pub use client::{FplClient, FplClientBuilder};
pub use error::{Error, Result};
pub use models::Position;
pub use planning::{
    FixtureMap, Horizon, ReplacementQuery, ReplacementScores, RiskLevel, TeamFixture, dream_team,
    rank_replacements, replacement_report, structured_squad, transfer_plans,
};
pub use tools::{
    FplContext, best_value, fixture_list, gameweek_info, player_card, register_all,
    season_history, squad, top_by_form, transfer_list,
};
