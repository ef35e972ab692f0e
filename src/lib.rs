pub mod balancer;
pub mod clock;
pub mod error;
pub mod interchange;
pub mod logging;
pub mod manager;
pub mod roster;
pub mod scoring;
pub mod skill;
pub mod stats;
pub mod store;
pub mod sync;
pub mod types;

use error::CricketError;
use manager::CricketManager;
use scoring::{BatterEnd, Delivery};
use serde::Serialize;
use types::*;
use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init();
}

fn js_error(e: CricketError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("{} parse error: {}", what, e)))
}

/// Parse a bare string value, e.g. a style name, through its serde names
fn parse_name<T: serde::de::DeserializeOwned>(text: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_value(serde_json::Value::String(text.to_string()))
        .map_err(|e| JsValue::from_str(&format!("{} parse error: {}", what, e)))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(target_arch = "wasm32")]
fn default_store() -> Result<Box<dyn store::Store>, JsValue> {
    Ok(Box::new(store::BrowserStore::new().map_err(js_error)?))
}

#[cfg(not(target_arch = "wasm32"))]
fn default_store() -> Result<Box<dyn store::Store>, JsValue> {
    Ok(Box::new(store::MemoryStore::new()))
}

/// WASM-exposed cricket manager. Structured values cross the boundary as
/// JSON strings.
#[wasm_bindgen]
pub struct CricketApp {
    manager: CricketManager,
}

#[wasm_bindgen]
impl CricketApp {
    /// Open a group with the default config, backed by localStorage
    #[wasm_bindgen(constructor)]
    pub fn new(group: &str) -> Result<CricketApp, JsValue> {
        Self::new_with_config(group, "{}", clock::now_millis() as u64)
    }

    /// Open a group with a custom config and RNG seed
    pub fn new_with_config(group: &str, config_json: &str, seed: u64) -> Result<CricketApp, JsValue> {
        let config: AppConfig = serde_json::from_str(config_json)
            .map_err(|e| js_error(CricketError::Config(e.to_string())))?;
        let manager = CricketManager::new(default_store()?, group, config, seed).map_err(js_error)?;
        Ok(CricketApp { manager })
    }

    pub fn get_group(&self) -> String {
        self.manager.group().to_string()
    }

    pub fn switch_group(&mut self, group: &str) -> Result<(), JsValue> {
        self.manager.switch_group(group).map_err(js_error)
    }

    /// Update config
    pub fn update_config(&mut self, config_json: &str) -> Result<(), JsValue> {
        let config: AppConfig = serde_json::from_str(config_json)
            .map_err(|e| js_error(CricketError::Config(e.to_string())))?;
        self.manager.update_config(config);
        Ok(())
    }

    pub fn get_config(&self) -> String {
        serde_json::to_string(self.manager.config()).unwrap_or_default()
    }

    /// Get default config as JSON
    pub fn get_default_config() -> String {
        serde_json::to_string(&AppConfig::default()).unwrap_or_default()
    }

    /// Notices about dropped or repaired data, each returned once
    pub fn take_notices(&mut self) -> String {
        serde_json::to_string(&self.manager.take_notices()).unwrap_or_default()
    }

    // Players

    pub fn get_players(&self) -> String {
        let players: Vec<_> = self.manager.roster().players().collect();
        serde_json::to_string(&players).unwrap_or_default()
    }

    /// Add a player and return its id
    pub fn add_player(
        &mut self,
        name: &str,
        batting_style: &str,
        bowling_style: &str,
        is_star: bool,
    ) -> Result<u32, JsValue> {
        let batting: BattingStyle = parse_name(batting_style, "Batting style")?;
        let bowling: BowlingStyle = parse_name(bowling_style, "Bowling style")?;
        self.manager
            .add_player(name, batting, bowling, is_star)
            .map_err(js_error)
    }

    pub fn update_player(
        &mut self,
        id: u32,
        name: &str,
        batting_style: &str,
        bowling_style: &str,
        is_star: bool,
    ) -> Result<(), JsValue> {
        let batting: BattingStyle = parse_name(batting_style, "Batting style")?;
        let bowling: BowlingStyle = parse_name(bowling_style, "Bowling style")?;
        self.manager
            .update_player(id, name, batting, bowling, is_star)
            .map_err(js_error)
    }

    pub fn remove_player(&mut self, id: u32) -> Result<(), JsValue> {
        self.manager.remove_player(id).map(|_| ()).map_err(js_error)
    }

    pub fn get_player_summary(&self, id: u32) -> Result<String, JsValue> {
        to_json(&self.manager.player_summary(id).map_err(js_error)?)
    }

    pub fn get_player_summaries(&self) -> String {
        serde_json::to_string(&self.manager.player_summaries()).unwrap_or_default()
    }

    pub fn get_player_clusters(&self) -> String {
        let players: Vec<Player> = self.manager.roster().players().cloned().collect();
        serde_json::to_string(&stats::cluster_players(&players)).unwrap_or_default()
    }

    // Teams

    /// Generate teams from a JSON array of selected player ids
    pub fn generate_teams(
        &mut self,
        player_ids_json: &str,
        captain1: u32,
        captain2: u32,
    ) -> Result<String, JsValue> {
        let ids: Vec<PlayerId> = parse(player_ids_json, "Player IDs")?;
        let teams = self
            .manager
            .generate_teams(&ids, captain1, captain2)
            .map_err(js_error)?;
        to_json(&teams)
    }

    pub fn get_teams(&self) -> String {
        serde_json::to_string(&self.manager.teams()).unwrap_or_default()
    }

    // Live match

    /// Start a match; `overs` of 0 uses the configured default
    pub fn start_match(&mut self, overs: u32) -> Result<String, JsValue> {
        let overs = (overs > 0).then_some(overs);
        let state = self.manager.start_match(overs).map_err(js_error)?;
        to_json(state)
    }

    /// Current match state as JSON, `null` when no match is active
    pub fn get_match(&self) -> String {
        serde_json::to_string(&self.manager.current_match()).unwrap_or_default()
    }

    pub fn select_striker(&mut self, player_id: u32) -> Result<(), JsValue> {
        self.manager.select_striker(player_id).map_err(js_error)
    }

    pub fn select_non_striker(&mut self, player_id: u32) -> Result<(), JsValue> {
        self.manager.select_non_striker(player_id).map_err(js_error)
    }

    pub fn select_bowler(&mut self, player_id: u32) -> Result<(), JsValue> {
        self.manager.select_bowler(player_id).map_err(js_error)
    }

    /// Record a ball, e.g. `{"runs":1,"extras":"Wide"}` or
    /// `{"wicket":{"kind":"Caught","fielder":4}}`
    pub fn record_delivery(&mut self, delivery_json: &str) -> Result<(), JsValue> {
        let delivery: Delivery = parse(delivery_json, "Delivery")?;
        self.manager.record_delivery(delivery).map_err(js_error)
    }

    /// Record runs off the bat
    pub fn record_runs(&mut self, runs: u32) -> Result<(), JsValue> {
        self.manager.record_delivery(Delivery::runs(runs)).map_err(js_error)
    }

    pub fn end_innings(&mut self) -> Result<(), JsValue> {
        self.manager.end_innings().map_err(js_error)
    }

    pub fn undo(&mut self) -> Result<(), JsValue> {
        self.manager.undo().map_err(js_error)
    }

    pub fn swap_strike(&mut self) -> Result<(), JsValue> {
        self.manager.swap_strike().map_err(js_error)
    }

    pub fn retire_batsman(&mut self, non_striker: bool) -> Result<(), JsValue> {
        let end = if non_striker {
            BatterEnd::NonStriker
        } else {
            BatterEnd::Striker
        };
        self.manager.retire_batsman(end).map_err(js_error)
    }

    /// Live figures for the scoring screen
    pub fn get_live_summary(&self) -> Result<String, JsValue> {
        let state = self
            .manager
            .current_match()
            .ok_or_else(|| js_error(CricketError::NoActiveMatch))?;
        to_json(&serde_json::json!({
            "batting_team": state.batting_team().name,
            "score": state.batting_score().summary(),
            "overs": state.batting_score().overs_display(),
            "target": state.target,
            "balls_remaining": state.balls_remaining(),
            "current_run_rate": state.current_run_rate(),
            "required_run_rate": state.required_run_rate(),
            "this_over": state.this_over(),
            "awaiting_bowler_change": state.awaiting_bowler_change,
            "can_undo": state.can_undo(),
            "status": state.status,
            "result": state.result,
        }))
    }

    /// Scorecard for team 1 or team 2
    pub fn get_scorecard(&self, team: u8) -> Result<String, JsValue> {
        let state = self
            .manager
            .current_match()
            .ok_or_else(|| js_error(CricketError::NoActiveMatch))?;
        let side = if team == 2 { TeamSide::Two } else { TeamSide::One };
        to_json(&state.scorecard(side))
    }

    /// Archive the finished match and return its record
    pub fn end_match(&mut self) -> Result<String, JsValue> {
        let record = self.manager.end_match().map_err(js_error)?;
        to_json(&record)
    }

    pub fn abandon_match(&mut self) -> Result<(), JsValue> {
        self.manager.abandon_match().map_err(js_error)
    }

    // History and analytics

    pub fn get_matches(&self) -> String {
        serde_json::to_string(self.manager.matches()).unwrap_or_default()
    }

    pub fn get_team_records(&self) -> String {
        serde_json::to_string(&self.manager.team_records()).unwrap_or_default()
    }

    // Backup and sync

    pub fn export_data(&self) -> Result<String, JsValue> {
        to_json(&self.manager.export())
    }

    /// Replace roster and history from an export document
    pub fn import_data(&mut self, json: &str) -> Result<String, JsValue> {
        let doc: interchange::ExportDocument = parse(json, "Import")?;
        to_json(&self.manager.import(&doc).map_err(js_error)?)
    }

    /// Delete the group's local data; returns the backup document
    pub fn wipe_group(&mut self) -> Result<String, JsValue> {
        to_json(&self.manager.wipe_group().map_err(js_error)?)
    }

    /// Body for `POST /sync/upload`
    pub fn get_sync_upload(&self, group_id: u64) -> Result<String, JsValue> {
        to_json(&sync::UploadRequest {
            group_id,
            data: self.manager.export().into(),
        })
    }

    /// Apply a `GET /sync/download` response
    pub fn apply_sync_download(&mut self, json: &str) -> Result<String, JsValue> {
        let payload: sync::SyncPayload = parse(json, "Download")?;
        to_json(&self.manager.import(&payload.into()).map_err(js_error)?)
    }
}

/// Split players into two balanced teams without touching any group data
#[wasm_bindgen]
pub fn balance_teams(
    players_json: &str,
    captain1: u32,
    captain2: u32,
    seed: u64,
) -> Result<String, JsValue> {
    use rand::SeedableRng;

    let players: Vec<Player> = parse(players_json, "Players")?;
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
    let (team_a, team_b) = balancer::TeamBalancer::new(AppConfig::default())
        .balance_teams(&players, captain1, captain2, Some(&mut rng))
        .map_err(js_error)?;
    to_json(&serde_json::json!({ "team_a": team_a, "team_b": team_b }))
}

/// Body for `POST /groups` and `POST /groups/auth`
#[wasm_bindgen]
pub fn group_request(group_name: &str, password: &str) -> Result<String, JsValue> {
    to_json(&sync::GroupRequest::new(group_name, password))
}

#[wasm_bindgen]
pub fn hash_password(password: &str) -> String {
    sync::hash_password(password)
}
