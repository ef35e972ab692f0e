//! Export/import document shared with the spreadsheet-style backup format.
//!
//! Field names are capitalized (`Match_ID`, `Balls_Faced`, ...) so files
//! written by older app versions load unchanged.

use crate::clock;
use crate::error::{CricketError, Result};
use crate::roster::Roster;
use crate::stats;
use crate::types::*;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub const DATA_FORMAT_VERSION: &str = "2.0";

/// A player reference as found in documents: a numeric id, a legacy code
/// such as `"P001"`, or a player name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerRef {
    Id(PlayerId),
    Text(String),
}

impl PlayerRef {
    /// The id this reference encodes, if it encodes one
    pub fn id(&self) -> Option<PlayerId> {
        match self {
            PlayerRef::Id(id) => Some(*id),
            PlayerRef::Text(text) => {
                let digits = text.trim().trim_start_matches(|c: char| c.is_ascii_alphabetic());
                if digits.is_empty() {
                    return None;
                }
                digits.parse().ok()
            }
        }
    }
}

impl From<PlayerId> for PlayerRef {
    fn from(id: PlayerId) -> Self {
        PlayerRef::Id(id)
    }
}

/// Accepts `true`/`false`, `0`/`1` and `"true"`/`"yes"`
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        Some(Flag::Text(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        None => false,
    })
}

/// Accepts match ids written as numbers or strings
fn flexible_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Int(i64),
    }
    Ok(match Text::deserialize(deserializer)? {
        Text::Str(s) => s,
        Text::Int(n) => n.to_string(),
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfoRow {
    #[serde(rename = "Player_ID")]
    pub player_id: PlayerRef,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Bowling_Style", default = "unknown_bowling")]
    pub bowling_style: BowlingStyle,
    #[serde(rename = "Batting_Style", default = "unknown_batting")]
    pub batting_style: BattingStyle,
    #[serde(rename = "Is_Star", default, deserialize_with = "flexible_bool")]
    pub is_star: bool,
    #[serde(rename = "Last_Updated", default)]
    pub last_updated: Option<NaiveDate>,
}

fn unknown_bowling() -> BowlingStyle {
    BowlingStyle::Unknown
}

fn unknown_batting() -> BattingStyle {
    BattingStyle::Unknown
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(rename = "Match_ID", deserialize_with = "flexible_string")]
    pub match_id: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Team1")]
    pub team1: String,
    #[serde(rename = "Team2")]
    pub team2: String,
    #[serde(rename = "Team1_Captain")]
    pub team1_captain: PlayerRef,
    #[serde(rename = "Team2_Captain")]
    pub team2_captain: PlayerRef,
    #[serde(rename = "Team1_Composition", default)]
    pub team1_composition: Vec<PlayerRef>,
    #[serde(rename = "Team2_Composition", default)]
    pub team2_composition: Vec<PlayerRef>,
    #[serde(rename = "Winning_Team", default)]
    pub winning_team: String,
    #[serde(rename = "Losing_Team", default)]
    pub losing_team: String,
    #[serde(rename = "Game_Start_Time", default)]
    pub game_start_time: String,
    #[serde(rename = "Game_Finish_Time", default)]
    pub game_finish_time: String,
    #[serde(rename = "Winning_Team_Score", default)]
    pub winning_team_score: String,
    #[serde(rename = "Losing_Team_Score", default)]
    pub losing_team_score: String,
    #[serde(rename = "Result", default)]
    pub result: String,
    #[serde(rename = "Overs", default)]
    pub overs: u32,
    #[serde(rename = "Status", default = "completed")]
    pub status: String,
    #[serde(rename = "Man_Of_The_Match", default)]
    pub man_of_the_match: Option<PlayerRef>,
}

fn completed() -> String {
    "Completed".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattingRow {
    #[serde(rename = "Match_ID", deserialize_with = "flexible_string")]
    pub match_id: String,
    #[serde(rename = "Player_ID")]
    pub player_id: PlayerRef,
    #[serde(rename = "Player", default)]
    pub player: String,
    #[serde(rename = "Runs", default)]
    pub runs: u32,
    #[serde(rename = "Balls_Faced", default)]
    pub balls_faced: u32,
    #[serde(rename = "Strike_Rate", default)]
    pub strike_rate: String,
    #[serde(rename = "Fours", default)]
    pub fours: u32,
    #[serde(rename = "Sixes", default)]
    pub sixes: u32,
    #[serde(rename = "Out", default, deserialize_with = "flexible_bool")]
    pub out: bool,
    #[serde(rename = "Dismissal_Type", default)]
    pub dismissal_type: String,
    #[serde(rename = "Dismissal_Text", default)]
    pub dismissal_text: String,
    #[serde(rename = "Fielder", default)]
    pub fielder: Option<PlayerRef>,
    #[serde(rename = "Position", default)]
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BowlingRow {
    #[serde(rename = "Match_ID", deserialize_with = "flexible_string")]
    pub match_id: String,
    #[serde(rename = "Player_ID")]
    pub player_id: PlayerRef,
    #[serde(rename = "Player", default)]
    pub player: String,
    #[serde(rename = "Overs", default)]
    pub overs: String,
    #[serde(rename = "Maidens", default)]
    pub maidens: u32,
    #[serde(rename = "Runs", default)]
    pub runs: u32,
    #[serde(rename = "Wickets", default)]
    pub wickets: u32,
    #[serde(rename = "Economy", default)]
    pub economy: String,
    #[serde(rename = "Balls", default)]
    pub balls: u32,
}

impl BowlingRow {
    /// Balls bowled, from `Balls` or else from the `"3.2"` overs notation
    pub fn total_balls(&self) -> u32 {
        if self.balls > 0 {
            return self.balls;
        }
        let mut parts = self.overs.trim().splitn(2, '.');
        let overs: u32 = parts.next().and_then(|o| o.parse().ok()).unwrap_or(0);
        let balls: u32 = parts.next().and_then(|b| b.parse().ok()).unwrap_or(0);
        overs * 6 + balls.min(5)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportMetadata {
    pub total_players: usize,
    pub total_matches: usize,
    pub export_date: String,
    pub export_timestamp: i64,
    pub app_version: String,
    pub data_format_version: String,
    pub created_by: String,
}

impl Default for ExportMetadata {
    fn default() -> Self {
        Self {
            total_players: 0,
            total_matches: 0,
            export_date: String::new(),
            export_timestamp: 0,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            data_format_version: DATA_FORMAT_VERSION.to_string(),
            created_by: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// The whole backup document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDocument {
    pub player_info: Vec<PlayerInfoRow>,
    pub matches: Vec<MatchRow>,
    pub match_batting_performance: Vec<BattingRow>,
    pub match_bowling_performance: Vec<BowlingRow>,
    pub export_metadata: ExportMetadata,
}

/// What an import produced
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub players: usize,
    pub matches: usize,
    /// Rows dropped because they named a player that could not be resolved
    pub skipped_rows: usize,
}

/// Build the backup document for a roster and its match history
pub fn export(roster: &Roster, history: &[MatchRecord], exported_at: i64) -> ExportDocument {
    let player_info = roster
        .players()
        .map(|p| PlayerInfoRow {
            player_id: p.id.into(),
            name: p.name.clone(),
            bowling_style: p.bowling_style,
            batting_style: p.batting_style,
            is_star: p.is_star,
            last_updated: p.last_updated,
        })
        .collect();

    let mut matches = Vec::with_capacity(history.len());
    let mut batting_rows = Vec::new();
    let mut bowling_rows = Vec::new();
    for record in history {
        matches.push(MatchRow {
            match_id: record.id.clone(),
            date: record.date,
            team1: record.team1.clone(),
            team2: record.team2.clone(),
            team1_captain: record.team1_captain.into(),
            team2_captain: record.team2_captain.into(),
            team1_composition: record.team1_players.iter().map(|&id| id.into()).collect(),
            team2_composition: record.team2_players.iter().map(|&id| id.into()).collect(),
            winning_team: record.winning_team.clone().unwrap_or_default(),
            losing_team: record.losing_team.clone().unwrap_or_default(),
            game_start_time: clock::format_millis(record.started_at),
            game_finish_time: clock::format_millis(record.finished_at),
            winning_team_score: record.winning_team_score.clone(),
            losing_team_score: record.losing_team_score.clone(),
            result: record.result.clone(),
            overs: record.overs,
            status: completed(),
            man_of_the_match: record.man_of_the_match.map(PlayerRef::Id),
        });
        batting_rows.extend(record.batting.iter().map(|b| BattingRow {
            match_id: record.id.clone(),
            player_id: b.player_id.into(),
            player: b.player_name.clone(),
            runs: b.runs,
            balls_faced: b.balls_faced,
            strike_rate: format!("{:.2}", stats::batting_strike_rate(b.runs, b.balls_faced)),
            fours: b.fours,
            sixes: b.sixes,
            out: b.out,
            dismissal_type: b.dismissal.map(|d| d.as_str().to_string()).unwrap_or_default(),
            dismissal_text: b.dismissal_text.clone(),
            fielder: b.fielder.map(PlayerRef::Id),
            position: b.position,
        }));
        bowling_rows.extend(record.bowling.iter().map(|b| BowlingRow {
            match_id: record.id.clone(),
            player_id: b.player_id.into(),
            player: b.player_name.clone(),
            overs: b.overs_display(),
            maidens: b.maidens,
            runs: b.runs,
            wickets: b.wickets,
            economy: format!("{:.2}", stats::bowling_economy(b.runs, b.balls)),
            balls: b.balls,
        }));
    }

    ExportDocument {
        export_metadata: ExportMetadata {
            total_players: roster.len(),
            total_matches: history.len(),
            export_date: clock::format_millis(exported_at),
            export_timestamp: exported_at,
            ..ExportMetadata::default()
        },
        player_info,
        matches,
        match_batting_performance: batting_rows,
        match_bowling_performance: bowling_rows,
    }
}

pub fn export_json(roster: &Roster, history: &[MatchRecord], exported_at: i64) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export(roster, history, exported_at))?)
}

/// Dismissal kind from its scorecard name; matching ignores case and spacing
pub fn parse_dismissal(text: &str) -> Option<DismissalKind> {
    let key: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "bowled" => Some(DismissalKind::Bowled),
        "caught" => Some(DismissalKind::Caught),
        "lbw" => Some(DismissalKind::Lbw),
        "runout" => Some(DismissalKind::RunOut),
        "stumped" => Some(DismissalKind::Stumped),
        "hitwicket" => Some(DismissalKind::HitWicket),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> i64 {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Maps document player references onto roster ids
struct Resolver {
    by_ref: HashMap<String, PlayerId>,
    by_name: HashMap<String, PlayerId>,
}

impl Resolver {
    fn resolve(&self, player: &PlayerRef) -> Option<PlayerId> {
        let key = match player {
            PlayerRef::Id(id) => id.to_string(),
            PlayerRef::Text(text) => text.trim().to_string(),
        };
        self.by_ref
            .get(&key)
            .or_else(|| self.by_name.get(&key.to_ascii_lowercase()))
            .copied()
    }
}

/// Rebuild a roster and match history from a backup document.
///
/// Careers are recomputed from the imported matches. Rows that reference
/// unknown players are skipped and counted.
pub fn import(doc: &ExportDocument) -> Result<(Roster, Vec<MatchRecord>, ImportSummary)> {
    let mut roster = Roster::new();
    let mut resolver = Resolver {
        by_ref: HashMap::new(),
        by_name: HashMap::new(),
    };
    let mut summary = ImportSummary::default();

    // Players whose reference carries no usable id are numbered after the rest
    let mut unnumbered = Vec::new();
    for row in &doc.player_info {
        let name = row.name.trim();
        if name.is_empty() {
            summary.skipped_rows += 1;
            continue;
        }
        match row.player_id.id().filter(|id| *id > 0 && !roster.contains(*id)) {
            Some(id) => add_player(&mut roster, &mut resolver, id, row),
            None => unnumbered.push(row),
        }
    }
    for row in unnumbered {
        let id = roster.next_id();
        add_player(&mut roster, &mut resolver, id, row);
    }
    summary.players = roster.len();

    let mut history = Vec::with_capacity(doc.matches.len());
    for row in &doc.matches {
        if !row.status.eq_ignore_ascii_case("completed") {
            log::debug!("Skipping match {} with status {}", row.match_id, row.status);
            continue;
        }
        let (Some(team1_captain), Some(team2_captain)) = (
            resolver.resolve(&row.team1_captain),
            resolver.resolve(&row.team2_captain),
        ) else {
            log::warn!("Skipping match {}: unknown captain", row.match_id);
            summary.skipped_rows += 1;
            continue;
        };

        let mut resolve_all = |refs: &[PlayerRef]| -> Vec<PlayerId> {
            refs.iter()
                .filter_map(|r| {
                    let id = resolver.resolve(r);
                    if id.is_none() {
                        summary.skipped_rows += 1;
                    }
                    id
                })
                .collect()
        };
        let team1_players = resolve_all(&row.team1_composition);
        let team2_players = resolve_all(&row.team2_composition);

        let mut record = MatchRecord {
            id: row.match_id.clone(),
            date: row.date,
            team1: row.team1.clone(),
            team2: row.team2.clone(),
            team1_captain,
            team2_captain,
            team1_players,
            team2_players,
            winning_team: Some(row.winning_team.clone()).filter(|t| !t.is_empty()),
            losing_team: Some(row.losing_team.clone()).filter(|t| !t.is_empty()),
            winning_team_score: row.winning_team_score.clone(),
            losing_team_score: row.losing_team_score.clone(),
            result: row.result.clone(),
            overs: row.overs,
            man_of_the_match: row.man_of_the_match.as_ref().and_then(|r| resolver.resolve(r)),
            started_at: parse_timestamp(&row.game_start_time),
            finished_at: parse_timestamp(&row.game_finish_time),
            batting: Vec::new(),
            bowling: Vec::new(),
        };

        for b in doc.match_batting_performance.iter().filter(|b| b.match_id == row.match_id) {
            let Some(player_id) = resolver.resolve(&b.player_id) else {
                summary.skipped_rows += 1;
                continue;
            };
            record.batting.push(BattingPerformance {
                player_id,
                player_name: roster_name(&roster, player_id, &b.player),
                runs: b.runs,
                balls_faced: b.balls_faced,
                fours: b.fours,
                sixes: b.sixes,
                out: b.out,
                dismissal: parse_dismissal(&b.dismissal_type),
                dismissal_text: if !b.dismissal_text.is_empty() {
                    b.dismissal_text.clone()
                } else if b.out {
                    b.dismissal_type.clone()
                } else {
                    "not out".to_string()
                },
                fielder: b.fielder.as_ref().and_then(|f| resolver.resolve(f)),
                position: b.position,
            });
        }
        for b in doc.match_bowling_performance.iter().filter(|b| b.match_id == row.match_id) {
            let Some(player_id) = resolver.resolve(&b.player_id) else {
                summary.skipped_rows += 1;
                continue;
            };
            record.bowling.push(BowlingPerformance {
                player_id,
                player_name: roster_name(&roster, player_id, &b.player),
                balls: b.total_balls(),
                maidens: b.maidens,
                runs: b.runs,
                wickets: b.wickets,
            });
        }
        history.push(record);
    }
    summary.matches = history.len();

    roster.rebuild_careers(&history);
    log::info!(
        "Imported {} players and {} matches ({} rows skipped)",
        summary.players,
        summary.matches,
        summary.skipped_rows
    );
    Ok((roster, history, summary))
}

pub fn import_json(json: &str) -> Result<(Roster, Vec<MatchRecord>, ImportSummary)> {
    let doc: ExportDocument = serde_json::from_str(json)?;
    if doc.player_info.is_empty() && !doc.matches.is_empty() {
        return Err(CricketError::InvalidPlayer(
            "document has matches but no player_info".to_string(),
        ));
    }
    import(&doc)
}

fn add_player(roster: &mut Roster, resolver: &mut Resolver, id: PlayerId, row: &PlayerInfoRow) {
    let name = row.name.trim();
    let mut player = Player::new(id, name, row.batting_style, row.bowling_style, row.is_star);
    player.last_updated = row.last_updated;
    roster.insert(player);

    let original = match &row.player_id {
        PlayerRef::Id(n) => n.to_string(),
        PlayerRef::Text(text) => text.trim().to_string(),
    };
    resolver.by_ref.entry(original).or_insert(id);
    resolver.by_ref.entry(id.to_string()).or_insert(id);
    resolver.by_name.entry(name.to_ascii_lowercase()).or_insert(id);
}

fn roster_name(roster: &Roster, id: PlayerId, fallback: &str) -> String {
    roster
        .get(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_history() -> (Roster, Vec<MatchRecord>) {
        let mut roster = Roster::new();
        for (name, bat, bowl) in [
            ("Anil", BattingStyle::Reliable, BowlingStyle::Fast),
            ("Ravi", BattingStyle::SoSo, BowlingStyle::Medium),
            ("Kiran", BattingStyle::Tailend, BowlingStyle::Fast),
            ("Dev", BattingStyle::Reliable, BowlingStyle::Dnb),
        ] {
            roster.add_player(name, bat, bowl, false).unwrap();
        }
        let record = MatchRecord {
            id: "M1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            team1: "Anil's Team".to_string(),
            team2: "Ravi's Team".to_string(),
            team1_captain: 1,
            team2_captain: 2,
            team1_players: vec![1, 3],
            team2_players: vec![2, 4],
            winning_team: Some("Anil's Team".to_string()),
            losing_team: Some("Ravi's Team".to_string()),
            winning_team_score: "30/1".to_string(),
            losing_team_score: "22/2".to_string(),
            result: "Anil's Team won by 8 runs".to_string(),
            overs: 2,
            man_of_the_match: Some(1),
            started_at: 1_755_266_400_000,
            finished_at: 1_755_268_200_000,
            batting: vec![
                BattingPerformance {
                    player_id: 1,
                    player_name: "Anil".to_string(),
                    runs: 24,
                    balls_faced: 10,
                    fours: 3,
                    sixes: 1,
                    out: false,
                    dismissal: None,
                    dismissal_text: "not out".to_string(),
                    fielder: None,
                    position: 1,
                },
                BattingPerformance {
                    player_id: 2,
                    player_name: "Ravi".to_string(),
                    runs: 5,
                    balls_faced: 6,
                    fours: 0,
                    sixes: 0,
                    out: true,
                    dismissal: Some(DismissalKind::Caught),
                    dismissal_text: "c Anil b Kiran".to_string(),
                    fielder: Some(1),
                    position: 1,
                },
            ],
            bowling: vec![BowlingPerformance {
                player_id: 3,
                player_name: "Kiran".to_string(),
                balls: 8,
                maidens: 0,
                runs: 12,
                wickets: 1,
            }],
        };
        let mut roster = roster;
        roster.apply_match(&record);
        (roster, vec![record])
    }

    #[test]
    fn test_player_ref_accepts_legacy_codes() {
        assert_eq!(PlayerRef::Id(7).id(), Some(7));
        assert_eq!(PlayerRef::Text("P001".to_string()).id(), Some(1));
        assert_eq!(PlayerRef::Text("12".to_string()).id(), Some(12));
        assert_eq!(PlayerRef::Text("Anil".to_string()).id(), None);

        let row: PlayerInfoRow = serde_json::from_str(
            r#"{"Player_ID":"P014","Name":"Anil","Bowling_Style":"Fast","Batting_Style":"R","Is_Star":1}"#,
        )
        .unwrap();
        assert_eq!(row.player_id.id(), Some(14));
        assert_eq!(row.batting_style, BattingStyle::Reliable);
        assert!(row.is_star);
    }

    #[test]
    fn test_export_uses_capitalized_fields() {
        let (roster, history) = sample_history();
        let json = export_json(&roster, &history, 1_755_270_000_000).unwrap();
        for field in [
            "\"player_info\"",
            "\"Player_ID\"",
            "\"Match_ID\"",
            "\"Team1_Composition\"",
            "\"Winning_Team_Score\"",
            "\"Balls_Faced\"",
            "\"export_metadata\"",
            "\"data_format_version\": \"2.0\"",
        ] {
            assert!(json.contains(field), "missing {}", field);
        }

        let doc = export(&roster, &history, 0);
        assert_eq!(doc.match_bowling_performance[0].overs, "1.2");
        assert_eq!(doc.match_bowling_performance[0].economy, "9.00");
        assert_eq!(doc.match_batting_performance[1].dismissal_type, "Caught");
        assert_eq!(doc.export_metadata.total_players, 4);
    }

    #[test]
    fn test_import_restores_history_and_careers() {
        let (roster, history) = sample_history();
        let json = export_json(&roster, &history, 0).unwrap();
        let (imported, matches, summary) = import_json(&json).unwrap();

        assert_eq!(summary.players, 4);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.skipped_rows, 0);
        assert_eq!(matches, history);
        assert_eq!(imported.get(1).unwrap().career, roster.get(1).unwrap().career);
        assert_eq!(imported.get(3).unwrap().career.wickets, 1);
    }

    #[test]
    fn test_import_legacy_document() {
        let json = r#"{
            "player_info": [
                {"Player_ID": "P001", "Name": "Anil", "Bowling_Style": "Fast", "Batting_Style": "R"},
                {"Player_ID": "P002", "Name": "Ravi", "Bowling_Style": "DNB", "Batting_Style": "S"},
                {"Player_ID": "X", "Name": "Kiran", "Bowling_Style": "Medium", "Batting_Style": "U"}
            ],
            "matches": [{
                "Match_ID": 17, "Date": "2024-05-01", "Team1": "A", "Team2": "B",
                "Team1_Captain": "Anil", "Team2_Captain": "P002",
                "Team1_Composition": ["P001", "Kiran"], "Team2_Composition": ["P002", "P099"],
                "Winning_Team": "A", "Losing_Team": "B",
                "Winning_Team_Score": "40/2", "Losing_Team_Score": "38/4",
                "Result": "A won by 2 runs", "Overs": 5
            }],
            "match_batting_performance": [
                {"Match_ID": "17", "Player_ID": "P001", "Player": "Anil", "Runs": 20,
                 "Balls_Faced": 12, "Strike_Rate": "166.67", "Fours": 2, "Sixes": 1,
                 "Out": true, "Dismissal_Type": "run out", "Position": 1}
            ],
            "match_bowling_performance": [
                {"Match_ID": "17", "Player_ID": "P002", "Player": "Ravi", "Overs": "2.3",
                 "Maidens": 0, "Runs": 14, "Wickets": 1, "Economy": "5.60"}
            ]
        }"#;
        let (roster, matches, summary) = import_json(json).unwrap();

        assert_eq!(summary.players, 3);
        // Kiran had no usable id and was numbered after the others
        assert_eq!(roster.find_by_name("Kiran").unwrap().id, 3);
        // P099 is not a known player
        assert_eq!(summary.skipped_rows, 1);

        let record = &matches[0];
        assert_eq!(record.id, "17");
        assert_eq!(record.team1_captain, 1);
        assert_eq!(record.team1_players, vec![1, 3]);
        assert_eq!(record.team2_players, vec![2]);
        assert_eq!(record.batting[0].dismissal, Some(DismissalKind::RunOut));
        assert_eq!(record.bowling[0].balls, 15);
        assert_eq!(roster.get(1).unwrap().career.runs, 20);
    }

    #[test]
    fn test_import_rejects_matches_without_players() {
        let json = r#"{"matches": [{"Match_ID": "1", "Date": "2024-05-01", "Team1": "A",
            "Team2": "B", "Team1_Captain": 1, "Team2_Captain": 2}]}"#;
        assert!(import_json(json).is_err());
        assert!(import_json("{not json").is_err());
    }

    #[test]
    fn test_parse_dismissal_names() {
        assert_eq!(parse_dismissal("Hit Wicket"), Some(DismissalKind::HitWicket));
        assert_eq!(parse_dismissal("LBW"), Some(DismissalKind::Lbw));
        assert_eq!(parse_dismissal("run-out"), Some(DismissalKind::RunOut));
        assert_eq!(parse_dismissal("retired"), None);
    }
}
