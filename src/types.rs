use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Stable player identifier, assigned by the roster and never reused
pub type PlayerId = u32;

/// Batting category used for skill estimation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattingStyle {
    #[serde(alias = "R")]
    Reliable,
    #[serde(rename = "So-So", alias = "S")]
    SoSo,
    #[serde(alias = "U")]
    Tailend,
    #[serde(other)]
    Unknown,
}

impl BattingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattingStyle::Reliable => "Reliable",
            BattingStyle::SoSo => "So-So",
            BattingStyle::Tailend => "Tailend",
            BattingStyle::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BattingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bowling category used for skill estimation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BowlingStyle {
    Fast,
    Medium,
    /// Does not bowl
    #[serde(rename = "DNB")]
    Dnb,
    #[serde(other)]
    Unknown,
}

impl BowlingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BowlingStyle::Fast => "Fast",
            BowlingStyle::Medium => "Medium",
            BowlingStyle::Dnb => "DNB",
            BowlingStyle::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BowlingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role derived from a player's batting/bowling categories
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerRole {
    Batsman,
    Bowler,
    Allrounder,
}

/// Bowling figures for a single innings, e.g. 3/24
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlingFigure {
    pub wickets: u32,
    pub runs: u32,
}

impl BowlingFigure {
    /// More wickets is better; at equal wickets, fewer runs is better
    pub fn is_better_than(&self, other: &BowlingFigure) -> bool {
        match self.wickets.cmp(&other.wickets) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.runs < other.runs,
        }
    }
}

impl fmt::Display for BowlingFigure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.wickets, self.runs)
    }
}

/// Cumulative career statistics. Only grows, and only at match completion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerStats {
    pub matches: u32,
    pub innings: u32,
    pub not_outs: u32,
    pub runs: u32,
    pub balls_faced: u32,
    pub highest_score: u32,
    pub fours: u32,
    pub sixes: u32,
    pub centuries: u32,
    pub half_centuries: u32,
    pub ducks: u32,

    pub bowling_innings: u32,
    pub wickets: u32,
    pub balls_bowled: u32,
    pub runs_conceded: u32,
    pub maidens: u32,
    pub best_bowling: Option<BowlingFigure>,
    pub four_wicket_hauls: u32,
    pub five_wicket_hauls: u32,

    pub catches: u32,
    pub run_outs: u32,
    pub stumpings: u32,
}

impl CareerStats {
    /// Completed innings in which the batter was dismissed
    pub fn dismissals(&self) -> u32 {
        self.innings.saturating_sub(self.not_outs)
    }

    /// Fielding dismissals of any kind
    pub fn fielding_dismissals(&self) -> u32 {
        self.catches + self.run_outs + self.stumpings
    }
}

/// A player in the group's roster
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub batting_style: BattingStyle,
    pub bowling_style: BowlingStyle,
    #[serde(default)]
    pub is_star: bool,
    #[serde(default)]
    pub career: CareerStats,
    #[serde(default)]
    pub last_updated: Option<NaiveDate>,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: &str,
        batting_style: BattingStyle,
        bowling_style: BowlingStyle,
        is_star: bool,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            batting_style,
            bowling_style,
            is_star,
            career: CareerStats::default(),
            last_updated: None,
        }
    }
}

/// One side of a match. Holds player ids; the roster owns the players.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub captain: PlayerId,
    pub players: Vec<PlayerId>,
    /// Sum of the scores used when the team was generated
    #[serde(default)]
    pub strength: i32,
}

impl Team {
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.contains(&player_id)
    }

    pub fn size(&self) -> usize {
        self.players.len()
    }
}

/// Which of the two teams in a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    One,
    Two,
}

impl TeamSide {
    pub fn other(self) -> TeamSide {
        match self {
            TeamSide::One => TeamSide::Two,
            TeamSide::Two => TeamSide::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            TeamSide::One => 1,
            TeamSide::Two => 2,
        }
    }
}

/// Extras that can be attached to a delivery
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrasKind {
    Wide,
    NoBall,
    Bye,
    LegBye,
}

impl ExtrasKind {
    /// Wides and no-balls are not one of the six legal balls of an over
    pub fn is_legal(&self) -> bool {
        matches!(self, ExtrasKind::Bye | ExtrasKind::LegBye)
    }

    pub fn short_code(&self) -> &'static str {
        match self {
            ExtrasKind::Wide => "Wd",
            ExtrasKind::NoBall => "Nb",
            ExtrasKind::Bye => "B",
            ExtrasKind::LegBye => "Lb",
        }
    }
}

/// How a batter was dismissed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DismissalKind {
    Bowled,
    Caught,
    #[serde(rename = "LBW", alias = "Lbw")]
    Lbw,
    #[serde(rename = "Run Out", alias = "RunOut")]
    RunOut,
    Stumped,
    #[serde(rename = "Hit Wicket", alias = "HitWicket")]
    HitWicket,
}

impl DismissalKind {
    /// Run outs are not credited to the bowler
    pub fn credits_bowler(&self) -> bool {
        !matches!(self, DismissalKind::RunOut)
    }

    pub fn needs_fielder(&self) -> bool {
        matches!(
            self,
            DismissalKind::Caught | DismissalKind::RunOut | DismissalKind::Stumped
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DismissalKind::Bowled => "Bowled",
            DismissalKind::Caught => "Caught",
            DismissalKind::Lbw => "LBW",
            DismissalKind::RunOut => "Run Out",
            DismissalKind::Stumped => "Stumped",
            DismissalKind::HitWicket => "Hit Wicket",
        }
    }
}

/// Rules applied while scoring a match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    /// Penalty run awarded for a wide
    pub wide_penalty: u32,
    /// Penalty run awarded for a no-ball
    pub no_ball_penalty: u32,
    /// Let the last remaining batter continue alone once all partners are out
    pub last_man_standing: bool,
    /// Overs used when a match is started without an explicit format
    pub default_overs: u32,
    /// Maximum number of deliveries that can be undone
    pub undo_depth: usize,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            wide_penalty: 1,
            no_ball_penalty: 1,
            last_man_standing: false,
            default_overs: 20,
            undo_depth: 120,
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scoring: ScoringRules,
    /// Minimum selected players (captains included) to generate teams
    pub min_players_for_teams: usize,
    /// History entries a player needs before the stats-aware balancer kicks in
    pub stats_history_threshold: usize,
    /// Number of recent matches considered by the form index
    pub form_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringRules::default(),
            min_players_for_teams: 4,
            stats_history_threshold: 2,
            form_window: 5,
        }
    }
}

/// A batter's line in a completed match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattingPerformance {
    pub player_id: PlayerId,
    pub player_name: String,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub out: bool,
    #[serde(default)]
    pub dismissal: Option<DismissalKind>,
    /// Scorecard text, e.g. "c Ravi b Anil"
    #[serde(default)]
    pub dismissal_text: String,
    /// Fielder credited with the dismissal (catch, run out, stumping)
    #[serde(default)]
    pub fielder: Option<PlayerId>,
    /// Batting position, 1-based
    pub position: u32,
}

/// A bowler's line in a completed match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BowlingPerformance {
    pub player_id: PlayerId,
    pub player_name: String,
    pub balls: u32,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
}

impl BowlingPerformance {
    /// Overs in cricket notation, e.g. "3.4"
    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.balls / 6, self.balls % 6)
    }
}

/// A completed match as kept in the group's history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub date: NaiveDate,
    pub team1: String,
    pub team2: String,
    pub team1_captain: PlayerId,
    pub team2_captain: PlayerId,
    pub team1_players: Vec<PlayerId>,
    pub team2_players: Vec<PlayerId>,
    #[serde(default)]
    pub winning_team: Option<String>,
    #[serde(default)]
    pub losing_team: Option<String>,
    /// "runs/wickets"
    pub winning_team_score: String,
    pub losing_team_score: String,
    pub result: String,
    pub overs: u32,
    #[serde(default)]
    pub man_of_the_match: Option<PlayerId>,
    #[serde(default)]
    pub started_at: i64,
    #[serde(default)]
    pub finished_at: i64,
    #[serde(default)]
    pub batting: Vec<BattingPerformance>,
    #[serde(default)]
    pub bowling: Vec<BowlingPerformance>,
}

impl MatchRecord {
    /// Whether the player took part in this match on either side
    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.team1_players.contains(&player_id) || self.team2_players.contains(&player_id)
    }

    pub fn batting_for(&self, player_id: PlayerId) -> Option<&BattingPerformance> {
        self.batting.iter().find(|b| b.player_id == player_id)
    }

    pub fn bowling_for(&self, player_id: PlayerId) -> Option<&BowlingPerformance> {
        self.bowling.iter().find(|b| b.player_id == player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parsing_accepts_legacy_codes() {
        let reliable: BattingStyle = serde_json::from_str("\"R\"").unwrap();
        let so_so: BattingStyle = serde_json::from_str("\"So-So\"").unwrap();
        let tailend: BattingStyle = serde_json::from_str("\"U\"").unwrap();
        assert_eq!(reliable, BattingStyle::Reliable);
        assert_eq!(so_so, BattingStyle::SoSo);
        assert_eq!(tailend, BattingStyle::Tailend);

        let dnb: BowlingStyle = serde_json::from_str("\"DNB\"").unwrap();
        assert_eq!(dnb, BowlingStyle::Dnb);
        assert_eq!(serde_json::to_string(&BattingStyle::SoSo).unwrap(), "\"So-So\"");
    }

    #[test]
    fn test_unknown_style_parses_as_unknown() {
        let batting: BattingStyle = serde_json::from_str("\"Slogger\"").unwrap();
        let bowling: BowlingStyle = serde_json::from_str("\"Spin\"").unwrap();
        assert_eq!(batting, BattingStyle::Unknown);
        assert_eq!(bowling, BowlingStyle::Unknown);
    }

    #[test]
    fn test_best_bowling_comparison() {
        let three_for_20 = BowlingFigure { wickets: 3, runs: 20 };
        let three_for_25 = BowlingFigure { wickets: 3, runs: 25 };
        let two_for_5 = BowlingFigure { wickets: 2, runs: 5 };

        assert!(three_for_20.is_better_than(&three_for_25));
        assert!(three_for_25.is_better_than(&two_for_5));
        assert!(!two_for_5.is_better_than(&three_for_20));
        assert_eq!(three_for_20.to_string(), "3/20");
    }

    #[test]
    fn test_player_deserializes_without_career() {
        let json = r#"{"id":7,"name":"Kiran","batting_style":"Tailend","bowling_style":"DNB"}"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert_eq!(player.id, 7);
        assert!(!player.is_star);
        assert_eq!(player.career, CareerStats::default());
    }

    #[test]
    fn test_extras_legality() {
        assert!(!ExtrasKind::Wide.is_legal());
        assert!(!ExtrasKind::NoBall.is_legal());
        assert!(ExtrasKind::Bye.is_legal());
        assert!(ExtrasKind::LegBye.is_legal());
    }

    #[test]
    fn test_run_out_does_not_credit_bowler() {
        assert!(!DismissalKind::RunOut.credits_bowler());
        assert!(DismissalKind::Caught.credits_bowler());
        assert!(DismissalKind::Stumped.needs_fielder());
        assert!(!DismissalKind::Bowled.needs_fielder());
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: AppConfig = serde_json::from_str(r#"{"form_window": 3}"#).unwrap();
        assert_eq!(config.form_window, 3);
        assert_eq!(config.min_players_for_teams, 4);
        assert_eq!(config.scoring.wide_penalty, 1);
        assert!(!config.scoring.last_man_standing);
    }
}
