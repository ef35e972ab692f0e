//! Live ball-by-ball scoring.
//!
//! `MatchState` is the whole state of a match in progress. Every mutating
//! method checks all of its preconditions before touching anything, so a
//! rejected call leaves the state exactly as it was.
//!
//! Batters and bowlers are always chosen explicitly. When a wicket falls the
//! crease slot is left empty until the next batter is selected, and when an
//! over completes no further ball is accepted until a different bowler is
//! selected.

use crate::clock;
use crate::error::{CricketError, Result};
use crate::stats::{self, MatchContribution};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Most runs a single delivery can add for the batters, boundary overthrows included
const MAX_RUNS_PER_BALL: u32 = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Which end a dismissed batter was at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatterEnd {
    #[default]
    Striker,
    NonStriker,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dismissal {
    pub kind: DismissalKind,
    #[serde(default)]
    pub batter: BatterEnd,
    #[serde(default)]
    pub fielder: Option<PlayerId>,
}

impl Dismissal {
    pub fn new(kind: DismissalKind) -> Self {
        Self {
            kind,
            batter: BatterEnd::Striker,
            fielder: None,
        }
    }

    pub fn by(mut self, fielder: PlayerId) -> Self {
        self.fielder = Some(fielder);
        self
    }

    pub fn at(mut self, batter: BatterEnd) -> Self {
        self.batter = batter;
        self
    }
}

/// One ball's outcome as reported by the scorer. `runs` are the runs the
/// batters ran or hit; wide and no-ball penalties are added by the rules.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(default)]
    pub runs: u32,
    #[serde(default)]
    pub extras: Option<ExtrasKind>,
    #[serde(default)]
    pub wicket: Option<Dismissal>,
}

impl Delivery {
    pub fn runs(runs: u32) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    pub fn extra(kind: ExtrasKind, runs: u32) -> Self {
        Self {
            runs,
            extras: Some(kind),
            wicket: None,
        }
    }

    pub fn wicket(kind: DismissalKind) -> Self {
        Self {
            wicket: Some(Dismissal::new(kind)),
            ..Self::default()
        }
    }

    pub fn with_wicket(mut self, dismissal: Dismissal) -> Self {
        self.wicket = Some(dismissal);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum BatterStatus {
    #[default]
    NotOut,
    Out {
        kind: DismissalKind,
        bowler: Option<PlayerId>,
        fielder: Option<PlayerId>,
    },
    Retired,
}

impl BatterStatus {
    pub fn is_out(&self) -> bool {
        matches!(self, BatterStatus::Out { .. })
    }
}

/// A batter's figures for the current match
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattingFigures {
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub status: BatterStatus,
}

/// A bowler's figures for the current match
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BowlingFigures {
    pub balls: u32,
    pub runs: u32,
    pub wickets: u32,
    pub maidens: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extras {
    pub byes: u32,
    pub leg_byes: u32,
    pub wides: u32,
    pub no_balls: u32,
}

impl Extras {
    pub fn total(&self) -> u32 {
        self.byes + self.leg_byes + self.wides + self.no_balls
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallOfWicket {
    pub wicket_number: u32,
    pub runs: u32,
    pub batsman: PlayerId,
    pub batsman_name: String,
    /// Cricket notation, e.g. "3.2"
    pub over: String,
}

/// One side's innings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamScore {
    pub runs: u32,
    pub wickets: u32,
    pub overs: u32,
    /// Legal balls in the current over, 0..=5 between operations
    pub balls: u32,
    pub striker: Option<PlayerId>,
    pub non_striker: Option<PlayerId>,
    pub extras: Extras,
    pub fall_of_wickets: Vec<FallOfWicket>,
    /// Team runs per completed over
    pub over_by_over: Vec<u32>,
    /// Team runs in the over in progress
    pub over_runs: u32,
    /// Runs charged to the bowler in the over in progress
    pub over_conceded: u32,
    pub batting: BTreeMap<PlayerId, BattingFigures>,
    pub bowling: BTreeMap<PlayerId, BowlingFigures>,
    pub batting_order: Vec<PlayerId>,
    pub bowling_order: Vec<PlayerId>,
}

impl TeamScore {
    pub fn total_balls(&self) -> u32 {
        self.overs * 6 + self.balls
    }

    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.overs, self.balls)
    }

    pub fn summary(&self) -> String {
        format!("{}/{}", self.runs, self.wickets)
    }

    pub fn is_out(&self, player_id: PlayerId) -> bool {
        self.batting
            .get(&player_id)
            .map(|f| f.status.is_out())
            .unwrap_or(false)
    }

    /// (runs, legal balls) per over, the over in progress included
    pub fn over_rates(&self) -> Vec<(u32, u32)> {
        let mut overs: Vec<(u32, u32)> = self.over_by_over.iter().map(|&r| (r, 6)).collect();
        if self.balls > 0 || self.over_runs > 0 {
            overs.push((self.over_runs, self.balls));
        }
        overs
    }

    fn swap_ends(&mut self) {
        std::mem::swap(&mut self.striker, &mut self.non_striker);
    }
}

/// Append-only log entry for one delivery
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub innings: u8,
    /// Completed overs when the ball was bowled
    pub over: u32,
    /// Legal ball number within the over
    pub ball: u32,
    /// Runs added to the team total
    pub runs: u32,
    pub batsman: PlayerId,
    pub bowler: PlayerId,
    pub team: TeamSide,
    pub is_wicket: bool,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_extra: bool,
    pub extras_kind: Option<ExtrasKind>,
    pub dismissal: Option<DismissalKind>,
    pub dismissed: Option<PlayerId>,
    pub timestamp: i64,
}

impl DeliveryRecord {
    /// Short display form: "4", "W", "1Wd", "2Lb"
    pub fn display(&self) -> String {
        if self.is_wicket {
            return "W".to_string();
        }
        match self.extras_kind {
            Some(kind) => format!("{}{}", self.runs, kind.short_code()),
            None => self.runs.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Margin {
    Runs(u32),
    Wickets { wickets: u32, balls_remaining: u32 },
    Tie,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: Option<TeamSide>,
    pub margin: Margin,
    pub text: String,
}

/// State restored by `undo`
#[derive(Clone, Debug)]
struct Checkpoint {
    current_team: TeamSide,
    current_innings: u8,
    team1_score: TeamScore,
    team2_score: TeamScore,
    bowler: Option<PlayerId>,
    target: Option<u32>,
    status: MatchStatus,
    awaiting_bowler_change: bool,
    last_over_bowler: Option<PlayerId>,
    result: Option<MatchOutcome>,
    man_of_the_match: Option<PlayerId>,
    log_len: usize,
}

/// Scorecard line for a batter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattingLine {
    pub player_id: PlayerId,
    pub name: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: f64,
    pub status: String,
}

/// Scorecard line for a bowler
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BowlingLine {
    pub player_id: PlayerId,
    pub name: String,
    pub overs: String,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
    pub economy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub team: String,
    pub total: String,
    pub overs: String,
    pub extras: Extras,
    pub batting: Vec<BattingLine>,
    /// Bowlers of the opposing side
    pub bowling: Vec<BowlingLine>,
    pub fall_of_wickets: Vec<FallOfWicket>,
}

/// A match in progress
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchState {
    pub id: String,
    pub team1: Team,
    pub team2: Team,
    /// The batting side. Nothing else records who is batting.
    pub current_team: TeamSide,
    pub current_innings: u8,
    #[serde(default)]
    pub team1_score: TeamScore,
    #[serde(default)]
    pub team2_score: TeamScore,
    #[serde(default)]
    pub bowler: Option<PlayerId>,
    pub total_overs: u32,
    #[serde(default)]
    pub target: Option<u32>,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub awaiting_bowler_change: bool,
    #[serde(default)]
    pub last_over_bowler: Option<PlayerId>,
    #[serde(default)]
    pub ball_by_ball: Vec<DeliveryRecord>,
    #[serde(default)]
    pub result: Option<MatchOutcome>,
    #[serde(default)]
    pub man_of_the_match: Option<PlayerId>,
    #[serde(default)]
    pub rules: ScoringRules,
    /// Display names captured at match start
    #[serde(default)]
    pub names: BTreeMap<PlayerId, String>,
    #[serde(default)]
    pub started_at: i64,
    #[serde(skip)]
    undo_stack: VecDeque<Checkpoint>,
}

impl MatchState {
    /// Start innings 1 with team one batting and nobody selected
    pub fn start(
        id: &str,
        team1: Team,
        team2: Team,
        total_overs: u32,
        rules: ScoringRules,
        names: BTreeMap<PlayerId, String>,
    ) -> Result<Self> {
        for team in [&team1, &team2] {
            if team.players.is_empty() {
                return Err(CricketError::InvalidTeam(format!("{} has no players", team.name)));
            }
            let mut ids = team.players.clone();
            ids.sort_unstable();
            ids.dedup();
            if ids.len() != team.players.len() {
                return Err(CricketError::InvalidTeam(format!(
                    "{} lists a player twice",
                    team.name
                )));
            }
        }
        if let Some(shared) = team1.players.iter().find(|id| team2.contains(**id)) {
            return Err(CricketError::InvalidTeam(format!(
                "player {} is on both teams",
                shared
            )));
        }
        if total_overs == 0 {
            return Err(CricketError::Config("a match needs at least one over".to_string()));
        }

        log::info!(
            "Match {} started: {} vs {}, {} overs",
            id,
            team1.name,
            team2.name,
            total_overs
        );

        Ok(Self {
            id: id.to_string(),
            team1,
            team2,
            current_team: TeamSide::One,
            current_innings: 1,
            team1_score: TeamScore::default(),
            team2_score: TeamScore::default(),
            bowler: None,
            total_overs,
            target: None,
            status: MatchStatus::InProgress,
            awaiting_bowler_change: false,
            last_over_bowler: None,
            ball_by_ball: Vec::new(),
            result: None,
            man_of_the_match: None,
            rules,
            names,
            started_at: clock::now_millis(),
            undo_stack: VecDeque::new(),
        })
    }

    pub fn team(&self, side: TeamSide) -> &Team {
        match side {
            TeamSide::One => &self.team1,
            TeamSide::Two => &self.team2,
        }
    }

    pub fn score(&self, side: TeamSide) -> &TeamScore {
        match side {
            TeamSide::One => &self.team1_score,
            TeamSide::Two => &self.team2_score,
        }
    }

    fn score_mut(&mut self, side: TeamSide) -> &mut TeamScore {
        match side {
            TeamSide::One => &mut self.team1_score,
            TeamSide::Two => &mut self.team2_score,
        }
    }

    pub fn batting_side(&self) -> TeamSide {
        self.current_team
    }

    pub fn fielding_side(&self) -> TeamSide {
        self.current_team.other()
    }

    pub fn batting_team(&self) -> &Team {
        self.team(self.batting_side())
    }

    pub fn fielding_team(&self) -> &Team {
        self.team(self.fielding_side())
    }

    pub fn batting_score(&self) -> &TeamScore {
        self.score(self.batting_side())
    }

    fn batting_score_mut(&mut self) -> &mut TeamScore {
        self.score_mut(self.batting_side())
    }

    /// Display name; ids are authoritative, names are cosmetic
    pub fn name(&self, player_id: PlayerId) -> String {
        self.names
            .get(&player_id)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", player_id))
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == MatchStatus::InProgress
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// The last batter carries on alone once every partner is out
    pub fn lone_batter(&self) -> bool {
        self.rules.last_man_standing
            && self.batting_score().wickets + 1 >= self.batting_team().size() as u32
    }

    fn wickets_to_end_innings(&self) -> u32 {
        let size = self.batting_team().size() as u32;
        if self.rules.last_man_standing {
            size
        } else {
            size.saturating_sub(1)
        }
    }

    fn require_in_progress(&self) -> Result<()> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(CricketError::MatchNotInProgress)
        }
    }

    fn check_batter(&self, player_id: PlayerId) -> Result<()> {
        let team = self.batting_team();
        if !team.contains(player_id) {
            return Err(CricketError::PlayerNotInTeam {
                player: player_id,
                team: team.name.clone(),
            });
        }
        if self.batting_score().is_out(player_id) {
            return Err(CricketError::BatsmanUnavailable(player_id));
        }
        Ok(())
    }

    fn take_guard(&mut self, player_id: PlayerId) {
        let score = self.batting_score_mut();
        let figures = score.batting.entry(player_id).or_default();
        if figures.status == BatterStatus::Retired {
            figures.status = BatterStatus::NotOut;
        }
        if !score.batting_order.contains(&player_id) {
            score.batting_order.push(player_id);
        }
    }

    pub fn select_striker(&mut self, player_id: PlayerId) -> Result<()> {
        self.require_in_progress()?;
        self.check_batter(player_id)?;
        let lone = self.lone_batter();
        if self.batting_score().non_striker == Some(player_id) && !lone {
            return Err(CricketError::BatsmanUnavailable(player_id));
        }

        self.take_guard(player_id);
        let score = self.batting_score_mut();
        if score.non_striker == Some(player_id) {
            score.non_striker = None;
        }
        score.striker = Some(player_id);
        Ok(())
    }

    pub fn select_non_striker(&mut self, player_id: PlayerId) -> Result<()> {
        self.require_in_progress()?;
        self.check_batter(player_id)?;
        if self.batting_score().striker == Some(player_id) {
            return Err(CricketError::BatsmanUnavailable(player_id));
        }

        self.take_guard(player_id);
        self.batting_score_mut().non_striker = Some(player_id);
        Ok(())
    }

    /// Choose the bowler. Allowed before the first ball of an innings, to fill
    /// an empty slot, or to resolve a completed over with someone new.
    pub fn select_bowler(&mut self, player_id: PlayerId) -> Result<()> {
        self.require_in_progress()?;
        let team = self.fielding_team();
        if !team.contains(player_id) {
            return Err(CricketError::PlayerNotInTeam {
                player: player_id,
                team: team.name.clone(),
            });
        }

        if self.awaiting_bowler_change {
            if self.last_over_bowler == Some(player_id) {
                return Err(CricketError::ConsecutiveOvers(player_id));
            }
        } else if let Some(current) = self.bowler {
            let innings_started = self.batting_score().total_balls() > 0
                || self
                    .ball_by_ball
                    .iter()
                    .any(|d| d.innings == self.current_innings);
            if current != player_id && innings_started {
                return Err(CricketError::MidOverBowlerChange);
            }
        }

        self.awaiting_bowler_change = false;
        self.bowler = Some(player_id);
        Ok(())
    }

    fn validate_delivery(&self, delivery: &Delivery) -> Result<()> {
        self.require_in_progress()?;
        if self.awaiting_bowler_change {
            return Err(CricketError::BowlerChangeRequired);
        }
        let score = self.batting_score();
        let lone = self.lone_batter();
        if score.striker.is_none() || (score.non_striker.is_none() && !lone) {
            return Err(CricketError::BatsmanNotSelected);
        }
        if self.bowler.is_none() {
            return Err(CricketError::BowlerNotSelected);
        }
        if delivery.runs > MAX_RUNS_PER_BALL {
            return Err(CricketError::InvalidDelivery(format!(
                "{} runs off one ball",
                delivery.runs
            )));
        }

        if let Some(dismissal) = &delivery.wicket {
            let allowed = match delivery.extras {
                Some(ExtrasKind::Wide) => matches!(
                    dismissal.kind,
                    DismissalKind::RunOut | DismissalKind::Stumped | DismissalKind::HitWicket
                ),
                Some(ExtrasKind::NoBall) => dismissal.kind == DismissalKind::RunOut,
                _ => true,
            };
            if !allowed {
                return Err(CricketError::InvalidDelivery(format!(
                    "{} is not possible off this delivery",
                    dismissal.kind.as_str()
                )));
            }
            if dismissal.batter == BatterEnd::NonStriker {
                if dismissal.kind != DismissalKind::RunOut {
                    return Err(CricketError::InvalidDelivery(
                        "only a run out can dismiss the non-striker".to_string(),
                    ));
                }
                if score.non_striker.is_none() {
                    return Err(CricketError::BatsmanNotSelected);
                }
            }
            if let Some(fielder) = dismissal.fielder {
                let team = self.fielding_team();
                if !team.contains(fielder) {
                    return Err(CricketError::PlayerNotInTeam {
                        player: fielder,
                        team: team.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current_team: self.current_team,
            current_innings: self.current_innings,
            team1_score: self.team1_score.clone(),
            team2_score: self.team2_score.clone(),
            bowler: self.bowler,
            target: self.target,
            status: self.status,
            awaiting_bowler_change: self.awaiting_bowler_change,
            last_over_bowler: self.last_over_bowler,
            result: self.result.clone(),
            man_of_the_match: self.man_of_the_match,
            log_len: self.ball_by_ball.len(),
        }
    }

    fn push_checkpoint(&mut self) {
        if self.rules.undo_depth == 0 {
            return;
        }
        while self.undo_stack.len() >= self.rules.undo_depth {
            self.undo_stack.pop_front();
        }
        let checkpoint = self.checkpoint();
        self.undo_stack.push_back(checkpoint);
    }

    /// Score one ball
    pub fn record_delivery(&mut self, delivery: Delivery) -> Result<()> {
        self.validate_delivery(&delivery)?;

        let (Some(striker), Some(bowler)) = (self.batting_score().striker, self.bowler) else {
            return Err(CricketError::BatsmanNotSelected);
        };
        self.push_checkpoint();

        let run = delivery.runs;
        let (team_runs, batter_runs, faced, conceded, legal) = match delivery.extras {
            None => (run, run, true, run, true),
            Some(ExtrasKind::Wide) => {
                let total = self.rules.wide_penalty + run;
                (total, 0, false, total, false)
            }
            Some(ExtrasKind::NoBall) => {
                let total = self.rules.no_ball_penalty + run;
                (total, run, true, total, false)
            }
            Some(ExtrasKind::Bye) | Some(ExtrasKind::LegBye) => (run, 0, true, 0, true),
        };
        let lone = self.lone_batter();
        let side = self.batting_side();
        let innings = self.current_innings;
        let wide_penalty = self.rules.wide_penalty;
        let no_ball_penalty = self.rules.no_ball_penalty;

        let score = self.score_mut(side);
        score.runs += team_runs;
        score.over_runs += team_runs;
        score.over_conceded += conceded;
        match delivery.extras {
            Some(ExtrasKind::Wide) => score.extras.wides += wide_penalty + run,
            Some(ExtrasKind::NoBall) => score.extras.no_balls += no_ball_penalty,
            Some(ExtrasKind::Bye) => score.extras.byes += run,
            Some(ExtrasKind::LegBye) => score.extras.leg_byes += run,
            None => {}
        }

        let over = score.overs;
        if legal {
            score.balls += 1;
        }
        let ball = score.balls;

        let batter = score.batting.entry(striker).or_default();
        if faced {
            batter.balls += 1;
        }
        batter.runs += batter_runs;
        if delivery.extras.is_none() || delivery.extras == Some(ExtrasKind::NoBall) {
            match batter_runs {
                4 => batter.fours += 1,
                6 => batter.sixes += 1,
                _ => {}
            }
        }

        // Bowling figures sit with the batting side's innings
        if !score.bowling_order.contains(&bowler) {
            score.bowling_order.push(bowler);
        }
        let figures = score.bowling.entry(bowler).or_default();
        figures.runs += conceded;
        if legal {
            figures.balls += 1;
        }

        // Resolve the victim before the batters cross
        let victim = delivery.wicket.as_ref().map(|d| match d.batter {
            BatterEnd::Striker => striker,
            BatterEnd::NonStriker => score.non_striker.unwrap_or(striker),
        });

        // Only runs credited to the striker rotate strike
        if batter_runs % 2 == 1 && !lone {
            score.swap_ends();
        }

        let mut dismissed = None;
        if let (Some(dismissal), Some(victim)) = (&delivery.wicket, victim) {
            score.wickets += 1;
            let fielder = if dismissal.kind.needs_fielder() {
                dismissal.fielder
            } else {
                None
            };
            score.batting.entry(victim).or_default().status = BatterStatus::Out {
                kind: dismissal.kind,
                bowler: Some(bowler),
                fielder,
            };
            if dismissal.kind.credits_bowler() {
                score.bowling.entry(bowler).or_default().wickets += 1;
            }
            if score.striker == Some(victim) {
                score.striker = None;
            } else if score.non_striker == Some(victim) {
                score.non_striker = None;
            }
            let wicket_number = score.wickets;
            let runs_at_fall = score.runs;
            let over_text = format!("{}.{}", over, ball);
            let name = self.name(victim);
            self.score_mut(side).fall_of_wickets.push(FallOfWicket {
                wicket_number,
                runs: runs_at_fall,
                batsman: victim,
                batsman_name: name,
                over: over_text,
            });
            dismissed = Some(victim);
        }

        self.ball_by_ball.push(DeliveryRecord {
            innings,
            over,
            ball,
            runs: team_runs,
            batsman: striker,
            bowler,
            team: side,
            is_wicket: delivery.wicket.is_some(),
            is_wide: delivery.extras == Some(ExtrasKind::Wide),
            is_no_ball: delivery.extras == Some(ExtrasKind::NoBall),
            is_extra: delivery.extras.is_some(),
            extras_kind: delivery.extras,
            dismissal: delivery.wicket.as_ref().map(|d| d.kind),
            dismissed,
            timestamp: clock::now_millis(),
        });

        // The last batter moves to the striker's end
        if self.lone_batter() {
            let score = self.batting_score_mut();
            if score.striker.is_none() {
                score.striker = score.non_striker.take();
            }
        }

        let over_complete = legal && self.batting_score().balls == 6;
        if over_complete {
            self.complete_over(bowler);
        }

        if self.target_reached() {
            self.complete_match();
            return Ok(());
        }

        let score = self.batting_score();
        if score.overs >= self.total_overs || score.wickets >= self.wickets_to_end_innings() {
            self.close_innings();
        } else if over_complete {
            self.awaiting_bowler_change = true;
            self.last_over_bowler = Some(bowler);
            self.bowler = None;
        }
        Ok(())
    }

    fn target_reached(&self) -> bool {
        self.current_innings == 2
            && self
                .target
                .map(|target| self.batting_score().runs >= target)
                .unwrap_or(false)
    }

    fn complete_over(&mut self, bowler: PlayerId) {
        let lone = self.lone_batter();
        let score = self.batting_score_mut();
        score.overs += 1;
        score.balls = 0;
        let over_runs = std::mem::take(&mut score.over_runs);
        score.over_by_over.push(over_runs);
        if std::mem::take(&mut score.over_conceded) == 0 {
            score.bowling.entry(bowler).or_default().maidens += 1;
        }
        if !lone {
            score.swap_ends();
        }
        log::debug!(
            "Over {} complete: {} runs, {}",
            score.overs,
            over_runs,
            score.summary()
        );
    }

    /// Close the current innings by hand (declaration or abandonment)
    pub fn end_innings(&mut self) -> Result<()> {
        self.require_in_progress()?;
        self.push_checkpoint();
        self.close_innings();
        Ok(())
    }

    fn close_innings(&mut self) {
        if self.current_innings == 1 {
            let target = self.batting_score().runs + 1;
            log::info!(
                "Innings 1 closed at {} in {} overs, target {}",
                self.batting_score().summary(),
                self.batting_score().overs_display(),
                target
            );
            self.target = Some(target);
            self.current_team = self.current_team.other();
            self.current_innings = 2;
            self.bowler = None;
            self.awaiting_bowler_change = false;
            self.last_over_bowler = None;
        } else {
            self.complete_match();
        }
    }

    fn complete_match(&mut self) {
        self.status = MatchStatus::Completed;
        self.awaiting_bowler_change = false;
        let outcome = self.outcome();
        self.man_of_the_match = stats::man_of_the_match(&self.contributions());
        log::info!("Match {} completed: {}", self.id, outcome.text);
        self.result = Some(outcome);
    }

    fn outcome(&self) -> MatchOutcome {
        let chasing = self.batting_side();
        let defending = chasing.other();
        let chase = self.score(chasing);
        let defend = self.score(defending);

        if chase.runs > defend.runs {
            let wickets = self.wickets_to_end_innings().saturating_sub(chase.wickets);
            let balls_remaining = self.balls_remaining();
            MatchOutcome {
                winner: Some(chasing),
                margin: Margin::Wickets {
                    wickets,
                    balls_remaining,
                },
                text: format!(
                    "{} won by {} wicket{} ({} ball{} remaining)",
                    self.team(chasing).name,
                    wickets,
                    plural(wickets),
                    balls_remaining,
                    plural(balls_remaining)
                ),
            }
        } else if defend.runs > chase.runs {
            let runs = defend.runs - chase.runs;
            MatchOutcome {
                winner: Some(defending),
                margin: Margin::Runs(runs),
                text: format!("{} won by {} run{}", self.team(defending).name, runs, plural(runs)),
            }
        } else {
            MatchOutcome {
                winner: None,
                margin: Margin::Tie,
                text: "Match tied".to_string(),
            }
        }
    }

    /// Per-player contributions across both innings, team one's players first
    pub fn contributions(&self) -> Vec<MatchContribution> {
        let mut out = Vec::new();
        for side in [TeamSide::One, TeamSide::Two] {
            let own = self.score(side);
            let opposing = self.score(side.other());
            for &player_id in &self.team(side).players {
                let mut c = MatchContribution {
                    player_id,
                    ..MatchContribution::default()
                };
                if let Some(b) = own.batting.get(&player_id) {
                    c.runs = b.runs;
                    c.balls_faced = b.balls;
                }
                if let Some(b) = opposing.bowling.get(&player_id) {
                    c.wickets = b.wickets;
                    c.balls_bowled = b.balls;
                    c.runs_conceded = b.runs;
                }
                out.push(c);
            }
        }
        out
    }

    /// Step back to the state before the last ball, innings close or manual
    /// strike change
    pub fn undo(&mut self) -> Result<()> {
        let checkpoint = self.undo_stack.pop_back().ok_or(CricketError::NothingToUndo)?;
        self.current_team = checkpoint.current_team;
        self.current_innings = checkpoint.current_innings;
        self.team1_score = checkpoint.team1_score;
        self.team2_score = checkpoint.team2_score;
        self.bowler = checkpoint.bowler;
        self.target = checkpoint.target;
        self.status = checkpoint.status;
        self.awaiting_bowler_change = checkpoint.awaiting_bowler_change;
        self.last_over_bowler = checkpoint.last_over_bowler;
        self.result = checkpoint.result;
        self.man_of_the_match = checkpoint.man_of_the_match;
        self.ball_by_ball.truncate(checkpoint.log_len);
        Ok(())
    }

    /// Swap ends by hand
    pub fn swap_strike(&mut self) -> Result<()> {
        self.require_in_progress()?;
        let score = self.batting_score();
        if score.striker.is_none() || score.non_striker.is_none() {
            return Err(CricketError::BatsmanNotSelected);
        }
        self.push_checkpoint();
        self.batting_score_mut().swap_ends();
        Ok(())
    }

    /// Retire a batter not out. They may be selected again later.
    pub fn retire_batsman(&mut self, end: BatterEnd) -> Result<()> {
        self.require_in_progress()?;
        let score = self.batting_score();
        let selected = match end {
            BatterEnd::Striker => score.striker,
            BatterEnd::NonStriker => score.non_striker,
        };
        if selected.is_none() {
            return Err(CricketError::BatsmanNotSelected);
        }
        self.push_checkpoint();
        let score = self.batting_score_mut();
        let slot = match end {
            BatterEnd::Striker => &mut score.striker,
            BatterEnd::NonStriker => &mut score.non_striker,
        };
        let player_id = slot.take().ok_or(CricketError::BatsmanNotSelected)?;
        score.batting.entry(player_id).or_default().status = BatterStatus::Retired;
        Ok(())
    }

    pub fn balls_remaining(&self) -> u32 {
        (self.total_overs * 6).saturating_sub(self.batting_score().total_balls())
    }

    pub fn current_run_rate(&self) -> f64 {
        let score = self.batting_score();
        let balls = score.total_balls();
        if balls == 0 {
            return 0.0;
        }
        score.runs as f64 * 6.0 / balls as f64
    }

    /// Runs per over still needed; None outside a live chase
    pub fn required_run_rate(&self) -> Option<f64> {
        let target = self.target?;
        if self.current_innings != 2 || !self.is_in_progress() {
            return None;
        }
        let balls = self.balls_remaining();
        if balls == 0 {
            return None;
        }
        let needed = target.saturating_sub(self.batting_score().runs);
        Some(needed as f64 * 6.0 / balls as f64)
    }

    /// Deliveries of the over in progress, in display form
    pub fn this_over(&self) -> Vec<String> {
        let score = self.batting_score();
        if score.balls == 0 && score.over_runs == 0 {
            return Vec::new();
        }
        self.ball_by_ball
            .iter()
            .filter(|d| {
                d.innings == self.current_innings && d.team == self.current_team && d.over == score.overs
            })
            .map(|d| d.display())
            .collect()
    }

    fn dismissal_text(&self, status: &BatterStatus) -> String {
        match status {
            BatterStatus::NotOut => "not out".to_string(),
            BatterStatus::Retired => "retired not out".to_string(),
            BatterStatus::Out {
                kind,
                bowler,
                fielder,
            } => {
                let b = bowler.map(|id| self.name(id)).unwrap_or_default();
                match (kind, fielder) {
                    (DismissalKind::Bowled, _) => format!("b {}", b),
                    (DismissalKind::Lbw, _) => format!("lbw b {}", b),
                    (DismissalKind::HitWicket, _) => format!("hit wicket b {}", b),
                    (DismissalKind::Caught, Some(f)) if Some(*f) == *bowler => format!("c & b {}", b),
                    (DismissalKind::Caught, Some(f)) => format!("c {} b {}", self.name(*f), b),
                    (DismissalKind::Caught, None) => format!("c ? b {}", b),
                    (DismissalKind::Stumped, Some(f)) => format!("st {} b {}", self.name(*f), b),
                    (DismissalKind::Stumped, None) => format!("st b {}", b),
                    (DismissalKind::RunOut, Some(f)) => format!("run out ({})", self.name(*f)),
                    (DismissalKind::RunOut, None) => "run out".to_string(),
                }
            }
        }
    }

    /// Batting card for `side` with the opposition's bowling against it
    pub fn scorecard(&self, side: TeamSide) -> Scorecard {
        let score = self.score(side);
        let batting = score
            .batting_order
            .iter()
            .filter_map(|id| score.batting.get(id).map(|f| (*id, f)))
            .map(|(player_id, f)| BattingLine {
                player_id,
                name: self.name(player_id),
                runs: f.runs,
                balls: f.balls,
                fours: f.fours,
                sixes: f.sixes,
                strike_rate: stats::round2(stats::batting_strike_rate(f.runs, f.balls)),
                status: self.dismissal_text(&f.status),
            })
            .collect();
        let bowling = score
            .bowling_order
            .iter()
            .filter_map(|id| score.bowling.get(id).map(|f| (*id, f)))
            .map(|(player_id, f)| BowlingLine {
                player_id,
                name: self.name(player_id),
                overs: format!("{}.{}", f.balls / 6, f.balls % 6),
                maidens: f.maidens,
                runs: f.runs,
                wickets: f.wickets,
                economy: stats::round2(stats::bowling_economy(f.runs, f.balls)),
            })
            .collect();

        Scorecard {
            team: self.team(side).name.clone(),
            total: score.summary(),
            overs: score.overs_display(),
            extras: score.extras.clone(),
            batting,
            bowling,
            fall_of_wickets: score.fall_of_wickets.clone(),
        }
    }

    /// Convert a completed match into its history record
    pub fn to_record(&self, finished_at: i64) -> Result<MatchRecord> {
        if self.status != MatchStatus::Completed {
            return Err(CricketError::MatchNotCompleted);
        }
        let outcome = self.result.clone().unwrap_or_else(|| self.outcome());

        let (winner, loser) = match outcome.winner {
            Some(side) => (side, side.other()),
            None => (TeamSide::One, TeamSide::Two),
        };
        let decided = outcome.winner.is_some();

        let mut batting = Vec::new();
        let mut bowling = Vec::new();
        for side in [TeamSide::One, TeamSide::Two] {
            let score = self.score(side);
            for (index, player_id) in score.batting_order.iter().enumerate() {
                let Some(f) = score.batting.get(player_id) else {
                    continue;
                };
                let (dismissal, fielder) = match &f.status {
                    BatterStatus::Out { kind, fielder, .. } => (Some(*kind), *fielder),
                    _ => (None, None),
                };
                batting.push(BattingPerformance {
                    player_id: *player_id,
                    player_name: self.name(*player_id),
                    runs: f.runs,
                    balls_faced: f.balls,
                    fours: f.fours,
                    sixes: f.sixes,
                    out: f.status.is_out(),
                    dismissal,
                    dismissal_text: self.dismissal_text(&f.status),
                    fielder,
                    position: index as u32 + 1,
                });
            }
            for player_id in &score.bowling_order {
                let Some(f) = score.bowling.get(player_id) else {
                    continue;
                };
                bowling.push(BowlingPerformance {
                    player_id: *player_id,
                    player_name: self.name(*player_id),
                    balls: f.balls,
                    maidens: f.maidens,
                    runs: f.runs,
                    wickets: f.wickets,
                });
            }
        }

        Ok(MatchRecord {
            id: self.id.clone(),
            date: clock::date_from_millis(finished_at),
            team1: self.team1.name.clone(),
            team2: self.team2.name.clone(),
            team1_captain: self.team1.captain,
            team2_captain: self.team2.captain,
            team1_players: self.team1.players.clone(),
            team2_players: self.team2.players.clone(),
            winning_team: decided.then(|| self.team(winner).name.clone()),
            losing_team: decided.then(|| self.team(loser).name.clone()),
            winning_team_score: self.score(winner).summary(),
            losing_team_score: self.score(loser).summary(),
            result: outcome.text,
            overs: self.total_overs,
            man_of_the_match: self.man_of_the_match,
            started_at: self.started_at,
            finished_at,
            batting,
            bowling,
        })
    }

    /// Repair a state loaded from storage. Returns a note per fix applied.
    pub fn validate_and_repair(&mut self) -> Vec<String> {
        let mut notes = Vec::new();

        if self.current_innings != 1 && self.current_innings != 2 {
            notes.push(format!("innings {} reset to 1", self.current_innings));
            self.current_innings = 1;
        }
        if self.total_overs == 0 {
            notes.push(format!("total overs reset to {}", self.rules.default_overs.max(1)));
            self.total_overs = self.rules.default_overs.max(1);
        }

        for side in [TeamSide::One, TeamSide::Two] {
            let team_name = self.team(side).name.clone();
            let batting_ids = self.team(side).players.clone();
            let score = self.score_mut(side);

            if score.balls >= 6 {
                score.overs += score.balls / 6;
                score.balls %= 6;
                notes.push(format!("{}: ball count normalized to {}", team_name, score.overs_display()));
            }

            // Out without facing a ball or scoring a run is a crash signature
            let phantom: Vec<PlayerId> = score
                .batting
                .iter()
                .filter(|(_, f)| f.status.is_out() && f.runs == 0 && f.balls == 0)
                .map(|(id, _)| *id)
                .collect();
            for player_id in phantom {
                if let Some(f) = score.batting.get_mut(&player_id) {
                    f.status = BatterStatus::NotOut;
                }
                let before = score.fall_of_wickets.len();
                score.fall_of_wickets.retain(|w| w.batsman != player_id);
                if score.fall_of_wickets.len() < before {
                    score.wickets = score.wickets.saturating_sub(1);
                }
                notes.push(format!("{}: player {} reset to not out", team_name, player_id));
            }

            for slot in [&mut score.striker, &mut score.non_striker] {
                if let Some(player_id) = *slot {
                    let out = score
                        .batting
                        .get(&player_id)
                        .map(|f| f.status.is_out())
                        .unwrap_or(false);
                    if out || !batting_ids.contains(&player_id) {
                        *slot = None;
                        notes.push(format!("{}: cleared unavailable batter {}", team_name, player_id));
                    }
                }
            }
            if score.striker.is_some() && score.striker == score.non_striker {
                score.non_striker = None;
                notes.push(format!("{}: same batter at both ends", team_name));
            }
        }

        if let Some(bowler) = self.bowler {
            if !self.fielding_team().contains(bowler) {
                self.bowler = None;
                notes.push(format!("cleared bowler {} not on the fielding side", bowler));
            }
        }
        if self.awaiting_bowler_change && self.bowler.is_some() {
            self.awaiting_bowler_change = false;
        }

        for note in &notes {
            log::warn!("Match {} repaired: {}", self.id, note);
        }
        notes
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
