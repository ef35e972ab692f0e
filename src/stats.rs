//! Derived batting, bowling and fielding statistics.
//!
//! Everything here is a pure function over players and completed-match records.
//! The thresholds and weights define user-visible rankings, so they are fixed.

use crate::skill::player_role;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Rating baselines
const AVERAGE_BASELINE: f64 = 35.0;
const STRIKE_RATE_BASELINE: f64 = 130.0;
const HIGH_SCORE_CAP: f64 = 100.0;
/// One boundary every six balls faced earns the full boundary score
const BOUNDARY_FREQUENCY_BASELINE: f64 = 1.0 / 6.0;
const WICKETS_PER_MATCH_BASELINE: f64 = 3.0;
const ECONOMY_BASELINE: f64 = 6.5;
const BOWLING_AVERAGE_BASELINE: f64 = 20.0;
const BOWLING_STRIKE_RATE_BASELINE: f64 = 25.0;
const FIELDING_DISMISSALS_BASELINE: f64 = 0.3;

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Runs per 100 balls faced
pub fn batting_strike_rate(runs: u32, balls_faced: u32) -> f64 {
    if balls_faced == 0 {
        return 0.0;
    }
    runs as f64 / balls_faced as f64 * 100.0
}

/// Runs per dismissal; a batter never dismissed averages their total
pub fn batting_average(runs: u32, dismissals: u32) -> f64 {
    if dismissals == 0 {
        return runs as f64;
    }
    runs as f64 / dismissals as f64
}

/// Runs conceded per six-ball over
pub fn bowling_economy(runs_conceded: u32, balls_bowled: u32) -> f64 {
    if balls_bowled == 0 {
        return 0.0;
    }
    runs_conceded as f64 / (balls_bowled as f64 / 6.0)
}

pub fn bowling_average(runs_conceded: u32, wickets: u32) -> f64 {
    if wickets == 0 {
        return 0.0;
    }
    runs_conceded as f64 / wickets as f64
}

/// Balls bowled per wicket
pub fn bowling_strike_rate(balls_bowled: u32, wickets: u32) -> f64 {
    if wickets == 0 {
        return 0.0;
    }
    balls_bowled as f64 / wickets as f64
}

/// Score in [0, 100] for a value where bigger is better
fn normalized(value: f64, baseline: f64) -> f64 {
    (value / baseline).clamp(0.0, 1.0) * 100.0
}

/// Score in [0, 100] for a value where smaller is better. At or under the
/// baseline scores 100, above it decays as baseline / value.
fn normalized_inverted(value: f64, baseline: f64) -> f64 {
    if value <= 0.0 {
        return 100.0;
    }
    (baseline / value).clamp(0.0, 1.0) * 100.0
}

/// Discretized batting consistency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consistency {
    High,
    Medium,
    Low,
}

impl Consistency {
    pub fn score(&self) -> f64 {
        match self {
            Consistency::High => 80.0,
            Consistency::Medium => 50.0,
            Consistency::Low => 20.0,
        }
    }
}

/// Consistency from per-innings runs, via the coefficient of variation.
/// Fewer than two innings carry no signal and count as Medium.
pub fn consistency(per_innings_runs: &[u32]) -> Consistency {
    if per_innings_runs.len() < 2 {
        return Consistency::Medium;
    }
    let n = per_innings_runs.len() as f64;
    let mean = per_innings_runs.iter().map(|&r| r as f64).sum::<f64>() / n;
    if mean <= 0.0 {
        return Consistency::Low;
    }
    let variance = per_innings_runs
        .iter()
        .map(|&r| (r as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let cv = variance.sqrt() / mean;

    if cv <= 0.5 {
        Consistency::High
    } else if cv <= 1.0 {
        Consistency::Medium
    } else {
        Consistency::Low
    }
}

/// Consistency when only career totals are known: average relative to best score
pub fn career_consistency(career: &CareerStats) -> Consistency {
    if career.innings == 0 || career.highest_score == 0 {
        return Consistency::Medium;
    }
    let average = batting_average(career.runs, career.dismissals());
    let ratio = (average / career.highest_score as f64).min(1.0);
    if ratio >= 0.5 {
        Consistency::High
    } else if ratio >= 0.25 {
        Consistency::Medium
    } else {
        Consistency::Low
    }
}

/// Batting rating in [0, 100]
pub fn batting_rating(career: &CareerStats, consistency: Consistency) -> f64 {
    if career.balls_faced == 0 {
        return 0.0;
    }
    let average = batting_average(career.runs, career.dismissals());
    let strike_rate = batting_strike_rate(career.runs, career.balls_faced);
    let boundary_frequency = (career.fours + career.sixes) as f64 / career.balls_faced as f64;

    let rating = 0.25 * normalized(average, AVERAGE_BASELINE)
        + 0.2 * normalized(strike_rate, STRIKE_RATE_BASELINE)
        + 0.1 * normalized(career.highest_score as f64, HIGH_SCORE_CAP)
        + 0.1 * normalized(boundary_frequency, BOUNDARY_FREQUENCY_BASELINE)
        + 0.15 * consistency.score();
    rating.clamp(0.0, 100.0)
}

/// Bowling rating in [0, 100]; zero without matches or wickets
pub fn bowling_rating(career: &CareerStats) -> f64 {
    if career.matches == 0 || career.wickets == 0 {
        return 0.0;
    }
    let wickets_per_match = career.wickets as f64 / career.matches as f64;
    let economy = bowling_economy(career.runs_conceded, career.balls_bowled);
    let average = bowling_average(career.runs_conceded, career.wickets);
    let strike_rate = bowling_strike_rate(career.balls_bowled, career.wickets);

    let rating = 0.35 * normalized(wickets_per_match, WICKETS_PER_MATCH_BASELINE)
        + 0.25 * normalized_inverted(economy, ECONOMY_BASELINE)
        + 0.25 * normalized_inverted(average, BOWLING_AVERAGE_BASELINE)
        + 0.15 * normalized_inverted(strike_rate, BOWLING_STRIKE_RATE_BASELINE);
    rating.clamp(0.0, 100.0)
}

/// Fielding rating in [0, 100]; 50 when there is nothing to judge
pub fn fielding_rating(career: &CareerStats) -> f64 {
    let dismissals = career.fielding_dismissals();
    if career.matches == 0 || dismissals == 0 {
        return 50.0;
    }
    let per_match = dismissals as f64 / career.matches as f64;
    (per_match / FIELDING_DISMISSALS_BASELINE * 100.0).min(100.0)
}

/// (batting, bowling, fielding) weights for a role
pub fn role_weights(role: PlayerRole) -> (f64, f64, f64) {
    match role {
        PlayerRole::Batsman => (0.7, 0.1, 0.2),
        PlayerRole::Bowler => (0.1, 0.7, 0.2),
        PlayerRole::Allrounder => (0.45, 0.45, 0.1),
    }
}

/// Component and overall ratings for one player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerRatings {
    pub batting: f64,
    pub bowling: f64,
    pub fielding: f64,
    pub overall: f64,
    pub consistency: Consistency,
}

/// Per-innings runs for a player, oldest first
pub fn innings_runs(player_id: PlayerId, history: &[MatchRecord]) -> Vec<u32> {
    history
        .iter()
        .filter_map(|m| m.batting_for(player_id))
        .filter(|b| b.balls_faced > 0 || b.out)
        .map(|b| b.runs)
        .collect()
}

/// Ratings from career totals; per-match history sharpens the consistency bucket
pub fn player_ratings(player: &Player, history: &[MatchRecord]) -> PlayerRatings {
    let runs = innings_runs(player.id, history);
    let consistency = if runs.len() >= 2 {
        consistency(&runs)
    } else {
        career_consistency(&player.career)
    };

    let batting = batting_rating(&player.career, consistency);
    let bowling = bowling_rating(&player.career);
    let fielding = fielding_rating(&player.career);
    let (w_bat, w_bowl, w_field) = role_weights(player_role(player));
    let overall = (w_bat * batting + w_bowl * bowling + w_field * fielding).clamp(0.0, 100.0);

    PlayerRatings {
        batting,
        bowling,
        fielding,
        overall,
        consistency,
    }
}

/// Overall performance rating in [0, 100]
pub fn performance_rating(player: &Player, history: &[MatchRecord]) -> f64 {
    player_ratings(player, history).overall
}

/// Composite batting + bowling score for one match, in [0, 100]
fn match_composite(player_id: PlayerId, record: &MatchRecord) -> f64 {
    let batting = record
        .batting_for(player_id)
        .map(|b| {
            let runs_part = (b.runs.min(50) as f64 / 50.0) * 50.0;
            let tempo_part = if b.balls_faced > 0 {
                (batting_strike_rate(b.runs, b.balls_faced) / 200.0).min(1.0) * 10.0
            } else {
                0.0
            };
            runs_part + tempo_part
        })
        .unwrap_or(0.0);

    let bowling = record
        .bowling_for(player_id)
        .filter(|b| b.balls > 0)
        .map(|b| {
            let wickets_part = (b.wickets.min(4) as f64 / 4.0) * 30.0;
            let economy_part = if b.balls >= 6 {
                normalized_inverted(bowling_economy(b.runs, b.balls), ECONOMY_BASELINE) / 100.0 * 10.0
            } else {
                0.0
            };
            wickets_part + economy_part
        })
        .unwrap_or(0.0);

    (batting + bowling).clamp(0.0, 100.0)
}

/// Least-squares slope of `values` against their index
fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Recent form in [0, 100]. Looks at the last `window` matches of the group
/// (oldest first) in which the player took part; 50 with fewer than two.
pub fn form_index(player_id: PlayerId, history: &[MatchRecord], window: usize) -> f64 {
    let start = history.len().saturating_sub(window);
    let scores: Vec<f64> = history[start..]
        .iter()
        .filter(|m| m.involves(player_id))
        .map(|m| match_composite(player_id, m))
        .collect();

    if scores.len() < 2 {
        return 50.0;
    }

    let average = scores.iter().sum::<f64>() / scores.len() as f64;
    // A gain of 10 points per match is a full-strength upward trend
    let trend = (linear_slope(&scores) / 10.0).clamp(-1.0, 1.0);
    (average + trend * 20.0).clamp(0.0, 100.0)
}

/// One player's raw contribution to a single match
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchContribution {
    pub player_id: PlayerId,
    pub runs: u32,
    pub balls_faced: u32,
    pub wickets: u32,
    pub balls_bowled: u32,
    pub runs_conceded: u32,
}

/// Man-of-the-match scores, normalized against the match's own maxima.
/// Only players who batted or bowled are scored; input order is kept.
pub fn man_of_the_match_scores(contributions: &[MatchContribution]) -> Vec<(PlayerId, f64)> {
    let participants: Vec<&MatchContribution> = contributions
        .iter()
        .filter(|c| c.balls_faced > 0 || c.balls_bowled > 0)
        .collect();
    if participants.is_empty() {
        return Vec::new();
    }

    let runs = |c: &MatchContribution| if c.balls_faced > 0 { c.runs as f64 } else { 0.0 };
    let strike_rate = |c: &MatchContribution| batting_strike_rate(c.runs, c.balls_faced);
    let economy = |c: &MatchContribution| bowling_economy(c.runs_conceded, c.balls_bowled);

    let nonzero_or_one = |v: f64| if v > 0.0 { v } else { 1.0 };
    let max_runs = nonzero_or_one(participants.iter().map(|c| runs(c)).fold(0.0, f64::max));
    let max_sr = nonzero_or_one(participants.iter().map(|c| strike_rate(c)).fold(0.0, f64::max));
    let max_wickets = nonzero_or_one(participants.iter().map(|c| c.wickets as f64).fold(0.0, f64::max));

    let bowler_economies: Vec<f64> = participants
        .iter()
        .filter(|c| c.balls_bowled > 0)
        .map(|c| economy(c))
        .collect();
    let max_er = bowler_economies.iter().cloned().fold(f64::MIN, f64::max);
    let min_er = bowler_economies.iter().cloned().fold(f64::MAX, f64::min);

    participants
        .iter()
        .map(|c| {
            let batting = if c.balls_faced > 0 {
                0.6 * runs(c) / max_runs + 0.4 * strike_rate(c) / max_sr
            } else {
                0.0
            };
            let bowling = if c.balls_bowled > 0 {
                let norm_er = if max_er > min_er {
                    (max_er - economy(c)) / (max_er - min_er)
                } else {
                    0.0
                };
                0.7 * c.wickets as f64 / max_wickets + 0.3 * norm_er
            } else {
                0.0
            };
            (c.player_id, batting + bowling)
        })
        .collect()
}

/// Highest man-of-the-match score. Ties go to whoever comes first in
/// `contributions`, which is an accepted non-strict tie-break.
pub fn man_of_the_match(contributions: &[MatchContribution]) -> Option<PlayerId> {
    let mut best: Option<(PlayerId, f64)> = None;
    for (player_id, score) in man_of_the_match_scores(contributions) {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((player_id, score)),
        }
    }
    best.map(|(player_id, _)| player_id)
}

/// Fold one completed match into a player's career totals
pub fn accumulate_match(career: &mut CareerStats, player_id: PlayerId, record: &MatchRecord) {
    if record.involves(player_id) {
        career.matches += 1;
    }

    if let Some(b) = record.batting_for(player_id) {
        if b.balls_faced > 0 || b.out {
            career.innings += 1;
            if !b.out {
                career.not_outs += 1;
            }
        }
        career.runs += b.runs;
        career.balls_faced += b.balls_faced;
        career.fours += b.fours;
        career.sixes += b.sixes;
        career.highest_score = career.highest_score.max(b.runs);
        if b.runs == 0 && b.out {
            career.ducks += 1;
        }
        if b.runs >= 100 {
            career.centuries += 1;
        } else if b.runs >= 50 {
            career.half_centuries += 1;
        }
    }

    if let Some(b) = record.bowling_for(player_id).filter(|b| b.balls > 0) {
        career.bowling_innings += 1;
        career.balls_bowled += b.balls;
        career.runs_conceded += b.runs;
        career.wickets += b.wickets;
        career.maidens += b.maidens;

        if b.wickets > 0 {
            let figure = BowlingFigure {
                wickets: b.wickets,
                runs: b.runs,
            };
            let improved = career
                .best_bowling
                .map(|best| figure.is_better_than(&best))
                .unwrap_or(true);
            if improved {
                career.best_bowling = Some(figure);
            }
        }
        if b.wickets >= 5 {
            career.five_wicket_hauls += 1;
        } else if b.wickets >= 4 {
            career.four_wicket_hauls += 1;
        }
    }

    for dismissal in record.batting.iter().filter(|b| b.fielder == Some(player_id)) {
        match dismissal.dismissal {
            Some(DismissalKind::Caught) => career.catches += 1,
            Some(DismissalKind::RunOut) => career.run_outs += 1,
            Some(DismissalKind::Stumped) => career.stumpings += 1,
            _ => {}
        }
    }
}

/// Rebuild career totals from the full match history
pub fn aggregate_career(player_id: PlayerId, history: &[MatchRecord]) -> CareerStats {
    let mut career = CareerStats::default();
    for record in history {
        accumulate_match(&mut career, player_id, record);
    }
    career
}

/// Win/loss record for a team name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_percentage: f64,
}

pub fn team_records(history: &[MatchRecord]) -> Vec<TeamRecord> {
    let mut records: BTreeMap<String, TeamRecord> = BTreeMap::new();
    for m in history {
        for team in [&m.team1, &m.team2] {
            let entry = records.entry(team.clone()).or_insert_with(|| TeamRecord {
                name: team.clone(),
                ..TeamRecord::default()
            });
            entry.matches += 1;
            if m.winning_team.as_ref() == Some(team) {
                entry.wins += 1;
            } else if m.losing_team.as_ref() == Some(team) {
                entry.losses += 1;
            }
        }
    }
    records
        .into_values()
        .map(|mut r| {
            r.win_percentage = if r.matches > 0 {
                round2(r.wins as f64 / r.matches as f64 * 100.0)
            } else {
                0.0
            };
            r
        })
        .collect()
}

/// The quarter of the match where the two innings' scoring rates differed most
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurningPoint {
    /// 0-based quarter index
    pub quadrant: usize,
    /// Inclusive 1-based over range of the quarter
    pub first_over: u32,
    pub last_over: u32,
    pub first_innings_leads: bool,
    pub leading_rpo: f64,
    pub trailing_rpo: f64,
}

/// Runs per over across overs [start, end), capped at 36.
/// `overs` holds (runs, legal balls) per over so a partial last over counts pro rata.
fn quadrant_rpo(overs: &[(u32, u32)], start: usize, end: usize) -> f64 {
    let end = end.min(overs.len());
    if start >= end {
        return 0.0;
    }
    let (runs, balls) = overs[start..end]
        .iter()
        .fold((0u32, 0u32), |(r, b), &(or, ob)| (r + or, b + ob));
    if balls == 0 {
        return 0.0;
    }
    (runs as f64 / balls as f64 * 6.0).min(36.0)
}

/// Compare both innings quarter by quarter and report the widest gap
pub fn turning_point(first: &[(u32, u32)], second: &[(u32, u32)]) -> Option<TurningPoint> {
    let max_overs = first.len().max(second.len());
    if max_overs == 0 {
        return None;
    }
    let size = (max_overs / 4).max(1);
    let bounds = |q: usize| -> (usize, usize) {
        let start = q * size;
        let end = if q == 3 { max_overs } else { (q + 1) * size };
        (start, end)
    };

    let mut best_quadrant = 0;
    let mut best_diff = -1.0;
    let mut rates = [(0.0, 0.0); 4];
    for (q, rate) in rates.iter_mut().enumerate() {
        let (start, end) = bounds(q);
        *rate = (quadrant_rpo(first, start, end), quadrant_rpo(second, start, end));
        let diff = (rate.0 - rate.1).abs();
        if diff > best_diff {
            best_diff = diff;
            best_quadrant = q;
        }
    }

    let (first_rpo, second_rpo) = rates[best_quadrant];
    let (start, end) = bounds(best_quadrant);
    Some(TurningPoint {
        quadrant: best_quadrant,
        first_over: start as u32 + 1,
        last_over: end.max(start + 1) as u32,
        first_innings_leads: first_rpo > second_rpo,
        leading_rpo: round2(first_rpo.max(second_rpo)),
        trailing_rpo: round2(first_rpo.min(second_rpo)),
    })
}

/// Playing archetype derived from career numbers
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Archetype {
    PowerHitter,
    Anchor,
    StrikeBowler,
    Containing,
    AllRounder,
    Developing,
}

pub fn archetype(career: &CareerStats) -> Archetype {
    let strike_rate = batting_strike_rate(career.runs, career.balls_faced);
    let average = batting_average(career.runs, career.dismissals());
    let boundary_frequency = if career.balls_faced > 0 {
        (career.fours + career.sixes) as f64 / career.balls_faced as f64
    } else {
        0.0
    };

    let batting = if career.balls_faced >= 30
        && strike_rate >= 140.0
        && boundary_frequency >= BOUNDARY_FREQUENCY_BASELINE
    {
        Some(Archetype::PowerHitter)
    } else if career.innings >= 3 && average >= 25.0 && strike_rate < 120.0 {
        Some(Archetype::Anchor)
    } else {
        None
    };

    let bowling = if career.wickets >= 3
        && bowling_strike_rate(career.balls_bowled, career.wickets) <= 18.0
    {
        Some(Archetype::StrikeBowler)
    } else if career.balls_bowled >= 30
        && bowling_economy(career.runs_conceded, career.balls_bowled) <= 6.0
    {
        Some(Archetype::Containing)
    } else {
        None
    };

    match (batting, bowling) {
        (Some(_), Some(_)) => Archetype::AllRounder,
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => Archetype::Developing,
    }
}

/// Group players by archetype; ids keep roster order inside each group
pub fn cluster_players(players: &[Player]) -> BTreeMap<Archetype, Vec<PlayerId>> {
    let mut clusters: BTreeMap<Archetype, Vec<PlayerId>> = BTreeMap::new();
    for player in players {
        clusters
            .entry(archetype(&player.career))
            .or_default()
            .push(player.id);
    }
    clusters
}

/// Everything the analytics view shows for one player
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
    pub batting_average: f64,
    pub strike_rate: f64,
    pub economy: f64,
    pub bowling_average: f64,
    pub bowling_strike_rate: f64,
    pub ratings: PlayerRatings,
    pub form: f64,
    pub archetype: Archetype,
}

pub fn player_summary(player: &Player, history: &[MatchRecord], form_window: usize) -> PlayerSummary {
    let c = &player.career;
    PlayerSummary {
        player_id: player.id,
        name: player.name.clone(),
        role: player_role(player),
        batting_average: round2(if c.innings > 0 {
            batting_average(c.runs, c.dismissals())
        } else {
            0.0
        }),
        strike_rate: round2(batting_strike_rate(c.runs, c.balls_faced)),
        economy: round2(bowling_economy(c.runs_conceded, c.balls_bowled)),
        bowling_average: round2(bowling_average(c.runs_conceded, c.wickets)),
        bowling_strike_rate: round2(bowling_strike_rate(c.balls_bowled, c.wickets)),
        ratings: player_ratings(player, history),
        form: round2(form_index(player.id, history, form_window)),
        archetype: archetype(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn batting(player_id: PlayerId, runs: u32, balls: u32, out: bool) -> BattingPerformance {
        BattingPerformance {
            player_id,
            player_name: format!("P{}", player_id),
            runs,
            balls_faced: balls,
            fours: 0,
            sixes: 0,
            out,
            dismissal: if out { Some(DismissalKind::Bowled) } else { None },
            dismissal_text: String::new(),
            fielder: None,
            position: 1,
        }
    }

    fn bowling(player_id: PlayerId, balls: u32, runs: u32, wickets: u32) -> BowlingPerformance {
        BowlingPerformance {
            player_id,
            player_name: format!("P{}", player_id),
            balls,
            maidens: 0,
            runs,
            wickets,
        }
    }

    fn record(id: &str, team1: Vec<PlayerId>, team2: Vec<PlayerId>) -> MatchRecord {
        MatchRecord {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            team1: "Thunderbolts".to_string(),
            team2: "Lightning".to_string(),
            team1_captain: team1[0],
            team2_captain: team2[0],
            team1_players: team1,
            team2_players: team2,
            winning_team: Some("Thunderbolts".to_string()),
            losing_team: Some("Lightning".to_string()),
            winning_team_score: "145/6".to_string(),
            losing_team_score: "120/8".to_string(),
            result: "Thunderbolts won by 25 runs".to_string(),
            overs: 20,
            man_of_the_match: None,
            started_at: 0,
            finished_at: 0,
            batting: Vec::new(),
            bowling: Vec::new(),
        }
    }

    #[test]
    fn test_basic_rates() {
        assert_eq!(batting_strike_rate(50, 40), 125.0);
        assert_eq!(batting_strike_rate(10, 0), 0.0);
        assert_eq!(bowling_economy(30, 24), 7.5);
        assert_eq!(bowling_economy(30, 0), 0.0);
        assert_eq!(bowling_average(30, 3), 10.0);
        assert_eq!(bowling_average(30, 0), 0.0);
        assert_eq!(bowling_strike_rate(24, 2), 12.0);
        assert_eq!(bowling_strike_rate(24, 0), 0.0);
        assert_eq!(batting_average(90, 3), 30.0);
        assert_eq!(batting_average(45, 0), 45.0);
    }

    #[test]
    fn test_consistency_buckets() {
        assert_eq!(consistency(&[30, 32, 28, 30]), Consistency::High);
        assert_eq!(consistency(&[10, 40, 5, 25]), Consistency::Medium);
        assert_eq!(consistency(&[0, 0, 0, 80]), Consistency::Low);
        assert_eq!(consistency(&[0, 0]), Consistency::Low);
        assert_eq!(consistency(&[42]), Consistency::Medium);
    }

    #[test]
    fn test_batting_rating_full_marks() {
        let career = CareerStats {
            matches: 10,
            innings: 10,
            not_outs: 0,
            runs: 400,
            balls_faced: 300,
            highest_score: 120,
            fours: 40,
            sixes: 20,
            ..CareerStats::default()
        };
        // average 40 >= 35, SR 133 >= 130, HS capped, 60 boundaries in 300 balls >= 1/6
        let rating = batting_rating(&career, Consistency::High);
        let expected = 25.0 + 20.0 + 10.0 + 10.0 + 0.15 * 80.0;
        assert!((rating - expected).abs() < 1e-9);
    }

    #[test]
    fn test_batting_rating_zero_without_balls() {
        assert_eq!(batting_rating(&CareerStats::default(), Consistency::High), 0.0);
    }

    #[test]
    fn test_bowling_rating() {
        assert_eq!(bowling_rating(&CareerStats::default()), 0.0);

        let career = CareerStats {
            matches: 2,
            wickets: 6,
            balls_bowled: 60,
            runs_conceded: 60,
            ..CareerStats::default()
        };
        // 3 wkts/match, economy 6.0, average 10, SR 10: all at or under baseline
        assert!((bowling_rating(&career) - 100.0).abs() < 1e-9);

        let expensive = CareerStats {
            matches: 3,
            wickets: 3,
            balls_bowled: 60,
            runs_conceded: 130,
            ..CareerStats::default()
        };
        // 1 wkt/match, economy 13, average 43.3, SR 20
        let expected = 0.35 * (100.0 / 3.0)
            + 0.25 * (6.5 / 13.0 * 100.0)
            + 0.25 * (20.0 / (130.0 / 3.0) * 100.0)
            + 0.15 * 100.0;
        assert!((bowling_rating(&expensive) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fielding_rating() {
        assert_eq!(fielding_rating(&CareerStats::default()), 50.0);
        let career = CareerStats {
            matches: 10,
            catches: 2,
            run_outs: 1,
            ..CareerStats::default()
        };
        assert!((fielding_rating(&career) - 100.0).abs() < 1e-9);
        let sparse = CareerStats {
            matches: 10,
            catches: 1,
            ..CareerStats::default()
        };
        assert!((fielding_rating(&sparse) - (0.1 / 0.3 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_performance_rating_uses_role_weights() {
        let mut bowler = Player::new(1, "Umesh", BattingStyle::Tailend, BowlingStyle::Fast, false);
        bowler.career = CareerStats {
            matches: 2,
            wickets: 6,
            balls_bowled: 60,
            runs_conceded: 60,
            ..CareerStats::default()
        };
        // batting 0, bowling 100, fielding 50
        let rating = performance_rating(&bowler, &[]);
        assert!((rating - (0.7 * 100.0 + 0.2 * 50.0)).abs() < 1e-9);
    }

    #[test]
    fn test_form_index_neutral_with_little_history() {
        let mut m = record("M1", vec![1, 2], vec![3, 4]);
        m.batting.push(batting(1, 80, 40, false));
        assert_eq!(form_index(1, &[m], 5), 50.0);
        assert_eq!(form_index(9, &[], 5), 50.0);
    }

    #[test]
    fn test_form_index_rewards_upward_trend() {
        let scores = [0u32, 20, 40];
        let history: Vec<MatchRecord> = scores
            .iter()
            .enumerate()
            .map(|(i, &runs)| {
                let mut m = record(&format!("M{}", i), vec![1, 2], vec![3, 4]);
                m.batting.push(batting(1, runs, 20, true));
                m
            })
            .collect();
        let falling: Vec<MatchRecord> = history.iter().rev().cloned().collect();

        let rising_form = form_index(1, &history, 5);
        let falling_form = form_index(1, &falling, 5);
        assert!(rising_form > falling_form);
        assert!((0.0..=100.0).contains(&rising_form));
    }

    #[test]
    fn test_form_index_only_looks_at_window() {
        let mut history = Vec::new();
        for i in 0..6 {
            let mut m = record(&format!("M{}", i), vec![1, 2], vec![3, 4]);
            m.batting.push(batting(1, 50, 25, false));
            history.push(m);
        }
        // Player 1 was absent from the last four matches
        for m in history.iter_mut().skip(2) {
            m.team1_players = vec![5, 2];
            m.batting.clear();
        }
        assert_eq!(form_index(1, &history, 4), 50.0);
    }

    #[test]
    fn test_man_of_the_match_formula() {
        let contributions = vec![
            MatchContribution { player_id: 1, runs: 50, balls_faced: 25, ..Default::default() },
            MatchContribution { player_id: 2, runs: 10, balls_faced: 20, wickets: 3, balls_bowled: 24, runs_conceded: 18 },
            MatchContribution { player_id: 3, wickets: 1, balls_bowled: 24, runs_conceded: 40, ..Default::default() },
            MatchContribution { player_id: 4, ..Default::default() },
        ];
        let scores = man_of_the_match_scores(&contributions);
        // player 4 neither batted nor bowled
        assert_eq!(scores.len(), 3);

        // player 1: 0.6 * 1 + 0.4 * 1 = 1.0
        assert!((scores[0].1 - 1.0).abs() < 1e-9);
        // player 2: batting 0.6*0.2 + 0.4*(50/200) = 0.22, bowling 0.7*1 + 0.3*1 = 1.0
        assert!((scores[1].1 - 1.22).abs() < 1e-9);
        // player 3: bowling 0.7 * (1/3) + 0.3 * 0
        assert!((scores[2].1 - 0.7 / 3.0).abs() < 1e-9);

        assert_eq!(man_of_the_match(&contributions), Some(2));
    }

    #[test]
    fn test_man_of_the_match_tie_goes_to_first_seen() {
        let contributions = vec![
            MatchContribution { player_id: 7, runs: 20, balls_faced: 10, ..Default::default() },
            MatchContribution { player_id: 3, runs: 20, balls_faced: 10, ..Default::default() },
        ];
        assert_eq!(man_of_the_match(&contributions), Some(7));
        assert_eq!(man_of_the_match(&[]), None);
    }

    #[test]
    fn test_aggregate_career_from_history() {
        let mut m1 = record("M1", vec![1, 2], vec![3, 4]);
        m1.batting.push(batting(1, 0, 3, true));
        m1.bowling.push(bowling(1, 24, 20, 4));
        let mut caught = batting(3, 12, 8, true);
        caught.dismissal = Some(DismissalKind::Caught);
        caught.fielder = Some(1);
        m1.batting.push(caught);

        let mut m2 = record("M2", vec![1, 2], vec![3, 4]);
        m2.batting.push(batting(1, 55, 30, false));
        m2.bowling.push(bowling(1, 24, 15, 4));

        let career = aggregate_career(1, &[m1, m2]);
        assert_eq!(career.matches, 2);
        assert_eq!(career.innings, 2);
        assert_eq!(career.not_outs, 1);
        assert_eq!(career.runs, 55);
        assert_eq!(career.ducks, 1);
        assert_eq!(career.half_centuries, 1);
        assert_eq!(career.highest_score, 55);
        assert_eq!(career.wickets, 8);
        assert_eq!(career.four_wicket_hauls, 2);
        assert_eq!(career.best_bowling, Some(BowlingFigure { wickets: 4, runs: 15 }));
        assert_eq!(career.catches, 1);
    }

    #[test]
    fn test_team_records() {
        let m1 = record("M1", vec![1], vec![2]);
        let mut m2 = record("M2", vec![1], vec![2]);
        m2.winning_team = Some("Lightning".to_string());
        m2.losing_team = Some("Thunderbolts".to_string());
        let mut m3 = record("M3", vec![1], vec![2]);
        m3.winning_team = Some("Thunderbolts".to_string());
        m3.losing_team = Some("Lightning".to_string());

        let records = team_records(&[m1, m2, m3]);
        let thunder = records.iter().find(|r| r.name == "Thunderbolts").unwrap();
        assert_eq!(thunder.matches, 3);
        assert_eq!(thunder.wins, 2);
        assert_eq!(thunder.losses, 1);
        assert_eq!(thunder.win_percentage, 66.67);
    }

    #[test]
    fn test_turning_point_finds_widest_gap() {
        let first: Vec<(u32, u32)> = vec![(6, 6), (6, 6), (6, 6), (6, 6), (20, 6), (20, 6), (6, 6), (6, 6)];
        let second: Vec<(u32, u32)> = vec![(6, 6); 8];
        let tp = turning_point(&first, &second).unwrap();
        assert_eq!(tp.quadrant, 2);
        assert_eq!((tp.first_over, tp.last_over), (5, 6));
        assert!(tp.first_innings_leads);
        assert_eq!(tp.leading_rpo, 20.0);
        assert_eq!(tp.trailing_rpo, 6.0);
        assert!(turning_point(&[], &[]).is_none());
    }

    #[test]
    fn test_archetypes() {
        let hitter = CareerStats {
            innings: 5,
            runs: 150,
            balls_faced: 90,
            fours: 12,
            sixes: 6,
            ..CareerStats::default()
        };
        assert_eq!(archetype(&hitter), Archetype::PowerHitter);

        let anchor = CareerStats {
            innings: 4,
            runs: 120,
            balls_faced: 110,
            ..CareerStats::default()
        };
        assert_eq!(archetype(&anchor), Archetype::Anchor);

        let strike = CareerStats {
            wickets: 5,
            balls_bowled: 60,
            runs_conceded: 70,
            ..CareerStats::default()
        };
        assert_eq!(archetype(&strike), Archetype::StrikeBowler);

        let both = CareerStats {
            wickets: 5,
            balls_bowled: 60,
            runs_conceded: 70,
            ..anchor.clone()
        };
        assert_eq!(archetype(&both), Archetype::AllRounder);
        assert_eq!(archetype(&CareerStats::default()), Archetype::Developing);
    }
}
