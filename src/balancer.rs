use crate::error::{CricketError, Result};
use crate::skill::{batting_score, bowling_score, player_role, skill_score};
use crate::stats::player_ratings;
use crate::types::*;
use rand::seq::SliceRandom;
use rand::RngCore;
use std::collections::{HashMap, HashSet};

/// Draft-based team generator
pub struct TeamBalancer {
    config: AppConfig,
}

impl TeamBalancer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Split `players` into two teams around the given captains using category
    /// skill scores. With an RNG, players of equal score are shuffled among
    /// themselves before the draft.
    pub fn balance_teams(
        &self,
        players: &[Player],
        captain1: PlayerId,
        captain2: PlayerId,
        rng: Option<&mut dyn RngCore>,
    ) -> Result<(Vec<PlayerId>, Vec<PlayerId>)> {
        self.validate(players, captain1, captain2)?;
        let scores: HashMap<PlayerId, i32> =
            players.iter().map(|p| (p.id, skill_score(p))).collect();
        Ok(self.draft(players, &scores, captain1, captain2, rng))
    }

    /// Same draft, but players with enough match history are scored from
    /// their observed ratings. Falls back to `balance_teams` when nobody
    /// qualifies.
    pub fn balance_teams_with_stats(
        &self,
        players: &[Player],
        history: &[MatchRecord],
        captain1: PlayerId,
        captain2: PlayerId,
        rng: Option<&mut dyn RngCore>,
    ) -> Result<(Vec<PlayerId>, Vec<PlayerId>)> {
        match self.enhanced_scores(players, history) {
            None => self.balance_teams(players, captain1, captain2, rng),
            Some(scores) => {
                self.validate(players, captain1, captain2)?;
                Ok(self.draft(players, &scores, captain1, captain2, rng))
            }
        }
    }

    /// Build named teams with a strength snapshot
    pub fn generate_teams(
        &self,
        players: &[Player],
        history: &[MatchRecord],
        captain1: PlayerId,
        captain2: PlayerId,
        rng: Option<&mut dyn RngCore>,
    ) -> Result<(Team, Team)> {
        let (team_a, team_b) =
            self.balance_teams_with_stats(players, history, captain1, captain2, rng)?;
        let scores = self.draft_scores(players, history);

        let name_of = |id: PlayerId| {
            players
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.name.clone())
                .unwrap_or_default()
        };
        let strength = |ids: &[PlayerId]| ids.iter().filter_map(|id| scores.get(id)).sum::<i32>();

        let team1 = Team {
            id: 1,
            name: format!("{}'s Team", name_of(captain1)),
            captain: captain1,
            strength: strength(&team_a),
            players: team_a,
        };
        let team2 = Team {
            id: 2,
            name: format!("{}'s Team", name_of(captain2)),
            captain: captain2,
            strength: strength(&team_b),
            players: team_b,
        };

        log::info!(
            "Generated teams: {} ({} players, strength {}) vs {} ({} players, strength {})",
            team1.name,
            team1.size(),
            team1.strength,
            team2.name,
            team2.size(),
            team2.strength
        );
        Ok((team1, team2))
    }

    /// Scores the draft would use for these players
    pub fn draft_scores(&self, players: &[Player], history: &[MatchRecord]) -> HashMap<PlayerId, i32> {
        self.enhanced_scores(players, history).unwrap_or_else(|| {
            players.iter().map(|p| (p.id, skill_score(p))).collect()
        })
    }

    /// Statistics-aware scores, or None when no player has enough history
    pub fn enhanced_scores(
        &self,
        players: &[Player],
        history: &[MatchRecord],
    ) -> Option<HashMap<PlayerId, i32>> {
        let threshold = self.config.stats_history_threshold;
        let experienced: HashSet<PlayerId> = players
            .iter()
            .filter(|p| history.iter().filter(|m| m.involves(p.id)).count() >= threshold)
            .map(|p| p.id)
            .collect();
        if experienced.is_empty() {
            return None;
        }

        // Observed points on the same scale as the category maps
        let mut observed: HashMap<PlayerId, (f64, f64)> = HashMap::new();
        let mut batting_by_style: HashMap<BattingStyle, (f64, usize)> = HashMap::new();
        let mut bowling_by_style: HashMap<BowlingStyle, (f64, usize)> = HashMap::new();
        for player in players.iter().filter(|p| experienced.contains(&p.id)) {
            let ratings = player_ratings(player, history);
            let batting = ratings.batting / 100.0 * 6.0;
            let bowling = ratings.bowling / 100.0 * 5.0;
            observed.insert(player.id, (batting, bowling));

            let entry = batting_by_style.entry(player.batting_style).or_insert((0.0, 0));
            entry.0 += batting;
            entry.1 += 1;
            let entry = bowling_by_style.entry(player.bowling_style).or_insert((0.0, 0));
            entry.0 += bowling;
            entry.1 += 1;
        }

        let scores = players
            .iter()
            .map(|player| {
                let (batting, bowling) = observed.get(&player.id).copied().unwrap_or_else(|| {
                    let batting = batting_by_style
                        .get(&player.batting_style)
                        .map(|(sum, n)| sum / *n as f64)
                        .unwrap_or(batting_score(player.batting_style) as f64);
                    let bowling = bowling_by_style
                        .get(&player.bowling_style)
                        .map(|(sum, n)| sum / *n as f64)
                        .unwrap_or(bowling_score(player.bowling_style) as f64);
                    (batting, bowling)
                });
                let (w_bat, w_bowl) = match player_role(player) {
                    PlayerRole::Batsman => (0.8, 0.2),
                    PlayerRole::Bowler => (0.2, 0.8),
                    PlayerRole::Allrounder => (0.5, 0.5),
                };
                let score = (w_bat * batting + w_bowl * bowling).round() as i32;
                (player.id, score)
            })
            .collect();

        log::debug!(
            "Stats-aware balancing: {} of {} players have {}+ matches",
            experienced.len(),
            players.len(),
            threshold
        );
        Some(scores)
    }

    fn validate(&self, players: &[Player], captain1: PlayerId, captain2: PlayerId) -> Result<()> {
        let required = self.config.min_players_for_teams;
        if players.len() < required {
            return Err(CricketError::InsufficientPlayers {
                required,
                found: players.len(),
            });
        }
        if captain1 == captain2 {
            return Err(CricketError::DuplicateCaptain);
        }
        let mut seen = HashSet::new();
        for player in players {
            if !seen.insert(player.id) {
                return Err(CricketError::InvalidTeam(format!(
                    "player {} selected twice",
                    player.id
                )));
            }
        }
        for captain in [captain1, captain2] {
            if !seen.contains(&captain) {
                return Err(CricketError::UnknownPlayer(captain));
            }
        }
        Ok(())
    }

    /// Alternating draft: stars first, then regulars, with one turn counter
    /// running through both groups
    fn draft(
        &self,
        players: &[Player],
        scores: &HashMap<PlayerId, i32>,
        captain1: PlayerId,
        captain2: PlayerId,
        mut rng: Option<&mut dyn RngCore>,
    ) -> (Vec<PlayerId>, Vec<PlayerId>) {
        let score = |id: PlayerId| scores.get(&id).copied().unwrap_or(0);

        let mut stars: Vec<PlayerId> = Vec::new();
        let mut regulars: Vec<PlayerId> = Vec::new();
        for player in players {
            if player.id == captain1 || player.id == captain2 {
                continue;
            }
            if player.is_star {
                stars.push(player.id);
            } else {
                regulars.push(player.id);
            }
        }

        for group in [&mut stars, &mut regulars] {
            // Stable sort keeps input order among equal scores
            group.sort_by(|a, b| score(*b).cmp(&score(*a)));
            if let Some(rng) = rng.as_deref_mut() {
                shuffle_equal_runs(group, &score, rng);
            }
        }

        let mut team_a = vec![captain1];
        let mut team_b = vec![captain2];

        // The weaker captain picks first; a tie goes to team A
        let mut turn = if score(captain1) <= score(captain2) { 0 } else { 1 };
        for id in stars.into_iter().chain(regulars) {
            if turn % 2 == 0 {
                team_a.push(id);
            } else {
                team_b.push(id);
            }
            turn += 1;
        }

        while team_a.len().abs_diff(team_b.len()) > 1 {
            let (larger, smaller) = if team_a.len() > team_b.len() {
                (&mut team_a, &mut team_b)
            } else {
                (&mut team_b, &mut team_a)
            };
            if let Some(id) = larger.pop() {
                smaller.push(id);
            }
        }

        (team_a, team_b)
    }
}

/// Shuffle each run of equal-scored players in place. Players never cross
/// into a run with a different score.
fn shuffle_equal_runs(ids: &mut [PlayerId], score: &impl Fn(PlayerId) -> i32, rng: &mut dyn RngCore) {
    let mut start = 0;
    while start < ids.len() {
        let run_score = score(ids[start]);
        let mut end = start + 1;
        while end < ids.len() && score(ids[end]) == run_score {
            end += 1;
        }
        ids[start..end].shuffle(rng);
        start = end;
    }
}
