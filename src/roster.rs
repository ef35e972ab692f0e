use crate::error::{CricketError, Result};
use crate::stats;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The group's players. The only place player data is mutated; teams and
/// matches refer to players by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    players: BTreeMap<PlayerId, Player>,
    /// Next id to hand out. Only grows, so removed ids are never reused.
    #[serde(default = "first_id")]
    next_id: PlayerId,
}

fn first_id() -> PlayerId {
    1
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            next_id: first_id(),
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn next_id(&self) -> PlayerId {
        self.next_id
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Players in id order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        let name = name.trim();
        self.players
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn add_player(
        &mut self,
        name: &str,
        batting_style: BattingStyle,
        bowling_style: BowlingStyle,
        is_star: bool,
    ) -> Result<PlayerId> {
        let name = validate_name(name)?;
        if self.find_by_name(name).is_some() {
            return Err(CricketError::InvalidPlayer(format!("{} already exists", name)));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.players
            .insert(id, Player::new(id, name, batting_style, bowling_style, is_star));
        log::debug!("Added player {} ({})", name, id);
        Ok(id)
    }

    /// Insert a player that already has an id, e.g. from an import.
    /// Replaces any player with the same id.
    pub fn insert(&mut self, player: Player) {
        self.next_id = self.next_id.max(player.id + 1);
        self.players.insert(player.id, player);
    }

    pub fn update_player(
        &mut self,
        id: PlayerId,
        name: &str,
        batting_style: BattingStyle,
        bowling_style: BowlingStyle,
        is_star: bool,
    ) -> Result<()> {
        let name = validate_name(name)?;
        if self.find_by_name(name).map(|p| p.id != id).unwrap_or(false) {
            return Err(CricketError::InvalidPlayer(format!("{} already exists", name)));
        }
        let player = self
            .players
            .get_mut(&id)
            .ok_or(CricketError::UnknownPlayer(id))?;
        player.name = name.to_string();
        player.batting_style = batting_style;
        player.bowling_style = bowling_style;
        player.is_star = is_star;
        Ok(())
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player> {
        self.players.remove(&id).ok_or(CricketError::UnknownPlayer(id))
    }

    /// Copies of the given players, in the order asked for
    pub fn select(&self, ids: &[PlayerId]) -> Result<Vec<Player>> {
        ids.iter()
            .map(|id| self.get(*id).cloned().ok_or(CricketError::UnknownPlayer(*id)))
            .collect()
    }

    pub fn names(&self, ids: impl IntoIterator<Item = PlayerId>) -> BTreeMap<PlayerId, String> {
        ids.into_iter()
            .filter_map(|id| self.get(id).map(|p| (id, p.name.clone())))
            .collect()
    }

    /// Fold a completed match into every participant's career
    pub fn apply_match(&mut self, record: &MatchRecord) {
        for &id in record.team1_players.iter().chain(&record.team2_players) {
            match self.players.get_mut(&id) {
                Some(player) => {
                    stats::accumulate_match(&mut player.career, id, record);
                    player.last_updated = Some(record.date);
                }
                None => log::warn!("Match {}: player {} is no longer in the roster", record.id, id),
            }
        }
    }

    /// Recompute every career from scratch
    pub fn rebuild_careers(&mut self, history: &[MatchRecord]) {
        for player in self.players.values_mut() {
            player.career = stats::aggregate_career(player.id, history);
            player.last_updated = history
                .iter()
                .filter(|m| m.involves(player.id))
                .map(|m| m.date)
                .max();
        }
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CricketError::InvalidPlayer("name is empty".to_string()));
    }
    Ok(name)
}
