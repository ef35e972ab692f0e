//! Key-value persistence and the group-scoped repository on top of it.

use crate::error::Result;
use crate::roster::Roster;
use crate::scoring::MatchState;
use crate::types::{MatchRecord, Team};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// String key-value storage. Values are whole JSON documents.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// Store kept in memory; used natively and in tests
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::Store;
    use crate::error::{CricketError, Result};
    use wasm_bindgen::JsValue;

    fn storage_error(e: JsValue) -> CricketError {
        CricketError::Storage(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
    }

    /// `window.localStorage`
    pub struct BrowserStore {
        storage: web_sys::Storage,
    }

    impl BrowserStore {
        pub fn new() -> Result<Self> {
            let window = web_sys::window()
                .ok_or_else(|| CricketError::Storage("no window".to_string()))?;
            let storage = window
                .local_storage()
                .map_err(storage_error)?
                .ok_or_else(|| CricketError::Storage("localStorage unavailable".to_string()))?;
            Ok(Self { storage })
        }
    }

    impl Store for BrowserStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.storage.get_item(key).map_err(storage_error)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.storage.set_item(key, value).map_err(storage_error)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.storage.remove_item(key).map_err(storage_error)
        }

        fn keys(&self) -> Result<Vec<String>> {
            let len = self.storage.length().map_err(storage_error)?;
            let mut keys = Vec::with_capacity(len as usize);
            for i in 0..len {
                if let Some(key) = self.storage.key(i).map_err(storage_error)? {
                    keys.push(key);
                }
            }
            Ok(keys)
        }
    }
}

pub const PLAYERS_KEY: &str = "players";
pub const MATCHES_KEY: &str = "matches";
pub const TEAMS_KEY: &str = "teams";
pub const CURRENT_MATCH_KEY: &str = "currentMatch";

/// Storage key for `name` inside `group`, e.g. `players[Sunday XI]`
pub fn group_key(name: &str, group: &str) -> String {
    format!("{}[{}]", name, group)
}

/// Typed access to one group's documents.
///
/// Unreadable documents are dropped rather than failing the load; each drop
/// leaves a notice for the host to show once.
pub struct Repository {
    store: Box<dyn Store>,
    group: String,
    notices: Vec<String>,
}

impl Repository {
    pub fn new(store: Box<dyn Store>, group: &str) -> Self {
        Self {
            store,
            group: group.to_string(),
            notices: Vec::new(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn set_group(&mut self, group: &str) {
        self.group = group.to_string();
    }

    /// Notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn load_roster(&mut self) -> Result<Roster> {
        Ok(self.load(PLAYERS_KEY)?.unwrap_or_default())
    }

    pub fn save_roster(&mut self, roster: &Roster) -> Result<()> {
        self.save(PLAYERS_KEY, roster)
    }

    pub fn load_matches(&mut self) -> Result<Vec<MatchRecord>> {
        Ok(self.load(MATCHES_KEY)?.unwrap_or_default())
    }

    pub fn save_matches(&mut self, matches: &[MatchRecord]) -> Result<()> {
        self.save(MATCHES_KEY, matches)
    }

    pub fn load_teams(&mut self) -> Result<Option<(Team, Team)>> {
        self.load(TEAMS_KEY)
    }

    pub fn save_teams(&mut self, teams: &(Team, Team)) -> Result<()> {
        self.save(TEAMS_KEY, teams)
    }

    /// Load the saved match and repair anything a crash may have left behind
    pub fn load_current_match(&mut self) -> Result<Option<MatchState>> {
        let Some(mut state) = self.load::<MatchState>(CURRENT_MATCH_KEY)? else {
            return Ok(None);
        };
        let repairs = state.validate_and_repair();
        if !repairs.is_empty() {
            self.notices.push(format!(
                "Match {} was repaired on load: {}",
                state.id,
                repairs.join("; ")
            ));
        }
        Ok(Some(state))
    }

    pub fn save_current_match(&mut self, state: &MatchState) -> Result<()> {
        self.save(CURRENT_MATCH_KEY, state)
    }

    pub fn clear_current_match(&mut self) -> Result<()> {
        let key = group_key(CURRENT_MATCH_KEY, &self.group);
        self.store.remove(&key)
    }

    /// Remove every document of the group
    pub fn clear_group(&mut self) -> Result<()> {
        for name in [PLAYERS_KEY, MATCHES_KEY, TEAMS_KEY, CURRENT_MATCH_KEY] {
            let key = group_key(name, &self.group);
            self.store.remove(&key)?;
        }
        log::info!("Cleared stored data for group {}", self.group);
        Ok(())
    }

    fn load<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        let key = group_key(name, &self.group);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("Dropping unreadable {}: {}", key, e);
                self.store.remove(&key)?;
                self.notices
                    .push(format!("Saved {} could not be read and was reset", name));
                Ok(None)
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        let key = group_key(name, &self.group);
        let json = serde_json::to_string(value)?;
        self.store.set(&key, &json)
    }
}

/// Store that refuses writes; lets tests exercise storage failures
#[cfg(test)]
pub(crate) struct ReadOnlyStore(pub MemoryStore);

#[cfg(test)]
impl Store for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key)
    }

    fn set(&mut self, key: &str, _value: &str) -> Result<()> {
        Err(crate::error::CricketError::Storage(format!("quota exceeded writing {}", key)))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.0.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.0.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CricketError;
    use crate::types::{BattingStyle, BowlingStyle, ScoringRules};

    fn team(id: u32, name: &str, players: Vec<u32>) -> Team {
        Team {
            id,
            name: name.to_string(),
            captain: players[0],
            players,
            strength: 0,
        }
    }

    #[test]
    fn test_group_keys() {
        assert_eq!(group_key(PLAYERS_KEY, "Sunday XI"), "players[Sunday XI]");
        assert_eq!(group_key(CURRENT_MATCH_KEY, "g"), "currentMatch[g]");
    }

    #[test]
    fn test_roster_round_trip_is_group_scoped() {
        let mut repo = Repository::new(Box::new(MemoryStore::new()), "alpha");
        let mut roster = Roster::new();
        roster
            .add_player("Anil", BattingStyle::Reliable, BowlingStyle::Fast, true)
            .unwrap();
        repo.save_roster(&roster).unwrap();
        assert_eq!(repo.load_roster().unwrap(), roster);

        repo.set_group("beta");
        assert!(repo.load_roster().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_is_dropped_with_notice() {
        let mut store = MemoryStore::new();
        store.set("matches[alpha]", "{not json").unwrap();
        let mut repo = Repository::new(Box::new(store), "alpha");

        assert!(repo.load_matches().unwrap().is_empty());
        let notices = repo.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("matches"));
        // Reported once; the key is gone
        assert!(repo.load_matches().unwrap().is_empty());
        assert!(repo.take_notices().is_empty());
    }

    #[test]
    fn test_current_match_is_repaired_on_load() {
        let mut repo = Repository::new(Box::new(MemoryStore::new()), "alpha");
        let mut state = MatchState::start(
            "M1",
            team(1, "A", vec![1, 2, 3]),
            team(2, "B", vec![4, 5, 6]),
            2,
            ScoringRules::default(),
            BTreeMap::new(),
        )
        .unwrap();
        // A bowler from the batting side can only come from a bad save
        state.bowler = Some(2);
        repo.save_current_match(&state).unwrap();

        let loaded = repo.load_current_match().unwrap().unwrap();
        assert_eq!(loaded.bowler, None);
        assert_eq!(repo.take_notices().len(), 1);

        repo.clear_current_match().unwrap();
        assert!(repo.load_current_match().unwrap().is_none());
    }

    #[test]
    fn test_clear_group_leaves_other_groups() {
        let mut store = MemoryStore::new();
        store.set("players[alpha]", "{}").unwrap();
        store.set("teams[alpha]", "[]").unwrap();
        store.set("players[beta]", "{}").unwrap();
        let mut repo = Repository::new(Box::new(store), "alpha");
        repo.clear_group().unwrap();

        repo.set_group("beta");
        assert!(repo.load_roster().is_ok());
        assert!(repo.take_notices().is_empty());
    }

    #[test]
    fn test_write_failure_surfaces_as_storage_error() {
        let mut repo = Repository::new(Box::new(ReadOnlyStore(MemoryStore::new())), "alpha");
        assert!(matches!(
            repo.save_roster(&Roster::new()),
            Err(CricketError::Storage(_))
        ));
    }
}
