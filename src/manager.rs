use crate::balancer::TeamBalancer;
use crate::clock;
use crate::error::{CricketError, Result};
use crate::interchange::{self, ExportDocument, ImportSummary};
use crate::roster::Roster;
use crate::scoring::{BatterEnd, Delivery, MatchState};
use crate::stats::{self, PlayerSummary, TeamRecord};
use crate::store::{Repository, Store};
use crate::sync::{GroupInfo, SyncClient};
use crate::types::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Single-threaded controller for one group: roster, teams, the live match,
/// history, persistence and sync.
///
/// Every successful mutation is saved before it returns. Sync runs after the
/// local save and never fails the operation.
pub struct CricketManager {
    config: AppConfig,
    repo: Repository,
    sync: Option<SyncClient>,
    roster: Roster,
    matches: Vec<MatchRecord>,
    teams: Option<(Team, Team)>,
    current: Option<MatchState>,
    rng: ChaCha8Rng,
}

impl CricketManager {
    /// Open `group` in `store`, restoring whatever was saved there
    pub fn new(store: Box<dyn Store>, group: &str, config: AppConfig, seed: u64) -> Result<Self> {
        let mut manager = Self {
            config,
            repo: Repository::new(store, group),
            sync: None,
            roster: Roster::new(),
            matches: Vec::new(),
            teams: None,
            current: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        manager.load()?;
        Ok(manager)
    }

    /// Reload every document of the current group
    pub fn load(&mut self) -> Result<()> {
        self.roster = self.repo.load_roster()?;
        self.matches = self.repo.load_matches()?;
        self.teams = self.repo.load_teams()?;
        self.current = self.repo.load_current_match()?;
        log::info!(
            "Loaded group {}: {} players, {} matches{}",
            self.repo.group(),
            self.roster.len(),
            self.matches.len(),
            if self.current.is_some() { ", match in progress" } else { "" }
        );
        Ok(())
    }

    pub fn switch_group(&mut self, group: &str) -> Result<()> {
        self.repo.set_group(group);
        self.load()
    }

    pub fn group(&self) -> &str {
        self.repo.group()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: AppConfig) {
        self.config = config;
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    pub fn teams(&self) -> Option<&(Team, Team)> {
        self.teams.as_ref()
    }

    pub fn current_match(&self) -> Option<&MatchState> {
        self.current.as_ref()
    }

    /// Notices for the host to show once (dropped or repaired data)
    pub fn take_notices(&mut self) -> Vec<String> {
        self.repo.take_notices()
    }

    // Roster

    pub fn add_player(
        &mut self,
        name: &str,
        batting_style: BattingStyle,
        bowling_style: BowlingStyle,
        is_star: bool,
    ) -> Result<PlayerId> {
        let id = self
            .roster
            .add_player(name, batting_style, bowling_style, is_star)?;
        self.save_roster()?;
        Ok(id)
    }

    pub fn update_player(
        &mut self,
        id: PlayerId,
        name: &str,
        batting_style: BattingStyle,
        bowling_style: BowlingStyle,
        is_star: bool,
    ) -> Result<()> {
        self.roster
            .update_player(id, name, batting_style, bowling_style, is_star)?;
        self.save_roster()
    }

    /// Players in the live match cannot be removed
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Player> {
        if let Some(state) = &self.current {
            if state.team1.contains(id) || state.team2.contains(id) {
                return Err(CricketError::InvalidPlayer(format!(
                    "player {} is playing in the current match",
                    id
                )));
            }
        }
        let player = self.roster.remove_player(id)?;
        self.save_roster()?;
        Ok(player)
    }

    fn save_roster(&mut self) -> Result<()> {
        self.repo.save_roster(&self.roster)?;
        self.push_sync();
        Ok(())
    }

    // Teams

    /// Draft two teams from the selected players and save them
    pub fn generate_teams(
        &mut self,
        selected: &[PlayerId],
        captain1: PlayerId,
        captain2: PlayerId,
    ) -> Result<(Team, Team)> {
        let players = self.roster.select(selected)?;
        let balancer = TeamBalancer::new(self.config.clone());
        let teams = balancer.generate_teams(
            &players,
            &self.matches,
            captain1,
            captain2,
            Some(&mut self.rng),
        )?;
        self.repo.save_teams(&teams)?;
        self.teams = Some(teams.clone());
        Ok(teams)
    }

    // Live match

    /// Start a match between the saved teams. `overs` defaults to the
    /// configured format. A finished match must be archived with
    /// `end_match` first.
    pub fn start_match(&mut self, overs: Option<u32>) -> Result<&MatchState> {
        if self.current.is_some() {
            return Err(CricketError::MatchAlreadyActive);
        }
        let (team1, team2) = self
            .teams
            .clone()
            .ok_or_else(|| CricketError::InvalidTeam("generate teams first".to_string()))?;
        let names = self
            .roster
            .names(team1.players.iter().chain(&team2.players).copied());
        let id = format!("M{}", clock::now_millis());
        let overs = overs.unwrap_or(self.config.scoring.default_overs);
        let state = MatchState::start(&id, team1, team2, overs, self.config.scoring.clone(), names)?;
        self.repo.save_current_match(&state)?;
        Ok(self.current.insert(state))
    }

    /// Apply `op` to the live match and save the result. Nothing is saved
    /// when `op` fails, and the state is unchanged.
    fn with_match<T>(&mut self, op: impl FnOnce(&mut MatchState) -> Result<T>) -> Result<T> {
        let state = self.current.as_mut().ok_or(CricketError::NoActiveMatch)?;
        let value = op(state)?;
        self.repo.save_current_match(state)?;
        Ok(value)
    }

    pub fn select_striker(&mut self, player_id: PlayerId) -> Result<()> {
        self.with_match(|m| m.select_striker(player_id))
    }

    pub fn select_non_striker(&mut self, player_id: PlayerId) -> Result<()> {
        self.with_match(|m| m.select_non_striker(player_id))
    }

    pub fn select_bowler(&mut self, player_id: PlayerId) -> Result<()> {
        self.with_match(|m| m.select_bowler(player_id))
    }

    pub fn record_delivery(&mut self, delivery: Delivery) -> Result<()> {
        self.with_match(|m| m.record_delivery(delivery))
    }

    pub fn end_innings(&mut self) -> Result<()> {
        self.with_match(|m| m.end_innings())
    }

    pub fn undo(&mut self) -> Result<()> {
        self.with_match(|m| m.undo())
    }

    pub fn swap_strike(&mut self) -> Result<()> {
        self.with_match(|m| m.swap_strike())
    }

    pub fn retire_batsman(&mut self, end: BatterEnd) -> Result<()> {
        self.with_match(|m| m.retire_batsman(end))
    }

    /// Archive the completed match: history, careers, save, sync
    pub fn end_match(&mut self) -> Result<MatchRecord> {
        let state = self.current.as_ref().ok_or(CricketError::NoActiveMatch)?;
        let record = state.to_record(clock::now_millis())?;

        self.roster.apply_match(&record);
        self.matches.push(record.clone());
        self.repo.save_roster(&self.roster)?;
        self.repo.save_matches(&self.matches)?;
        self.repo.clear_current_match()?;
        self.current = None;
        log::info!("Match {} archived: {}", record.id, record.result);
        self.push_sync();
        Ok(record)
    }

    /// Throw away the live match without recording it
    pub fn abandon_match(&mut self) -> Result<()> {
        let state = self.current.take().ok_or(CricketError::NoActiveMatch)?;
        self.repo.clear_current_match()?;
        log::warn!("Match {} abandoned at {}", state.id, state.batting_score().summary());
        Ok(())
    }

    // Statistics

    pub fn player_summary(&self, id: PlayerId) -> Result<PlayerSummary> {
        let player = self.roster.get(id).ok_or(CricketError::UnknownPlayer(id))?;
        Ok(stats::player_summary(player, &self.matches, self.config.form_window))
    }

    pub fn player_summaries(&self) -> Vec<PlayerSummary> {
        self.roster
            .players()
            .map(|p| stats::player_summary(p, &self.matches, self.config.form_window))
            .collect()
    }

    pub fn team_records(&self) -> Vec<TeamRecord> {
        stats::team_records(&self.matches)
    }

    // Interchange

    pub fn export(&self) -> ExportDocument {
        interchange::export(&self.roster, &self.matches, clock::now_millis())
    }

    /// Replace the group's roster and history with the document's
    pub fn import(&mut self, doc: &ExportDocument) -> Result<ImportSummary> {
        let (roster, matches, summary) = interchange::import(doc)?;
        self.roster = roster;
        self.matches = matches;
        self.repo.save_roster(&self.roster)?;
        self.repo.save_matches(&self.matches)?;
        self.push_sync();
        Ok(summary)
    }

    /// Export a backup, then delete everything stored for the group
    pub fn wipe_group(&mut self) -> Result<ExportDocument> {
        let backup = self.export();
        self.repo.clear_group()?;
        self.roster = Roster::new();
        self.matches.clear();
        self.teams = None;
        self.current = None;
        log::warn!(
            "Wiped group {} ({} players, {} matches backed up)",
            self.repo.group(),
            backup.export_metadata.total_players,
            backup.export_metadata.total_matches
        );
        Ok(backup)
    }

    // Sync

    pub fn attach_sync(&mut self, client: SyncClient) {
        self.sync = Some(client);
    }

    pub fn sync_client(&self) -> Option<&SyncClient> {
        self.sync.as_ref()
    }

    pub fn login(&mut self, group_name: &str, password: &str) -> Result<GroupInfo> {
        let client = self
            .sync
            .as_mut()
            .ok_or_else(|| CricketError::Sync("no sync backend".to_string()))?;
        let group = client.login(group_name, password)?;
        self.switch_group(&group.name)?;
        Ok(group)
    }

    /// Replace local data with the backend's copy
    pub fn pull(&mut self) -> Result<ImportSummary> {
        let client = self
            .sync
            .as_mut()
            .ok_or_else(|| CricketError::Sync("no sync backend".to_string()))?;
        let payload = client.pull()?;
        let (roster, matches, summary) = interchange::import(&payload.into())?;
        self.roster = roster;
        self.matches = matches;
        self.repo.save_roster(&self.roster)?;
        self.repo.save_matches(&self.matches)?;
        Ok(summary)
    }

    fn push_sync(&mut self) {
        let Some(client) = self.sync.as_mut() else {
            return;
        };
        if client.group().is_none() {
            return;
        }
        let doc = interchange::export(&self.roster, &self.matches, clock::now_millis());
        client.push(doc.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::MatchStatus;
    use crate::store::{MemoryStore, ReadOnlyStore};
    use crate::sync::InMemoryRemote;

    fn manager_with_players() -> CricketManager {
        let mut manager =
            CricketManager::new(Box::new(MemoryStore::new()), "test", AppConfig::default(), 42)
                .unwrap();
        for (name, bat, bowl) in [
            ("Anil", BattingStyle::Reliable, BowlingStyle::Fast),
            ("Ravi", BattingStyle::Reliable, BowlingStyle::Medium),
            ("Kiran", BattingStyle::SoSo, BowlingStyle::Fast),
            ("Dev", BattingStyle::SoSo, BowlingStyle::Medium),
            ("Sunil", BattingStyle::Tailend, BowlingStyle::Fast),
            ("Manoj", BattingStyle::Tailend, BowlingStyle::Dnb),
        ] {
            manager.add_player(name, bat, bowl, false).unwrap();
        }
        manager
    }

    /// One-over-a-side match that team one wins by 8 runs
    fn play_short_match(manager: &mut CricketManager) {
        let (team1, team2) = manager.generate_teams(&[1, 2, 3, 4, 5, 6], 1, 2).unwrap();
        manager.start_match(Some(1)).unwrap();

        manager.select_striker(team1.players[0]).unwrap();
        manager.select_non_striker(team1.players[1]).unwrap();
        manager.select_bowler(team2.players[0]).unwrap();
        for runs in [4, 1, 0, 6, 2, 1] {
            manager.record_delivery(Delivery::runs(runs)).unwrap();
        }
        // Over limit reached: innings 2 needs fresh selections
        let state = manager.current_match().unwrap();
        assert_eq!(state.current_innings, 2);
        assert_eq!(state.target, Some(15));

        manager.select_striker(team2.players[0]).unwrap();
        manager.select_non_striker(team2.players[1]).unwrap();
        manager.select_bowler(team1.players[0]).unwrap();
        for _ in 0..6 {
            manager.record_delivery(Delivery::runs(1)).unwrap();
        }
    }

    #[test]
    fn test_full_match_is_archived() {
        let mut manager = manager_with_players();
        play_short_match(&mut manager);
        assert_eq!(manager.current_match().unwrap().status, MatchStatus::Completed);

        let record = manager.end_match().unwrap();
        assert!(manager.current_match().is_none());
        assert_eq!(manager.matches().len(), 1);
        assert_eq!(record.winning_team_score, "14/0");
        assert_eq!(record.losing_team_score, "6/0");

        let opener = record.team1_players[0];
        assert_eq!(manager.roster().get(opener).unwrap().career.matches, 1);
        assert_eq!(manager.team_records().len(), 2);
    }

    #[test]
    fn test_reload_restores_roster_and_reports_corrupt_match() {
        let mut roster = Roster::new();
        roster
            .add_player("Anil", BattingStyle::Reliable, BowlingStyle::Fast, true)
            .unwrap();
        let mut store = MemoryStore::new();
        store
            .set("players[test]", &serde_json::to_string(&roster).unwrap())
            .unwrap();
        store.set("currentMatch[test]", "{\"id\":").unwrap();

        let mut manager =
            CricketManager::new(Box::new(store), "test", AppConfig::default(), 42).unwrap();
        assert!(manager.roster().get(1).unwrap().is_star);
        assert!(manager.current_match().is_none());
        assert_eq!(manager.take_notices().len(), 1);
    }

    #[test]
    fn test_second_match_needs_first_to_end() {
        let mut manager = manager_with_players();
        manager.generate_teams(&[1, 2, 3, 4, 5, 6], 1, 2).unwrap();
        manager.start_match(Some(2)).unwrap();
        assert!(matches!(manager.start_match(Some(2)), Err(CricketError::MatchAlreadyActive)));

        manager.abandon_match().unwrap();
        assert!(manager.start_match(None).is_ok());
        assert_eq!(manager.current_match().unwrap().total_overs, 20);
    }

    #[test]
    fn test_scoring_without_match_fails() {
        let mut manager = manager_with_players();
        assert!(matches!(
            manager.record_delivery(Delivery::runs(1)),
            Err(CricketError::NoActiveMatch)
        ));
        assert!(matches!(manager.end_match(), Err(CricketError::NoActiveMatch)));
    }

    #[test]
    fn test_unfinished_match_cannot_be_archived() {
        let mut manager = manager_with_players();
        manager.generate_teams(&[1, 2, 3, 4, 5, 6], 1, 2).unwrap();
        manager.start_match(Some(2)).unwrap();
        assert!(matches!(manager.end_match(), Err(CricketError::MatchNotCompleted)));
        assert!(manager.current_match().is_some());
    }

    #[test]
    fn test_players_in_live_match_cannot_be_removed() {
        let mut manager = manager_with_players();
        manager.generate_teams(&[1, 2, 3, 4], 1, 2).unwrap();
        manager.start_match(Some(2)).unwrap();
        assert!(manager.remove_player(1).is_err());
        assert!(manager.remove_player(6).is_ok());
    }

    #[test]
    fn test_wipe_returns_backup() {
        let mut manager = manager_with_players();
        play_short_match(&mut manager);
        manager.end_match().unwrap();

        let backup = manager.wipe_group().unwrap();
        assert_eq!(backup.player_info.len(), 6);
        assert_eq!(backup.matches.len(), 1);
        assert!(manager.roster().is_empty());

        let summary = manager.import(&backup).unwrap();
        assert_eq!(summary.players, 6);
        assert_eq!(manager.matches().len(), 1);
        assert_eq!(manager.roster().get(1).unwrap().career.matches, 1);
    }

    #[test]
    fn test_sync_runs_after_local_save() {
        let remote = InMemoryRemote::new();
        let mut client = SyncClient::new(Box::new(remote.clone()));
        let group = client.register("test", "secret").unwrap();

        let mut manager = manager_with_players();
        manager.attach_sync(client);
        manager
            .add_player("Arjun", BattingStyle::SoSo, BowlingStyle::Medium, false)
            .unwrap();
        assert_eq!(remote.player_count(group.id), 7);

        remote.set_reachable(false);
        manager
            .add_player("Vikram", BattingStyle::SoSo, BowlingStyle::Medium, false)
            .unwrap();
        let client = manager.sync_client().unwrap();
        assert!(!client.is_online());
        assert!(client.has_pending_upload());
        assert_eq!(manager.roster().len(), 8);
    }

    #[test]
    fn test_failed_save_is_reported() {
        let mut manager =
            CricketManager::new(Box::new(ReadOnlyStore(MemoryStore::new())), "test", AppConfig::default(), 42)
                .unwrap();
        assert!(matches!(
            manager.add_player("Anil", BattingStyle::SoSo, BowlingStyle::Fast, false),
            Err(CricketError::Storage(_))
        ));
    }
}
