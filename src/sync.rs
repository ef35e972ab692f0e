//! Best-effort synchronisation with the group backend.
//!
//! Local storage is always the source of truth. A failed upload marks the
//! client offline and keeps the payload for the next attempt; it never
//! fails the local operation that triggered it.

use crate::error::{CricketError, Result};
use crate::interchange::{BattingRow, BowlingRow, ExportDocument, MatchRow, PlayerInfoRow};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// SHA-256 of the password, lowercase hex. Only the hash leaves the device.
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Body of `POST /groups` and `POST /groups/auth`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupRequest {
    pub group_name: String,
    pub password_hash: String,
}

impl GroupRequest {
    pub fn new(group_name: &str, password: &str) -> Self {
        Self {
            group_name: group_name.trim().to_string(),
            password_hash: hash_password(password),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: u64,
    pub name: String,
}

/// Response of `POST /groups/auth`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub group: Option<GroupInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthResponse {
    pub fn into_result(self) -> Result<GroupInfo> {
        match (self.success, self.group) {
            (true, Some(group)) => Ok(group),
            _ => Err(CricketError::Sync(
                self.error
                    .unwrap_or_else(|| "authentication failed".to_string()),
            )),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceData {
    #[serde(default)]
    pub batting: Vec<BattingRow>,
    #[serde(default)]
    pub bowling: Vec<BowlingRow>,
}

/// Group data as exchanged with the backend
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    #[serde(default)]
    pub players: Vec<PlayerInfoRow>,
    #[serde(default)]
    pub matches: Vec<MatchRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_data: Option<PerformanceData>,
}

impl From<ExportDocument> for SyncPayload {
    fn from(doc: ExportDocument) -> Self {
        Self {
            players: doc.player_info,
            matches: doc.matches,
            performance_data: Some(PerformanceData {
                batting: doc.match_batting_performance,
                bowling: doc.match_bowling_performance,
            }),
        }
    }
}

impl From<SyncPayload> for ExportDocument {
    fn from(payload: SyncPayload) -> Self {
        let performance = payload.performance_data.unwrap_or_default();
        ExportDocument {
            player_info: payload.players,
            matches: payload.matches,
            match_batting_performance: performance.batting,
            match_bowling_performance: performance.bowling,
            ..ExportDocument::default()
        }
    }
}

/// Body of `POST /sync/upload`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub group_id: u64,
    #[serde(flatten)]
    pub data: SyncPayload,
}

/// The group backend
pub trait RemoteRepository {
    /// Register a new group; fails if the name is taken
    fn create_group(&mut self, request: &GroupRequest) -> Result<GroupInfo>;
    fn authenticate(&mut self, request: &GroupRequest) -> Result<GroupInfo>;
    fn download(&mut self, group_id: u64) -> Result<SyncPayload>;
    /// Upsert players and matches by id
    fn upload(&mut self, request: &UploadRequest) -> Result<()>;
    fn health(&mut self) -> Result<()>;
}

#[derive(Debug, Default)]
struct RemoteData {
    groups: Vec<(GroupInfo, String)>,
    players: BTreeMap<u64, BTreeMap<String, PlayerInfoRow>>,
    matches: BTreeMap<u64, BTreeMap<String, MatchRow>>,
    batting: BTreeMap<u64, Vec<BattingRow>>,
    bowling: BTreeMap<u64, Vec<BowlingRow>>,
    unreachable: bool,
}

impl RemoteData {
    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(CricketError::Sync("network unavailable".to_string()));
        }
        Ok(())
    }

    fn check_group(&self, group_id: u64) -> Result<()> {
        if self.groups.iter().any(|(g, _)| g.id == group_id) {
            Ok(())
        } else {
            Err(CricketError::Sync(format!("group {} does not exist", group_id)))
        }
    }
}

/// Backend kept in memory. Clones share the same data, so a test can hold
/// one handle and cut the network while a client owns another.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRemote {
    data: Rc<RefCell<RemoteData>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.data.borrow_mut().unreachable = !reachable;
    }

    pub fn player_count(&self, group_id: u64) -> usize {
        self.data
            .borrow()
            .players
            .get(&group_id)
            .map(|p| p.len())
            .unwrap_or(0)
    }
}

fn player_key(row: &PlayerInfoRow) -> String {
    match row.player_id.id() {
        Some(id) => id.to_string(),
        None => row.name.to_ascii_lowercase(),
    }
}

impl RemoteRepository for InMemoryRemote {
    fn create_group(&mut self, request: &GroupRequest) -> Result<GroupInfo> {
        let mut data = self.data.borrow_mut();
        data.check_reachable()?;
        if request.group_name.is_empty() {
            return Err(CricketError::Sync("group name is required".to_string()));
        }
        if data
            .groups
            .iter()
            .any(|(g, _)| g.name.eq_ignore_ascii_case(&request.group_name))
        {
            return Err(CricketError::Sync(format!(
                "group {} already exists",
                request.group_name
            )));
        }
        let group = GroupInfo {
            id: data.groups.len() as u64 + 1,
            name: request.group_name.clone(),
        };
        data.groups.push((group.clone(), request.password_hash.clone()));
        Ok(group)
    }

    fn authenticate(&mut self, request: &GroupRequest) -> Result<GroupInfo> {
        let data = self.data.borrow();
        data.check_reachable()?;
        let group = data
            .groups
            .iter()
            .find(|(g, hash)| {
                g.name.eq_ignore_ascii_case(&request.group_name) && *hash == request.password_hash
            })
            .map(|(g, _)| g.clone());
        group.ok_or_else(|| CricketError::Sync("invalid group name or password".to_string()))
    }

    fn download(&mut self, group_id: u64) -> Result<SyncPayload> {
        let data = self.data.borrow();
        data.check_reachable()?;
        data.check_group(group_id)?;
        let payload = SyncPayload {
            players: data
                .players
                .get(&group_id)
                .map(|p| p.values().cloned().collect())
                .unwrap_or_default(),
            matches: data
                .matches
                .get(&group_id)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default(),
            performance_data: Some(PerformanceData {
                batting: data.batting.get(&group_id).cloned().unwrap_or_default(),
                bowling: data.bowling.get(&group_id).cloned().unwrap_or_default(),
            }),
        };
        Ok(payload)
    }

    fn upload(&mut self, request: &UploadRequest) -> Result<()> {
        let mut data = self.data.borrow_mut();
        data.check_reachable()?;
        data.check_group(request.group_id)?;
        let group_id = request.group_id;

        let players = data.players.entry(group_id).or_default();
        for row in &request.data.players {
            players.insert(player_key(row), row.clone());
        }
        let matches = data.matches.entry(group_id).or_default();
        for row in &request.data.matches {
            matches.insert(row.match_id.clone(), row.clone());
        }
        if let Some(performance) = &request.data.performance_data {
            let uploaded: Vec<&String> = request.data.matches.iter().map(|m| &m.match_id).collect();
            let batting = data.batting.entry(group_id).or_default();
            batting.retain(|b| !uploaded.contains(&&b.match_id));
            batting.extend(performance.batting.iter().cloned());
            let bowling = data.bowling.entry(group_id).or_default();
            bowling.retain(|b| !uploaded.contains(&&b.match_id));
            bowling.extend(performance.bowling.iter().cloned());
        }
        Ok(())
    }

    fn health(&mut self) -> Result<()> {
        self.data.borrow().check_reachable()
    }
}

/// Remote access with offline degradation
pub struct SyncClient {
    remote: Box<dyn RemoteRepository>,
    online: bool,
    group: Option<GroupInfo>,
    pending_upload: Option<UploadRequest>,
}

impl SyncClient {
    pub fn new(remote: Box<dyn RemoteRepository>) -> Self {
        Self {
            remote,
            online: true,
            group: None,
            pending_upload: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn group(&self) -> Option<&GroupInfo> {
        self.group.as_ref()
    }

    pub fn has_pending_upload(&self) -> bool {
        self.pending_upload.is_some()
    }

    pub fn register(&mut self, group_name: &str, password: &str) -> Result<GroupInfo> {
        let request = GroupRequest::new(group_name, password);
        let group = self.remote.create_group(&request)?;
        log::info!("Registered group {} ({})", group.name, group.id);
        self.login_as(group.clone());
        Ok(group)
    }

    pub fn login(&mut self, group_name: &str, password: &str) -> Result<GroupInfo> {
        let request = GroupRequest::new(group_name, password);
        let group = self.remote.authenticate(&request)?;
        log::info!("Signed in to group {} ({})", group.name, group.id);
        self.login_as(group.clone());
        Ok(group)
    }

    fn login_as(&mut self, group: GroupInfo) {
        self.group = Some(group);
        self.online = true;
        self.pending_upload = None;
    }

    pub fn logout(&mut self) {
        self.group = None;
        self.pending_upload = None;
    }

    /// Queue `data` for upload and try to send it. Returns whether the
    /// backend now has it. A newer payload replaces any pending one.
    pub fn push(&mut self, data: SyncPayload) -> bool {
        let Some(group) = &self.group else {
            return false;
        };
        self.pending_upload = Some(UploadRequest {
            group_id: group.id,
            data,
        });
        self.retry()
    }

    /// Send the pending upload, if any
    pub fn retry(&mut self) -> bool {
        let Some(request) = &self.pending_upload else {
            return true;
        };
        match self.remote.upload(request) {
            Ok(()) => {
                log::debug!("Uploaded group {} data", request.group_id);
                self.pending_upload = None;
                self.online = true;
                true
            }
            Err(e) => {
                log::warn!("Sync failed, working offline: {}", e);
                self.online = false;
                false
            }
        }
    }

    /// Fetch the group's data from the backend
    pub fn pull(&mut self) -> Result<SyncPayload> {
        let group_id = self
            .group
            .as_ref()
            .map(|g| g.id)
            .ok_or_else(|| CricketError::Sync("not signed in to a group".to_string()))?;
        match self.remote.download(group_id) {
            Ok(payload) => {
                self.online = true;
                Ok(payload)
            }
            Err(e) => {
                log::warn!("Download failed, working offline: {}", e);
                self.online = false;
                Err(e)
            }
        }
    }

    /// Probe the backend; a success also flushes any pending upload
    pub fn check_health(&mut self) -> bool {
        self.online = self.remote.health().is_ok();
        if self.online && self.pending_upload.is_some() {
            self.retry();
        }
        self.online
    }
}
