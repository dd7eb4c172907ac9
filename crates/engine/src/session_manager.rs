// SPDX-License-Identifier: MIT

//! `SessionManager` (C6): the single source of truth for session metadata
//! and the routing layer over executors (spec §4.6).

use chost_core::{
    executor_key, slug::generate_slug, time::now_secs, ExecutorKey, HostError, IdGen, Mode, Session,
    SequentialIdGen, LOCAL_EXECUTOR_ID,
};
use chost_storage::MetadataStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::EngineError;
use crate::executor_interface::{ExecutorInterface, LocalExecutor};
use crate::registry::{ExecutorRegistry, SessionLiveness};

/// Sessions whose executor has been offline longer than this are dropped
/// from `list`. Not specified numerically by name in the source material;
/// chosen generously since pruning is destructive and offline executors
/// routinely reconnect.
pub const ABANDON_THRESHOLD_SECS: i64 = 24 * 60 * 60;

pub struct SessionManager {
    metadata: Arc<dyn MetadataStore>,
    local: Arc<LocalExecutor>,
    registry: ExecutorRegistry,
    ids: Arc<dyn IdGen>,
    admin_email: Option<String>,
    sessions_root: PathBuf,
    abandon_threshold_secs: i64,
}

impl SessionManager {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        local: Arc<LocalExecutor>,
        registry: ExecutorRegistry,
        sessions_root: PathBuf,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            metadata,
            local,
            registry,
            ids: Arc::new(SequentialIdGen::default()),
            admin_email,
            sessions_root,
            abandon_threshold_secs: ABANDON_THRESHOLD_SECS,
        }
    }

    /// Override the abandon-prune threshold (spec §10.3 live configuration
    /// overrides).
    pub fn with_abandon_threshold_secs(mut self, secs: i64) -> Self {
        self.abandon_threshold_secs = secs;
        self
    }

    fn session_dir(&self, name: &str) -> PathBuf {
        self.sessions_root.join(name)
    }

    /// The in-process executor, for callers (the Frontdoor's attach handlers)
    /// that need direct access to `TerminalBridge`/`RichBridgeHandle` rather
    /// than going through `ExecutorInterface` (spec §9 "attach is not part
    /// of this trait").
    pub fn local_executor(&self) -> &Arc<LocalExecutor> {
        &self.local
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Look up a session row and check ownership, without dispatching any
    /// executor operation. Used by attach handlers before splicing a socket.
    pub async fn get_owned_session(&self, user_id: &str, name: &str) -> Result<Session, EngineError> {
        let session = self
            .metadata
            .get_session(name)
            .await?
            .ok_or_else(|| EngineError::Host(HostError::NotFound(name.to_string())))?;
        if !session.is_owned_by(user_id) {
            return Err(EngineError::Host(HostError::NotOwned));
        }
        Ok(session)
    }

    /// Resolve an executor id to the trait object that should carry the
    /// operation, checking that a remote executor is online and owned by
    /// `user_id` when it isn't `"local"`.
    async fn resolve_executor(&self, user_id: &str, executor_id: &str) -> Result<Arc<dyn ExecutorInterface>, EngineError> {
        if executor_id == LOCAL_EXECUTOR_ID {
            return Ok(self.local.clone() as Arc<dyn ExecutorInterface>);
        }
        let info = self
            .registry
            .info(executor_id)
            .ok_or_else(|| EngineError::Host(HostError::NotFound(executor_id.to_string())))?;
        if !info.is_owned_by(user_id) {
            return Err(EngineError::Host(HostError::NotFound(executor_id.to_string())));
        }
        Ok(Arc::new(crate::executor_interface::RemoteExecutor::new(
            self.registry.clone(),
            executor_id.to_string(),
        )) as Arc<dyn ExecutorInterface>)
    }

    pub async fn create(
        &self,
        user_id: &str,
        description: &str,
        command: &str,
        mode: Mode,
        executor_id: Option<&str>,
    ) -> Result<Session, EngineError> {
        let executor_id = executor_id.unwrap_or(LOCAL_EXECUTOR_ID).to_string();
        let executor = self.resolve_executor(user_id, &executor_id).await?;

        let name = generate_slug(self.ids.as_ref());
        let cwd = self.session_dir(&name);
        tokio::fs::create_dir_all(&cwd).await.map_err(|e| EngineError::Host(HostError::IoFailure(e.to_string())))?;

        match mode {
            Mode::Terminal => executor.create_session(&name, &cwd, command, &[]).await?,
            Mode::Rich => executor.create_rich_session(&name, &cwd, command).await?,
        };

        let now = now_secs();
        let session = Session::new(
            name,
            user_id,
            executor_id,
            mode,
            command,
            description,
            None,
            now,
            None,
            None,
        )
        .map_err(EngineError::Host)?;
        self.metadata.put_session(session.clone()).await?;
        Ok(session)
    }

    pub async fn create_job(
        &self,
        user_id: &str,
        prompt: &str,
        max_iterations: u32,
        executor_id: Option<&str>,
        agent_command: &str,
    ) -> Result<Session, EngineError> {
        let executor_id = executor_id.unwrap_or(LOCAL_EXECUTOR_ID).to_string();
        let executor = self.resolve_executor(user_id, &executor_id).await?;

        let name = generate_slug(self.ids.as_ref());
        let cwd = self.session_dir(&name);
        tokio::fs::create_dir_all(&cwd).await.map_err(|e| EngineError::Host(HostError::IoFailure(e.to_string())))?;

        executor
            .create_job(&name, &cwd, agent_command, prompt, max_iterations, &[])
            .await?;

        let now = now_secs();
        let session = Session::new(
            name,
            user_id,
            executor_id,
            Mode::Terminal,
            agent_command,
            format!("job: {prompt}"),
            None,
            now,
            Some(prompt.to_string()),
            Some(max_iterations),
        )
        .map_err(EngineError::Host)?;
        self.metadata.put_session(session.clone()).await?;
        Ok(session)
    }

    pub async fn fork(&self, user_id: &str, source_name: &str, executor_id: Option<&str>) -> Result<Session, EngineError> {
        let source = self
            .metadata
            .get_session(source_name)
            .await?
            .ok_or_else(|| EngineError::Host(HostError::NotFound(source_name.to_string())))?;
        if !source.is_owned_by(user_id) {
            return Err(EngineError::Host(HostError::NotOwned));
        }

        let executor_id = executor_id.unwrap_or(&source.executor_id).to_string();
        let executor = self.resolve_executor(user_id, &executor_id).await?;

        let fork_hooks = self.load_fork_hooks(user_id).await?;
        let new_name = generate_slug(self.ids.as_ref());
        executor
            .fork_session(chost_adapters::ForkRequest {
                source_name: source_name.to_string(),
                new_name: new_name.clone(),
                fork_hooks,
            })
            .await?;

        let now = now_secs();
        let session = Session::new(
            new_name,
            user_id,
            executor_id,
            source.mode,
            source.command.clone(),
            format!("forked from {source_name}"),
            Some(source_name.to_string()),
            now,
            None,
            None,
        )
        .map_err(EngineError::Host)?;
        self.metadata.put_session(session.clone()).await?;
        Ok(session)
    }

    async fn load_fork_hooks(&self, user_id: &str) -> Result<HashMap<String, String>, EngineError> {
        match self.metadata.get_config(user_id, "forkHooks").await? {
            Some(value) => {
                let raw = value.as_str().unwrap_or_default();
                Ok(chost_core::config::parse_fork_hooks(raw).unwrap_or_default())
            }
            None => Ok(HashMap::new()),
        }
    }

    /// Rows owned by `user_id`, overlaid with each executor's latest
    /// heartbeat-cached liveness; rows whose executor has been offline
    /// beyond `ABANDON_THRESHOLD_SECS` are pruned from the store.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Session>, EngineError> {
        let all = self.metadata.list_sessions().await?;
        let now = now_secs();
        let mut kept = Vec::new();

        for mut session in all.into_iter().filter(|s| s.is_owned_by(user_id)) {
            if session.executor_id != LOCAL_EXECUTOR_ID {
                let info = self.registry.info(&session.executor_id);
                // An executor this control-plane has never heard from this
                // lifetime (a restart, or one that simply hasn't dialed in
                // yet) is not itself grounds to prune — fall back to the
                // session's own last-activity timestamp rather than
                // treating registry silence as abandonment.
                let last_seen = info.as_ref().map(|i| i.last_seen).unwrap_or(session.last_activity);

                if now - last_seen > self.abandon_threshold_secs {
                    self.metadata.delete_session(&session.name).await?;
                    continue;
                }

                if let Some(info) = info {
                    if info.status == chost_core::ExecutorStatus::Online {
                        if let Some(live) = self
                            .registry
                            .sessions(&session.executor_id)
                            .into_iter()
                            .find(|s| s.name == session.name)
                        {
                            session.last_activity = live.last_activity;
                        }
                    }
                }
            }
            kept.push(session);
        }
        Ok(kept)
    }

    pub async fn delete(&self, user_id: &str, name: &str, executor_id: &str) -> Result<(), EngineError> {
        let Some(session) = self.metadata.get_session(name).await? else {
            return Ok(());
        };
        if !session.is_owned_by(user_id) {
            return Err(EngineError::Host(HostError::NotOwned));
        }
        let executor = self.resolve_executor(user_id, executor_id).await?;
        match session.mode {
            Mode::Terminal => executor.delete_session(name).await?,
            Mode::Rich => executor.delete_rich_session(name).await?,
        }
        self.metadata.delete_session(name).await?;
        Ok(())
    }

    pub async fn snapshot(&self, user_id: &str, name: &str, executor_id: &str) -> Result<String, EngineError> {
        let session = self
            .metadata
            .get_session(name)
            .await?
            .ok_or_else(|| EngineError::Host(HostError::NotFound(name.to_string())))?;
        if !session.is_owned_by(user_id) {
            return Err(EngineError::Host(HostError::NotOwned));
        }
        let executor = self.resolve_executor(user_id, executor_id).await?;
        match session.mode {
            Mode::Terminal => executor.snapshot_session(name, 200).await,
            Mode::Rich => executor.snapshot_rich_session(name).await,
        }
    }

    /// Summarize a session's pane tail with a one-shot agent invocation
    /// (spec §4.1 "Analyze / summarize"). `prompt` is the caller-supplied
    /// instruction; the pane's own content is folded in by the caller.
    pub async fn summarize(
        &self,
        user_id: &str,
        name: &str,
        executor_id: &str,
        prompt: &str,
    ) -> Result<chost_adapters::probe::ProbeResult, EngineError> {
        let session = self.get_owned_session(user_id, name).await?;
        let executor = self.resolve_executor(user_id, executor_id).await?;
        executor.summarize_session(&session.command, prompt).await
    }

    pub async fn analyze(
        &self,
        user_id: &str,
        name: &str,
        executor_id: &str,
        prompt: &str,
    ) -> Result<chost_adapters::probe::ProbeResult, EngineError> {
        let session = self.get_owned_session(user_id, name).await?;
        let executor = self.resolve_executor(user_id, executor_id).await?;
        executor.analyze_session(&session.command, prompt).await
    }

    pub async fn get_config(&self, user_id: &str, key: &str) -> Result<Option<serde_json::Value>, EngineError> {
        Ok(self.metadata.get_config(user_id, key).await?)
    }

    pub async fn put_config(&self, user_id: &str, key: &str, value: serde_json::Value) -> Result<(), EngineError> {
        self.metadata.put_config(user_id, key, value).await?;
        Ok(())
    }

    /// All executors currently or previously known to the registry/store,
    /// including the synthetic `"local"` record (spec §4.3). Live registry
    /// state (online/offline, last heartbeat) always wins over whatever was
    /// last persisted, since the registry reflects this process's actual
    /// connections.
    pub async fn list_executors(&self) -> Result<Vec<chost_core::ExecutorRecord>, EngineError> {
        let mut by_id: HashMap<String, chost_core::ExecutorRecord> = self
            .metadata
            .list_executors()
            .await?
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();

        for record in self.registry.all() {
            by_id.insert(record.id.clone(), record);
        }

        by_id
            .entry(LOCAL_EXECUTOR_ID.to_string())
            .or_insert_with(|| chost_core::ExecutorRecord::local(now_secs()));

        Ok(by_id.into_values().collect())
    }

    /// Called on every heartbeat: reconcile the store against what the
    /// executor actually reports running (spec §4.6 "control-plane
    /// restarts and hand-off between executors safe").
    pub async fn adopt_orphaned_sessions(
        &self,
        executor_id: &str,
        owner_user_id: &str,
        liveness: &[SessionLiveness],
    ) -> Result<(), EngineError> {
        let reported: std::collections::HashSet<&str> = liveness.iter().map(|s| s.name.as_str()).collect();
        let known = self.metadata.list_sessions().await?;
        let known_for_executor: Vec<Session> = known.into_iter().filter(|s| s.executor_id == executor_id).collect();
        let known_names: std::collections::HashSet<&str> = known_for_executor.iter().map(|s| s.name.as_str()).collect();

        let now = now_secs();
        for live in liveness {
            if !known_names.contains(live.name.as_str()) {
                let session = Session::new(
                    live.name.clone(),
                    owner_user_id,
                    executor_id,
                    Mode::Terminal,
                    String::new(),
                    "adopted".to_string(),
                    None,
                    now,
                    None,
                    None,
                )
                .map_err(EngineError::Host)?;
                self.metadata.put_session(session).await?;
            }
        }

        for session in known_for_executor {
            if !reported.contains(session.name.as_str()) {
                self.metadata.delete_session(&session.name).await?;
            }
        }
        Ok(())
    }

    /// First login of the configured admin email: claim every row with an
    /// empty `owner_user_id`. Idempotent.
    pub async fn adopt_unowned_resources(&self, user_id: &str, login_email: &str) -> Result<(), EngineError> {
        if self.admin_email.as_deref() != Some(login_email) {
            return Ok(());
        }
        for mut session in self.metadata.list_sessions().await? {
            if session.owner_user_id.is_empty() {
                session.owner_user_id = user_id.to_string();
                self.metadata.put_session(session).await?;
            }
        }
        Ok(())
    }

    pub async fn create_executor_key(
        &self,
        user_id: &str,
        name: &str,
        expires_at: Option<i64>,
    ) -> Result<(ExecutorKey, String), EngineError> {
        let token = executor_key::generate_token();
        let key = ExecutorKey {
            id: self.ids.next(),
            owner_user_id: user_id.to_string(),
            name: name.to_string(),
            key_hash: executor_key::hash_token(&token),
            key_prefix: executor_key::display_prefix(&token),
            created_at: now_secs(),
            expires_at,
            last_used: None,
            revoked: false,
        };
        self.metadata.put_executor_key(key.clone()).await?;
        Ok((key, token))
    }

    pub async fn list_executor_keys(&self, user_id: &str) -> Result<Vec<ExecutorKey>, EngineError> {
        Ok(self
            .metadata
            .list_executor_keys()
            .await?
            .into_iter()
            .filter(|k| k.owner_user_id == user_id)
            .collect())
    }

    pub async fn revoke_executor_key(&self, user_id: &str, key_id: &str) -> Result<(), EngineError> {
        let mut key = self
            .metadata
            .get_executor_key(key_id)
            .await?
            .ok_or_else(|| EngineError::Host(HostError::NotFound(key_id.to_string())))?;
        if key.owner_user_id != user_id {
            return Err(EngineError::Host(HostError::NotOwned));
        }
        key.revoked = true;
        self.metadata.put_executor_key(key).await?;
        Ok(())
    }

    /// Parse, look up by prefix, constant-time-compare the hash, and (on
    /// success) bump `last_used` (spec §4.6, §6).
    pub async fn validate_executor_key(&self, token: &str) -> Result<Option<ExecutorKey>, EngineError> {
        if !executor_key::looks_like_token(token) {
            return Ok(None);
        }
        let prefix = executor_key::display_prefix(token);
        let presented_hash = executor_key::hash_token(token);
        let now = now_secs();

        for mut key in self.metadata.list_executor_keys().await? {
            if key.key_prefix != prefix {
                continue;
            }
            if !executor_key::constant_time_eq(&key.key_hash, &presented_hash) {
                continue;
            }
            if !key.is_usable_at(now) {
                return Ok(None);
            }
            key.last_used = Some(now);
            self.metadata.put_executor_key(key.clone()).await?;
            return Ok(Some(key));
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;
