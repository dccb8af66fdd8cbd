use super::types::{
    BatchChange, BatchChangeKind, CreateRepositoryOptions, RemoteSnapshot, RepoRef,
    RepositoryInfo,
};
use super::{ContentStore, StoreError};
use crate::utils::compute_hash;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// A call observed by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Fetch { path: String },
    Create { path: String },
    Update { path: String, version_token: Option<String> },
    Delete { path: String, version_token: Option<String> },
    BatchCommit { paths: Vec<String> },
    CreateRepository { name: String },
}

impl StoreCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::Fetch { .. })
    }
}

type FileKey = (RepoRef, String, String);

#[derive(Default)]
struct MemoryState {
    files: HashMap<FileKey, Vec<u8>>,
    repositories: HashSet<String>,
    calls: Vec<StoreCall>,
    fetch_failures: HashMap<String, StoreError>,
    write_failures: HashMap<String, StoreError>,
    batch_failure: Option<StoreError>,
}

/// In-process content store keyed by repository, branch and path.
///
/// Version tokens are the SHA-256 of the stored content, so a token changes
/// exactly when the content does. Writes follow forge semantics: creating an
/// existing path or updating/deleting with a stale or missing token is a
/// conflict. Failures can be injected per path or for combined commits.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a call
    pub async fn insert(&self, repo: &RepoRef, branch: &str, path: &str, content: &[u8]) {
        let mut state = self.state.lock().await;
        state
            .files
            .insert(file_key(repo, branch, path), content.to_vec());
    }

    pub async fn content(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        state.files.get(&file_key(repo, branch, path)).cloned()
    }

    /// Version token the store currently holds for a path
    pub async fn version_token(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<String> {
        self.content(repo, branch, path)
            .await
            .map(|content| compute_hash(&content))
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn write_count(&self) -> usize {
        let state = self.state.lock().await;
        state.calls.iter().filter(|call| call.is_write()).count()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn fail_fetch(&self, path: &str, error: StoreError) {
        let mut state = self.state.lock().await;
        state.fetch_failures.insert(path.to_string(), error);
    }

    pub async fn fail_write(&self, path: &str, error: StoreError) {
        let mut state = self.state.lock().await;
        state.write_failures.insert(path.to_string(), error);
    }

    pub async fn fail_batch(&self, error: StoreError) {
        self.state.lock().await.batch_failure = Some(error);
    }
}

fn file_key(repo: &RepoRef, branch: &str, path: &str) -> FileKey {
    (repo.clone(), branch.to_string(), path.to_string())
}

fn check_token(
    current: &[u8],
    path: &str,
    version_token: Option<&str>,
) -> Result<(), StoreError> {
    let expected = compute_hash(current);
    match version_token {
        Some(token) if token == expected => Ok(()),
        Some(token) => Err(StoreError::Conflict {
            status: 409,
            body: format!("sha {token} does not match current sha {expected} of {path}"),
        }),
        None => Err(StoreError::Conflict {
            status: 422,
            body: format!("sha is required to change {path}"),
        }),
    }
}

impl MemoryState {
    fn injected_write_failure(&self, path: &str) -> Result<(), StoreError> {
        match self.write_failures.get(path) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn apply_create(&mut self, key: FileKey, content: &[u8]) -> Result<(), StoreError> {
        if self.files.contains_key(&key) {
            return Err(StoreError::Conflict {
                status: 422,
                body: format!("repository file already exists: {}", key.2),
            });
        }
        self.files.insert(key, content.to_vec());
        Ok(())
    }

    fn apply_update(
        &mut self,
        key: FileKey,
        content: &[u8],
        version_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let current = self
            .files
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.2.clone()))?;
        check_token(current, &key.2, version_token)?;
        self.files.insert(key, content.to_vec());
        Ok(())
    }

    fn apply_delete(&mut self, key: FileKey, version_token: Option<&str>) -> Result<(), StoreError> {
        let current = self
            .files
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(key.2.clone()))?;
        check_token(current, &key.2, version_token)?;
        self.files.remove(&key);
        Ok(())
    }

    fn apply_change(
        &mut self,
        repo: &RepoRef,
        branch: &str,
        change: &BatchChange,
    ) -> Result<(), StoreError> {
        let key = file_key(repo, branch, &change.path);
        let content = change.content.as_deref().unwrap_or_default();
        match change.kind {
            BatchChangeKind::Create => self.apply_create(key, content),
            BatchChangeKind::Update => {
                self.apply_update(key, content, change.version_token.as_deref())
            }
            BatchChangeKind::Delete => self.apply_delete(key, change.version_token.as_deref()),
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteSnapshot>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Fetch {
            path: path.to_string(),
        });
        if let Some(error) = state.fetch_failures.get(path) {
            return Err(error.clone());
        }

        Ok(state
            .files
            .get(&file_key(repo, reference, path))
            .map(|content| RemoteSnapshot {
                path: path.to_string(),
                version_token: compute_hash(content),
                content: content.clone(),
            }))
    }

    async fn create(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        _message: &str,
        branch: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Create {
            path: path.to_string(),
        });
        state.injected_write_failure(path)?;
        state.apply_create(file_key(repo, branch, path), content)
    }

    async fn update(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        _message: &str,
        branch: &str,
        version_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Update {
            path: path.to_string(),
            version_token: version_token.map(str::to_string),
        });
        state.injected_write_failure(path)?;
        state.apply_update(file_key(repo, branch, path), content, version_token)
    }

    async fn delete(
        &self,
        repo: &RepoRef,
        path: &str,
        _message: &str,
        branch: &str,
        version_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::Delete {
            path: path.to_string(),
            version_token: version_token.map(str::to_string),
        });
        state.injected_write_failure(path)?;
        state.apply_delete(file_key(repo, branch, path), version_token)
    }

    async fn batch_commit(
        &self,
        repo: &RepoRef,
        changes: &[BatchChange],
        _message: &str,
        branch: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::BatchCommit {
            paths: changes.iter().map(|c| c.path.clone()).collect(),
        });
        if let Some(error) = &state.batch_failure {
            return Err(error.clone());
        }

        // All-or-nothing: apply to a scratch copy and swap on success.
        let mut staged = MemoryState {
            files: state.files.clone(),
            ..MemoryState::default()
        };
        for change in changes {
            state.injected_write_failure(&change.path)?;
            staged.apply_change(repo, branch, change)?;
        }
        state.files = staged.files;
        Ok(())
    }

    async fn create_repository(
        &self,
        options: &CreateRepositoryOptions,
    ) -> Result<RepositoryInfo, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(StoreCall::CreateRepository {
            name: options.name.clone(),
        });

        let owner = options.organization.as_deref().unwrap_or("me");
        let full_name = format!("{owner}/{}", options.name);
        if !state.repositories.insert(full_name.clone()) {
            return Err(StoreError::Conflict {
                status: 409,
                body: format!("repository {full_name} already exists"),
            });
        }

        Ok(RepositoryInfo {
            full_name,
            html_url: None,
            clone_url: None,
            default_branch: Some(options.default_branch.clone()),
            private: options.private,
            created_at: Some(chrono::Utc::now()),
        })
    }
}
