//! A file-backed token store

use std::{ffi::OsStr, io, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use super::{StoreError, TokenStore};
use crate::{OAuth2AccessToken, Principal, PrincipalRef, ResourceId, ResourceIdRef};

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    principal: Principal,
    resource: ResourceId,
    token: OAuth2AccessToken,
}

/// A token store that persists all tokens to a local JSON file
///
/// Every operation reads the whole file and, when modifying, replaces it
/// with a complete new copy. A missing file is treated as an empty store. On unix the file is
/// created readable only by its owner.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Constructs a new file token store
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn read_tokens(&self) -> Result<Vec<StoredToken>, StoreError> {
        use tokio::io::AsyncReadExt;

        let mut file = match OpenOptions::new().read(true).open(&self.path).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut data = String::new();
        file.read_to_string(&mut data).await?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&data)?)
    }

    /// Writes every entry to a staging file beside the store, then renames
    /// it into place
    async fn write_tokens(&self, tokens: &[StoredToken]) -> Result<(), StoreError> {
        use tokio::io::AsyncWriteExt;

        let data = serde_json::to_string_pretty(tokens)?;
        let staging = self.staging_path();

        match fs::remove_file(&staging).await {
            Ok(()) => tracing::debug!(path = %staging.display(), "removed stale staging file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let mut file_opts = OpenOptions::new();

        file_opts.create_new(true).write(true);

        #[cfg(unix)]
        file_opts.mode(0o600);

        let mut file = file_opts.open(&staging).await?;
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn is_entry_for(entry: &StoredToken, principal: &PrincipalRef, resource: &ResourceIdRef) -> bool {
    *entry.principal == *principal && *entry.resource == *resource
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn lookup(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<Option<OAuth2AccessToken>, StoreError> {
        let _guard = self.lock.lock().await;
        let tokens = self.read_tokens().await?;
        Ok(tokens
            .into_iter()
            .find(|e| is_entry_for(e, principal, resource))
            .map(|e| e.token))
    }

    async fn evict(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut tokens = self.read_tokens().await?;
        let before = tokens.len();
        tokens.retain(|e| !is_entry_for(e, principal, resource));

        if tokens.len() != before {
            self.write_tokens(&tokens).await?;
            tracing::trace!(path = %self.path.display(), %principal, %resource, "evicted token from file");
        }

        Ok(())
    }

    async fn store(
        &self,
        principal: &PrincipalRef,
        resource: &ResourceIdRef,
        token: OAuth2AccessToken,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut tokens = self.read_tokens().await?;
        tokens.retain(|e| !is_entry_for(e, principal, resource));
        tokens.push(StoredToken {
            principal: principal.to_owned(),
            resource: resource.to_owned(),
            token,
        });
        self.write_tokens(&tokens).await
    }
}
