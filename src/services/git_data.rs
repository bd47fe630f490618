//! Git tree lookups and the caller-owned tree SHA cache.

use crate::client::{GitHubClient, QueryParams};
use crate::errors::GitHubResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Path to blob SHA for one tree.
pub type ShaMap = HashMap<String, String>;

/// Service for Git Data operations.
pub struct GitDataService<'a> {
    client: &'a GitHubClient,
}

impl<'a> GitDataService<'a> {
    /// Creates a new Git Data service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets a tree by SHA or ref name.
    pub async fn get_tree(&self, owner: &str, repo: &str, tree_ref: &str, recursive: bool) -> GitHubResult<Tree> {
        let path = format!("/repos/{}/{}/git/trees/{}", owner, repo, tree_ref);
        let params = recursive.then(|| QueryParams::new().with("recursive", "1"));
        self.client.get(&path, params.as_ref()).await
    }

    /// Maps every blob path under `tree_ref` to its SHA.
    pub async fn blob_shas(&self, owner: &str, repo: &str, tree_ref: &str) -> GitHubResult<ShaMap> {
        let tree = self.get_tree(owner, repo, tree_ref, true).await?;
        if tree.truncated {
            tracing::warn!(owner, repo, tree_ref, "Tree listing truncated; SHA map is partial");
        }
        Ok(tree.blob_shas())
    }
}

/// A Git tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// The SHA of the tree.
    pub sha: String,
    /// The URL of the tree.
    #[serde(default)]
    pub url: Option<String>,
    /// The tree entries.
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// Whether the listing hit the API's size limit.
    #[serde(default)]
    pub truncated: bool,
}

impl Tree {
    /// Collects `path -> sha` for blob entries.
    pub fn blob_shas(&self) -> ShaMap {
        self.tree
            .iter()
            .filter(|entry| entry.entry_type == "blob")
            .filter_map(|entry| entry.sha.clone().map(|sha| (entry.path.clone(), sha)))
            .collect()
    }
}

/// A tree entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    /// The path of the entry.
    pub path: String,
    /// The file mode.
    pub mode: String,
    /// The type of entry (blob, tree, commit).
    #[serde(rename = "type")]
    pub entry_type: String,
    /// The SHA of the entry.
    pub sha: Option<String>,
    /// The size in bytes (for blobs).
    #[serde(default)]
    pub size: Option<u64>,
}

/// Cache key: one tree per repository ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeKey {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Ref or tree SHA.
    pub git_ref: String,
}

impl TreeKey {
    /// Creates a key.
    pub fn new(owner: &str, repo: &str, git_ref: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            git_ref: git_ref.to_string(),
        }
    }
}

/// Memoizes blob SHA maps per `(owner, repo, ref)`.
///
/// Owned by the caller; the client never consults it. Entries are kept
/// until `invalidate` or `clear` is called.
#[derive(Debug, Default)]
pub struct TreeShaCache {
    entries: HashMap<TreeKey, Arc<ShaMap>>,
}

impl TreeShaCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached trees.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets a cached map without fetching.
    pub fn get(&self, owner: &str, repo: &str, git_ref: &str) -> Option<Arc<ShaMap>> {
        self.entries.get(&TreeKey::new(owner, repo, git_ref)).cloned()
    }

    /// Gets the map for a ref, fetching it on first use.
    pub async fn get_or_fetch(
        &mut self,
        client: &GitHubClient,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> GitHubResult<Arc<ShaMap>> {
        let key = TreeKey::new(owner, repo, git_ref);
        if let Some(map) = self.entries.get(&key) {
            return Ok(map.clone());
        }

        let map = Arc::new(client.git_data().blob_shas(owner, repo, git_ref).await?);
        self.entries.insert(key, map.clone());
        Ok(map)
    }

    /// Gets the blob SHA of `path` at `git_ref`, if the file exists.
    pub async fn file_sha(
        &mut self,
        client: &GitHubClient,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: &str,
    ) -> GitHubResult<Option<String>> {
        let map = self.get_or_fetch(client, owner, repo, git_ref).await?;
        Ok(map.get(path.trim_start_matches('/')).cloned())
    }

    /// Drops one entry. Returns true if it was cached.
    pub fn invalidate(&mut self, owner: &str, repo: &str, git_ref: &str) -> bool {
        self.entries.remove(&TreeKey::new(owner, repo, git_ref)).is_some()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
