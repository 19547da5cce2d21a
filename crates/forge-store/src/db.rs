//! SQLite-backed studio store
//!
//! Assets are normalized into a single table keyed by id so that an asset
//! referenced by several projects and the session is stored exactly once.
//! Projects are persisted dehydrated (id lists only) and rehydrated on
//! load. Every save garbage-collects asset rows nothing references.

use forge_core::{Asset, ContentHash, ForgeError, Project, Result};
use log::warn;
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const ACTIVE_PROJECT_KEY: &str = "active_project_id";
const SESSION_ASSETS_KEY: &str = "session_asset_ids";

/// Everything the store persists between runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredState {
    pub projects: Vec<Project>,
    pub active_project_id: Option<String>,
    pub session_assets: Vec<Asset>,
}

/// Handle to the embedded studio database
pub struct StudioStore {
    conn: Connection,
}

fn store_err(e: rusqlite::Error) -> ForgeError {
    ForgeError::StoreError(e.to_string())
}

impl StudioStore {
    /// Open (or create) the database at the given path.
    ///
    /// A file that cannot be opened or migrated is discarded and replaced
    /// with a fresh empty database rather than blocking startup.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match Self::open_and_init(path) {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!("discarding unreadable studio database {}: {}", path.display(), e);
                std::fs::remove_file(path)?;
                Self::open_and_init(path)
            }
        }
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn open_and_init(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS assets (
                    id TEXT PRIMARY KEY,
                    image_data TEXT NOT NULL,
                    prompt TEXT NOT NULL,
                    options TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    content_hash TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS projects (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    asset_ids TEXT NOT NULL,
                    position INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS metadata (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(store_err)?;
        Ok(())
    }

    /// Persist the full studio state in one transaction.
    ///
    /// Write path: upsert every asset referenced by the session or any
    /// project, delete unreferenced rows, replace the dehydrated project
    /// records, and update the metadata records.
    pub fn save(&mut self, state: &StoredState) -> Result<()> {
        let tx = self.conn.transaction().map_err(store_err)?;

        // Collect every referenced asset, de-duplicated by id
        let mut referenced: HashMap<&str, &Asset> = HashMap::new();
        for asset in &state.session_assets {
            referenced.insert(asset.id.as_str(), asset);
        }
        for project in &state.projects {
            for asset in &project.assets {
                referenced.insert(asset.id.as_str(), asset);
            }
        }

        for asset in referenced.values() {
            let options = serde_json::to_string(&asset.options)?;
            let hash = ContentHash::from_str(&asset.image_data).to_prefixed_hex();
            tx.execute(
                "INSERT OR REPLACE INTO assets (id, image_data, prompt, options, created_at, content_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![asset.id, asset.image_data, asset.prompt, options, asset.created_at, hash],
            )
            .map_err(store_err)?;
        }

        // Garbage-collect rows no project or session entry references
        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT id FROM assets").map_err(store_err)?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(store_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(store_err)?;
            ids
        };
        let mut collected = 0usize;
        for id in existing {
            if !referenced.contains_key(id.as_str()) {
                tx.execute("DELETE FROM assets WHERE id = ?1", params![id])
                    .map_err(store_err)?;
                collected += 1;
            }
        }
        if collected > 0 {
            log::debug!("garbage-collected {} unreferenced asset(s)", collected);
        }

        // Dehydrated project records, order preserved via position
        tx.execute("DELETE FROM projects", []).map_err(store_err)?;
        for (position, project) in state.projects.iter().enumerate() {
            let asset_ids: Vec<&str> = project.assets.iter().map(|a| a.id.as_str()).collect();
            let asset_ids = serde_json::to_string(&asset_ids)?;
            tx.execute(
                "INSERT INTO projects (id, name, asset_ids, position) VALUES (?1, ?2, ?3, ?4)",
                params![project.id, project.name, asset_ids, position as i64],
            )
            .map_err(store_err)?;
        }

        // Metadata records
        let active = serde_json::to_string(&state.active_project_id)?;
        let session_ids: Vec<&str> = state.session_assets.iter().map(|a| a.id.as_str()).collect();
        let session_ids = serde_json::to_string(&session_ids)?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![ACTIVE_PROJECT_KEY, active],
        )
        .map_err(store_err)?;
        tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![SESSION_ASSETS_KEY, session_ids],
        )
        .map_err(store_err)?;

        tx.commit().map_err(store_err)?;
        Ok(())
    }

    /// Load the persisted state, falling back to defaults when the prior
    /// state is empty or corrupt.
    pub fn load(&self) -> StoredState {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                warn!("failed to load studio state, starting fresh: {}", e);
                StoredState::default()
            }
        }
    }

    fn try_load(&self) -> Result<StoredState> {
        let assets = self.load_assets()?;

        let mut projects = Vec::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT id, name, asset_ids FROM projects ORDER BY position")
                .map_err(store_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(store_err)?;

            for row in rows {
                let (id, name, asset_ids) = row.map_err(store_err)?;
                let ids: Vec<String> = serde_json::from_str(&asset_ids)?;
                // Dangling references are dropped silently
                let hydrated = ids
                    .iter()
                    .filter_map(|id| assets.get(id).cloned())
                    .collect();
                projects.push(Project {
                    id,
                    name,
                    assets: hydrated,
                });
            }
        }

        let active_project_id = match self.metadata(ACTIVE_PROJECT_KEY)? {
            Some(value) => serde_json::from_str(&value)?,
            None => None,
        };

        let session_assets = match self.metadata(SESSION_ASSETS_KEY)? {
            Some(value) => {
                let ids: Vec<String> = serde_json::from_str(&value)?;
                ids.iter().filter_map(|id| assets.get(id).cloned()).collect()
            }
            None => Vec::new(),
        };

        Ok(StoredState {
            projects,
            active_project_id,
            session_assets,
        })
    }

    fn load_assets(&self) -> Result<HashMap<String, Asset>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, image_data, prompt, options, created_at, content_hash FROM assets")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(store_err)?;

        let mut assets = HashMap::new();
        for row in rows {
            let (id, image_data, prompt, options, created_at, content_hash) =
                row.map_err(store_err)?;

            if ContentHash::from_str(&image_data).to_prefixed_hex() != content_hash {
                warn!("dropping asset {} with corrupt image payload", id);
                continue;
            }
            let options = match serde_json::from_str(&options) {
                Ok(options) => options,
                Err(e) => {
                    warn!("dropping asset {} with unreadable options: {}", id, e);
                    continue;
                }
            };

            assets.insert(
                id.clone(),
                Asset {
                    id,
                    image_data,
                    prompt,
                    options,
                    created_at,
                },
            );
        }
        Ok(assets)
    }

    fn metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")
            .map_err(store_err)?;
        let mut rows = stmt.query(params![key]).map_err(store_err)?;
        match rows.next().map_err(store_err)? {
            Some(row) => Ok(Some(row.get(0).map_err(store_err)?)),
            None => Ok(None),
        }
    }

    /// Number of asset rows currently stored
    pub fn asset_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(count as usize)
    }
}
