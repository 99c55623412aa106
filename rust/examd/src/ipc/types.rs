use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use super::error::HandlerErr;
use crate::db;
use crate::store::SqliteStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    /// Open (creating if needed) the workspace database and make it current.
    /// Returns whether default catalog data was seeded.
    pub fn open_workspace(&mut self, path: PathBuf, seed_defaults: bool) -> anyhow::Result<bool> {
        let conn = db::open_db(&path)?;
        let seeded = if seed_defaults {
            db::seed_defaults(&conn)?
        } else {
            false
        };
        tracing::info!(workspace = %path.display(), seeded, "workspace opened");
        self.workspace = Some(path);
        self.db = Some(conn);
        Ok(seeded)
    }

    pub fn conn(&self) -> Result<&Connection, HandlerErr> {
        self.db
            .as_ref()
            .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
    }

    pub fn store(&self) -> Result<SqliteStore<'_>, HandlerErr> {
        Ok(SqliteStore::new(self.conn()?))
    }
}
