use std::fmt;
use std::path::Path;

use crate::config::IN_MEMORY;
use crate::engine::{Connection, Relation};
use crate::error::{DuckPlusError, Result};
use crate::joinable::Joinable;

/// A relation together with the database path of the connection it belongs to.
#[derive(Clone)]
pub struct ConnectedRelation {
    conn_path: String,
    relation: Relation,
}

impl ConnectedRelation {
    /// Fails with `InvalidConnectionPath` unless the path is `:memory:` or
    /// points into an existing directory.
    pub fn new(relation: Relation) -> Result<Self> {
        let conn_path = relation.connection().path().to_string();
        validate_path(&conn_path)?;
        Ok(Self {
            conn_path,
            relation,
        })
    }

    pub fn conn_path(&self) -> &str {
        &self.conn_path
    }

    pub fn connection(&self) -> &Connection {
        self.relation.connection()
    }

    pub fn into_relation(self) -> Relation {
        self.relation
    }
}

fn validate_path(path: &str) -> Result<()> {
    if path == IN_MEMORY {
        return Ok(());
    }
    if path.trim().is_empty() {
        return Err(DuckPlusError::InvalidConnectionPath(path.to_string()));
    }
    let parent_exists = match Path::new(path).parent() {
        None => false,
        Some(parent) if parent.as_os_str().is_empty() => true,
        Some(parent) => parent.is_dir(),
    };
    if !parent_exists {
        return Err(DuckPlusError::InvalidConnectionPath(path.to_string()));
    }
    Ok(())
}

impl Joinable for ConnectedRelation {
    fn relation(&self) -> &Relation {
        &self.relation
    }
}

impl fmt::Display for ConnectedRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relation)
    }
}

impl fmt::Debug for ConnectedRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedRelation")
            .field("conn_path", &self.conn_path)
            .field("columns", &self.relation.columns())
            .finish()
    }
}
