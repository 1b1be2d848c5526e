use gnindex_schema::Operation;
use gnindex_store::MigrationId;
use serde::{Deserialize, Serialize};

/// One migration: an `up` operation and, when it can be reverted, a `down`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    pub id: MigrationId,
    pub description: String,
    pub up: Operation,
    pub down: Option<Operation>,
}

impl MigrationUnit {
    /// An irreversible unit until [`with_down`](Self::with_down) is called.
    pub fn new(id: MigrationId, description: impl Into<String>, up: Operation) -> Self {
        Self {
            id,
            description: description.into(),
            up,
            down: None,
        }
    }

    /// A unit whose `down` is the inverse of `up`, or irreversible when some
    /// action of `up` has no inverse.
    pub fn change(id: MigrationId, description: impl Into<String>, up: Operation) -> Self {
        let down = up.inverse();

        Self {
            down,
            ..Self::new(id, description, up)
        }
    }

    pub fn with_down(mut self, down: Operation) -> Self {
        self.down = Some(down);
        self
    }

    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }
}
