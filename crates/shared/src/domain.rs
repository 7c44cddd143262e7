use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ContextId);
id_newtype!(RecordId);

impl ContextId {
    /// No parent scope is active.
    pub const NONE: ContextId = ContextId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl RecordId {
    /// Nothing selected.
    pub const NONE: RecordId = RecordId(0);
    /// Reserved route value that asks the detail surface to start a new record.
    pub const CREATE: RecordId = RecordId(-1);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_create(self) -> bool {
        self == Self::CREATE
    }

    /// True for ids that can name a stored record.
    pub fn is_persisted(self) -> bool {
        self.0 > 0
    }
}

/// Who currently holds the edit lock on the detail surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub ip: String,
}
