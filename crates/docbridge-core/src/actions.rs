use docbridge_store::StoreVerb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every action a message type may name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Find,
    Remove,
    Insert,
    Set,
    Unset,
    AddToSet,
    Push,
    Pull,
}

pub const ALL_ACTIONS: [Action; 8] = [
    Action::Find,
    Action::Remove,
    Action::Insert,
    Action::Set,
    Action::Unset,
    Action::AddToSet,
    Action::Push,
    Action::Pull,
];

impl Action {
    pub fn parse(name: &str) -> Option<Self> {
        ALL_ACTIONS.into_iter().find(|action| action.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Remove => "remove",
            Self::Insert => "insert",
            Self::Set => "set",
            Self::Unset => "unset",
            Self::AddToSet => "addToSet",
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }

    /// Single-payload actions that go to the store without operator wrapping.
    pub fn is_basic(self) -> bool {
        matches!(self, Self::Insert | Self::Find | Self::Remove)
    }

    /// Actions that select by criteria and carry no data payload.
    pub fn is_query(self) -> bool {
        matches!(self, Self::Find | Self::Remove)
    }

    pub fn is_array(self) -> bool {
        matches!(self, Self::AddToSet | Self::Push | Self::Pull)
    }

    /// Update operator key for non-basic actions, e.g. `$addToSet`.
    pub fn operator(self) -> String {
        format!("${}", self.as_str())
    }

    /// Basic actions keep their own verb; everything else is an update.
    pub fn verb(self) -> StoreVerb {
        match self {
            Self::Find => StoreVerb::Find,
            Self::Remove => StoreVerb::Remove,
            Self::Insert => StoreVerb::Insert,
            Self::Set | Self::Unset | Self::AddToSet | Self::Push | Self::Pull => StoreVerb::Update,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_basic(action: &str) -> bool {
    Action::parse(action).is_some_and(Action::is_basic)
}

pub fn is_query(action: &str) -> bool {
    Action::parse(action).is_some_and(Action::is_query)
}

pub fn is_array(action: &str) -> bool {
    Action::parse(action).is_some_and(Action::is_array)
}

pub fn is_valid(action: &str) -> bool {
    Action::parse(action).is_some()
}
