use std::fmt;

use serde::{Deserialize, Serialize};

/// Payment entitlement of a user.
///
/// Only `Paid` unlocks extraction. Unknown users are treated as `Unpaid`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entitlement {
    Paid,
    #[default]
    Unpaid,
}

impl Entitlement {
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
        }
    }
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
