use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A FieldView field as returned by the platform. Unknown keys are kept in
/// `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    pub boundary_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViewUser {
    pub firstname: String,
    pub lastname: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a successful OAuth2 code or refresh-token exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    pub access_token: String,
    pub refresh_token: String,
    pub user: FieldViewUser,
}

/// The three activity layers the platform exposes in paginated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Activity {
    AsPlanted,
    AsHarvested,
    AsApplied,
}

impl Activity {
    pub const ALL: [Activity; 3] = [
        Activity::AsPlanted,
        Activity::AsHarvested,
        Activity::AsApplied,
    ];

    /// Layer name as it appears in platform URLs.
    pub fn layer_name(self) -> &'static str {
        match self {
            Activity::AsPlanted => "asPlanted",
            Activity::AsHarvested => "asHarvested",
            Activity::AsApplied => "asApplied",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.layer_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity layer '{0}'")]
pub struct UnknownActivity(pub String);

impl FromStr for Activity {
    type Err = UnknownActivity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Activity::ALL
            .into_iter()
            .find(|a| a.layer_name() == s)
            .ok_or_else(|| UnknownActivity(s.to_string()))
    }
}

/// One page of activity records plus the continuation token, when the
/// platform reported more records behind the cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPage {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}
