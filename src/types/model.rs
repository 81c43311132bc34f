use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chat model identifier.
///
/// Either one of the models this client knows by name or a custom string passed through
/// verbatim, for proxies and services that host other models.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Models known by name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// GPT-4o, the default higher-capability model.
    #[serde(rename = "gpt-4o")]
    Gpt4o,

    /// GPT-4o mini.
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,

    /// GPT-4.
    #[serde(rename = "gpt-4")]
    Gpt4,

    /// GPT-3.5 Turbo, the lower-cost model.
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl Model {
    /// The model used when nothing else is requested.
    pub const fn capable() -> Self {
        Model::Known(KnownModel::Gpt4o)
    }

    /// The lower-cost model selected by `--cheap`.
    pub const fn cheap() -> Self {
        Model::Known(KnownModel::Gpt35Turbo)
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::capable()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownModel::Gpt4o => write!(f, "gpt-4o"),
            KnownModel::Gpt4oMini => write!(f, "gpt-4o-mini"),
            KnownModel::Gpt4 => write!(f, "gpt-4"),
            KnownModel::Gpt35Turbo => write!(f, "gpt-3.5-turbo"),
        }
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt-4o" => Ok(KnownModel::Gpt4o),
            "gpt-4o-mini" => Ok(KnownModel::Gpt4oMini),
            "gpt-4" => Ok(KnownModel::Gpt4),
            "gpt-3.5-turbo" => Ok(KnownModel::Gpt35Turbo),
            _ => Err(format!("unknown model: {s}")),
        }
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<KnownModel>()
            .map(Model::Known)
            .unwrap_or_else(|_| Model::Custom(s.to_string())))
    }
}
