//! Execution strategy selector stored with each sync configuration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy used to walk a configuration's account list.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// One account at a time.
    #[default]
    #[sea_orm(string_value = "sequential")]
    Sequential,
    /// Fixed chunks of `max_concurrent_accounts` run concurrently.
    #[sea_orm(string_value = "parallel")]
    Parallel,
    /// Chunk size tuned after every chunk from measured throughput.
    #[sea_orm(string_value = "adaptive")]
    Adaptive,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Sequential => write!(f, "sequential"),
            SyncMode::Parallel => write!(f, "parallel"),
            SyncMode::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(SyncMode::Sequential),
            "parallel" | "par" => Ok(SyncMode::Parallel),
            "adaptive" | "auto" => Ok(SyncMode::Adaptive),
            _ => Err(format!("Unknown sync mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SyncMode::Sequential.to_string(), "sequential");
        assert_eq!(SyncMode::Parallel.to_string(), "parallel");
        assert_eq!(SyncMode::Adaptive.to_string(), "adaptive");
    }

    #[test]
    fn test_from_str_accepts_aliases() {
        assert_eq!("PARALLEL".parse::<SyncMode>().unwrap(), SyncMode::Parallel);
        assert_eq!("auto".parse::<SyncMode>().unwrap(), SyncMode::Adaptive);
        assert_eq!("seq".parse::<SyncMode>().unwrap(), SyncMode::Sequential);
        assert!("burst".parse::<SyncMode>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&SyncMode::Adaptive).unwrap();
        assert_eq!(json, "\"adaptive\"");
    }
}
