use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StallSize {
    #[serde(alias = "SMALL")]
    Small,
    #[serde(alias = "MEDIUM")]
    Medium,
    #[serde(alias = "LARGE")]
    Large,
}

impl FromStr for StallSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(StallSize::Small),
            "medium" => Ok(StallSize::Medium),
            "large" => Ok(StallSize::Large),
            other => Err(anyhow!("Unknown stall size: {}", other)),
        }
    }
}

impl fmt::Display for StallSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StallSize::Small => "small",
            StallSize::Medium => "medium",
            StallSize::Large => "large",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StallStatus {
    #[serde(alias = "AVAILABLE")]
    Available,
    #[serde(alias = "RESERVED")]
    Reserved,
    #[serde(alias = "UNAVAILABLE")]
    Unavailable,
}

impl FromStr for StallStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(StallStatus::Available),
            "reserved" => Ok(StallStatus::Reserved),
            "unavailable" => Ok(StallStatus::Unavailable),
            other => Err(anyhow!("Unknown stall status: {}", other)),
        }
    }
}

impl fmt::Display for StallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StallStatus::Available => "available",
            StallStatus::Reserved => "reserved",
            StallStatus::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Stall {
    pub id: i64,
    pub stall_code: String,
    pub name: Option<String>,
    pub size: StallSize,
    pub status: StallStatus,
    pub price: f64,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub stall_code: Option<String>,
    pub available: bool,
    pub message: String,
}

impl AvailabilityResponse {
    pub fn for_stall(stall: &Stall) -> Self {
        let available = stall.status == StallStatus::Available;
        let message = if available {
            "Stall is available".to_string()
        } else {
            format!("Stall is {}", stall.status)
        };
        Self {
            stall_code: Some(stall.stall_code.clone()),
            available,
            message,
        }
    }

    pub fn not_found() -> Self {
        Self {
            stall_code: None,
            available: false,
            message: "Stall not found".to_string(),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StallStats {
    pub total_stalls: i64,
    pub available_stalls: i64,
    pub reserved_stalls: i64,
    pub unavailable_stalls: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stall(status: StallStatus) -> Stall {
        Stall {
            id: 12,
            stall_code: "A-12".to_string(),
            name: None,
            size: StallSize::Medium,
            status,
            price: 15000.0,
            location: Some("Hall A".to_string()),
            description: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn availability_message_follows_status() {
        let open = AvailabilityResponse::for_stall(&stall(StallStatus::Available));
        assert!(open.available);
        assert_eq!(open.message, "Stall is available");

        let taken = AvailabilityResponse::for_stall(&stall(StallStatus::Reserved));
        assert!(!taken.available);
        assert_eq!(taken.message, "Stall is reserved");

        let missing = AvailabilityResponse::not_found();
        assert!(!missing.available);
        assert_eq!(missing.stall_code, None);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "AVAILABLE".parse::<StallStatus>().unwrap(),
            StallStatus::Available
        );
        assert_eq!(
            "Unavailable".parse::<StallStatus>().unwrap(),
            StallStatus::Unavailable
        );
        assert!("maintenance".parse::<StallStatus>().is_err());
    }

    #[test]
    fn stall_serializes_camel_case() {
        let body = serde_json::to_string(&stall(StallStatus::Available)).unwrap();
        assert!(body.contains("\"stallCode\":\"A-12\""));
        assert!(body.contains("\"size\":\"medium\""));
        assert!(body.contains("\"status\":\"available\""));
    }
}
