use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[serde(alias = "RESERVATION")]
    Reservation,
    #[serde(alias = "REGISTRATION")]
    Registration,
    #[serde(alias = "SYSTEM")]
    System,
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reservation" => Ok(NotificationKind::Reservation),
            "registration" => Ok(NotificationKind::Registration),
            "system" => Ok(NotificationKind::System),
            other => Err(anyhow!("Unknown notification type: {}", other)),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::Reservation => "reservation",
            NotificationKind::Registration => "registration",
            NotificationKind::System => "system",
        };
        write!(f, "{}", s)
    }
}

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub reference_id: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total_notifications: i64,
    pub unread_notifications: i64,
    pub read_notifications: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_as_type_field() {
        let n = Notification {
            id: 1,
            user_id: 9,
            title: "Stall Reservation Confirmation".to_string(),
            message: "Reservation #4 confirmed".to_string(),
            kind: NotificationKind::Reservation,
            read: false,
            reference_id: Some("4".to_string()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let body = serde_json::to_string(&n).unwrap();
        assert!(body.contains("\"type\":\"reservation\""));
        assert!(body.contains("\"read\":false"));
    }
}
