use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use time::OffsetDateTime;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "ADMIN")]
    Admin,
    #[serde(alias = "VENDOR")]
    Vendor,
    #[serde(alias = "CUSTOMER")]
    Customer,
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "vendor" => Ok(Role::Vendor),
            "customer" => Ok(Role::Customer),
            other => Err(anyhow!("Unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Vendor => "vendor",
            Role::Customer => "customer",
        };
        write!(f, "{}", s)
    }
}

/// Full user record as stored; the password hash never leaves the process.
#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: OffsetDateTime,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name.clone(),
            business_name: user.company_name.clone(),
            phone: user.phone_number.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("vendor".parse::<Role>().unwrap(), Role::Vendor);
        assert_eq!("Customer".parse::<Role>().unwrap(), Role::Customer);
        assert!("organizer".parse::<Role>().is_err());
    }

    #[test]
    fn user_response_hides_password_hash() {
        let user = User {
            id: 7,
            email: "vendor@books.lk".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: Role::Vendor,
            full_name: Some("Nadia Perera".to_string()),
            phone_number: None,
            company_name: Some("Island Books".to_string()),
            business_reg_no: None,
            address: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };

        let body = serde_json::to_string(&UserResponse::from_user(&user)).unwrap();
        assert!(body.contains("\"businessName\":\"Island Books\""));
        assert!(body.contains("\"role\":\"vendor\""));
        assert!(!body.contains("argon2id"));
        // absent optional fields are omitted entirely
        assert!(!body.contains("phone"));
    }
}
