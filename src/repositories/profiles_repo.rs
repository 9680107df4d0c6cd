use anyhow::Context;
use bb8_postgres::tokio_postgres::Row;

use crate::models::profile::Profile;
use crate::repositories::{get_postgres_connection, PgPool};

#[derive(Default)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub literary_genres: Option<Vec<String>>,
}

pub struct ProfilesRepo {
    pool: PgPool,
}

impl ProfilesRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> anyhow::Result<Option<Profile>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt(
                "SELECT * FROM profiles WHERE user_id = $1 LIMIT 1;",
                &[&user_id],
            )
            .await
            .context("Failed to look up profile")?;

        row.map(parse_row_into_profile).transpose()
    }

    pub async fn list_profiles(&self) -> anyhow::Result<Vec<Profile>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query("SELECT * FROM profiles ORDER BY created_at DESC;", &[])
            .await
            .context("Failed to list profiles")?;

        rows.into_iter().map(parse_row_into_profile).collect()
    }

    /// Creates the profile on first write, then only overwrites the fields
    /// present in the request.
    pub async fn upsert_profile(
        &self,
        user_id: i64,
        changes: ProfileChanges,
    ) -> anyhow::Result<Profile> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "INSERT INTO profiles \
            (user_id, full_name, email, phone_number, company_name, business_reg_no, address, literary_genres) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '{}')) \
            ON CONFLICT (user_id) DO UPDATE SET \
            full_name = COALESCE($2, profiles.full_name), \
            email = COALESCE($3, profiles.email), \
            phone_number = COALESCE($4, profiles.phone_number), \
            company_name = COALESCE($5, profiles.company_name), \
            business_reg_no = COALESCE($6, profiles.business_reg_no), \
            address = COALESCE($7, profiles.address), \
            literary_genres = COALESCE($8, profiles.literary_genres), \
            updated_at = now() \
            RETURNING *;";

        let row = conn
            .query_one(
                stmt,
                &[
                    &user_id,
                    &changes.full_name,
                    &changes.email,
                    &changes.phone_number,
                    &changes.company_name,
                    &changes.business_reg_no,
                    &changes.address,
                    &changes.literary_genres,
                ],
            )
            .await
            .context("Failed to upsert profile")?;

        parse_row_into_profile(row)
    }
}

fn parse_row_into_profile(row: Row) -> anyhow::Result<Profile> {
    Ok(Profile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone_number: row.get("phone_number"),
        company_name: row.get("company_name"),
        business_reg_no: row.get("business_reg_no"),
        address: row.get("address"),
        literary_genres: row.get("literary_genres"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
