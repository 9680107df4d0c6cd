use anyhow::Context;
use bb8_postgres::tokio_postgres::Row;

use crate::models::user::{Role, User};
use crate::repositories::{get_postgres_connection, PgPool};

pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
}

#[derive(Default)]
pub struct UserChanges {
    pub role: Option<Role>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
}

pub struct UsersRepo {
    pool: PgPool,
}

impl UsersRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_user(&self, new_user: NewUser) -> anyhow::Result<User> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "INSERT INTO users \
            (email, password_hash, role, full_name, phone_number, company_name, business_reg_no, address) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
            RETURNING *;";

        let row = conn
            .query_one(
                stmt,
                &[
                    &new_user.email,
                    &new_user.password_hash,
                    &new_user.role.to_string(),
                    &new_user.full_name,
                    &new_user.phone_number,
                    &new_user.company_name,
                    &new_user.business_reg_no,
                    &new_user.address,
                ],
            )
            .await
            .context("Failed to insert user")?;

        parse_row_into_user(row)
    }

    pub async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT * FROM users WHERE email = $1 LIMIT 1;";

        let row = conn
            .query_opt(stmt, &[&email])
            .await
            .context("Failed to look up user by email")?;

        row.map(parse_row_into_user).transpose()
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT * FROM users WHERE id = $1 LIMIT 1;";

        let row = conn
            .query_opt(stmt, &[&id])
            .await
            .context("Failed to look up user by id")?;

        row.map(parse_row_into_user).transpose()
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT * FROM users ORDER BY created_at DESC;";

        let rows = conn
            .query(stmt, &[])
            .await
            .context("Failed to list users")?;

        rows.into_iter().map(parse_row_into_user).collect()
    }

    pub async fn update_user(&self, id: i64, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "UPDATE users SET \
            role = COALESCE($2, role), \
            full_name = COALESCE($3, full_name), \
            phone_number = COALESCE($4, phone_number), \
            company_name = COALESCE($5, company_name), \
            business_reg_no = COALESCE($6, business_reg_no), \
            address = COALESCE($7, address), \
            updated_at = now() \
            WHERE id = $1 \
            RETURNING *;";

        let row = conn
            .query_opt(
                stmt,
                &[
                    &id,
                    &changes.role.map(|r| r.to_string()),
                    &changes.full_name,
                    &changes.phone_number,
                    &changes.company_name,
                    &changes.business_reg_no,
                    &changes.address,
                ],
            )
            .await
            .context("Failed to update user")?;

        row.map(parse_row_into_user).transpose()
    }

    pub async fn delete_user(&self, id: i64) -> anyhow::Result<bool> {
        let conn = get_postgres_connection(&self.pool).await?;
        let deleted = conn
            .execute("DELETE FROM users WHERE id = $1;", &[&id])
            .await
            .context("Failed to delete user")?;

        Ok(deleted > 0)
    }

    pub async fn count_users(&self) -> anyhow::Result<i64> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_one("SELECT count(*) FROM users;", &[])
            .await
            .context("Failed to count users")?;

        Ok(row.get(0))
    }
}

fn parse_row_into_user(row: Row) -> anyhow::Result<User> {
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get::<&str, String>("role").parse()?,
        full_name: row.get("full_name"),
        phone_number: row.get("phone_number"),
        company_name: row.get("company_name"),
        business_reg_no: row.get("business_reg_no"),
        address: row.get("address"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
