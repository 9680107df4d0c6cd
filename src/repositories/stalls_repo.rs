use anyhow::Context;
use bb8_postgres::tokio_postgres::Row;

use crate::models::stall::{Stall, StallSize, StallStats, StallStatus};
use crate::repositories::{get_postgres_connection, PgPool};

pub struct NewStall {
    pub stall_code: String,
    pub name: Option<String>,
    pub size: StallSize,
    pub status: StallStatus,
    pub price: f64,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct StallChanges {
    pub name: Option<String>,
    pub size: Option<StallSize>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
}

pub struct StallsRepo {
    pool: PgPool,
}

impl StallsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn stall_code_exists(&self, stall_code: &str) -> anyhow::Result<bool> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_one(
                "SELECT count(*) FROM stalls WHERE stall_code = $1;",
                &[&stall_code],
            )
            .await
            .context("Failed to check stall code")?;

        Ok(row.get::<usize, i64>(0) > 0)
    }

    pub async fn insert_stall(&self, new_stall: NewStall) -> anyhow::Result<Stall> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "INSERT INTO stalls \
            (stall_code, name, size, status, price, location, description) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) \
            RETURNING *;";

        let row = conn
            .query_one(
                stmt,
                &[
                    &new_stall.stall_code,
                    &new_stall.name,
                    &new_stall.size.to_string(),
                    &new_stall.status.to_string(),
                    &new_stall.price,
                    &new_stall.location,
                    &new_stall.description,
                ],
            )
            .await
            .context("Failed to insert stall")?;

        parse_row_into_stall(row)
    }

    pub async fn list_stalls(&self) -> anyhow::Result<Vec<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query("SELECT * FROM stalls ORDER BY stall_code;", &[])
            .await
            .context("Failed to list stalls")?;

        rows.into_iter().map(parse_row_into_stall).collect()
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt("SELECT * FROM stalls WHERE id = $1 LIMIT 1;", &[&id])
            .await
            .context("Failed to look up stall")?;

        row.map(parse_row_into_stall).transpose()
    }

    pub async fn list_by_ids(&self, ids: &[i64]) -> anyhow::Result<Vec<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let ids = ids.to_vec();
        let rows = conn
            .query("SELECT * FROM stalls WHERE id = ANY($1);", &[&ids])
            .await
            .context("Failed to list stalls by ids")?;

        rows.into_iter().map(parse_row_into_stall).collect()
    }

    pub async fn list_by_status(&self, status: StallStatus) -> anyhow::Result<Vec<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query(
                "SELECT * FROM stalls WHERE status = $1 ORDER BY stall_code;",
                &[&status.to_string()],
            )
            .await
            .context("Failed to list stalls by status")?;

        rows.into_iter().map(parse_row_into_stall).collect()
    }

    /// Available stalls, optionally narrowed by size and location.
    pub async fn list_available(
        &self,
        size: Option<StallSize>,
        location: Option<&str>,
    ) -> anyhow::Result<Vec<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT * FROM stalls \
            WHERE status = 'available' \
            AND ($1::text IS NULL OR size = $1) \
            AND ($2::text IS NULL OR location ILIKE $2) \
            ORDER BY stall_code;";

        let rows = conn
            .query(stmt, &[&size.map(|s| s.to_string()), &location])
            .await
            .context("Failed to list available stalls")?;

        rows.into_iter().map(parse_row_into_stall).collect()
    }

    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let pattern = format!("%{}%", query);
        let stmt = "SELECT * FROM stalls \
            WHERE stall_code ILIKE $1 \
            OR name ILIKE $1 \
            OR location ILIKE $1 \
            OR description ILIKE $1 \
            ORDER BY stall_code;";

        let rows = conn
            .query(stmt, &[&pattern])
            .await
            .context("Failed to search stalls")?;

        rows.into_iter().map(parse_row_into_stall).collect()
    }

    pub async fn update_stall(
        &self,
        id: i64,
        changes: StallChanges,
    ) -> anyhow::Result<Option<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "UPDATE stalls SET \
            name = COALESCE($2, name), \
            size = COALESCE($3, size), \
            price = COALESCE($4, price), \
            location = COALESCE($5, location), \
            description = COALESCE($6, description), \
            updated_at = now() \
            WHERE id = $1 \
            RETURNING *;";

        let row = conn
            .query_opt(
                stmt,
                &[
                    &id,
                    &changes.name,
                    &changes.size.map(|s| s.to_string()),
                    &changes.price,
                    &changes.location,
                    &changes.description,
                ],
            )
            .await
            .context("Failed to update stall")?;

        row.map(parse_row_into_stall).transpose()
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: StallStatus,
    ) -> anyhow::Result<Option<Stall>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt(
                "UPDATE stalls SET status = $2, updated_at = now() WHERE id = $1 RETURNING *;",
                &[&id, &status.to_string()],
            )
            .await
            .context("Failed to update stall status")?;

        row.map(parse_row_into_stall).transpose()
    }

    /// Flip a whole reservation's stalls in one statement.
    pub async fn set_status_many(&self, ids: &[i64], status: StallStatus) -> anyhow::Result<()> {
        let conn = get_postgres_connection(&self.pool).await?;
        let ids = ids.to_vec();
        conn.execute(
            "UPDATE stalls SET status = $2, updated_at = now() WHERE id = ANY($1);",
            &[&ids, &status.to_string()],
        )
        .await
        .context("Failed to update stall statuses")?;

        Ok(())
    }

    pub async fn delete_stall(&self, id: i64) -> anyhow::Result<bool> {
        let conn = get_postgres_connection(&self.pool).await?;
        let deleted = conn
            .execute("DELETE FROM stalls WHERE id = $1;", &[&id])
            .await
            .context("Failed to delete stall")?;

        Ok(deleted > 0)
    }

    pub async fn stats(&self) -> anyhow::Result<StallStats> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT \
            count(*) AS total, \
            count(*) FILTER (WHERE status = 'available') AS available, \
            count(*) FILTER (WHERE status = 'reserved') AS reserved, \
            count(*) FILTER (WHERE status = 'unavailable') AS unavailable \
            FROM stalls;";

        let row = conn
            .query_one(stmt, &[])
            .await
            .context("Failed to compute stall stats")?;

        Ok(StallStats {
            total_stalls: row.get("total"),
            available_stalls: row.get("available"),
            reserved_stalls: row.get("reserved"),
            unavailable_stalls: row.get("unavailable"),
        })
    }
}

fn parse_row_into_stall(row: Row) -> anyhow::Result<Stall> {
    Ok(Stall {
        id: row.get("id"),
        stall_code: row.get("stall_code"),
        name: row.get("name"),
        size: row.get::<&str, String>("size").parse()?,
        status: row.get::<&str, String>("status").parse()?,
        price: row.get("price"),
        location: row.get("location"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
