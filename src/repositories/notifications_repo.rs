use anyhow::Context;
use bb8_postgres::tokio_postgres::Row;

use crate::models::notification::{Notification, NotificationKind, NotificationStats};
use crate::repositories::{get_postgres_connection, PgPool};

pub struct NotificationsRepo {
    pool: PgPool,
}

impl NotificationsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_notification(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
        kind: NotificationKind,
        reference_id: Option<&str>,
    ) -> anyhow::Result<Notification> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "INSERT INTO notifications (user_id, title, message, kind, reference_id) \
            VALUES ($1, $2, $3, $4, $5) \
            RETURNING *;";

        let row = conn
            .query_one(
                stmt,
                &[&user_id, &title, &message, &kind.to_string(), &reference_id],
            )
            .await
            .context("Failed to insert notification")?;

        parse_row_into_notification(row)
    }

    /// One insert per registered user, in a single statement.
    pub async fn insert_for_all_users(
        &self,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> anyhow::Result<u64> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "INSERT INTO notifications (user_id, title, message, kind) \
            SELECT id, $1, $2, $3 FROM users;";

        let inserted = conn
            .execute(stmt, &[&title, &message, &kind.to_string()])
            .await
            .context("Failed to broadcast notification")?;

        Ok(inserted)
    }

    pub async fn list_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Notification>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query(
                "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC;",
                &[&user_id],
            )
            .await
            .context("Failed to list notifications")?;

        rows.into_iter().map(parse_row_into_notification).collect()
    }

    pub async fn unread_count(&self, user_id: i64) -> anyhow::Result<i64> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_one(
                "SELECT count(*) FROM notifications WHERE user_id = $1 AND NOT is_read;",
                &[&user_id],
            )
            .await
            .context("Failed to count unread notifications")?;

        Ok(row.get(0))
    }

    /// Marks one of the caller's notifications read. False when the row does
    /// not exist or belongs to someone else.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> anyhow::Result<bool> {
        let conn = get_postgres_connection(&self.pool).await?;
        let updated = conn
            .execute(
                "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2;",
                &[&id, &user_id],
            )
            .await
            .context("Failed to mark notification read")?;

        Ok(updated > 0)
    }

    pub async fn mark_all_read(&self, user_id: i64) -> anyhow::Result<u64> {
        let conn = get_postgres_connection(&self.pool).await?;
        let updated = conn
            .execute(
                "UPDATE notifications SET is_read = true WHERE user_id = $1 AND NOT is_read;",
                &[&user_id],
            )
            .await
            .context("Failed to mark notifications read")?;

        Ok(updated)
    }

    pub async fn delete_notification(&self, id: i64, user_id: i64) -> anyhow::Result<bool> {
        let conn = get_postgres_connection(&self.pool).await?;
        let deleted = conn
            .execute(
                "DELETE FROM notifications WHERE id = $1 AND user_id = $2;",
                &[&id, &user_id],
            )
            .await
            .context("Failed to delete notification")?;

        Ok(deleted > 0)
    }

    pub async fn stats_for_user(&self, user_id: i64) -> anyhow::Result<NotificationStats> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT \
            count(*) AS total, \
            count(*) FILTER (WHERE NOT is_read) AS unread, \
            count(*) FILTER (WHERE is_read) AS read_count \
            FROM notifications WHERE user_id = $1;";

        let row = conn
            .query_one(stmt, &[&user_id])
            .await
            .context("Failed to compute notification stats")?;

        Ok(NotificationStats {
            total_notifications: row.get("total"),
            unread_notifications: row.get("unread"),
            read_notifications: row.get("read_count"),
        })
    }
}

fn parse_row_into_notification(row: Row) -> anyhow::Result<Notification> {
    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        message: row.get("message"),
        kind: row.get::<&str, String>("kind").parse()?,
        read: row.get("is_read"),
        reference_id: row.get("reference_id"),
        created_at: row.get("created_at"),
    })
}
