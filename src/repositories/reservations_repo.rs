use anyhow::Context;
use bb8_postgres::tokio_postgres::Row;
use time::Date;

use crate::models::reservation::{
    PaymentStatus, Reservation, ReservationStats, ReservationStatus,
};
use crate::repositories::{get_postgres_connection, PgPool};

pub struct NewReservation {
    pub user_id: i64,
    pub user_email: String,
    pub business_name: Option<String>,
    pub contact_person: Option<String>,
    pub stall_ids: Vec<i64>,
    pub start_date: Date,
    pub end_date: Date,
    pub total_price: f64,
    pub notes: Option<String>,
}

pub struct ReservationsRepo {
    pool: PgPool,
}

impl ReservationsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts as pending; confirmation is a separate step so the QR code can
    /// be attached in between.
    pub async fn insert_reservation(
        &self,
        new_reservation: NewReservation,
    ) -> anyhow::Result<Reservation> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "INSERT INTO reservations \
            (user_id, user_email, business_name, contact_person, stall_ids, start_date, end_date, \
             status, payment_status, total_price, notes) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 'pending', $8, $9) \
            RETURNING *;";

        let row = conn
            .query_one(
                stmt,
                &[
                    &new_reservation.user_id,
                    &new_reservation.user_email,
                    &new_reservation.business_name,
                    &new_reservation.contact_person,
                    &new_reservation.stall_ids,
                    &new_reservation.start_date,
                    &new_reservation.end_date,
                    &new_reservation.total_price,
                    &new_reservation.notes,
                ],
            )
            .await
            .context("Failed to insert reservation")?;

        parse_row_into_reservation(row)
    }

    pub async fn set_qr_code(&self, id: i64, qr_code: &str) -> anyhow::Result<()> {
        let conn = get_postgres_connection(&self.pool).await?;
        conn.execute(
            "UPDATE reservations SET qr_code = $2, updated_at = now() WHERE id = $1;",
            &[&id, &qr_code],
        )
        .await
        .context("Failed to store reservation QR code")?;

        Ok(())
    }

    pub async fn confirm(&self, id: i64) -> anyhow::Result<Option<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt(
                "UPDATE reservations \
                 SET status = 'confirmed', confirmed_at = now(), updated_at = now() \
                 WHERE id = $1 \
                 RETURNING *;",
                &[&id],
            )
            .await
            .context("Failed to confirm reservation")?;

        row.map(parse_row_into_reservation).transpose()
    }

    pub async fn cancel(
        &self,
        id: i64,
        reason: Option<&str>,
    ) -> anyhow::Result<Option<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt(
                "UPDATE reservations \
                 SET status = 'cancelled', payment_status = 'refunded', \
                     cancelled_at = now(), cancellation_reason = $2, updated_at = now() \
                 WHERE id = $1 \
                 RETURNING *;",
                &[&id, &reason],
            )
            .await
            .context("Failed to cancel reservation")?;

        row.map(parse_row_into_reservation).transpose()
    }

    pub async fn complete(&self, id: i64) -> anyhow::Result<Option<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt(
                "UPDATE reservations \
                 SET status = 'completed', updated_at = now() \
                 WHERE id = $1 \
                 RETURNING *;",
                &[&id],
            )
            .await
            .context("Failed to complete reservation")?;

        row.map(parse_row_into_reservation).transpose()
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt("SELECT * FROM reservations WHERE id = $1 LIMIT 1;", &[&id])
            .await
            .context("Failed to look up reservation")?;

        row.map(parse_row_into_reservation).transpose()
    }

    pub async fn find_by_qr_code(&self, qr_code: &str) -> anyhow::Result<Option<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_opt(
                "SELECT * FROM reservations WHERE qr_code = $1 LIMIT 1;",
                &[&qr_code],
            )
            .await
            .context("Failed to look up reservation by QR code")?;

        row.map(parse_row_into_reservation).transpose()
    }

    pub async fn list_for_user(&self, user_id: i64) -> anyhow::Result<Vec<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query(
                "SELECT * FROM reservations WHERE user_id = $1 ORDER BY created_at DESC;",
                &[&user_id],
            )
            .await
            .context("Failed to list user reservations")?;

        rows.into_iter().map(parse_row_into_reservation).collect()
    }

    pub async fn list_all(&self) -> anyhow::Result<Vec<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query("SELECT * FROM reservations ORDER BY created_at DESC;", &[])
            .await
            .context("Failed to list reservations")?;

        rows.into_iter().map(parse_row_into_reservation).collect()
    }

    pub async fn list_by_status(
        &self,
        status: ReservationStatus,
    ) -> anyhow::Result<Vec<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let rows = conn
            .query(
                "SELECT * FROM reservations WHERE status = $1 ORDER BY created_at DESC;",
                &[&status.to_string()],
            )
            .await
            .context("Failed to list reservations by status")?;

        rows.into_iter().map(parse_row_into_reservation).collect()
    }

    pub async fn search(&self, query: &str) -> anyhow::Result<Vec<Reservation>> {
        let conn = get_postgres_connection(&self.pool).await?;
        let pattern = format!("%{}%", query);
        let stmt = "SELECT * FROM reservations \
            WHERE business_name ILIKE $1 \
            OR contact_person ILIKE $1 \
            OR user_email ILIKE $1 \
            ORDER BY created_at DESC;";

        let rows = conn
            .query(stmt, &[&pattern])
            .await
            .context("Failed to search reservations")?;

        rows.into_iter().map(parse_row_into_reservation).collect()
    }

    /// Total stalls held by a user across their pending and confirmed
    /// reservations, for the per-vendor limit.
    pub async fn count_active_stalls_for_user(&self, user_id: i64) -> anyhow::Result<i64> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_one(
                "SELECT COALESCE(SUM(cardinality(stall_ids)), 0)::bigint \
                 FROM reservations \
                 WHERE user_id = $1 AND status IN ('pending', 'confirmed');",
                &[&user_id],
            )
            .await
            .context("Failed to count user's reserved stalls")?;

        Ok(row.get(0))
    }

    /// Active reservations holding the stall over any day of the range.
    pub async fn count_overlapping(
        &self,
        stall_id: i64,
        start_date: Date,
        end_date: Date,
    ) -> anyhow::Result<i64> {
        let conn = get_postgres_connection(&self.pool).await?;
        let row = conn
            .query_one(
                "SELECT count(*) FROM reservations \
                 WHERE $1 = ANY(stall_ids) \
                 AND status IN ('pending', 'confirmed') \
                 AND start_date <= $3 AND end_date >= $2;",
                &[&stall_id, &start_date, &end_date],
            )
            .await
            .context("Failed to check reservation overlap")?;

        Ok(row.get(0))
    }

    pub async fn stats(&self) -> anyhow::Result<ReservationStats> {
        let conn = get_postgres_connection(&self.pool).await?;
        let stmt = "SELECT \
            count(*) AS total, \
            count(*) FILTER (WHERE status = 'confirmed') AS confirmed, \
            count(*) FILTER (WHERE status = 'pending') AS pending, \
            count(*) FILTER (WHERE status = 'cancelled') AS cancelled \
            FROM reservations;";

        let row = conn
            .query_one(stmt, &[])
            .await
            .context("Failed to compute reservation stats")?;

        Ok(ReservationStats {
            total_reservations: row.get("total"),
            confirmed_reservations: row.get("confirmed"),
            pending_reservations: row.get("pending"),
            cancelled_reservations: row.get("cancelled"),
        })
    }
}

fn parse_row_into_reservation(row: Row) -> anyhow::Result<Reservation> {
    Ok(Reservation {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_email: row.get("user_email"),
        business_name: row.get("business_name"),
        contact_person: row.get("contact_person"),
        stall_ids: row.get("stall_ids"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        status: row.get::<&str, String>("status").parse()?,
        payment_status: row.get::<&str, String>("payment_status").parse::<PaymentStatus>()?,
        total_price: row.get("total_price"),
        qr_code: row.get("qr_code"),
        notes: row.get("notes"),
        cancellation_reason: row.get("cancellation_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        confirmed_at: row.get("confirmed_at"),
        cancelled_at: row.get("cancelled_at"),
    })
}
