//! Guest repository for database operations.

use chrono::Utc;
use domain::models::{Guest, GuestFields};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::GuestEntity;
use crate::metrics::QueryTimer;

const GUEST_COLUMNS: &str = "id, family_id, first_name, last_name, email, phone, rsvp_status, \
     accommodation, room_detail, booking_method, meal_choice, dietary_restrictions, \
     plus_one, plus_one_name, note, created_at, updated_at";

/// Repository for guest-related database operations.
#[derive(Clone)]
pub struct GuestRepository {
    pool: PgPool,
}

impl GuestRepository {
    /// Creates a new GuestRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// List every guest in retrieval order (oldest first).
    pub async fn list_all(&self) -> Result<Vec<GuestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_guests");
        let result = sqlx::query_as::<_, GuestEntity>(&format!(
            "SELECT {} FROM guests ORDER BY created_at ASC, id ASC",
            GUEST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a guest. The database assigns `id`, `created_at` and `updated_at`.
    pub async fn insert(&self, row: &GuestEntity) -> Result<GuestEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_guest");
        let result = sqlx::query_as::<_, GuestEntity>(&format!(
            r#"
            INSERT INTO guests (family_id, first_name, last_name, email, phone, rsvp_status,
                                accommodation, room_detail, booking_method, meal_choice,
                                dietary_restrictions, plus_one, plus_one_name, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            GUEST_COLUMNS
        ))
        .bind(&row.family_id)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.rsvp_status)
        .bind(&row.accommodation)
        .bind(&row.room_detail)
        .bind(&row.booking_method)
        .bind(&row.meal_choice)
        .bind(&row.dietary_restrictions)
        .bind(row.plus_one)
        .bind(&row.plus_one_name)
        .bind(&row.note)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Apply a partial update to one guest.
    ///
    /// The row is locked, merged with `fields` and written back whole inside
    /// one transaction. Returns `None` if the guest does not exist.
    pub async fn update_fields(
        &self,
        id: Uuid,
        fields: &GuestFields,
    ) -> Result<Option<GuestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_guest");
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, GuestEntity>(&format!(
            "SELECT {} FROM guests WHERE id = $1 FOR UPDATE",
            GUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            timer.record();
            return Ok(None);
        };

        let mut guest =
            Guest::try_from(current).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        guest.apply(fields, Utc::now());
        let row = GuestEntity::from(&guest);

        let updated = sqlx::query_as::<_, GuestEntity>(&format!(
            r#"
            UPDATE guests
            SET family_id = $2, first_name = $3, last_name = $4, email = $5, phone = $6,
                rsvp_status = $7, accommodation = $8, room_detail = $9, booking_method = $10,
                meal_choice = $11, dietary_restrictions = $12, plus_one = $13,
                plus_one_name = $14, note = $15, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            GUEST_COLUMNS
        ))
        .bind(id)
        .bind(&row.family_id)
        .bind(&row.first_name)
        .bind(&row.last_name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.rsvp_status)
        .bind(&row.accommodation)
        .bind(&row.room_detail)
        .bind(&row.booking_method)
        .bind(&row.meal_choice)
        .bind(&row.dietary_restrictions)
        .bind(row.plus_one)
        .bind(&row.plus_one_name)
        .bind(&row.note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(updated))
    }

    /// Delete a guest. Returns the number of rows affected.
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_guest");
        let result = sqlx::query("DELETE FROM guests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Round-trip check used by readiness probes.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
