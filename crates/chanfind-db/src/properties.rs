//! Property repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use chanfind_core::reconcile::property_view;
use chanfind_core::{Error, Property, PropertyRepository, Result};

use crate::channels::PgChannelRepository;
use crate::ChannelRepository;

/// PostgreSQL implementation of [`PropertyRepository`].
///
/// Carries a channel repository handle to populate denormalized channel
/// lists and to strip instances from channel documents on delete.
#[derive(Clone)]
pub struct PgPropertyRepository {
    pool: PgPool,
    channels: PgChannelRepository,
}

impl PgPropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        let channels = PgChannelRepository::new(pool.clone());
        Self { pool, channels }
    }

    /// Channels currently bearing this property with a non-empty value,
    /// shaped for the response: single instance, tags stripped.
    async fn bearing_channels(&self, name: &str) -> Result<Vec<chanfind_core::Channel>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name
            FROM channel c
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(c.properties) p
                WHERE p->>'name' = $1 AND COALESCE(p->>'value', '') <> ''
            )
            ORDER BY c.name
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut channels = Vec::with_capacity(rows.len());
        for row in rows {
            let channel_name: String = row.try_get("name").map_err(Error::Database)?;
            if let Some(channel) = self.channels.find_by_id(&channel_name).await? {
                channels.push(property_view(&channel, name));
            }
        }
        Ok(channels)
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    async fn find_all(&self) -> Result<Vec<Property>> {
        let rows = sqlx::query("SELECT name, owner FROM property ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                Ok(Property::new(
                    row.try_get::<String, _>("name").map_err(Error::Database)?,
                    row.try_get::<String, _>("owner").map_err(Error::Database)?,
                ))
            })
            .collect()
    }

    async fn find_by_id(&self, name: &str, with_channels: bool) -> Result<Option<Property>> {
        let row = sqlx::query("SELECT name, owner FROM property WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut property = Property::new(
            row.try_get::<String, _>("name").map_err(Error::Database)?,
            row.try_get::<String, _>("owner").map_err(Error::Database)?,
        );
        if with_channels {
            property.channels = self.bearing_channels(name).await?;
        }
        Ok(Some(property))
    }

    async fn index(&self, property: Property) -> Result<Property> {
        upsert_definition(&self.pool, &property).await?;
        Ok(property)
    }

    async fn index_all(&self, properties: Vec<Property>) -> Result<Vec<Property>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for property in &properties {
            upsert_definition_tx(&mut tx, property).await?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(properties)
    }

    async fn save(&self, name: &str, property: Property) -> Result<Property> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        if name != property.name {
            // Rename: drop the row stored under the old name.
            sqlx::query("DELETE FROM property WHERE name = $1")
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }
        upsert_definition_tx(&mut tx, &property).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(property)
    }

    async fn save_all(&self, properties: Vec<Property>) -> Result<Vec<Property>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for property in &properties {
            upsert_definition_tx(&mut tx, property).await?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(properties)
    }

    async fn delete_by_id(&self, name: &str) -> Result<()> {
        debug!(property = name, "Deleting property definition");
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM property WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // Strip the instance (tombstones included) from every channel
        // document bearing it.
        sqlx::query(
            r#"
            UPDATE channel c
            SET properties = (
                SELECT COALESCE(jsonb_agg(p), '[]'::jsonb)
                FROM jsonb_array_elements(c.properties) p
                WHERE p->>'name' <> $1
            ),
            updated_at_utc = now()
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(c.properties) p
                WHERE p->>'name' = $1
            )
            "#,
        )
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

async fn upsert_definition(pool: &PgPool, property: &Property) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO property (name, owner)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET owner = EXCLUDED.owner
        "#,
    )
    .bind(&property.name)
    .bind(&property.owner)
    .execute(pool)
    .await
    .map_err(Error::Database)?;
    Ok(())
}

async fn upsert_definition_tx(
    tx: &mut Transaction<'_, Postgres>,
    property: &Property,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO property (name, owner)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET owner = EXCLUDED.owner
        "#,
    )
    .bind(&property.name)
    .bind(&property.owner)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}
