//! Channel repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use chanfind_core::{Channel, ChannelRepository, Error, PropertyInstance, Result, TagInstance};

/// PostgreSQL implementation of [`ChannelRepository`] over JSONB documents.
#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Merge a patch into whatever is stored under the patch's name, inside
    /// the given transaction, and upsert the result. The row is locked for
    /// the duration so the read-modify-write is atomic per document.
    async fn merge_locked(
        tx: &mut Transaction<'_, Postgres>,
        patch: Channel,
    ) -> Result<Channel> {
        let existing = sqlx::query(
            "SELECT name, owner, properties, tags FROM channel WHERE name = $1 FOR UPDATE",
        )
        .bind(&patch.name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let merged = match existing {
            Some(row) => {
                let mut merged = row_to_channel(&row)?;
                if !patch.owner.is_empty() {
                    merged.owner = patch.owner;
                }
                for instance in patch.properties {
                    merged.set_property(instance);
                }
                for instance in patch.tags {
                    merged.set_tag(instance);
                }
                merged
            }
            None => patch,
        };

        upsert(tx, &merged).await?;
        Ok(merged)
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn find_by_id(&self, name: &str) -> Result<Option<Channel>> {
        let row = sqlx::query("SELECT name, owner, properties, tags FROM channel WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(row_to_channel).transpose()
    }

    async fn exists_by_id(&self, name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM channel WHERE name = $1)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn find_all(&self) -> Result<Vec<Channel>> {
        let rows =
            sqlx::query("SELECT name, owner, properties, tags FROM channel ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        rows.iter().map(row_to_channel).collect()
    }

    async fn save(&self, channel: Channel) -> Result<Channel> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let merged = Self::merge_locked(&mut tx, channel).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(merged)
    }

    async fn save_all(&self, channels: Vec<Channel>) -> Result<Vec<Channel>> {
        debug!(channel_count = channels.len(), "Bulk channel upsert");
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut merged = Vec::with_capacity(channels.len());
        for channel in channels {
            merged.push(Self::merge_locked(&mut tx, channel).await?);
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(merged)
    }

    async fn index(&self, channel: Channel) -> Result<Channel> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        upsert(&mut tx, &channel).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(channel)
    }

    async fn delete_by_id(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM channel WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

fn row_to_channel(row: &PgRow) -> Result<Channel> {
    let properties: Json<Vec<PropertyInstance>> =
        row.try_get("properties").map_err(Error::Database)?;
    let tags: Json<Vec<TagInstance>> = row.try_get("tags").map_err(Error::Database)?;
    Ok(Channel {
        name: row.try_get("name").map_err(Error::Database)?,
        owner: row.try_get("owner").map_err(Error::Database)?,
        properties: properties.0,
        tags: tags.0,
    })
}

async fn upsert(tx: &mut Transaction<'_, Postgres>, channel: &Channel) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO channel (name, owner, properties, tags)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE
        SET owner = EXCLUDED.owner,
            properties = EXCLUDED.properties,
            tags = EXCLUDED.tags,
            updated_at_utc = now()
        "#,
    )
    .bind(&channel.name)
    .bind(&channel.owner)
    .bind(Json(&channel.properties))
    .bind(Json(&channel.tags))
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}
