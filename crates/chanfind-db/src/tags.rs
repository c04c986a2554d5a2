//! Tag repository implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use chanfind_core::reconcile::tag_view;
use chanfind_core::{Error, Result, Tag, TagRepository};

use crate::channels::PgChannelRepository;
use crate::ChannelRepository;

/// PostgreSQL implementation of [`TagRepository`].
#[derive(Clone)]
pub struct PgTagRepository {
    pool: PgPool,
    channels: PgChannelRepository,
}

impl PgTagRepository {
    pub fn new(pool: PgPool) -> Self {
        let channels = PgChannelRepository::new(pool.clone());
        Self { pool, channels }
    }

    /// Channels currently bearing this tag, shaped for the response.
    async fn bearing_channels(&self, name: &str) -> Result<Vec<chanfind_core::Channel>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name
            FROM channel c
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(c.tags) t
                WHERE t->>'name' = $1
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
                channels.push(tag_view(&channel, name));
            }
        }
        Ok(channels)
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn find_all(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT name, owner FROM tag ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter()
            .map(|row| {
                Ok(Tag::new(
                    row.try_get::<String, _>("name").map_err(Error::Database)?,
                    row.try_get::<String, _>("owner").map_err(Error::Database)?,
                ))
            })
            .collect()
    }

    async fn find_by_id(&self, name: &str, with_channels: bool) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT name, owner FROM tag WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut tag = Tag::new(
            row.try_get::<String, _>("name").map_err(Error::Database)?,
            row.try_get::<String, _>("owner").map_err(Error::Database)?,
        );
        if with_channels {
            tag.channels = self.bearing_channels(name).await?;
        }
        Ok(Some(tag))
    }

    async fn index(&self, tag: Tag) -> Result<Tag> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        upsert_definition(&mut tx, &tag).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(tag)
    }

    async fn index_all(&self, tags: Vec<Tag>) -> Result<Vec<Tag>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for tag in &tags {
            upsert_definition(&mut tx, tag).await?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(tags)
    }

    async fn save(&self, name: &str, tag: Tag) -> Result<Tag> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        if name != tag.name {
            sqlx::query("DELETE FROM tag WHERE name = $1")
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }
        upsert_definition(&mut tx, &tag).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(tag)
    }

    async fn save_all(&self, tags: Vec<Tag>) -> Result<Vec<Tag>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for tag in &tags {
            upsert_definition(&mut tx, tag).await?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(tags)
    }

    async fn delete_by_id(&self, name: &str) -> Result<()> {
        debug!(tag = name, "Deleting tag definition");
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM tag WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        // Strip the instance from every channel document bearing it.
        sqlx::query(
            r#"
            UPDATE channel c
            SET tags = (
                SELECT COALESCE(jsonb_agg(t), '[]'::jsonb)
                FROM jsonb_array_elements(c.tags) t
                WHERE t->>'name' <> $1
            ),
            updated_at_utc = now()
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(c.tags) t
                WHERE t->>'name' = $1
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

async fn upsert_definition(tx: &mut Transaction<'_, Postgres>, tag: &Tag) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tag (name, owner)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET owner = EXCLUDED.owner
        "#,
    )
    .bind(&tag.name)
    .bind(&tag.owner)
    .execute(&mut **tx)
    .await
    .map_err(Error::Database)?;
    Ok(())
}
