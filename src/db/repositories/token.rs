use anyhow::{Context, Result};
use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::entities::revoked_tokens;

pub struct TokenRepository {
    conn: DatabaseConnection,
}

impl TokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Add a token ID to the denylist. Idempotent: revoking an already
    /// revoked jti is a no-op.
    pub async fn revoke(&self, jti: &str, reason: &str) -> Result<()> {
        let active = revoked_tokens::ActiveModel {
            jti: Set(jti.to_string()),
            revoked_at: Set(chrono::Utc::now().to_rfc3339()),
            reason: Set(reason.to_string()),
        };

        revoked_tokens::Entity::insert(active)
            .on_conflict(
                OnConflict::column(revoked_tokens::Column::Jti)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.conn)
            .await
            .context("Failed to revoke token")?;

        Ok(())
    }

    pub async fn is_revoked(&self, jti: &str) -> Result<bool> {
        let found = revoked_tokens::Entity::find_by_id(jti.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query revoked token")?;

        Ok(found.is_some())
    }
}
