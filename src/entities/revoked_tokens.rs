use sea_orm::entity::prelude::*;

/// Append-only denylist of token IDs. Once a jti lands here the token is
/// dead regardless of its expiry.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "revoked_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub jti: String,

    /// RFC 3339 timestamp of revocation.
    pub revoked_at: String,

    /// Why the token was revoked ("logout", "refresh_rotation", ...).
    pub reason: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
