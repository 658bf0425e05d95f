use sea_orm::entity::prelude::*;

/// One line item of a logical order. Rows sharing a `code` form one
/// pickup order; grouping happens at read time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub product_id: i32,

    pub quantity: i32,

    /// 6-character pickup code shared by all rows of the order.
    pub code: String,

    pub collected: bool,

    /// Legacy line total kept for rows written before price snapshots.
    pub total_amount: f64,

    /// Unit price snapshot taken at order creation.
    pub unit_price: Option<f64>,

    /// Line total snapshot taken at order creation.
    pub line_total: Option<f64>,

    pub user_id: Option<i32>,

    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
