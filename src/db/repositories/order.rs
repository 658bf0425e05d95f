use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::SimpleExpr,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

use crate::entities::{orders, products, users};
use crate::models::order::{OrderGroup, OrderRow, OrderUser, group_rows, round2};

/// Date-range filter over order creation time (RFC 3339 bounds, inclusive).
#[derive(Debug, Default, Clone)]
pub struct StatsFilter {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    /// Count of distinct pickup codes, not item rows.
    pub total_orders: u64,
    pub total_revenue: f64,
    pub monthly_stats: Vec<MonthlyRevenue>,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub name: String,
    pub total_sold: i64,
    pub revenue: f64,
}

pub struct OrderRepository {
    conn: DatabaseConnection,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Fetch order rows (joined with products and users) matching the
    /// given condition, mapped into the read-model row shape.
    async fn fetch_rows(&self, condition: Condition) -> Result<Vec<OrderRow>> {
        let rows = orders::Entity::find()
            .filter(condition)
            .order_by_asc(orders::Column::Id)
            .find_also_related(products::Entity)
            .all(&self.conn)
            .await
            .context("Failed to query order rows")?;

        // Users are loaded in one batch; find_also_related only walks one
        // relation at a time.
        let user_ids: Vec<i32> = rows
            .iter()
            .filter_map(|(order, _)| order.user_id)
            .collect();

        let user_map: HashMap<i32, OrderUser> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(user_ids))
                .all(&self.conn)
                .await
                .context("Failed to query order users")?
                .into_iter()
                .map(|u| {
                    (
                        u.id,
                        OrderUser {
                            id: u.id,
                            username: u.username,
                        },
                    )
                })
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|(order, product)| OrderRow {
                code: order.code,
                quantity: order.quantity,
                collected: order.collected,
                total_amount: order.total_amount,
                unit_price: order.unit_price,
                line_total: order.line_total,
                created_at: order.created_at,
                product_name: product.as_ref().map(|p| p.name.clone()),
                product_price: product.as_ref().map(|p| p.price),
                user: order.user_id.and_then(|id| user_map.get(&id).cloned()),
            })
            .collect())
    }

    /// All logical orders, newest first.
    pub async fn list_grouped(&self) -> Result<Vec<OrderGroup>> {
        let rows = self.fetch_rows(Condition::all()).await?;
        Ok(group_rows(rows))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<OrderGroup>> {
        let rows = self
            .fetch_rows(Condition::all().add(orders::Column::Code.eq(code)))
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(crate::models::order::build_group(
            code.to_string(),
            &rows,
        )))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<OrderGroup>> {
        let rows = self
            .fetch_rows(Condition::all().add(orders::Column::UserId.eq(user_id)))
            .await?;
        Ok(group_rows(rows))
    }

    /// Lookup of one of the user's orders; the code matches
    /// case-insensitively after trimming.
    pub async fn get_for_user_by_code(
        &self,
        user_id: i32,
        code: &str,
    ) -> Result<Option<OrderGroup>> {
        let normalized = code.trim().to_uppercase();

        let code_upper: SimpleExpr =
            Func::upper(Expr::col((orders::Entity, orders::Column::Code))).into();

        let rows = self
            .fetch_rows(
                Condition::all()
                    .add(orders::Column::UserId.eq(user_id))
                    .add(code_upper.eq(normalized.clone())),
            )
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(crate::models::order::build_group(normalized, &rows)))
    }

    /// Mark every row sharing the code as collected. Returns the number of
    /// affected rows; zero means no such order exists.
    pub async fn mark_collected(&self, code: &str) -> Result<u64> {
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Collected, Expr::value(true))
            .filter(orders::Column::Code.eq(code))
            .exec(&self.conn)
            .await
            .context("Failed to mark orders collected")?;

        if result.rows_affected > 0 {
            info!("Marked order {} as collected", code);
        }
        Ok(result.rows_affected)
    }

    /// Sales statistics over collected rows within the optional date range.
    pub async fn stats(&self, filter: &StatsFilter) -> Result<StatsReport> {
        let mut condition = Condition::all().add(orders::Column::Collected.eq(true));
        if let Some(start) = &filter.start {
            condition = condition.add(orders::Column::CreatedAt.gte(start.clone()));
        }
        if let Some(end) = &filter.end {
            condition = condition.add(orders::Column::CreatedAt.lte(end.clone()));
        }

        let rows = orders::Entity::find()
            .filter(condition)
            .find_also_related(products::Entity)
            .all(&self.conn)
            .await
            .context("Failed to query order stats")?;

        let mut codes: HashSet<&str> = HashSet::new();
        let mut total_revenue = 0.0;
        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
        let mut per_product: HashMap<String, (i64, f64)> = HashMap::new();

        for (order, product) in &rows {
            codes.insert(order.code.as_str());

            // Same price fallback as the grouped read model.
            let revenue = if let Some(price) = order.unit_price {
                round2(price * f64::from(order.quantity))
            } else if let Some(line_total) = order.line_total {
                line_total
            } else {
                order.total_amount
            };
            total_revenue += revenue;

            // RFC 3339 timestamps carry the month in the first seven chars.
            if order.created_at.len() >= 7 {
                *monthly.entry(order.created_at[..7].to_string()).or_default() += revenue;
            }

            let name = product
                .as_ref()
                .map_or_else(|| "Unknown".to_string(), |p| p.name.clone());
            let entry = per_product.entry(name).or_default();
            entry.0 += i64::from(order.quantity);
            entry.1 += revenue;
        }

        let mut top_products: Vec<TopProduct> = per_product
            .into_iter()
            .map(|(name, (total_sold, revenue))| TopProduct {
                name,
                total_sold,
                revenue: round2(revenue),
            })
            .collect();
        top_products.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));
        top_products.truncate(5);

        Ok(StatsReport {
            total_orders: codes.len() as u64,
            total_revenue: round2(total_revenue),
            monthly_stats: monthly
                .into_iter()
                .map(|(month, revenue)| MonthlyRevenue {
                    month,
                    revenue: round2(revenue),
                })
                .collect(),
            top_products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    async fn test_store() -> Store {
        let path = std::env::temp_dir().join(format!("pickarr-stats-test-{}.db", Uuid::new_v4()));
        Store::new(&format!("sqlite:{}", path.display()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_stats_revenue_matches_listing_for_legacy_rows() {
        let store = test_store().await;
        let product = store
            .create_product("Scone", 2.0, 10, None, None)
            .await
            .unwrap();

        // Legacy row: unit price snapshot only, stale total_amount.
        orders::ActiveModel {
            product_id: Set(product.id),
            quantity: Set(3),
            code: Set("LEGACY".to_string()),
            collected: Set(true),
            total_amount: Set(999.0),
            unit_price: Set(Some(2.0)),
            line_total: Set(None),
            user_id: Set(None),
            created_at: Set("2026-05-01T12:00:00+00:00".to_string()),
            ..Default::default()
        }
        .insert(&store.conn)
        .await
        .unwrap();

        let report = store.order_stats(&StatsFilter::default()).await.unwrap();
        assert_eq!(report.total_orders, 1);
        assert_eq!(report.total_revenue, 6.0);
        assert_eq!(report.monthly_stats.len(), 1);
        assert_eq!(report.monthly_stats[0].month, "2026-05");
        assert_eq!(report.monthly_stats[0].revenue, 6.0);
        assert_eq!(report.top_products[0].revenue, 6.0);

        let group = store.get_order_by_code("LEGACY").await.unwrap().unwrap();
        assert_eq!(group.total, report.total_revenue);
    }
}
