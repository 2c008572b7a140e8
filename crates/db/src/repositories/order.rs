use scoopy_core::domain::order::Order;

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders (customer_name, phone, items, note, order_type)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(&order.items)
        .bind(&order.note)
        .bind(order.order_type.as_db_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scoopy_core::domain::order::{Order, OrderType};

    use super::SqlOrderRepository;
    use crate::repositories::OrderRepository;
    use crate::test_support::migrated_pool;

    fn order_fixture() -> Order {
        Order {
            customer_name: "Lan".to_string(),
            phone: "0901234567".to_string(),
            items: "1 kem ốc quế".to_string(),
            note: String::new(),
            order_type: OrderType::Takeaway,
        }
    }

    #[tokio::test]
    async fn insert_persists_all_fields() {
        let pool = migrated_pool().await;
        let repo = SqlOrderRepository::new(pool.clone());

        repo.insert(&order_fixture()).await.expect("insert order");

        let (name, phone, items, order_type): (String, String, String, String) = sqlx::query_as(
            "SELECT customer_name, phone, items, order_type FROM orders LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .expect("read back order");

        assert_eq!(name, "Lan");
        assert_eq!(phone, "0901234567");
        assert_eq!(items, "1 kem ốc quế");
        assert_eq!(order_type, "Mang về");
    }

    #[tokio::test]
    async fn identical_orders_produce_distinct_rows() {
        let pool = migrated_pool().await;
        let repo = SqlOrderRepository::new(pool.clone());

        repo.insert(&order_fixture()).await.expect("first insert");
        repo.insert(&order_fixture()).await.expect("second insert");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&pool)
            .await
            .expect("count orders");
        assert_eq!(count, 2, "repeat orders are not deduplicated");
    }
}
