//! The `save_order` tool: the only code path that writes an order row.
//!
//! The HTTP handler never saves orders itself; the model decides when
//! to invoke this tool, and the tool reports its outcome as text the
//! model relays to the customer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use scoopy_agent::prompt::SAVE_ORDER_TOOL_NAME;
use scoopy_agent::tools::{Tool, ToolSpec};
use scoopy_core::domain::order::{Order, OrderType};
use scoopy_db::repositories::OrderRepository;
use scoopy_notify::Notifier;

pub struct SaveOrderTool {
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
}

impl SaveOrderTool {
    pub fn new(orders: Arc<dyn OrderRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { orders, notifier }
    }
}

/// Raw tool arguments as the model supplies them. `order_type` arrives
/// as free text ("Mang về", "takeaway", ...) and is parsed leniently.
#[derive(Debug, Deserialize)]
struct SaveOrderArguments {
    customer_name: String,
    phone: String,
    items: String,
    #[serde(default)]
    note: String,
    #[serde(default)]
    order_type: Option<String>,
}

impl SaveOrderArguments {
    fn into_order(self) -> Order {
        let order_type = self
            .order_type
            .as_deref()
            .and_then(|raw| raw.parse::<OrderType>().ok())
            .unwrap_or_default();
        Order {
            customer_name: self.customer_name,
            phone: self.phone,
            items: self.items,
            note: self.note,
            order_type,
        }
    }
}

#[async_trait]
impl Tool for SaveOrderTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: SAVE_ORDER_TOOL_NAME.to_string(),
            description: "Lưu đơn hàng đã được khách xác nhận. BẮT BUỘC gọi tool này khi khách \
                          đã cung cấp tên, số điện thoại, danh sách món và loại đơn hàng \
                          (Ăn tại quán hoặc Mang về) và đã xác nhận đúng."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_name": { "type": "string", "description": "Tên khách hàng" },
                    "phone": { "type": "string", "description": "Số điện thoại" },
                    "items": { "type": "string", "description": "Danh sách món đã chọn" },
                    "note": { "type": "string", "description": "Ghi chú thêm (nếu có)" },
                    "order_type": {
                        "type": "string",
                        "enum": ["Ăn tại quán", "Mang về"],
                        "description": "Loại đơn hàng"
                    }
                },
                "required": ["customer_name", "phone", "items"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> String {
        let arguments: SaveOrderArguments = match serde_json::from_value(arguments) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(event_name = "order.arguments_invalid", error = %err, "rejected tool call");
                return format!("❌ Thiếu thông tin đơn hàng: {err}");
            }
        };
        let order = arguments.into_order();

        if let Err(err) = self.orders.insert(&order).await {
            error!(event_name = "order.save_failed", error = %err, "order insert failed");
            return format!("❌ Lỗi khi lưu đơn hàng: {err}");
        }
        info!(
            event_name = "order.saved",
            customer = %order.customer_name,
            order_type = order.order_type.as_db_str(),
            "order persisted"
        );

        let confirmation =
            format!("✅ Đã lưu đơn hàng của {} ({})!", order.customer_name, order.phone);

        // Best effort only: the order is already saved, a delivery
        // failure must not turn this into an error.
        match self.notifier.notify(&order.notification_text()).await {
            Ok(_) => confirmation,
            Err(err) => {
                warn!(event_name = "order.notify_failed", error = %err, "notification not sent");
                format!("{confirmation} (chưa gửi được thông báo cho cửa hàng: {err})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use scoopy_agent::tools::Tool;
    use scoopy_core::domain::order::OrderType;
    use scoopy_db::repositories::InMemoryOrderRepository;
    use scoopy_notify::{Ack, DeliveryError, Notifier};

    use super::SaveOrderTool;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _message: &str) -> Result<Ack, DeliveryError> {
            Err(DeliveryError::Rejected("500: boom".to_string()))
        }
    }

    struct OkNotifier;

    #[async_trait]
    impl Notifier for OkNotifier {
        async fn notify(&self, _message: &str) -> Result<Ack, DeliveryError> {
            Ok(Ack { detail: "sent".to_string() })
        }
    }

    fn arguments() -> serde_json::Value {
        json!({
            "customer_name": "Lan",
            "phone": "0901234567",
            "items": "1 kem ốc quế",
            "order_type": "Mang về"
        })
    }

    #[tokio::test]
    async fn save_reports_success_and_persists_fields() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let tool = SaveOrderTool::new(orders.clone(), Arc::new(OkNotifier));

        let result = tool.execute(arguments()).await;
        assert!(result.starts_with('✅'), "unexpected result: {result}");

        let saved = orders.all().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].customer_name, "Lan");
        assert_eq!(saved[0].order_type, OrderType::Takeaway);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_the_save() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let tool = SaveOrderTool::new(orders.clone(), Arc::new(FailingNotifier));

        let result = tool.execute(arguments()).await;

        assert_eq!(orders.all().await.len(), 1, "order must remain saved");
        assert!(result.starts_with('✅'), "save still reports success: {result}");
        assert!(result.contains("chưa gửi được thông báo"), "caveat is merged in: {result}");
    }

    #[tokio::test]
    async fn identical_saves_accumulate_rows() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let tool = SaveOrderTool::new(orders.clone(), Arc::new(OkNotifier));

        tool.execute(arguments()).await;
        tool.execute(arguments()).await;
        assert_eq!(orders.all().await.len(), 2);
    }

    #[tokio::test]
    async fn structurally_invalid_arguments_are_reported_not_saved() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let tool = SaveOrderTool::new(orders.clone(), Arc::new(OkNotifier));

        let result = tool.execute(json!({"customer_name": "Lan"})).await;
        assert!(result.starts_with('❌'));
        assert!(orders.all().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_order_type_falls_back_to_takeaway() {
        let orders = Arc::new(InMemoryOrderRepository::default());
        let tool = SaveOrderTool::new(orders.clone(), Arc::new(OkNotifier));

        let mut args = arguments();
        args["order_type"] = json!("ship về nhà");
        tool.execute(args).await;

        assert_eq!(orders.all().await[0].order_type, OrderType::Takeaway);
    }
}
