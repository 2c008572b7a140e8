use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dine-in vs takeaway. Stored with the shop's Vietnamese labels so
/// existing rows and the model's tool arguments line up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    DineIn,
    Takeaway,
}

impl OrderType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::DineIn => "Ăn tại quán",
            Self::Takeaway => "Mang về",
        }
    }
}

impl Default for OrderType {
    fn default() -> Self {
        Self::Takeaway
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown order type `{0}`")]
pub struct ParseOrderTypeError(String);

impl std::str::FromStr for OrderType {
    type Err = ParseOrderTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Ăn tại quán" | "dine_in" | "dine-in" => Ok(Self::DineIn),
            "Mang về" | "takeaway" | "take-away" => Ok(Self::Takeaway),
            other => Err(ParseOrderTypeError(other.to_string())),
        }
    }
}

/// A confirmed order. Deliberately has no link back to the session that
/// produced it; the order outlives conversation bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub customer_name: String,
    pub phone: String,
    pub items: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub order_type: OrderType,
}

impl Order {
    /// One-line summary used for the push notification.
    pub fn notification_text(&self) -> String {
        format!(
            "Đơn hàng mới từ {} ({}) - {}: {}",
            self.customer_name,
            self.phone,
            self.order_type.as_db_str(),
            self.items
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Order, OrderType};

    #[test]
    fn order_type_parses_vietnamese_and_snake_case() {
        assert_eq!("Mang về".parse::<OrderType>(), Ok(OrderType::Takeaway));
        assert_eq!("takeaway".parse::<OrderType>(), Ok(OrderType::Takeaway));
        assert_eq!("Ăn tại quán".parse::<OrderType>(), Ok(OrderType::DineIn));
        assert_eq!("dine_in".parse::<OrderType>(), Ok(OrderType::DineIn));
        assert!("delivery".parse::<OrderType>().is_err());
    }

    #[test]
    fn tool_arguments_deserialize_with_defaults() {
        let order: Order = serde_json::from_str(
            r#"{"customer_name":"Lan","phone":"0901234567","items":"1 kem ốc quế"}"#,
        )
        .expect("minimal arguments should deserialize");

        assert_eq!(order.note, "");
        assert_eq!(order.order_type, OrderType::Takeaway);
    }

    #[test]
    fn notification_text_carries_order_fields() {
        let order = Order {
            customer_name: "Lan".to_string(),
            phone: "0901234567".to_string(),
            items: "1 kem ốc quế".to_string(),
            note: String::new(),
            order_type: OrderType::Takeaway,
        };

        let text = order.notification_text();
        assert!(text.contains("Lan"));
        assert!(text.contains("0901234567"));
        assert!(text.contains("Mang về"));
    }
}
