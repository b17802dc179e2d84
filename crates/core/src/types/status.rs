//! Status, role, and category enums for storefront entities.
//!
//! Every enum here has a fixed allow-list of wire values. Parsing an unknown
//! string fails with [`ParseEnumError`] rather than falling back to a default,
//! so that callers can reject bad input before touching any stored state.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of an enum's allowed values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    /// Human-readable name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Implements `as_str`, `Display`, and `FromStr` from a single value table.
macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Every allowed value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire/database representation.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError::new($kind, s)),
                }
            }
        }
    };
}

/// Fulfillment state of an order.
///
/// `processing` is the initial state; `delivered` and `cancelled` are the
/// usual end states. Only the value itself is validated: the allow-list check
/// does not constrain which state an order may move to next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

wire_enum!(OrderStatus, "order status", {
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether delivery partners still have work to do on the order.
    #[must_use]
    pub const fn is_open_for_delivery(&self) -> bool {
        matches!(self, Self::Processing | Self::Shipped)
    }
}

/// How the shopper chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Card,
    Paypal,
}

wire_enum!(PaymentMethod, "payment method", {
    Cod => "cod",
    Card => "card",
    Paypal => "paypal",
});

/// Settlement state of an order's payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

wire_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
});

/// Account role, which gates catalog mutations and order status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A shopper.
    #[default]
    User,
    /// Store staff with full catalog and order access.
    Admin,
    /// Delivery partner who moves orders through fulfillment.
    Delivery,
}

wire_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
    Delivery => "delivery",
});

impl Role {
    /// Roles allowed to change an order's fulfillment status.
    pub const ORDER_STATUS_EDITORS: &'static [Self] = &[Self::Admin, Self::Delivery];

    /// Whether this role can manage the catalog, users, and contact inbox.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Product line a catalog item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.product_category", rename_all = "PascalCase")
)]
pub enum ProductCategory {
    Premium,
    Regular,
    Seasonal,
}

wire_enum!(ProductCategory, "product category", {
    Premium => "Premium",
    Regular => "Regular",
    Seasonal => "Seasonal",
});

/// Triage state of a contact-form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.contact_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Responded,
}

wire_enum!(ContactStatus, "contact status", {
    New => "new",
    Read => "read",
    Responded => "responded",
});

/// Kind of audit-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.activity_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Login,
    Signup,
    ProductAdd,
    ProductUpdate,
    ProductDelete,
    ProductImagesAdd,
    ProductImageDelete,
    OrderPlaced,
    OrderShipped,
    OrderDelivered,
    OrderCancelled,
}

wire_enum!(ActivityKind, "activity type", {
    Login => "login",
    Signup => "signup",
    ProductAdd => "product_add",
    ProductUpdate => "product_update",
    ProductDelete => "product_delete",
    ProductImagesAdd => "product_images_add",
    ProductImageDelete => "product_image_delete",
    OrderPlaced => "order_placed",
    OrderShipped => "order_shipped",
    OrderDelivered => "order_delivered",
    OrderCancelled => "order_cancelled",
});

impl ActivityKind {
    /// Audit entry for an order moving into `status`, if that move is audited.
    #[must_use]
    pub const fn for_order_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Processing => None,
            OrderStatus::Shipped => Some(Self::OrderShipped),
            OrderStatus::Delivered => Some(Self::OrderDelivered),
            OrderStatus::Cancelled => Some(Self::OrderCancelled),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_allow_list() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        let err = "refunded".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.value, "refunded");
        // Matching is exact; no case folding
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_default_is_processing() {
        assert_eq!(OrderStatus::default(), OrderStatus::Processing);
    }

    #[test]
    fn test_open_for_delivery() {
        assert!(OrderStatus::Processing.is_open_for_delivery());
        assert!(OrderStatus::Shipped.is_open_for_delivery());
        assert!(!OrderStatus::Delivered.is_open_for_delivery());
        assert!(!OrderStatus::Cancelled.is_open_for_delivery());
    }

    #[test]
    fn test_serde_matches_wire_values() {
        assert_eq!(
            serde_json::to_string(&ProductCategory::Seasonal).unwrap(),
            "\"Seasonal\""
        );
        assert_eq!(serde_json::to_string(&Role::Delivery).unwrap(), "\"delivery\"");
        assert_eq!(
            serde_json::to_string(&ActivityKind::ProductImagesAdd).unwrap(),
            format!("\"{}\"", ActivityKind::ProductImagesAdd.as_str())
        );
    }

    #[test]
    fn test_order_status_editors() {
        assert!(Role::ORDER_STATUS_EDITORS.contains(&Role::Admin));
        assert!(Role::ORDER_STATUS_EDITORS.contains(&Role::Delivery));
        assert!(!Role::ORDER_STATUS_EDITORS.contains(&Role::User));
    }

    #[test]
    fn test_activity_for_status() {
        assert_eq!(ActivityKind::for_order_status(OrderStatus::Processing), None);
        assert_eq!(
            ActivityKind::for_order_status(OrderStatus::Delivered),
            Some(ActivityKind::OrderDelivered)
        );
    }
}
