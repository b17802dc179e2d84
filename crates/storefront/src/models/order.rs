//! Order domain types and pricing.
//!
//! An order is the durable contract produced from a cart: every line is a
//! snapshot of the live variant at creation time and the stored totals are
//! exact decimal sums of those snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use dryfruit_core::{
    Email, OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, Price, PriceError,
    ProductId, UserId, VariantId,
};

use super::product::{Product, ProductImage, Variant};

/// Counter that issues order numbers.
pub const ORDER_NUMBER_COUNTER: &str = "order_number";

/// Counter value before the first order; the first order is `#1001`.
pub const ORDER_NUMBER_START: i64 = 1000;

/// Flat shipping charge. Shipping is free.
pub const SHIPPING_PRICE: Price = Price::ZERO;

/// Optional map pin attached to a delivery address.
///
/// Coordinates are kept as the client sent them. Browsers that deny
/// geolocation send empty strings, which read as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "coordinate")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "coordinate")]
    pub longitude: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Text(String),
    Number(f64),
}

/// Accept a coordinate as a string or a number; blank means absent.
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(
        match Option::<RawCoordinate>::deserialize(deserializer)? {
            Some(RawCoordinate::Text(text)) => {
                Some(text.trim().to_owned()).filter(|t| !t.is_empty())
            }
            Some(RawCoordinate::Number(n)) => Some(n.to_string()),
            None => None,
        },
    )
}

fn in_range(value: Option<&str>, limit: f64) -> bool {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .is_none_or(|v| (-limit..=limit).contains(&v))
}

impl GeoLocation {
    /// Trimmed copy, or `None` when nothing was filled in.
    fn normalized(&self) -> Option<Self> {
        let address = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned);
        if address.is_none() && self.latitude.is_none() && self.longitude.is_none() {
            return None;
        }
        Some(Self {
            address,
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
        })
    }

    /// Numeric coordinates must lie on the globe.
    fn in_range(&self) -> bool {
        in_range(self.latitude.as_deref(), 90.0) && in_range(self.longitude.as_deref(), 180.0)
    }
}

/// Where the order should be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pincode: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ShippingInfo {
    /// Check required fields and return a trimmed copy.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validated(&self) -> Result<Self, String> {
        let required = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("pincode", &self.pincode),
            ("address", &self.address),
            ("city", &self.city),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("shipping {field} is required"));
            }
        }
        let email = Email::parse(&self.email).map_err(|e| format!("shipping email: {e}"))?;
        let location = self.location.as_ref().and_then(GeoLocation::normalized);
        if location.as_ref().is_some_and(|l| !l.in_range()) {
            return Err("shipping location is out of range".to_owned());
        }

        Ok(Self {
            name: self.name.trim().to_owned(),
            email: email.into_inner(),
            phone: self.phone.trim().to_owned(),
            pincode: self.pincode.trim().to_owned(),
            address: self.address.trim().to_owned(),
            city: self.city.trim().to_owned(),
            location,
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_owned),
        })
    }
}

/// Payment method and settlement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}

/// A purchased line, frozen at order creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub quantity: u32,
    pub price: Price,
    pub weight: String,
    pub images: Vec<ProductImage>,
}

impl OrderItem {
    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total is not representable.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.price.times(self.quantity)
    }
}

/// The three stored totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricing {
    pub items_price: Price,
    pub shipping_price: Price,
    pub total_price: Price,
}

impl OrderPricing {
    /// Price `items` with the given shipping charge.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if any sum is not representable.
    pub fn for_items(items: &[OrderItem], shipping_price: Price) -> Result<Self, PriceError> {
        let items_price = items.iter().try_fold(Price::ZERO, |acc, item| {
            acc.checked_add(item.line_total()?)
        })?;
        Ok(Self {
            items_price,
            shipping_price,
            total_price: items_price.checked_add(shipping_price)?,
        })
    }
}

/// Everything needed to persist a new order except its number and id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_info: ShippingInfo,
    pub payment_info: PaymentInfo,
    pub pricing: OrderPricing,
}

/// Name and contact of the customer, joined in for staff views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A persisted order.
///
/// `I` is the line type: stored snapshots by default, or
/// [`OrderItemView`] when shown with live catalog details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order<I = OrderItem> {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<OrderCustomer>,
    pub items: Vec<I>,
    pub shipping_info: ShippingInfo,
    pub payment_info: PaymentInfo,
    #[serde(flatten)]
    pub pricing: OrderPricing,
    pub status: OrderStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<I> Order<I> {
    /// The same order with each line transformed by `f`.
    pub fn map_items<J>(self, f: impl FnMut(I) -> J) -> Order<J> {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer: self.customer,
            items: self.items.into_iter().map(f).collect(),
            shipping_info: self.shipping_info,
            payment_info: self.payment_info,
            pricing: self.pricing,
            status: self.status,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A purchased line next to the variant as the catalog lists it today.
///
/// `variant_details` is `None` once the product or variant has been removed.
/// The snapshot fields stay authoritative for what was paid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItem,
    pub variant_details: Option<Variant>,
}

impl OrderItemView {
    #[must_use]
    pub fn resolve(item: OrderItem, product: Option<&Product>) -> Self {
        let variant_details = product.and_then(|p| p.variant(item.variant_id)).cloned();
        Self {
            item,
            variant_details,
        }
    }
}

/// An order as shown on its detail page.
pub type OrderDetail = Order<OrderItemView>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn item(price: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(1),
            variant_id: VariantId::new(101),
            name: "Pistachios".to_owned(),
            quantity,
            price: Price::new(Decimal::from_str(price).unwrap()).unwrap(),
            weight: "250g".to_owned(),
            images: vec![],
        }
    }

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            name: " Asha Rao ".to_owned(),
            email: "Asha@Example.com".to_owned(),
            phone: "9876543210".to_owned(),
            pincode: "560001".to_owned(),
            address: "12 MG Road".to_owned(),
            city: "Bengaluru".to_owned(),
            location: None,
            notes: Some("  ".to_owned()),
        }
    }

    #[test]
    fn test_pricing_sums_lines() {
        let pricing =
            OrderPricing::for_items(&[item("500", 2), item("300", 1)], SHIPPING_PRICE).unwrap();
        assert_eq!(pricing.items_price, Price::from_rupees(1300));
        assert_eq!(pricing.shipping_price, Price::ZERO);
        assert_eq!(pricing.total_price, Price::from_rupees(1300));
    }

    #[test]
    fn test_pricing_is_exact_for_fractional_prices() {
        let items = [item("0.10", 3), item("19.99", 7), item("0.01", 1)];
        let pricing = OrderPricing::for_items(&items, Price::from_rupees(40)).unwrap();
        let expected = Decimal::from_str("140.24").unwrap();
        assert_eq!(pricing.items_price.amount(), expected);
        assert_eq!(
            pricing.total_price.amount(),
            expected + Decimal::from(40)
        );
    }

    #[test]
    fn test_shipping_validation_normalizes() {
        let clean = shipping().validated().unwrap();
        assert_eq!(clean.name, "Asha Rao");
        assert_eq!(clean.email, "asha@example.com");
        assert_eq!(clean.notes, None);
    }

    #[test]
    fn test_shipping_validation_rejects_missing_fields() {
        let mut info = shipping();
        info.city = "   ".to_owned();
        assert_eq!(info.validated().unwrap_err(), "shipping city is required");

        let mut info = shipping();
        info.email = "not-an-email".to_owned();
        assert!(info.validated().is_err());

        let mut info = shipping();
        info.location = Some(GeoLocation {
            address: None,
            latitude: Some("120.0".to_owned()),
            longitude: Some("77.6".to_owned()),
        });
        assert!(info.validated().is_err());
    }

    #[test]
    fn test_blank_location_from_client_is_accepted() {
        let payload = serde_json::json!({
            "name": "Asha Rao",
            "email": "asha@example.com",
            "phone": "9876543210",
            "pincode": "560001",
            "address": "12 MG Road",
            "city": "Bengaluru",
            "location": { "address": "", "latitude": "", "longitude": "" }
        });
        let info: ShippingInfo = serde_json::from_value(payload).unwrap();
        let location = info.location.as_ref().unwrap();
        assert_eq!(location.latitude, None);
        assert_eq!(location.longitude, None);
        assert_eq!(info.validated().unwrap().location, None);
    }

    #[test]
    fn test_location_accepts_strings_and_numbers() {
        let from_text: GeoLocation = serde_json::from_value(serde_json::json!({
            "address": "Near Cubbon Park",
            "latitude": "12.97",
            "longitude": "77.59"
        }))
        .unwrap();
        assert_eq!(from_text.latitude.as_deref(), Some("12.97"));

        let from_numbers: GeoLocation = serde_json::from_value(serde_json::json!({
            "latitude": 12.97,
            "longitude": 77.59
        }))
        .unwrap();
        assert_eq!(from_numbers.longitude.as_deref(), Some("77.59"));

        let mut info = shipping();
        info.location = Some(from_text);
        let clean = info.validated().unwrap();
        assert_eq!(
            clean.location.unwrap().address.as_deref(),
            Some("Near Cubbon Park")
        );
    }
}
