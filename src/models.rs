use std::{fmt, io::Write, str::FromStr};

use chrono::{DateTime, Utc};
use diesel::{
    AsChangeset, AsExpression, FromSqlRow, Selectable,
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::{Identifiable, Insertable, Queryable},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of values stored as `TEXT` and exchanged as the same
/// literal strings over JSON.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
            AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                Ok(raw.parse::<$name>()?)
            }
        }
    };
}

text_enum! {
    /// Suggested sequence only: any status may be set from any other.
    OrderStatus {
        Pending => "Pending",
        Packed => "Packed",
        OutForDelivery => "Out for Delivery",
        Completed => "Completed",
    }
}

text_enum! {
    PaymentMethod {
        BankTransfer => "bank_transfer",
        MobileMoney => "mobile_money",
        CashOnDelivery => "cash_on_delivery",
    }
}

text_enum! {
    ProductCategory {
        RipePlantainChips => "ripe_plantain_chips",
        UnripePlantainChips => "unripe_plantain_chips",
        FruitJuice => "fruit_juice",
        LoadedPlantain => "loaded_plantain",
    }
}

text_enum! {
    ProductUnit {
        Kg => "kg",
        Piece => "piece",
        Bottle => "bottle",
    }
}

text_enum! {
    PackagingType {
        Bucket => "bucket",
        Refill => "refill",
        NoPackaging => "none",
    }
}

text_enum! {
    ReviewType {
        Store => "store",
        Product => "product",
    }
}

text_enum! {
    ReviewStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    NotificationType {
        OrderCreated => "order_created",
        OrderStatusUpdated => "order_status_updated",
        LowStock => "low_stock",
        ProductCreated => "product_created",
        ProductDeleted => "product_deleted",
        ReviewSubmitted => "review_submitted",
    }
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OrderEntity {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OrderItemEntity {
    #[serde(skip)]
    pub id: Uuid,
    #[serde(skip)]
    pub order_id: Uuid,
    #[serde(rename = "product")]
    pub product_id: Uuid,
    pub name: String,
    pub qty: i32,
    pub price: f64,
    #[serde(skip)]
    pub position: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderItemEntity {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub qty: i32,
    pub price: f64,
    pub position: i32,
}

/// An order together with its line items, in submission order.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

/// Checkout submission, shared by the storefront cart and the orders API.
#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderReq {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(length(min = 6, message = "Phone number must have at least 6 characters"))]
    pub customer_phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<CreateOrderItem>,
    #[validate(range(min = 0.0, message = "Total must not be negative"))]
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub product: Uuid,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub qty: i32,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub price: f64,
    pub unit: ProductUnit,
    pub weight: Option<f64>,
    pub packaging_type: PackagingType,
    pub stock: i32,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Validate, Debug, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CreateProductEntity {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub slug: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default = "default_unit")]
    pub unit: ProductUnit,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    #[serde(default = "default_packaging")]
    pub packaging_type: PackagingType,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_unit() -> ProductUnit {
    ProductUnit::Piece
}

fn default_packaging() -> PackagingType {
    PackagingType::NoPackaging
}

/// Partial product update; absent fields are left untouched.
#[derive(AsChangeset, Deserialize, Validate, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductEntity {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub unit: Option<ProductUnit>,
    #[validate(range(min = 0.0))]
    pub weight: Option<f64>,
    pub packaging_type: Option<PackagingType>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub images: Option<Vec<String>>,
}

impl UpdateProductEntity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.unit.is_none()
            && self.weight.is_none()
            && self.packaging_type.is_none()
            && self.stock.is_none()
            && self.images.is_none()
    }
}

// Reviews

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub review_type: ReviewType,
    pub product_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_location: Option<String>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: String,
    pub images: Vec<String>,
    pub status: ReviewStatus,
    pub is_verified_purchase: bool,
    pub helpful_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_review_scope"))]
pub struct CreateReviewReq {
    #[serde(rename = "type")]
    pub review_type: ReviewType,
    pub product_id: Option<Uuid>,
    #[validate(length(min = 2, max = 100))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(max = 100))]
    pub customer_location: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 1000))]
    pub comment: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_verified_purchase: bool,
}

/// A product id is required for product reviews and meaningless for store ones.
fn validate_review_scope(req: &CreateReviewReq) -> Result<(), ValidationError> {
    match (req.review_type, req.product_id) {
        (ReviewType::Product, None) => Err(ValidationError::new("product_id_required")
            .with_message("productId is required for product reviews".into())),
        (ReviewType::Store, Some(_)) => Err(ValidationError::new("product_id_not_allowed")
            .with_message("productId is only allowed on product reviews".into())),
        _ => Ok(()),
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateReviewEntity {
    pub review_type: ReviewType,
    pub product_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_location: Option<String>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: String,
    pub images: Vec<String>,
    pub status: ReviewStatus,
    pub is_verified_purchase: bool,
}

impl From<CreateReviewReq> for CreateReviewEntity {
    fn from(req: CreateReviewReq) -> Self {
        Self {
            review_type: req.review_type,
            product_id: req.product_id,
            customer_name: req.customer_name.trim().to_string(),
            customer_email: req.customer_email.trim().to_lowercase(),
            customer_location: req.customer_location.map(|l| l.trim().to_string()),
            rating: req.rating,
            title: req.title.map(|t| t.trim().to_string()),
            comment: req.comment.trim().to_string(),
            images: req.images,
            status: ReviewStatus::Pending,
            is_verified_purchase: req.is_verified_purchase,
        }
    }
}

// Notifications

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateNotificationEntity {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: Option<Value>,
}

// Settings

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::store_settings)]
#[diesel(primary_key(singleton))]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct StoreSettingsEntity {
    #[serde(skip)]
    pub singleton: bool,
    pub store_name: String,
    pub whatsapp_phone: String,
    pub support_email: String,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub delivery_fee_threshold: f64,
    pub base_delivery_fee: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::store_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateStoreSettingsEntity {
    pub store_name: String,
    pub whatsapp_phone: String,
    pub support_email: String,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub delivery_fee_threshold: f64,
    pub base_delivery_fee: f64,
}

impl CreateStoreSettingsEntity {
    pub fn defaults(whatsapp_phone: &str) -> Self {
        Self {
            store_name: "Adunni Foods".into(),
            whatsapp_phone: whatsapp_phone.into(),
            support_email: "adunnifoods8@gmail.com".into(),
            bank_name: "First Bank of Nigeria".into(),
            account_name: "Adunni Foods Ltd".into(),
            account_number: "1234567890".into(),
            delivery_fee_threshold: 50.0,
            base_delivery_fee: 5.0,
        }
    }
}

#[derive(AsChangeset, Deserialize, Validate, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::store_settings)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoreSettingsEntity {
    #[validate(length(min = 1))]
    pub store_name: Option<String>,
    #[validate(length(min = 6))]
    pub whatsapp_phone: Option<String>,
    #[validate(email)]
    pub support_email: Option<String>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    #[validate(range(min = 0.0))]
    pub delivery_fee_threshold: Option<f64>,
    #[validate(range(min = 0.0))]
    pub base_delivery_fee: Option<f64>,
}

// Admins

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::admins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AdminEntity {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::admins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateAdminEntity {
    pub username: String,
    pub password_hash: String,
}

#[derive(Deserialize, Validate, Debug, ToSchema)]
pub struct LoginReq {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Deserialize, Validate, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAdminReq {
    #[validate(length(min = 3, max = 30), custom(function = "validate_username"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

#[derive(Deserialize, Validate, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCredentialsReq {
    #[validate(length(min = 6, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 3, max = 30), custom(function = "validate_username"))]
    pub new_username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "New passwords don't match"))]
    pub confirm_new_password: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset").with_message(
            "Username can only contain letters, numbers, and underscores".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_matching_passwords_and_plain_username() {
        let mut req = RegisterAdminReq {
            username: "adunni_admin".into(),
            password: "supersecret".into(),
            confirm_password: "supersecret".into(),
        };
        assert!(req.validate().is_ok());

        req.confirm_password = "different".into();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));

        req.confirm_password = "supersecret".into();
        req.username = "adunni admin!".into();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn order_status_uses_display_labels_on_the_wire() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"Out for Delivery\"");
        assert_eq!(
            "Out for Delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn every_variant_parses_back_from_its_label() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
        for method in PaymentMethod::ALL {
            assert_eq!(method.to_string().parse::<PaymentMethod>().unwrap(), *method);
        }
    }

    #[test]
    fn create_order_req_reads_camel_case() {
        let req: CreateOrderReq = serde_json::from_value(serde_json::json!({
            "customerName": "Ada",
            "customerPhone": "+2348000000000",
            "address": "Lagos",
            "items": [{
                "product": "6a1f8e3c-1b2d-4c5e-8f90-123456789abc",
                "name": "Classic",
                "qty": 2,
                "price": 1000.0
            }],
            "totalAmount": 2000.0,
            "paymentMethod": "bank_transfer"
        }))
        .unwrap();

        assert_eq!(req.payment_method, PaymentMethod::BankTransfer);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn create_order_req_rejects_empty_items_and_bad_quantities() {
        let mut req = CreateOrderReq {
            customer_name: "Ada".into(),
            customer_phone: "08000000000".into(),
            address: "Lagos".into(),
            items: vec![],
            total_amount: 10.0,
            payment_method: PaymentMethod::CashOnDelivery,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));

        req.items.push(CreateOrderItem {
            product: Uuid::new_v4(),
            name: "Juice".into(),
            qty: 0,
            price: 3.0,
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn unknown_payment_method_fails_to_deserialize() {
        let result = serde_json::from_str::<PaymentMethod>("\"paypal\"");
        assert!(result.is_err());
    }

    fn review_req(review_type: ReviewType, product_id: Option<Uuid>) -> CreateReviewReq {
        CreateReviewReq {
            review_type,
            product_id,
            customer_name: "Tolu".into(),
            customer_email: "Tolu@Example.com".into(),
            customer_location: None,
            rating: 5,
            title: None,
            comment: "Crunchy and fresh every time".into(),
            images: vec![],
            is_verified_purchase: false,
        }
    }

    #[test]
    fn product_review_requires_product_id() {
        assert!(review_req(ReviewType::Product, None).validate().is_err());
        assert!(
            review_req(ReviewType::Product, Some(Uuid::new_v4()))
                .validate()
                .is_ok()
        );
        assert!(
            review_req(ReviewType::Store, Some(Uuid::new_v4()))
                .validate()
                .is_err()
        );
        assert!(review_req(ReviewType::Store, None).validate().is_ok());
    }

    #[test]
    fn review_rating_must_be_within_one_and_five() {
        let mut req = review_req(ReviewType::Store, None);
        req.rating = 6;
        assert!(req.validate().is_err());
        req.rating = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn new_reviews_start_pending_with_normalised_email() {
        let entity = CreateReviewEntity::from(review_req(ReviewType::Store, None));
        assert_eq!(entity.status, ReviewStatus::Pending);
        assert_eq!(entity.customer_email, "tolu@example.com");
    }
}
