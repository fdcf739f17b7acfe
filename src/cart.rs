//! Storefront cart.
//!
//! [`Cart`] is a plain state container of line items keyed by product id.
//! [`CartStore`] owns a cart plus a [`CartStorage`] adapter and writes the
//! cart back after every mutation, so an abandoned cart survives a reload.
//! Line items hold name and price snapshots taken when the product was added;
//! checkout submits those snapshots as the order's prices.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::{
    models::{CreateOrderItem, CreateOrderReq, PaymentMethod, ProductEntity},
    pricing::{self, PricedLine, PricingSettings, Totals},
};

/// Fixed key the cart blob is stored under.
pub const CART_STORAGE_KEY: &str = "adunni-cart-storage";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("cannot check out an empty cart")]
    EmptyCart,

    #[error("cart storage failed: {0}")]
    Storage(#[from] io::Error),

    #[error("cart could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Uuid,
    pub name: String,
    pub qty: i32,
    pub price: f64,
    pub image: Option<String>,
}

impl PricedLine for CartLine {
    fn quantity(&self) -> i32 {
        self.qty
    }

    fn unit_price(&self) -> f64 {
        self.price
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartLine>,
}

/// Customer details collected by the checkout form.
#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_phone: String,
    pub address: String,
    pub payment_method: PaymentMethod,
}

impl Cart {
    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` of a product, merging into an existing line if present.
    pub fn add_item(&mut self, product: &ProductEntity, quantity: i32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        match self.items.iter_mut().find(|line| line.product == product.id) {
            Some(line) => line.qty += quantity,
            None => self.items.push(CartLine {
                product: product.id,
                name: product.name.clone(),
                qty: quantity,
                price: product.price,
                image: product.images.first().cloned(),
            }),
        }

        Ok(())
    }

    /// Overwrites a line's quantity; zero or less removes the line.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }

        if let Some(line) = self.items.iter_mut().find(|line| line.product == product_id) {
            line.qty = quantity;
        }
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|line| line.product != product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_items(&self) -> i32 {
        self.items.iter().map(|line| line.qty).sum()
    }

    pub fn subtotal(&self) -> f64 {
        pricing::subtotal(&self.items)
    }

    pub fn totals(&self, settings: &PricingSettings) -> Totals {
        pricing::compute_totals(&self.items, settings)
    }

    /// Builds the order submission from the current snapshot.
    pub fn checkout(
        &self,
        details: CheckoutDetails,
        settings: &PricingSettings,
    ) -> Result<CreateOrderReq, CartError> {
        if self.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let totals = self.totals(settings);
        Ok(CreateOrderReq {
            customer_name: details.customer_name,
            customer_phone: details.customer_phone,
            address: details.address,
            items: self
                .items
                .iter()
                .map(|line| CreateOrderItem {
                    product: line.product,
                    name: line.name.clone(),
                    qty: line.qty,
                    price: line.price,
                })
                .collect(),
            total_amount: totals.grand_total,
            payment_method: details.payment_method,
        })
    }
}

/// Key-value persistence for the cart blob.
pub trait CartStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CartError>;
    fn save(&self, key: &str, blob: &str) -> Result<(), CartError>;
}

impl<S: CartStorage + ?Sized> CartStorage for &S {
    fn load(&self, key: &str) -> Result<Option<String>, CartError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), CartError> {
        (**self).save(key, blob)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl CartStorage for MemoryCartStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CartError> {
        let blobs = self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(blobs.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), CartError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    dir: PathBuf,
}

impl FileCartStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CartStorage for FileCartStorage {
    fn load(&self, key: &str) -> Result<Option<String>, CartError> {
        match fs::read_to_string(self.path(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), CartError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), blob)?;
        Ok(())
    }
}

/// A cart bound to its storage; every mutation is written through.
pub struct CartStore<S: CartStorage> {
    cart: Cart,
    storage: S,
}

impl<S: CartStorage> CartStore<S> {
    /// Restores the persisted cart. A missing or unreadable blob starts empty.
    pub fn open(storage: S) -> Result<Self, CartError> {
        let cart = match storage.load(CART_STORAGE_KEY)? {
            Some(blob) => serde_json::from_str(&blob).unwrap_or_else(|err| {
                warn!(error = %err, "Discarding unreadable cart blob");
                Cart::default()
            }),
            None => Cart::default(),
        };

        Ok(Self { cart, storage })
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn add_item(&mut self, product: &ProductEntity, quantity: i32) -> Result<(), CartError> {
        self.cart.add_item(product, quantity)?;
        self.persist()
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) -> Result<(), CartError> {
        self.cart.update_quantity(product_id, quantity);
        self.persist()
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        self.cart.remove_item(product_id);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.persist()
    }

    pub fn checkout(
        &self,
        details: CheckoutDetails,
        settings: &PricingSettings,
    ) -> Result<CreateOrderReq, CartError> {
        self.cart.checkout(details, settings)
    }

    /// Called once the order has been accepted by the backend.
    pub fn complete_checkout(&mut self) -> Result<(), CartError> {
        self.clear()
    }

    fn persist(&self) -> Result<(), CartError> {
        let blob = serde_json::to_string(&self.cart)?;
        self.storage.save(CART_STORAGE_KEY, &blob)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{PackagingType, ProductCategory, ProductUnit};

    fn product(name: &str, price: f64) -> ProductEntity {
        ProductEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: name.to_lowercase(),
            description: None,
            category: ProductCategory::RipePlantainChips,
            price,
            unit: ProductUnit::Piece,
            weight: None,
            packaging_type: PackagingType::Bucket,
            stock: 20,
            images: vec![format!("/images/{}.jpg", name.to_lowercase())],
            created_at: Utc::now(),
        }
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            customer_name: "Ada".into(),
            customer_phone: "08000000000".into(),
            address: "12 Marina Road, Lagos".into(),
            payment_method: PaymentMethod::BankTransfer,
        }
    }

    #[test]
    fn adding_same_product_twice_merges_quantities() {
        let chips = product("Chips", 25.0);
        let mut cart = Cart::default();

        cart.add_item(&chips, 2).unwrap();
        cart.add_item(&chips, 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].qty, 5);
    }

    #[test]
    fn add_snapshots_name_price_and_first_image() {
        let mut chips = product("Chips", 25.0);
        let mut cart = Cart::default();
        cart.add_item(&chips, 1).unwrap();

        chips.price = 99.0;
        chips.name = "Renamed".into();

        let line = &cart.items()[0];
        assert_eq!(line.price, 25.0);
        assert_eq!(line.name, "Chips");
        assert_eq!(line.image.as_deref(), Some("/images/chips.jpg"));
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let mut cart = Cart::default();
        assert!(matches!(
            cart.add_item(&product("Chips", 1.0), 0),
            Err(CartError::InvalidQuantity(0))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn non_positive_quantity_update_removes_line() {
        let chips = product("Chips", 25.0);
        let juice = product("Juice", 30.0);
        let mut cart = Cart::default();
        cart.add_item(&chips, 2).unwrap();
        cart.add_item(&juice, 1).unwrap();

        cart.update_quantity(chips.id, 0);
        assert_eq!(cart.items().len(), 1);

        cart.update_quantity(juice.id, -1);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_overwrites_quantity() {
        let chips = product("Chips", 25.0);
        let mut cart = Cart::default();
        cart.add_item(&chips, 2).unwrap();

        cart.update_quantity(chips.id, 7);
        assert_eq!(cart.items()[0].qty, 7);
        assert_eq!(cart.total_items(), 7);
    }

    #[test]
    fn removing_absent_product_is_a_no_op() {
        let mut cart = Cart::default();
        cart.add_item(&product("Chips", 25.0), 1).unwrap();
        cart.remove_item(Uuid::new_v4());
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn checkout_submits_snapshot_and_grand_total() {
        let mut cart = Cart::default();
        cart.add_item(&product("Chips", 25.0), 2).unwrap();
        cart.add_item(&product("Juice", 30.0), 1).unwrap();

        let settings = PricingSettings {
            delivery_fee_threshold: 100.0,
            base_delivery_fee: 5.0,
        };
        let req = cart.checkout(details(), &settings).unwrap();

        assert_eq!(req.items.len(), 2);
        assert_eq!(req.items[0].name, "Chips");
        assert_eq!(req.total_amount, 85.0);
        assert_eq!(req.payment_method, PaymentMethod::BankTransfer);
    }

    #[test]
    fn empty_cart_cannot_check_out() {
        let cart = Cart::default();
        assert!(matches!(
            cart.checkout(details(), &PricingSettings::default()),
            Err(CartError::EmptyCart)
        ));
    }

    #[test]
    fn store_survives_reopen() {
        let storage = MemoryCartStorage::default();
        let chips = product("Chips", 25.0);

        let mut store = CartStore::open(&storage).unwrap();
        store.add_item(&chips, 3).unwrap();

        let reopened = CartStore::open(&storage).unwrap();
        assert_eq!(reopened.cart().items().len(), 1);
        assert_eq!(reopened.cart().items()[0].qty, 3);
    }

    #[test]
    fn completed_checkout_clears_persisted_cart() {
        let storage = MemoryCartStorage::default();
        let mut store = CartStore::open(&storage).unwrap();
        store.add_item(&product("Chips", 25.0), 1).unwrap();

        store.complete_checkout().unwrap();

        assert!(CartStore::open(&storage).unwrap().cart().is_empty());
    }

    #[test]
    fn unreadable_blob_starts_an_empty_cart() {
        let storage = MemoryCartStorage::default();
        storage.save(CART_STORAGE_KEY, "{not json").unwrap();

        let store = CartStore::open(&storage).unwrap();
        assert!(store.cart().is_empty());
    }

    #[test]
    fn file_storage_round_trips_blob() {
        let dir = std::env::temp_dir().join(format!("adunni-cart-{}", Uuid::new_v4()));
        let storage = FileCartStorage::new(&dir);

        assert_eq!(storage.load(CART_STORAGE_KEY).unwrap(), None);
        storage.save(CART_STORAGE_KEY, "{\"items\":[]}").unwrap();
        assert_eq!(
            storage.load(CART_STORAGE_KEY).unwrap().as_deref(),
            Some("{\"items\":[]}")
        );

        fs::remove_dir_all(dir).unwrap();
    }
}
