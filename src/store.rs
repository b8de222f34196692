use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::model::{AttachedImage, CustomerId, CustomerProfile, MaintenanceOrder, OrderId};

/// Read-only source of the records a report is built from.
///
/// Implementations are expected to hand out a consistent snapshot across the
/// three calls made for one generation.
pub trait RecordLoader {
    fn get_order(&self, order_id: OrderId) -> Option<MaintenanceOrder>;
    fn get_customer(&self, customer_id: CustomerId) -> Option<CustomerProfile>;
    /// Images of an order in display order: ascending upload time, ties by id.
    fn list_images(&self, order_id: OrderId) -> Vec<AttachedImage>;
}

#[derive(Deserialize)]
struct StoreFile {
    #[serde(default)]
    orders: Vec<MaintenanceOrder>,
    #[serde(default)]
    customers: Vec<CustomerProfile>,
    #[serde(default)]
    images: Vec<AttachedImage>,
}

/// In-memory record store, typically loaded from a JSON export.
#[derive(Default)]
pub struct RecordStore {
    orders: BTreeMap<OrderId, MaintenanceOrder>,
    customers: BTreeMap<CustomerId, CustomerProfile>,
    images: Vec<AttachedImage>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(s: &str) -> Result<Self, Error> {
        let file: StoreFile = serde_json::from_str(s)?;
        let mut store = RecordStore::new();
        for order in file.orders {
            store.insert_order(order);
        }
        for customer in file.customers {
            store.insert_customer(customer);
        }
        for image in file.images {
            store.attach_image(image)?;
        }
        log::debug!(
            "Loaded record store: {} orders, {} customers, {} images",
            store.orders.len(),
            store.customers.len(),
            store.images.len()
        );
        Ok(store)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", e, path.display()),
            ))
        })?;
        Self::from_json_str(&text)
    }

    pub fn insert_order(&mut self, order: MaintenanceOrder) {
        self.orders.insert(order.id, order);
    }

    pub fn insert_customer(&mut self, customer: CustomerProfile) {
        self.customers.insert(customer.id, customer);
    }

    /// Attach an image to an existing order.
    pub fn attach_image(&mut self, image: AttachedImage) -> Result<(), Error> {
        if !self.orders.contains_key(&image.order_id) {
            return Err(Error::Store(format!(
                "image {} ({}) references missing order {}",
                image.id, image.original_filename, image.order_id
            )));
        }
        self.images.retain(|existing| existing.id != image.id);
        self.images.push(image);
        Ok(())
    }

    /// Remove an order together with every image it owns.
    pub fn remove_order(&mut self, order_id: OrderId) -> Option<MaintenanceOrder> {
        let removed = self.orders.remove(&order_id)?;
        self.images.retain(|img| img.order_id != order_id);
        Some(removed)
    }
}

impl RecordLoader for RecordStore {
    fn get_order(&self, order_id: OrderId) -> Option<MaintenanceOrder> {
        self.orders.get(&order_id).cloned()
    }

    fn get_customer(&self, customer_id: CustomerId) -> Option<CustomerProfile> {
        self.customers.get(&customer_id).cloned()
    }

    fn list_images(&self, order_id: OrderId) -> Vec<AttachedImage> {
        let mut images: Vec<AttachedImage> = self
            .images
            .iter()
            .filter(|img| img.order_id == order_id)
            .cloned()
            .collect();
        images.sort_by(|a, b| {
            a.uploaded_at
                .cmp(&b.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        images
    }
}
