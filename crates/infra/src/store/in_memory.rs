//! In-memory catalog store.
//!
//! Intended for tests/dev. Not optimized for performance.
//!
//! Transactions get snapshot isolation: `begin` clones the committed tables,
//! writes go to that private copy and are journaled, and `commit` replays the
//! journal onto the latest committed state before re-checking every unique and
//! foreign key constraint the Postgres schema declares. A transaction that is
//! dropped or rolled back leaves nothing behind.
//!
//! Ids come from shared sequences and, like Postgres sequences, are not
//! reused after a rollback.
//!
//! `begin` and `commit` each yield to the executor once, standing in for the
//! round trip a real backend makes, so concurrent callers interleave between
//! their snapshot and their commit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use forgecart_catalog::{
    NewProduct, NewProductOption, NewProductOptionValue, NewProductRoot, Product, ProductOption,
    ProductOptionValue, ProductRoot, ProductVariantBridge,
};
use forgecart_core::{
    Entity, Lifecycle, ProductId, ProductOptionId, ProductOptionValueId, ProductRootId,
    VariantBridgeId,
};

use super::{
    ProductOptionStore, ProductOptionValueStore, ProductRootStore, ProductStore, StoreError,
    Transactional, VariantBridgeStore,
};

/// Table a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    ProductRoot,
    ProductOption,
    ProductOptionValue,
    Product,
    VariantBridge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteAction {
    Created,
    Updated,
    Archived,
}

/// One row-level write, in the order it was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteOp {
    pub kind: EntityKind,
    pub id: i64,
    pub action: WriteAction,
}

impl WriteOp {
    fn new(kind: EntityKind, id: i64, action: WriteAction) -> Self {
        Self { kind, id, action }
    }
}

/// Where [`InMemoryCatalogStore::fail_on`] injects a one-shot failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Create(EntityKind),
    Update(EntityKind),
    Archive(EntityKind),
    Commit,
}

/// Committed row counts (live and archived).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub product_roots: usize,
    pub product_options: usize,
    pub product_option_values: usize,
    pub products: usize,
    pub variant_bridges: usize,
    pub archived: usize,
}

impl StoreStats {
    pub fn total_rows(&self) -> usize {
        self.product_roots
            + self.product_options
            + self.product_option_values
            + self.products
            + self.variant_bridges
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    roots: BTreeMap<ProductRootId, ProductRoot>,
    options: BTreeMap<ProductOptionId, ProductOption>,
    values: BTreeMap<ProductOptionValueId, ProductOptionValue>,
    products: BTreeMap<ProductId, Product>,
    bridges: BTreeMap<VariantBridgeId, ProductVariantBridge>,
}

impl Tables {
    fn is_archived(&self, kind: EntityKind, id: i64) -> bool {
        let lifecycle = match kind {
            EntityKind::ProductRoot => self.roots.get(&ProductRootId::new(id)).map(|r| r.lifecycle),
            EntityKind::ProductOption => {
                self.options.get(&ProductOptionId::new(id)).map(|r| r.lifecycle)
            }
            EntityKind::ProductOptionValue => self
                .values
                .get(&ProductOptionValueId::new(id))
                .map(|r| r.lifecycle),
            EntityKind::Product => self.products.get(&ProductId::new(id)).map(|r| r.lifecycle),
            EntityKind::VariantBridge => {
                self.bridges.get(&VariantBridgeId::new(id)).map(|r| r.lifecycle)
            }
        };
        lifecycle.is_some_and(|l| l.is_archived())
    }

    /// Copy the current version of a row from `from`.
    fn copy_row(&mut self, kind: EntityKind, id: i64, from: &Tables) {
        match kind {
            EntityKind::ProductRoot => {
                if let Some(r) = from.roots.get(&ProductRootId::new(id)) {
                    self.roots.insert(r.id, r.clone());
                }
            }
            EntityKind::ProductOption => {
                if let Some(r) = from.options.get(&ProductOptionId::new(id)) {
                    self.options.insert(r.id, r.clone());
                }
            }
            EntityKind::ProductOptionValue => {
                if let Some(r) = from.values.get(&ProductOptionValueId::new(id)) {
                    self.values.insert(r.id, r.clone());
                }
            }
            EntityKind::Product => {
                if let Some(r) = from.products.get(&ProductId::new(id)) {
                    self.products.insert(r.id, r.clone());
                }
            }
            EntityKind::VariantBridge => {
                if let Some(r) = from.bridges.get(&VariantBridgeId::new(id)) {
                    self.bridges.insert(r.id, *r);
                }
            }
        }
    }

    fn check_row(&self, kind: EntityKind, id: i64) -> Result<(), StoreError> {
        match kind {
            EntityKind::ProductRoot => match self.roots.get(&ProductRootId::new(id)) {
                Some(r) => self.check_root(r),
                None => Ok(()),
            },
            EntityKind::ProductOption => match self.options.get(&ProductOptionId::new(id)) {
                Some(r) => self.check_option(r),
                None => Ok(()),
            },
            EntityKind::ProductOptionValue => match self
                .values
                .get(&ProductOptionValueId::new(id))
            {
                Some(r) => self.check_value(r),
                None => Ok(()),
            },
            EntityKind::Product => match self.products.get(&ProductId::new(id)) {
                Some(r) => self.check_product(r),
                None => Ok(()),
            },
            EntityKind::VariantBridge => match self.bridges.get(&VariantBridgeId::new(id)) {
                Some(r) => self.check_bridge(r),
                None => Ok(()),
            },
        }
    }

    fn check_root(&self, row: &ProductRoot) -> Result<(), StoreError> {
        if self
            .roots
            .values()
            .any(|r| r.id != row.id && r.sku_prefix == row.sku_prefix)
        {
            return Err(StoreError::unique("product_roots_sku_prefix_key"));
        }
        Ok(())
    }

    fn check_option(&self, row: &ProductOption) -> Result<(), StoreError> {
        if !self.roots.contains_key(&row.product_root_id) {
            return Err(StoreError::ForeignKeyViolation(
                "product_options_product_root_id_fkey".to_string(),
            ));
        }
        if row.is_live()
            && self.options.values().any(|o| {
                o.id != row.id
                    && o.is_live()
                    && o.product_root_id == row.product_root_id
                    && o.name == row.name
            })
        {
            return Err(StoreError::unique("product_options_root_name_live_idx"));
        }
        Ok(())
    }

    fn check_value(&self, row: &ProductOptionValue) -> Result<(), StoreError> {
        if !self.options.contains_key(&row.product_option_id) {
            return Err(StoreError::ForeignKeyViolation(
                "product_option_values_product_option_id_fkey".to_string(),
            ));
        }
        if row.is_live()
            && self.values.values().any(|v| {
                v.id != row.id
                    && v.is_live()
                    && v.product_option_id == row.product_option_id
                    && v.value == row.value
            })
        {
            return Err(StoreError::unique(
                "product_option_values_option_value_live_idx",
            ));
        }
        Ok(())
    }

    fn check_product(&self, row: &Product) -> Result<(), StoreError> {
        if !self.roots.contains_key(&row.product_root_id) {
            return Err(StoreError::ForeignKeyViolation(
                "products_product_root_id_fkey".to_string(),
            ));
        }
        if self
            .products
            .values()
            .any(|p| p.id != row.id && p.sku == row.sku)
        {
            return Err(StoreError::unique("products_sku_key"));
        }
        Ok(())
    }

    fn check_bridge(&self, row: &ProductVariantBridge) -> Result<(), StoreError> {
        if !self.products.contains_key(&row.product_id) {
            return Err(StoreError::ForeignKeyViolation(
                "product_variant_bridge_product_id_fkey".to_string(),
            ));
        }
        if !self.values.contains_key(&row.product_option_value_id) {
            return Err(StoreError::ForeignKeyViolation(
                "product_variant_bridge_product_option_value_id_fkey".to_string(),
            ));
        }
        if row.is_live()
            && self.bridges.values().any(|b| {
                b.id != row.id
                    && b.is_live()
                    && b.product_id == row.product_id
                    && b.product_option_value_id == row.product_option_value_id
            })
        {
            return Err(StoreError::unique(
                "product_variant_bridge_product_value_live_idx",
            ));
        }
        Ok(())
    }

    /// Attach the values of the product's live bridges, in bridge order.
    fn with_option_values(&self, mut product: Product) -> Product {
        product.applicable_option_values = self
            .bridges
            .values()
            .filter(|b| b.product_id == product.id && b.is_live())
            .filter_map(|b| self.values.get(&b.product_option_value_id))
            .cloned()
            .collect();
        product
    }

    fn stats(&self) -> StoreStats {
        let archived = self.roots.values().filter(|r| !r.is_live()).count()
            + self.options.values().filter(|r| !r.is_live()).count()
            + self.values.values().filter(|r| !r.is_live()).count()
            + self.products.values().filter(|r| !r.is_live()).count()
            + self.bridges.values().filter(|r| !r.is_live()).count();

        StoreStats {
            product_roots: self.roots.len(),
            product_options: self.options.len(),
            product_option_values: self.values.len(),
            products: self.products.len(),
            variant_bridges: self.bridges.len(),
            archived,
        }
    }
}

#[derive(Debug, Default)]
struct Committed {
    tables: Tables,
    journal: Vec<WriteOp>,
}

#[derive(Debug, Default)]
struct Sequences {
    roots: AtomicI64,
    options: AtomicI64,
    values: AtomicI64,
    products: AtomicI64,
    bridges: AtomicI64,
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Debug, Default)]
struct Shared {
    committed: RwLock<Committed>,
    sequences: Sequences,
    fail_point: Mutex<Option<FailPoint>>,
}

/// In-memory [`super::CatalogStore`]. Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    shared: Arc<Shared>,
}

/// Private working copy plus the writes issued through it.
#[derive(Debug)]
pub struct InMemoryTx {
    working: Tables,
    journal: Vec<WriteOp>,
}

impl InMemoryTx {
    fn record(&mut self, kind: EntityKind, id: i64, action: WriteAction) {
        self.journal.push(WriteOp::new(kind, id, action));
    }
}

fn poisoned() -> StoreError {
    StoreError::Database("lock poisoned".to_string())
}

fn not_live(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::RowNotFound(format!("{what} {id} does not exist or is archived"))
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next matching operation fail with [`StoreError::Database`].
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut slot) = self.shared.fail_point.lock() {
            *slot = Some(point);
        }
    }

    /// Every committed write, in commit order.
    pub fn journal(&self) -> Result<Vec<WriteOp>, StoreError> {
        let committed = self.shared.committed.read().map_err(|_| poisoned())?;
        Ok(committed.journal.clone())
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let committed = self.shared.committed.read().map_err(|_| poisoned())?;
        Ok(committed.tables.stats())
    }

    fn check_fault(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut slot = self.shared.fail_point.lock().map_err(|_| poisoned())?;
        if *slot == Some(point) {
            *slot = None;
            return Err(StoreError::Database(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transactional for InMemoryCatalogStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx, StoreError> {
        tokio::task::yield_now().await;

        let committed = self.shared.committed.read().map_err(|_| poisoned())?;
        Ok(InMemoryTx {
            working: committed.tables.clone(),
            journal: Vec::new(),
        })
    }

    async fn commit(&self, tx: InMemoryTx) -> Result<(), StoreError> {
        self.check_fault(FailPoint::Commit)?;
        tokio::task::yield_now().await;

        let mut committed = self.shared.committed.write().map_err(|_| poisoned())?;
        let mut next = committed.tables.clone();

        for op in &tx.journal {
            // Another transaction archived this row after our snapshot.
            if op.action != WriteAction::Created && committed.tables.is_archived(op.kind, op.id) {
                return Err(StoreError::RowNotFound(format!(
                    "{:?} {} was archived concurrently",
                    op.kind, op.id
                )));
            }
            next.copy_row(op.kind, op.id, &tx.working);
        }
        for op in &tx.journal {
            next.check_row(op.kind, op.id)?;
        }

        committed.tables = next;
        committed.journal.extend(tx.journal);
        Ok(())
    }

    async fn rollback(&self, tx: InMemoryTx) -> Result<(), StoreError> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl ProductRootStore for InMemoryCatalogStore {
    async fn product_root_exists(
        &self,
        tx: &mut InMemoryTx,
        id: ProductRootId,
    ) -> Result<bool, StoreError> {
        Ok(tx.working.roots.get(&id).is_some_and(|r| r.is_live()))
    }

    async fn product_root_with_sku_prefix_exists(
        &self,
        tx: &mut InMemoryTx,
        sku_prefix: &str,
    ) -> Result<bool, StoreError> {
        Ok(tx.working.roots.values().any(|r| r.sku_prefix == sku_prefix))
    }

    async fn get_product_root(
        &self,
        tx: &mut InMemoryTx,
        id: ProductRootId,
    ) -> Result<Option<ProductRoot>, StoreError> {
        Ok(tx.working.roots.get(&id).cloned())
    }

    async fn get_product_root_by_sku_prefix(
        &self,
        tx: &mut InMemoryTx,
        sku_prefix: &str,
    ) -> Result<Option<ProductRoot>, StoreError> {
        Ok(tx
            .working
            .roots
            .values()
            .find(|r| r.sku_prefix == sku_prefix)
            .cloned())
    }

    async fn create_product_root(
        &self,
        tx: &mut InMemoryTx,
        new: &NewProductRoot,
    ) -> Result<ProductRoot, StoreError> {
        self.check_fault(FailPoint::Create(EntityKind::ProductRoot))?;

        let now = Utc::now();
        let row = ProductRoot {
            id: ProductRootId::new(next_id(&self.shared.sequences.roots)),
            name: new.name.clone(),
            subtitle: new.subtitle.clone(),
            description: new.description.clone(),
            sku_prefix: new.sku_prefix.clone(),
            manufacturer: new.manufacturer.clone(),
            brand: new.brand.clone(),
            available_on: new.available_on.unwrap_or(now),
            taxable: new.taxable,
            cost: new.cost,
            product_dimensions: new.product_dimensions,
            package_dimensions: new.package_dimensions,
            lifecycle: Lifecycle::created(now),
        };
        tx.working.check_root(&row)?;

        tx.working.roots.insert(row.id, row.clone());
        tx.record(EntityKind::ProductRoot, row.id.get(), WriteAction::Created);
        Ok(row)
    }

    async fn update_product_root(
        &self,
        tx: &mut InMemoryTx,
        root: &ProductRoot,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Update(EntityKind::ProductRoot))?;

        let now = Utc::now();
        let row = tx
            .working
            .roots
            .get_mut(&root.id)
            .filter(|r| r.is_live())
            .ok_or_else(|| not_live("product root", root.id))?;

        *row = ProductRoot {
            id: row.id,
            sku_prefix: row.sku_prefix.clone(),
            lifecycle: Lifecycle {
                updated_on: Some(now),
                ..row.lifecycle
            },
            ..root.clone()
        };

        tx.record(EntityKind::ProductRoot, root.id.get(), WriteAction::Updated);
        Ok(now)
    }

    async fn archive_product_root(
        &self,
        tx: &mut InMemoryTx,
        id: ProductRootId,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::ProductRoot))?;

        let now = Utc::now();
        let row = tx
            .working
            .roots
            .get_mut(&id)
            .filter(|r| r.is_live())
            .ok_or_else(|| not_live("product root", id))?;
        row.lifecycle.archive(now);

        tx.record(EntityKind::ProductRoot, id.get(), WriteAction::Archived);
        Ok(now)
    }
}

#[async_trait]
impl ProductOptionStore for InMemoryCatalogStore {
    async fn product_option_exists(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionId,
    ) -> Result<bool, StoreError> {
        Ok(tx.working.options.get(&id).is_some_and(|o| o.is_live()))
    }

    async fn product_option_with_name_exists(
        &self,
        tx: &mut InMemoryTx,
        root_id: ProductRootId,
        name: &str,
    ) -> Result<bool, StoreError> {
        Ok(tx
            .working
            .options
            .values()
            .any(|o| o.is_live() && o.product_root_id == root_id && o.name == name))
    }

    async fn get_product_option(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionId,
    ) -> Result<Option<ProductOption>, StoreError> {
        Ok(tx.working.options.get(&id).cloned())
    }

    async fn get_product_option_by_name(
        &self,
        tx: &mut InMemoryTx,
        root_id: ProductRootId,
        name: &str,
    ) -> Result<Option<ProductOption>, StoreError> {
        Ok(tx
            .working
            .options
            .values()
            .find(|o| o.is_live() && o.product_root_id == root_id && o.name == name)
            .cloned())
    }

    async fn list_product_options(
        &self,
        tx: &mut InMemoryTx,
        root_id: ProductRootId,
    ) -> Result<Vec<ProductOption>, StoreError> {
        Ok(tx
            .working
            .options
            .values()
            .filter(|o| o.is_live() && o.product_root_id == root_id)
            .cloned()
            .collect())
    }

    async fn create_product_option(
        &self,
        tx: &mut InMemoryTx,
        new: &NewProductOption,
    ) -> Result<ProductOption, StoreError> {
        self.check_fault(FailPoint::Create(EntityKind::ProductOption))?;

        let row = ProductOption {
            id: ProductOptionId::new(next_id(&self.shared.sequences.options)),
            product_root_id: new.product_root_id,
            name: new.name.clone(),
            values: Vec::new(),
            lifecycle: Lifecycle::created(Utc::now()),
        };
        tx.working.check_option(&row)?;

        tx.working.options.insert(row.id, row.clone());
        tx.record(EntityKind::ProductOption, row.id.get(), WriteAction::Created);
        Ok(row)
    }

    async fn update_product_option(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionId,
        name: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Update(EntityKind::ProductOption))?;

        let mut row = tx
            .working
            .options
            .get(&id)
            .filter(|o| o.is_live())
            .cloned()
            .ok_or_else(|| not_live("product option", id))?;
        let now = Utc::now();
        row.name = name.to_string();
        row.lifecycle.updated_on = Some(now);
        tx.working.check_option(&row)?;

        tx.working.options.insert(id, row);
        tx.record(EntityKind::ProductOption, id.get(), WriteAction::Updated);
        Ok(now)
    }

    async fn archive_product_option(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionId,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::ProductOption))?;

        let now = Utc::now();
        let row = tx
            .working
            .options
            .get_mut(&id)
            .filter(|o| o.is_live())
            .ok_or_else(|| not_live("product option", id))?;
        row.lifecycle.archive(now);

        tx.record(EntityKind::ProductOption, id.get(), WriteAction::Archived);
        Ok(now)
    }
}

#[async_trait]
impl ProductOptionValueStore for InMemoryCatalogStore {
    async fn product_option_value_exists(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionValueId,
    ) -> Result<bool, StoreError> {
        Ok(tx.working.values.get(&id).is_some_and(|v| v.is_live()))
    }

    async fn product_option_value_for_option_exists(
        &self,
        tx: &mut InMemoryTx,
        option_id: ProductOptionId,
        value: &str,
    ) -> Result<bool, StoreError> {
        Ok(tx
            .working
            .values
            .values()
            .any(|v| v.is_live() && v.product_option_id == option_id && v.value == value))
    }

    async fn get_product_option_value(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionValueId,
    ) -> Result<Option<ProductOptionValue>, StoreError> {
        Ok(tx.working.values.get(&id).cloned())
    }

    async fn get_product_option_value_for_option(
        &self,
        tx: &mut InMemoryTx,
        option_id: ProductOptionId,
        value: &str,
    ) -> Result<Option<ProductOptionValue>, StoreError> {
        Ok(tx
            .working
            .values
            .values()
            .find(|v| v.is_live() && v.product_option_id == option_id && v.value == value)
            .cloned())
    }

    async fn list_product_option_values(
        &self,
        tx: &mut InMemoryTx,
        option_id: ProductOptionId,
    ) -> Result<Vec<ProductOptionValue>, StoreError> {
        Ok(tx
            .working
            .values
            .values()
            .filter(|v| v.is_live() && v.product_option_id == option_id)
            .cloned()
            .collect())
    }

    async fn create_product_option_value(
        &self,
        tx: &mut InMemoryTx,
        new: &NewProductOptionValue,
    ) -> Result<ProductOptionValue, StoreError> {
        self.check_fault(FailPoint::Create(EntityKind::ProductOptionValue))?;

        let row = ProductOptionValue {
            id: ProductOptionValueId::new(next_id(&self.shared.sequences.values)),
            product_option_id: new.product_option_id,
            value: new.value.clone(),
            lifecycle: Lifecycle::created(Utc::now()),
        };
        tx.working.check_value(&row)?;

        tx.working.values.insert(row.id, row.clone());
        tx.record(
            EntityKind::ProductOptionValue,
            row.id.get(),
            WriteAction::Created,
        );
        Ok(row)
    }

    async fn update_product_option_value(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionValueId,
        value: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Update(EntityKind::ProductOptionValue))?;

        let mut row = tx
            .working
            .values
            .get(&id)
            .filter(|v| v.is_live())
            .cloned()
            .ok_or_else(|| not_live("product option value", id))?;
        let now = Utc::now();
        row.value = value.to_string();
        row.lifecycle.updated_on = Some(now);
        tx.working.check_value(&row)?;

        tx.working.values.insert(id, row);
        tx.record(EntityKind::ProductOptionValue, id.get(), WriteAction::Updated);
        Ok(now)
    }

    async fn archive_product_option_value(
        &self,
        tx: &mut InMemoryTx,
        id: ProductOptionValueId,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::ProductOptionValue))?;

        let now = Utc::now();
        let row = tx
            .working
            .values
            .get_mut(&id)
            .filter(|v| v.is_live())
            .ok_or_else(|| not_live("product option value", id))?;
        row.lifecycle.archive(now);

        tx.record(EntityKind::ProductOptionValue, id.get(), WriteAction::Archived);
        Ok(now)
    }

    async fn archive_product_option_values_for_option(
        &self,
        tx: &mut InMemoryTx,
        option_id: ProductOptionId,
    ) -> Result<u64, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::ProductOptionValue))?;

        let now = Utc::now();
        let mut archived = Vec::new();
        for row in tx.working.values.values_mut() {
            if row.product_option_id == option_id && row.lifecycle.archive(now) {
                archived.push(row.id);
            }
        }
        for id in &archived {
            tx.record(EntityKind::ProductOptionValue, id.get(), WriteAction::Archived);
        }
        Ok(archived.len() as u64)
    }
}

#[async_trait]
impl ProductStore for InMemoryCatalogStore {
    async fn product_exists(&self, tx: &mut InMemoryTx, id: ProductId) -> Result<bool, StoreError> {
        Ok(tx.working.products.get(&id).is_some_and(|p| p.is_live()))
    }

    async fn product_with_sku_exists(
        &self,
        tx: &mut InMemoryTx,
        sku: &str,
    ) -> Result<bool, StoreError> {
        Ok(tx.working.products.values().any(|p| p.sku == sku))
    }

    async fn get_product(
        &self,
        tx: &mut InMemoryTx,
        id: ProductId,
    ) -> Result<Option<Product>, StoreError> {
        Ok(tx
            .working
            .products
            .get(&id)
            .cloned()
            .map(|p| tx.working.with_option_values(p)))
    }

    async fn get_product_by_sku(
        &self,
        tx: &mut InMemoryTx,
        sku: &str,
    ) -> Result<Option<Product>, StoreError> {
        Ok(tx
            .working
            .products
            .values()
            .find(|p| p.sku == sku)
            .cloned()
            .map(|p| tx.working.with_option_values(p)))
    }

    async fn list_products(
        &self,
        tx: &mut InMemoryTx,
        root_id: ProductRootId,
    ) -> Result<Vec<Product>, StoreError> {
        Ok(tx
            .working
            .products
            .values()
            .filter(|p| p.is_live() && p.product_root_id == root_id)
            .cloned()
            .map(|p| tx.working.with_option_values(p))
            .collect())
    }

    async fn create_product(
        &self,
        tx: &mut InMemoryTx,
        new: &NewProduct,
    ) -> Result<Product, StoreError> {
        self.check_fault(FailPoint::Create(EntityKind::Product))?;

        let now = Utc::now();
        let row = Product {
            id: ProductId::new(next_id(&self.shared.sequences.products)),
            product_root_id: new.product_root_id,
            name: new.name.clone(),
            subtitle: new.subtitle.clone(),
            description: new.description.clone(),
            option_summary: new.option_summary.clone(),
            sku: new.sku.clone(),
            upc: new.upc.clone(),
            manufacturer: new.manufacturer.clone(),
            brand: new.brand.clone(),
            quantity: new.quantity,
            quantity_per_package: new.quantity_per_package,
            taxable: new.taxable,
            price: new.price,
            on_sale: new.on_sale,
            sale_price: new.sale_price,
            cost: new.cost,
            product_dimensions: new.product_dimensions,
            package_dimensions: new.package_dimensions,
            applicable_option_values: Vec::new(),
            available_on: new.available_on.unwrap_or(now),
            lifecycle: Lifecycle::created(now),
        };
        tx.working.check_product(&row)?;

        tx.working.products.insert(row.id, row.clone());
        tx.record(EntityKind::Product, row.id.get(), WriteAction::Created);
        Ok(row)
    }

    async fn update_product(
        &self,
        tx: &mut InMemoryTx,
        product: &Product,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Update(EntityKind::Product))?;

        let now = Utc::now();
        let row = tx
            .working
            .products
            .get_mut(&product.id)
            .filter(|p| p.is_live())
            .ok_or_else(|| not_live("product", product.id))?;

        *row = Product {
            id: row.id,
            product_root_id: row.product_root_id,
            sku: row.sku.clone(),
            option_summary: row.option_summary.clone(),
            applicable_option_values: Vec::new(),
            lifecycle: Lifecycle {
                updated_on: Some(now),
                ..row.lifecycle
            },
            ..product.clone()
        };

        tx.record(EntityKind::Product, product.id.get(), WriteAction::Updated);
        Ok(now)
    }

    async fn archive_product(
        &self,
        tx: &mut InMemoryTx,
        id: ProductId,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::Product))?;

        let now = Utc::now();
        let row = tx
            .working
            .products
            .get_mut(&id)
            .filter(|p| p.is_live())
            .ok_or_else(|| not_live("product", id))?;
        row.lifecycle.archive(now);

        tx.record(EntityKind::Product, id.get(), WriteAction::Archived);
        Ok(now)
    }
}

#[async_trait]
impl VariantBridgeStore for InMemoryCatalogStore {
    async fn variant_bridge_exists(
        &self,
        tx: &mut InMemoryTx,
        id: VariantBridgeId,
    ) -> Result<bool, StoreError> {
        Ok(tx.working.bridges.get(&id).is_some_and(|b| b.is_live()))
    }

    async fn get_variant_bridge(
        &self,
        tx: &mut InMemoryTx,
        id: VariantBridgeId,
    ) -> Result<Option<ProductVariantBridge>, StoreError> {
        Ok(tx.working.bridges.get(&id).copied())
    }

    async fn create_variant_bridges(
        &self,
        tx: &mut InMemoryTx,
        product_id: ProductId,
        value_ids: &[ProductOptionValueId],
    ) -> Result<Vec<ProductVariantBridge>, StoreError> {
        self.check_fault(FailPoint::Create(EntityKind::VariantBridge))?;

        let now = Utc::now();
        let mut created = Vec::with_capacity(value_ids.len());
        for &value_id in value_ids {
            let row = ProductVariantBridge {
                id: VariantBridgeId::new(next_id(&self.shared.sequences.bridges)),
                product_id,
                product_option_value_id: value_id,
                lifecycle: Lifecycle::created(now),
            };
            tx.working.check_bridge(&row)?;

            tx.working.bridges.insert(row.id, row);
            tx.record(EntityKind::VariantBridge, row.id.get(), WriteAction::Created);
            created.push(row);
        }
        Ok(created)
    }

    async fn update_variant_bridge(
        &self,
        tx: &mut InMemoryTx,
        bridge: &ProductVariantBridge,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.check_fault(FailPoint::Update(EntityKind::VariantBridge))?;

        let now = Utc::now();
        let current = tx
            .working
            .bridges
            .get(&bridge.id)
            .filter(|b| b.is_live())
            .ok_or_else(|| not_live("variant bridge", bridge.id))?;

        let row = ProductVariantBridge {
            product_id: bridge.product_id,
            product_option_value_id: bridge.product_option_value_id,
            lifecycle: Lifecycle {
                updated_on: Some(now),
                ..current.lifecycle
            },
            ..*current
        };
        tx.working.check_bridge(&row)?;

        tx.working.bridges.insert(row.id, row);
        tx.record(EntityKind::VariantBridge, row.id.get(), WriteAction::Updated);
        Ok(now)
    }

    async fn archive_variant_bridges_for_product(
        &self,
        tx: &mut InMemoryTx,
        product_id: ProductId,
    ) -> Result<u64, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::VariantBridge))?;
        Ok(archive_bridges(tx, |b| b.product_id == product_id))
    }

    async fn archive_variant_bridges_for_option_value(
        &self,
        tx: &mut InMemoryTx,
        value_id: ProductOptionValueId,
    ) -> Result<u64, StoreError> {
        self.check_fault(FailPoint::Archive(EntityKind::VariantBridge))?;
        Ok(archive_bridges(tx, |b| b.product_option_value_id == value_id))
    }
}

fn archive_bridges<F>(tx: &mut InMemoryTx, matches: F) -> u64
where
    F: Fn(&ProductVariantBridge) -> bool,
{
    let now = Utc::now();
    let mut archived = Vec::new();
    for row in tx.working.bridges.values_mut() {
        if matches(row) && row.lifecycle.archive(now) {
            archived.push(row.id);
        }
    }
    for id in &archived {
        tx.record(EntityKind::VariantBridge, id.get(), WriteAction::Archived);
    }
    archived.len() as u64
}
