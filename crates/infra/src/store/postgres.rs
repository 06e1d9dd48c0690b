//! Postgres-backed catalog store.
//!
//! Every operation runs on the caller's `sqlx::Transaction`; the schema lives in
//! `migrations/0001_catalog.sql` and is applied by [`PostgresCatalogStore::migrate`].
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` (constraint/index name) |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (other) | Any other | `Database` |
//! | RowNotFound | N/A | `RowNotFound` |
//! | PoolClosed / other | N/A | `Database` |
//!
//! ## Archival
//!
//! Archive statements are `UPDATE ... SET archived_on = NOW() WHERE ... AND
//! archived_on IS NULL`, so a row is stamped at most once. A single-row archive
//! that matches nothing is reported as `RowNotFound`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{Span, instrument};

use forgecart_catalog::{
    Dimensions, NewProduct, NewProductOption, NewProductOptionValue, NewProductRoot, Product,
    ProductOption, ProductOptionValue, ProductRoot, ProductVariantBridge,
};
use forgecart_core::{
    Lifecycle, ProductId, ProductOptionId, ProductOptionValueId, ProductRootId, VariantBridgeId,
};

use super::{
    ProductOptionStore, ProductOptionValueStore, ProductRootStore, ProductStore, StoreError,
    Transactional, VariantBridgeStore,
};
use crate::config::CatalogConfig;

const ROOT_COLUMNS: &str = "id, name, subtitle, description, sku_prefix, manufacturer, brand, \
    available_on, taxable, cost, \
    product_weight, product_height, product_width, product_length, \
    package_weight, package_height, package_width, package_length, \
    created_on, updated_on, archived_on";

const OPTION_COLUMNS: &str = "id, product_root_id, name, created_on, updated_on, archived_on";

const VALUE_COLUMNS: &str = "id, product_option_id, value, created_on, updated_on, archived_on";

const PRODUCT_COLUMNS: &str = "id, product_root_id, name, subtitle, description, option_summary, \
    sku, upc, manufacturer, brand, quantity, quantity_per_package, taxable, price, on_sale, \
    sale_price, cost, \
    product_weight, product_height, product_width, product_length, \
    package_weight, package_height, package_width, package_length, \
    available_on, created_on, updated_on, archived_on";

const BRIDGE_COLUMNS: &str =
    "id, product_id, product_option_value_id, created_on, updated_on, archived_on";

/// Postgres-backed [`super::CatalogStore`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool sized from configuration.
    #[instrument(skip(config), fields(max_connections = config.db_max_connections), err)]
    pub async fn connect(config: &CatalogConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the catalog schema. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("../../migrations/0001_catalog.sql"))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type PgTx = Transaction<'static, Postgres>;

#[async_trait]
impl Transactional for PostgresCatalogStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn commit(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), StoreError> {
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl ProductRootStore for PostgresCatalogStore {
    async fn product_root_exists(
        &self,
        tx: &mut PgTx,
        id: ProductRootId,
    ) -> Result<bool, StoreError> {
        exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM product_roots WHERE id = $1 AND archived_on IS NULL)",
            id.get(),
            "product_root_exists",
        )
        .await
    }

    async fn product_root_with_sku_prefix_exists(
        &self,
        tx: &mut PgTx,
        sku_prefix: &str,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM product_roots WHERE sku_prefix = $1)")
            .bind(sku_prefix)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("product_root_with_sku_prefix_exists", e))?;
        read_bool(&row, "product_root_with_sku_prefix_exists")
    }

    async fn get_product_root(
        &self,
        tx: &mut PgTx,
        id: ProductRootId,
    ) -> Result<Option<ProductRoot>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ROOT_COLUMNS} FROM product_roots WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("get_product_root", e))?;
        row.map(|r| decode::<ProductRootRow>(&r).map(Into::into))
            .transpose()
    }

    async fn get_product_root_by_sku_prefix(
        &self,
        tx: &mut PgTx,
        sku_prefix: &str,
    ) -> Result<Option<ProductRoot>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ROOT_COLUMNS} FROM product_roots WHERE sku_prefix = $1"
        ))
        .bind(sku_prefix)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_product_root_by_sku_prefix", e))?;
        row.map(|r| decode::<ProductRootRow>(&r).map(Into::into))
            .transpose()
    }

    #[instrument(skip(self, tx, new), fields(sku_prefix = %new.sku_prefix, product_root_id), err)]
    async fn create_product_root(
        &self,
        tx: &mut PgTx,
        new: &NewProductRoot,
    ) -> Result<ProductRoot, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO product_roots (
                name, subtitle, description, sku_prefix, manufacturer, brand,
                available_on, taxable, cost,
                product_weight, product_height, product_width, product_length,
                package_weight, package_height, package_width, package_length
            )
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), $8, $9,
                    $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {ROOT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.subtitle)
        .bind(&new.description)
        .bind(&new.sku_prefix)
        .bind(&new.manufacturer)
        .bind(&new.brand)
        .bind(new.available_on)
        .bind(new.taxable)
        .bind(new.cost)
        .bind(new.product_dimensions.weight)
        .bind(new.product_dimensions.height)
        .bind(new.product_dimensions.width)
        .bind(new.product_dimensions.length)
        .bind(new.package_dimensions.weight)
        .bind(new.package_dimensions.height)
        .bind(new.package_dimensions.width)
        .bind(new.package_dimensions.length)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("create_product_root", e))?;

        let root: ProductRoot = decode::<ProductRootRow>(&row)?.into();
        Span::current().record("product_root_id", root.id.get());
        Ok(root)
    }

    #[instrument(skip(self, tx, root), fields(product_root_id = %root.id), err)]
    async fn update_product_root(
        &self,
        tx: &mut PgTx,
        root: &ProductRoot,
    ) -> Result<DateTime<Utc>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE product_roots SET
                name = $2, subtitle = $3, description = $4, manufacturer = $5, brand = $6,
                available_on = $7, taxable = $8, cost = $9,
                product_weight = $10, product_height = $11, product_width = $12,
                product_length = $13, package_weight = $14, package_height = $15,
                package_width = $16, package_length = $17,
                updated_on = NOW()
            WHERE id = $1 AND archived_on IS NULL
            RETURNING updated_on
            "#,
        )
        .bind(root.id.get())
        .bind(&root.name)
        .bind(&root.subtitle)
        .bind(&root.description)
        .bind(&root.manufacturer)
        .bind(&root.brand)
        .bind(root.available_on)
        .bind(root.taxable)
        .bind(root.cost)
        .bind(root.product_dimensions.weight)
        .bind(root.product_dimensions.height)
        .bind(root.product_dimensions.width)
        .bind(root.product_dimensions.length)
        .bind(root.package_dimensions.weight)
        .bind(root.package_dimensions.height)
        .bind(root.package_dimensions.width)
        .bind(root.package_dimensions.length)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_product_root", e))?;
        stamped(row, "updated_on", "update_product_root")
    }

    #[instrument(skip(self, tx), fields(product_root_id = %id), err)]
    async fn archive_product_root(
        &self,
        tx: &mut PgTx,
        id: ProductRootId,
    ) -> Result<DateTime<Utc>, StoreError> {
        archive_one(
            tx,
            "UPDATE product_roots SET archived_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING archived_on",
            id.get(),
            "archive_product_root",
        )
        .await
    }
}

#[async_trait]
impl ProductOptionStore for PostgresCatalogStore {
    async fn product_option_exists(
        &self,
        tx: &mut PgTx,
        id: ProductOptionId,
    ) -> Result<bool, StoreError> {
        exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM product_options WHERE id = $1 AND archived_on IS NULL)",
            id.get(),
            "product_option_exists",
        )
        .await
    }

    async fn product_option_with_name_exists(
        &self,
        tx: &mut PgTx,
        root_id: ProductRootId,
        name: &str,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM product_options
                WHERE product_root_id = $1 AND name = $2 AND archived_on IS NULL
            )
            "#,
        )
        .bind(root_id.get())
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("product_option_with_name_exists", e))?;
        read_bool(&row, "product_option_with_name_exists")
    }

    async fn get_product_option(
        &self,
        tx: &mut PgTx,
        id: ProductOptionId,
    ) -> Result<Option<ProductOption>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {OPTION_COLUMNS} FROM product_options WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_product_option", e))?;
        row.map(|r| decode::<ProductOptionRow>(&r).map(Into::into))
            .transpose()
    }

    async fn get_product_option_by_name(
        &self,
        tx: &mut PgTx,
        root_id: ProductRootId,
        name: &str,
    ) -> Result<Option<ProductOption>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {OPTION_COLUMNS} FROM product_options \
             WHERE product_root_id = $1 AND name = $2 AND archived_on IS NULL"
        ))
        .bind(root_id.get())
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_product_option_by_name", e))?;
        row.map(|r| decode::<ProductOptionRow>(&r).map(Into::into))
            .transpose()
    }

    async fn list_product_options(
        &self,
        tx: &mut PgTx,
        root_id: ProductRootId,
    ) -> Result<Vec<ProductOption>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {OPTION_COLUMNS} FROM product_options \
             WHERE product_root_id = $1 AND archived_on IS NULL ORDER BY id"
        ))
        .bind(root_id.get())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("list_product_options", e))?;
        rows.iter()
            .map(|r| decode::<ProductOptionRow>(r).map(Into::into))
            .collect()
    }

    #[instrument(
        skip(self, tx, new),
        fields(product_root_id = %new.product_root_id, name = %new.name),
        err
    )]
    async fn create_product_option(
        &self,
        tx: &mut PgTx,
        new: &NewProductOption,
    ) -> Result<ProductOption, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO product_options (product_root_id, name) VALUES ($1, $2) \
             RETURNING {OPTION_COLUMNS}"
        ))
        .bind(new.product_root_id.get())
        .bind(&new.name)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("create_product_option", e))?;
        Ok(decode::<ProductOptionRow>(&row)?.into())
    }

    async fn update_product_option(
        &self,
        tx: &mut PgTx,
        id: ProductOptionId,
        name: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        let row = sqlx::query(
            "UPDATE product_options SET name = $2, updated_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING updated_on",
        )
        .bind(id.get())
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_product_option", e))?;
        stamped(row, "updated_on", "update_product_option")
    }

    #[instrument(skip(self, tx), fields(product_option_id = %id), err)]
    async fn archive_product_option(
        &self,
        tx: &mut PgTx,
        id: ProductOptionId,
    ) -> Result<DateTime<Utc>, StoreError> {
        archive_one(
            tx,
            "UPDATE product_options SET archived_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING archived_on",
            id.get(),
            "archive_product_option",
        )
        .await
    }
}

#[async_trait]
impl ProductOptionValueStore for PostgresCatalogStore {
    async fn product_option_value_exists(
        &self,
        tx: &mut PgTx,
        id: ProductOptionValueId,
    ) -> Result<bool, StoreError> {
        exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM product_option_values \
             WHERE id = $1 AND archived_on IS NULL)",
            id.get(),
            "product_option_value_exists",
        )
        .await
    }

    async fn product_option_value_for_option_exists(
        &self,
        tx: &mut PgTx,
        option_id: ProductOptionId,
        value: &str,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM product_option_values
                WHERE product_option_id = $1 AND value = $2 AND archived_on IS NULL
            )
            "#,
        )
        .bind(option_id.get())
        .bind(value)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("product_option_value_for_option_exists", e))?;
        read_bool(&row, "product_option_value_for_option_exists")
    }

    async fn get_product_option_value(
        &self,
        tx: &mut PgTx,
        id: ProductOptionValueId,
    ) -> Result<Option<ProductOptionValue>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {VALUE_COLUMNS} FROM product_option_values WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_product_option_value", e))?;
        row.map(|r| decode::<ProductOptionValueRow>(&r).map(Into::into))
            .transpose()
    }

    async fn get_product_option_value_for_option(
        &self,
        tx: &mut PgTx,
        option_id: ProductOptionId,
        value: &str,
    ) -> Result<Option<ProductOptionValue>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {VALUE_COLUMNS} FROM product_option_values \
             WHERE product_option_id = $1 AND value = $2 AND archived_on IS NULL"
        ))
        .bind(option_id.get())
        .bind(value)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_product_option_value_for_option", e))?;
        row.map(|r| decode::<ProductOptionValueRow>(&r).map(Into::into))
            .transpose()
    }

    async fn list_product_option_values(
        &self,
        tx: &mut PgTx,
        option_id: ProductOptionId,
    ) -> Result<Vec<ProductOptionValue>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {VALUE_COLUMNS} FROM product_option_values \
             WHERE product_option_id = $1 AND archived_on IS NULL ORDER BY id"
        ))
        .bind(option_id.get())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("list_product_option_values", e))?;
        rows.iter()
            .map(|r| decode::<ProductOptionValueRow>(r).map(Into::into))
            .collect()
    }

    #[instrument(
        skip(self, tx, new),
        fields(product_option_id = %new.product_option_id, value = %new.value),
        err
    )]
    async fn create_product_option_value(
        &self,
        tx: &mut PgTx,
        new: &NewProductOptionValue,
    ) -> Result<ProductOptionValue, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO product_option_values (product_option_id, value) VALUES ($1, $2) \
             RETURNING {VALUE_COLUMNS}"
        ))
        .bind(new.product_option_id.get())
        .bind(&new.value)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("create_product_option_value", e))?;
        Ok(decode::<ProductOptionValueRow>(&row)?.into())
    }

    async fn update_product_option_value(
        &self,
        tx: &mut PgTx,
        id: ProductOptionValueId,
        value: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        let row = sqlx::query(
            "UPDATE product_option_values SET value = $2, updated_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING updated_on",
        )
        .bind(id.get())
        .bind(value)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_product_option_value", e))?;
        stamped(row, "updated_on", "update_product_option_value")
    }

    #[instrument(skip(self, tx), fields(product_option_value_id = %id), err)]
    async fn archive_product_option_value(
        &self,
        tx: &mut PgTx,
        id: ProductOptionValueId,
    ) -> Result<DateTime<Utc>, StoreError> {
        archive_one(
            tx,
            "UPDATE product_option_values SET archived_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING archived_on",
            id.get(),
            "archive_product_option_value",
        )
        .await
    }

    async fn archive_product_option_values_for_option(
        &self,
        tx: &mut PgTx,
        option_id: ProductOptionId,
    ) -> Result<u64, StoreError> {
        archive_many(
            tx,
            "UPDATE product_option_values SET archived_on = NOW() \
             WHERE product_option_id = $1 AND archived_on IS NULL",
            option_id.get(),
            "archive_product_option_values_for_option",
        )
        .await
    }
}

#[async_trait]
impl ProductStore for PostgresCatalogStore {
    async fn product_exists(&self, tx: &mut PgTx, id: ProductId) -> Result<bool, StoreError> {
        exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND archived_on IS NULL)",
            id.get(),
            "product_exists",
        )
        .await
    }

    async fn product_with_sku_exists(&self, tx: &mut PgTx, sku: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
            .bind(sku)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("product_with_sku_exists", e))?;
        read_bool(&row, "product_with_sku_exists")
    }

    async fn get_product(
        &self,
        tx: &mut PgTx,
        id: ProductId,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let products = with_option_values(tx, vec![decode::<ProductRow>(&row)?.into()]).await?;
        Ok(products.into_iter().next())
    }

    async fn get_product_by_sku(
        &self,
        tx: &mut PgTx,
        sku: &str,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("get_product_by_sku", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let products = with_option_values(tx, vec![decode::<ProductRow>(&row)?.into()]).await?;
        Ok(products.into_iter().next())
    }

    async fn list_products(
        &self,
        tx: &mut PgTx,
        root_id: ProductRootId,
    ) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE product_root_id = $1 AND archived_on IS NULL ORDER BY id"
        ))
        .bind(root_id.get())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        let products = rows
            .iter()
            .map(|r| decode::<ProductRow>(r).map(Into::into))
            .collect::<Result<Vec<Product>, _>>()?;
        with_option_values(tx, products).await
    }

    #[instrument(skip(self, tx, new), fields(sku = %new.sku, product_id), err)]
    async fn create_product(
        &self,
        tx: &mut PgTx,
        new: &NewProduct,
    ) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (
                product_root_id, name, subtitle, description, option_summary, sku, upc,
                manufacturer, brand, quantity, quantity_per_package, taxable, price, on_sale,
                sale_price, cost,
                product_weight, product_height, product_width, product_length,
                package_weight, package_height, package_width, package_length,
                available_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, COALESCE($25, NOW()))
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(new.product_root_id.get())
        .bind(&new.name)
        .bind(&new.subtitle)
        .bind(&new.description)
        .bind(&new.option_summary)
        .bind(&new.sku)
        .bind(&new.upc)
        .bind(&new.manufacturer)
        .bind(&new.brand)
        .bind(new.quantity)
        .bind(new.quantity_per_package)
        .bind(new.taxable)
        .bind(new.price)
        .bind(new.on_sale)
        .bind(new.sale_price)
        .bind(new.cost)
        .bind(new.product_dimensions.weight)
        .bind(new.product_dimensions.height)
        .bind(new.product_dimensions.width)
        .bind(new.product_dimensions.length)
        .bind(new.package_dimensions.weight)
        .bind(new.package_dimensions.height)
        .bind(new.package_dimensions.width)
        .bind(new.package_dimensions.length)
        .bind(new.available_on)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        let product: Product = decode::<ProductRow>(&row)?.into();
        Span::current().record("product_id", product.id.get());
        Ok(product)
    }

    #[instrument(skip(self, tx, product), fields(product_id = %product.id), err)]
    async fn update_product(
        &self,
        tx: &mut PgTx,
        product: &Product,
    ) -> Result<DateTime<Utc>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products SET
                name = $2, subtitle = $3, description = $4, upc = $5, manufacturer = $6,
                brand = $7, quantity = $8, quantity_per_package = $9, taxable = $10,
                price = $11, on_sale = $12, sale_price = $13, cost = $14,
                product_weight = $15, product_height = $16, product_width = $17,
                product_length = $18, package_weight = $19, package_height = $20,
                package_width = $21, package_length = $22, available_on = $23,
                updated_on = NOW()
            WHERE id = $1 AND archived_on IS NULL
            RETURNING updated_on
            "#,
        )
        .bind(product.id.get())
        .bind(&product.name)
        .bind(&product.subtitle)
        .bind(&product.description)
        .bind(&product.upc)
        .bind(&product.manufacturer)
        .bind(&product.brand)
        .bind(product.quantity)
        .bind(product.quantity_per_package)
        .bind(product.taxable)
        .bind(product.price)
        .bind(product.on_sale)
        .bind(product.sale_price)
        .bind(product.cost)
        .bind(product.product_dimensions.weight)
        .bind(product.product_dimensions.height)
        .bind(product.product_dimensions.width)
        .bind(product.product_dimensions.length)
        .bind(product.package_dimensions.weight)
        .bind(product.package_dimensions.height)
        .bind(product.package_dimensions.width)
        .bind(product.package_dimensions.length)
        .bind(product.available_on)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        stamped(row, "updated_on", "update_product")
    }

    #[instrument(skip(self, tx), fields(product_id = %id), err)]
    async fn archive_product(
        &self,
        tx: &mut PgTx,
        id: ProductId,
    ) -> Result<DateTime<Utc>, StoreError> {
        archive_one(
            tx,
            "UPDATE products SET archived_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING archived_on",
            id.get(),
            "archive_product",
        )
        .await
    }
}

#[async_trait]
impl VariantBridgeStore for PostgresCatalogStore {
    async fn variant_bridge_exists(
        &self,
        tx: &mut PgTx,
        id: VariantBridgeId,
    ) -> Result<bool, StoreError> {
        exists(
            tx,
            "SELECT EXISTS(SELECT 1 FROM product_variant_bridge \
             WHERE id = $1 AND archived_on IS NULL)",
            id.get(),
            "variant_bridge_exists",
        )
        .await
    }

    async fn get_variant_bridge(
        &self,
        tx: &mut PgTx,
        id: VariantBridgeId,
    ) -> Result<Option<ProductVariantBridge>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {BRIDGE_COLUMNS} FROM product_variant_bridge WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("get_variant_bridge", e))?;
        row.map(|r| decode::<BridgeRow>(&r).map(Into::into))
            .transpose()
    }

    #[instrument(
        skip(self, tx, value_ids),
        fields(product_id = %product_id, bridge_count = value_ids.len()),
        err
    )]
    async fn create_variant_bridges(
        &self,
        tx: &mut PgTx,
        product_id: ProductId,
        value_ids: &[ProductOptionValueId],
    ) -> Result<Vec<ProductVariantBridge>, StoreError> {
        if value_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(
                "INSERT INTO product_variant_bridge (product_id, product_option_value_id) ",
            );
        builder.push_values(value_ids, |mut b, value_id| {
            b.push_bind(product_id.get()).push_bind(value_id.get());
        });
        builder.push(format!(" RETURNING {BRIDGE_COLUMNS}"));

        let rows = builder
            .build()
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("create_variant_bridges", e))?;

        let mut bridges = rows
            .iter()
            .map(|r| decode::<BridgeRow>(r).map(Into::into))
            .collect::<Result<Vec<ProductVariantBridge>, _>>()?;
        // Ids follow VALUES order.
        bridges.sort_by_key(|b| b.id);
        Ok(bridges)
    }

    #[instrument(skip(self, tx, bridge), fields(variant_bridge_id = %bridge.id), err)]
    async fn update_variant_bridge(
        &self,
        tx: &mut PgTx,
        bridge: &ProductVariantBridge,
    ) -> Result<DateTime<Utc>, StoreError> {
        let row = sqlx::query(
            "UPDATE product_variant_bridge \
             SET product_id = $2, product_option_value_id = $3, updated_on = NOW() \
             WHERE id = $1 AND archived_on IS NULL RETURNING updated_on",
        )
        .bind(bridge.id.get())
        .bind(bridge.product_id.get())
        .bind(bridge.product_option_value_id.get())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_variant_bridge", e))?;
        stamped(row, "updated_on", "update_variant_bridge")
    }

    async fn archive_variant_bridges_for_product(
        &self,
        tx: &mut PgTx,
        product_id: ProductId,
    ) -> Result<u64, StoreError> {
        archive_many(
            tx,
            "UPDATE product_variant_bridge SET archived_on = NOW() \
             WHERE product_id = $1 AND archived_on IS NULL",
            product_id.get(),
            "archive_variant_bridges_for_product",
        )
        .await
    }

    async fn archive_variant_bridges_for_option_value(
        &self,
        tx: &mut PgTx,
        value_id: ProductOptionValueId,
    ) -> Result<u64, StoreError> {
        archive_many(
            tx,
            "UPDATE product_variant_bridge SET archived_on = NOW() \
             WHERE product_option_value_id = $1 AND archived_on IS NULL",
            value_id.get(),
            "archive_variant_bridges_for_option_value",
        )
        .await
    }
}

async fn exists(tx: &mut PgTx, sql: &str, id: i64, operation: &str) -> Result<bool, StoreError> {
    let row = sqlx::query(sql)
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
    read_bool(&row, operation)
}

async fn archive_one(
    tx: &mut PgTx,
    sql: &str,
    id: i64,
    operation: &str,
) -> Result<DateTime<Utc>, StoreError> {
    let row = sqlx::query(sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
    stamped(row, "archived_on", operation)
}

async fn archive_many(
    tx: &mut PgTx,
    sql: &str,
    id: i64,
    operation: &str,
) -> Result<u64, StoreError> {
    let result = sqlx::query(sql)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(result.rows_affected())
}

/// Resolve `applicable_option_values` for a batch of products from live bridges.
async fn with_option_values(
    tx: &mut PgTx,
    mut products: Vec<Product>,
) -> Result<Vec<Product>, StoreError> {
    if products.is_empty() {
        return Ok(products);
    }
    let ids: Vec<i64> = products.iter().map(|p| p.id.get()).collect();

    let rows = sqlx::query(
        r#"
        SELECT b.product_id, v.id, v.product_option_id, v.value,
               v.created_on, v.updated_on, v.archived_on
        FROM product_variant_bridge b
        JOIN product_option_values v ON v.id = b.product_option_value_id
        WHERE b.product_id = ANY($1) AND b.archived_on IS NULL
        ORDER BY b.id
        "#,
    )
    .bind(ids.as_slice())
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_applicable_option_values", e))?;

    for row in &rows {
        let product_id: i64 = row
            .try_get("product_id")
            .map_err(|e| map_sqlx_error("load_applicable_option_values", e))?;
        let value: ProductOptionValue = decode::<ProductOptionValueRow>(row)?.into();
        if let Some(p) = products.iter_mut().find(|p| p.id.get() == product_id) {
            p.applicable_option_values.push(value);
        }
    }
    Ok(products)
}

fn read_bool(row: &PgRow, operation: &str) -> Result<bool, StoreError> {
    row.try_get::<bool, _>(0)
        .map_err(|e| map_sqlx_error(operation, e))
}

/// Read a timestamp returned by a single-row `UPDATE ... RETURNING`.
fn stamped(
    row: Option<PgRow>,
    column: &str,
    operation: &str,
) -> Result<DateTime<Utc>, StoreError> {
    let row = row.ok_or_else(|| {
        StoreError::RowNotFound(format!("{operation}: target does not exist or is archived"))
    })?;
    row.try_get::<DateTime<Utc>, _>(column)
        .map_err(|e| map_sqlx_error(operation, e))
}

fn decode<'r, T>(row: &'r PgRow) -> Result<T, StoreError>
where
    T: FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(|e| StoreError::Database(format!("failed to decode row: {e}")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation {
                    constraint: db_err
                        .constraint()
                        .map(str::to_string)
                        .unwrap_or(msg),
                },
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::RowNotFound => {
            StoreError::RowNotFound(format!("unexpected row not found in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

fn lifecycle(row: &PgRow) -> Result<Lifecycle, sqlx::Error> {
    Ok(Lifecycle {
        created_on: row.try_get("created_on")?,
        updated_on: row.try_get("updated_on")?,
        archived_on: row.try_get("archived_on")?,
    })
}

fn dimensions(row: &PgRow, prefix: &str) -> Result<Dimensions, sqlx::Error> {
    Ok(Dimensions {
        weight: row.try_get(format!("{prefix}_weight").as_str())?,
        height: row.try_get(format!("{prefix}_height").as_str())?,
        width: row.try_get(format!("{prefix}_width").as_str())?,
        length: row.try_get(format!("{prefix}_length").as_str())?,
    })
}

#[derive(Debug)]
struct ProductRootRow {
    id: i64,
    name: String,
    subtitle: Option<String>,
    description: String,
    sku_prefix: String,
    manufacturer: Option<String>,
    brand: Option<String>,
    available_on: DateTime<Utc>,
    taxable: bool,
    cost: i64,
    product_dimensions: Dimensions,
    package_dimensions: Dimensions,
    lifecycle: Lifecycle,
}

impl<'r> FromRow<'r, PgRow> for ProductRootRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRootRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            subtitle: row.try_get("subtitle")?,
            description: row.try_get("description")?,
            sku_prefix: row.try_get("sku_prefix")?,
            manufacturer: row.try_get("manufacturer")?,
            brand: row.try_get("brand")?,
            available_on: row.try_get("available_on")?,
            taxable: row.try_get("taxable")?,
            cost: row.try_get("cost")?,
            product_dimensions: dimensions(row, "product")?,
            package_dimensions: dimensions(row, "package")?,
            lifecycle: lifecycle(row)?,
        })
    }
}

impl From<ProductRootRow> for ProductRoot {
    fn from(row: ProductRootRow) -> Self {
        ProductRoot {
            id: ProductRootId::new(row.id),
            name: row.name,
            subtitle: row.subtitle,
            description: row.description,
            sku_prefix: row.sku_prefix,
            manufacturer: row.manufacturer,
            brand: row.brand,
            available_on: row.available_on,
            taxable: row.taxable,
            cost: row.cost,
            product_dimensions: row.product_dimensions,
            package_dimensions: row.package_dimensions,
            lifecycle: row.lifecycle,
        }
    }
}

#[derive(Debug)]
struct ProductOptionRow {
    id: i64,
    product_root_id: i64,
    name: String,
    lifecycle: Lifecycle,
}

impl<'r> FromRow<'r, PgRow> for ProductOptionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductOptionRow {
            id: row.try_get("id")?,
            product_root_id: row.try_get("product_root_id")?,
            name: row.try_get("name")?,
            lifecycle: lifecycle(row)?,
        })
    }
}

impl From<ProductOptionRow> for ProductOption {
    fn from(row: ProductOptionRow) -> Self {
        ProductOption {
            id: ProductOptionId::new(row.id),
            product_root_id: ProductRootId::new(row.product_root_id),
            name: row.name,
            values: Vec::new(),
            lifecycle: row.lifecycle,
        }
    }
}

#[derive(Debug)]
struct ProductOptionValueRow {
    id: i64,
    product_option_id: i64,
    value: String,
    lifecycle: Lifecycle,
}

impl<'r> FromRow<'r, PgRow> for ProductOptionValueRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductOptionValueRow {
            id: row.try_get("id")?,
            product_option_id: row.try_get("product_option_id")?,
            value: row.try_get("value")?,
            lifecycle: lifecycle(row)?,
        })
    }
}

impl From<ProductOptionValueRow> for ProductOptionValue {
    fn from(row: ProductOptionValueRow) -> Self {
        ProductOptionValue {
            id: ProductOptionValueId::new(row.id),
            product_option_id: ProductOptionId::new(row.product_option_id),
            value: row.value,
            lifecycle: row.lifecycle,
        }
    }
}

#[derive(Debug)]
struct ProductRow {
    id: i64,
    product_root_id: i64,
    name: String,
    subtitle: Option<String>,
    description: String,
    option_summary: String,
    sku: String,
    upc: Option<String>,
    manufacturer: Option<String>,
    brand: Option<String>,
    quantity: i32,
    quantity_per_package: i32,
    taxable: bool,
    price: i64,
    on_sale: bool,
    sale_price: Option<i64>,
    cost: i64,
    product_dimensions: Dimensions,
    package_dimensions: Dimensions,
    available_on: DateTime<Utc>,
    lifecycle: Lifecycle,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            product_root_id: row.try_get("product_root_id")?,
            name: row.try_get("name")?,
            subtitle: row.try_get("subtitle")?,
            description: row.try_get("description")?,
            option_summary: row.try_get("option_summary")?,
            sku: row.try_get("sku")?,
            upc: row.try_get("upc")?,
            manufacturer: row.try_get("manufacturer")?,
            brand: row.try_get("brand")?,
            quantity: row.try_get("quantity")?,
            quantity_per_package: row.try_get("quantity_per_package")?,
            taxable: row.try_get("taxable")?,
            price: row.try_get("price")?,
            on_sale: row.try_get("on_sale")?,
            sale_price: row.try_get("sale_price")?,
            cost: row.try_get("cost")?,
            product_dimensions: dimensions(row, "product")?,
            package_dimensions: dimensions(row, "package")?,
            available_on: row.try_get("available_on")?,
            lifecycle: lifecycle(row)?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            product_root_id: ProductRootId::new(row.product_root_id),
            name: row.name,
            subtitle: row.subtitle,
            description: row.description,
            option_summary: row.option_summary,
            sku: row.sku,
            upc: row.upc,
            manufacturer: row.manufacturer,
            brand: row.brand,
            quantity: row.quantity,
            quantity_per_package: row.quantity_per_package,
            taxable: row.taxable,
            price: row.price,
            on_sale: row.on_sale,
            sale_price: row.sale_price,
            cost: row.cost,
            product_dimensions: row.product_dimensions,
            package_dimensions: row.package_dimensions,
            applicable_option_values: Vec::new(),
            available_on: row.available_on,
            lifecycle: row.lifecycle,
        }
    }
}

#[derive(Debug)]
struct BridgeRow {
    id: i64,
    product_id: i64,
    product_option_value_id: i64,
    lifecycle: Lifecycle,
}

impl<'r> FromRow<'r, PgRow> for BridgeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BridgeRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            product_option_value_id: row.try_get("product_option_value_id")?,
            lifecycle: lifecycle(row)?,
        })
    }
}

impl From<BridgeRow> for ProductVariantBridge {
    fn from(row: BridgeRow) -> Self {
        ProductVariantBridge {
            id: VariantBridgeId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_option_value_id: ProductOptionValueId::new(row.product_option_value_id),
            lifecycle: row.lifecycle,
        }
    }
}
