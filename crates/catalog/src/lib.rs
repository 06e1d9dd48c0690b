//! Catalog domain module.
//!
//! Business rules for product roots, options, option values and their
//! expanded variants, implemented purely as deterministic domain logic
//! (no IO, no storage). Persistence and transactions live in `forgecart-infra`.

pub mod combination;
pub mod event;
pub mod model;
pub mod naming;
pub mod patch;
pub mod payload;
pub mod sku;
pub mod variant;

pub use combination::{Combination, Combinations, Selection, combination_count, enumerate};
pub use event::{
    CatalogEvent, ProductArchived, ProductOptionArchived, ProductRootArchived, ProductRootCreated,
    ProductUpdated,
};
pub use model::{
    Dimensions, NewProductOption, NewProductOptionValue, Product, ProductOption,
    ProductOptionValue, ProductRoot, ProductVariantBridge, RootGraph,
};
pub use naming::VariantNaming;
pub use patch::ProductPatch;
pub use payload::{CatalogCreation, NewProductRoot, OptionCreation, ProductDraft};
pub use sku::{is_restricted_string, validate_sku};
pub use variant::NewProduct;
