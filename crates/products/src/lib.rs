//! Products domain module.
//!
//! The `Product` aggregate is the base catalog record with its canonical name.
//! Origin names extend it by composition: they live in an `OriginNameRegistry`
//! keyed by `ProductId`, and `ProductNaming` bundles both for name resolution.

pub mod naming;
pub mod origin_name;
pub mod product;
pub mod registry;

pub use naming::ProductNaming;
pub use origin_name::{
    DEFAULT_SEQUENCE, NewOriginName, OriginName, OriginNameId, OriginNameUpdate, Sequence,
    first_by_priority, sort_by_priority,
};
pub use product::{
    CreateProduct, DeleteProduct, Product, ProductCommand, ProductCreated, ProductDeleted,
    ProductEvent, ProductId, ProductRenamed, RenameProduct,
};
pub use registry::{InMemoryOriginNameRegistry, OriginNameRegistry};
