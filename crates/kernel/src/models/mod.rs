//! Catalog models.

pub mod brand;
pub mod category;
pub mod product;

pub use brand::Brand;
pub use category::Category;
pub use product::{Product, SpecValue, SpecificationGroup, SpecificationItem, Variant};
