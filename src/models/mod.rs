pub mod category;
pub mod product;
pub mod site;

pub use category::*;
pub use product::*;
pub use site::*;

/// Placeholder for any field that could not be extracted.
pub const SENTINEL: &str = "N/A";

/// Name given to products whose title could not be read.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
