pub mod header_map;
pub mod normalize;
pub mod types;

pub use header_map::{HeaderMap, StatusResolution, EXACT_STATUS_HEADER};
pub use normalize::{canonical_key, normalize_header};
pub use types::{CanonicalField, ColumnRef, FieldKind};
