pub mod cache;
pub mod checksum;
pub mod comparator;
pub mod comparison;

pub use cache::DirectoryCache;
pub use comparator::{CompareConfig, ComparisonServiceFilter, ComparisonSummary};
pub use comparison::{
    ChecksumComparisonService, Comparison, ComparisonService, SizeComparisonService,
    TimestampComparisonService,
};
