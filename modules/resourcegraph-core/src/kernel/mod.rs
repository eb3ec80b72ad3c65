//! The generic adapter kernel (spec.md §4.5-§4.8): four parametrised
//! adapter shapes built over the cache, paginator, and stream primitives.

pub mod always_get;
pub mod common;
pub mod describe_only;
pub mod get_list;
pub mod get_list_v2;

pub use always_get::AlwaysGet;
pub use describe_only::DescribeOnly;
pub use get_list::GetList;
pub use get_list_v2::GetListV2;
