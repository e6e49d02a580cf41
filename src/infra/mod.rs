//! External collaborators: reference cost data and account entitlement.

pub mod source;
pub mod supabase;

pub use source::{CostParameterSource, EntitlementSource, RegionalCostRecord, SourceError};
pub use supabase::SupabaseClient;
