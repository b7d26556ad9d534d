//! Harvester core: pure partitioning policy and record types.
//!
//! Nothing in this crate performs IO. The engine crate drives the policy
//! against a live search backend.
mod filter;
mod h_index;
mod interval;
mod partition;
mod policy;
mod record;

pub use filter::Filter;
pub use h_index::{h_index, rank_owners, OwnerRank};
pub use interval::{DayRange, Interval, IntervalError, StarRange, YearRange};
pub use partition::{Created, Partition};
pub use policy::{Decision, SplitPolicy, RESULT_CAP};
pub use record::{RepoRow, RepositoryRecord};
