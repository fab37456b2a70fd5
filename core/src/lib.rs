//! category-distance-core: resumable shortest-path search over category
//! hierarchies.
//!
//! Given an immutable, array-indexed category graph and a start page, a
//! [`CategorySearch`] runs Dijkstra one step at a time, climbing through the
//! page's ancestor categories and optionally descending into their
//! subcategories. Each step reports the categories and pages whose distances
//! became final. Searches are cheap to create, share the graph read-only, and
//! can be interleaved with [`SearchBatch`].
//!
//! No storage dependencies: category memberships come from any
//! [`CategoryMembership`] implementation.

mod batch;
mod config;
mod error;
mod graph;
mod membership;
mod snapshot;
mod traversal;

pub use batch::SearchBatch;
pub use config::SearchConfig;
pub use error::{BoxError, Error, Result};
pub use graph::{CategoryGraph, CategoryGraphBuilder, CategoryId, CategoryIndex, CostModel, PageId};
pub use membership::{CategoryMembership, CategoryRecord, Language, MembershipIndex};
pub use snapshot::{CategorySnapshot, GraphSnapshot};
pub use traversal::{CategorySearch, Direction, VisitedDelta};
