pub mod executor;
pub mod query;
pub mod session;
pub mod store;

pub use executor::{MemoryExecutor, QueryBackend, ReportRow, ReportRows};
pub use query::compose::{
    BaseQuery, ColumnFragment, ComposeError, ComposedQuery, FragmentError, ProjectedColumn,
    ReportQueryComposer,
};
pub use query::extract::{ClosedFragment, NonCorrelatedFragment, NonCorrelatedReason, extract};
pub use session::{PreparedReport, ReportError, ReportSession};
pub use store::MemoryStore;
