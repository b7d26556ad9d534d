//! Harvester engine: search API access, pagination, splitting driver and
//! artifact IO.
mod executor;
mod export;
mod harvest;
mod paginate;
mod persist;
mod scrape;
mod search;
mod types;

pub use executor::{ExecutorSettings, QueryExecutor, ReqwestExecutor, GITHUB_GRAPHQL_ENDPOINT};
pub use export::{
    list_artifacts, merge_artifacts, read_repo_table, write_h_index_table, write_repo_table,
    ExportError, H_INDEX_FILENAME, REPO_TABLE_FILENAME,
};
pub use harvest::{HarvestSummary, Harvester};
pub use paginate::{PaginationSettings, Paginator};
pub use persist::{
    ensure_output_dir, write_file_atomically, ArtifactStore, AtomicFileWriter, PersistError,
};
pub use scrape::{find_page_info, scrape_all, ScrapeOutput};
pub use search::{CountProbe, GraphQlSearch, PageSource};
pub use types::{
    Completion, FailureKind, HarvestError, HarvestEvent, Harvested, NullProgressSink,
    ProgressSink, QueryError, RateLimit, SearchPage,
};
