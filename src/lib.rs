pub mod bulk;
pub mod cache;
pub mod config;
pub mod criteria;
pub mod errors;
pub mod filtering;
pub mod hashid;
pub mod models;
pub mod presenter;
pub mod repository;
pub mod retry;
pub mod validation;

pub use bulk::{BulkReport, DEFAULT_BATCH_SIZE};
pub use cache::{CacheConfig, CacheStore, CachedRepo, MemoryCache, cache_key};
pub use config::{CriteriaConfig, ParamNames};
pub use criteria::{Criterion, FnCriterion, RequestCriteria};
pub use errors::RepoError;
pub use filtering::conditions::ConditionOp;
pub use filtering::{FieldWhitelist, RelationDef, Searchable};
pub use hashid::HashId;
pub use models::RequestParams;
pub use presenter::{FnTransformer, Transformer};
pub use repository::{ApplyToActiveModel, Page, Repo, RepoResource};
pub use retry::{RetryPolicy, with_retry};
pub use validation::{Validatable, ValidationError, ValidationErrors};
