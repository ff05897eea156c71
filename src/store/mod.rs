//! Persistence seams: recipient policies and raw-email objects.

pub mod libsql_backend;
pub mod migrations;
pub mod object_store;
pub mod traits;

pub use libsql_backend::LibSqlPolicyStore;
pub use object_store::FsObjectStore;
pub use traits::{ObjectStore, PolicyStore};
