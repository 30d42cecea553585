pub mod db;
pub mod github;
pub mod storage;

pub use db::DbAdapter;
pub use github::GithubDispatchAdapter;
pub use storage::HttpObjectStorage;
