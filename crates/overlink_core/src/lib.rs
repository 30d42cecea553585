pub mod crypto;
pub mod domain;
pub mod ports;
pub mod sync;

pub use crypto::{CipherError, CredentialCipher};
pub use domain::{
    DispatchPayload, NewProject, Project, ProjectRef, SharedWorkerConfig, SyncStatus, SyncTarget,
    Tier,
};
pub use ports::{BuildDispatcher, DatabaseService, ObjectStorage, PortError, PortResult};
pub use sync::{group_by_credentials, run_daily_sync, CredentialGroup, SyncError, SyncSummary};
