pub mod age;
pub mod backup;
pub mod export_key;
pub mod filters;
pub mod fingerprint;
pub mod init;
pub mod unlock;

pub use age::{publish_key, recipients, setup_age, share};
pub use export_key::{export_key, import_key};
pub use filters::{clean, diff, smudge};
pub use fingerprint::fingerprint;
pub use init::init;
pub use unlock::unlock;
