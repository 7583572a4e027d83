mod config;
mod error;
mod store;
mod stream;

pub use config::FirebaseConfig;
pub use error::{FirebaseDaoError, FirebaseResult};
pub use store::FirebaseScoreStore;
