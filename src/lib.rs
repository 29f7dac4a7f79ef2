pub mod alphabet;
pub mod batch;
pub mod container;
pub mod error;
pub mod mt19937;
pub mod options;
pub mod payload;
pub mod restore;
pub mod substitution;
pub mod volumes;

pub use alphabet::{AlphabetTable, SymbolUniverse};
pub use batch::{BatchDriver, BatchObserver, BatchReport, CancelFlag, RootReport, restore_all};
pub use container::Container;
pub use error::RestoreError;
pub use options::{NamePolicy, RestoreOptions};
pub use restore::{Restored, Restorer};
