//! Core of the StateX key-value store.
//!
//! Storage-agnostic building blocks shared by the backends: error kinds, pair validation, key
//! chunking, JSON merging, change notifications, the serial worker queue and the host-facing
//! [`StateModule`]. Backends implement [`KeyValueStorage`].

pub mod changes;
pub mod chunk;
pub mod error;
pub mod merge;
pub mod module;
pub mod pair;
pub mod queue;
pub mod state;
pub mod storage;

pub use changes::{uri_for_key, ChangeKind, ChangeNotifier, StateChange};
pub use error::{ErrorPayload, QueueClosed, StoreError};
pub use module::{StateModule, WipeOutcome};
pub use pair::{pair, RawPair};
pub use queue::SerialQueue;
pub use state::{ModuleState, StateHandle};
pub use storage::KeyValueStorage;
