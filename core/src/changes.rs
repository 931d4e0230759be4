use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::sync::broadcast;
use tracing::debug;

pub const URI_SCHEME: &str = "state";
pub const URI_AUTHORITY: &str = "statex";

const CHANNEL_CAPACITY: usize = 64;

/// Bytes left alone in a key's path: unreserved characters plus `/`.
const KEY_PATH: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~').remove(b'/');

/// Resource URI identifying a single key, `state://statex/<key>`, with the key percent-encoded.
pub fn uri_for_key(key: &str) -> String { format!("{}://{}/{}", URI_SCHEME, URI_AUTHORITY, utf8_percent_encode(key, KEY_PATH)) }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Set,
    Merged,
    Removed,
    Cleared,
}

/// A committed mutation of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub kind: ChangeKind,
    /// Affected keys in request order. Empty for `Cleared`.
    pub keys: Vec<String>,
}

impl StateChange {
    pub fn new(kind: ChangeKind, keys: Vec<String>) -> Self { Self { kind, keys } }

    pub fn cleared() -> Self { Self { kind: ChangeKind::Cleared, keys: Vec::new() } }

    pub fn uris(&self) -> Vec<String> { self.keys.iter().map(|k| uri_for_key(k)).collect() }
}

/// Fan-out of [`StateChange`]s to any number of subscribers.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<StateChange>,
}

impl Default for ChangeNotifier {
    fn default() -> Self { Self::new() }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> { self.sender.subscribe() }

    /// Publish a change. Having no subscribers is not an error.
    pub fn notify(&self, change: StateChange) {
        if let Err(broadcast::error::SendError(change)) = self.sender.send(change) {
            debug!("No subscribers for {:?} change", change.kind);
        }
    }
}
