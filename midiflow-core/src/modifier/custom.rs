//! Extension point for transforms that are not built in.

use super::Arity;
use crate::error::Result;
use crate::types::Pattern;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A user-supplied pure transform.
///
/// Implementations must be deterministic: equal inputs give an equal output,
/// and inputs are never changed. Flows cache on that promise.
pub trait CustomModifier: fmt::Debug + Send + Sync {
    /// Kind name, used in errors and as half of the cache identity
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Stable description of the parameters.
    ///
    /// Two modifiers with the same name and fingerprint are treated as the
    /// same transform.
    fn fingerprint(&self) -> String {
        String::new()
    }

    fn forward(&self, inputs: &[Pattern]) -> Result<Pattern>;
}

/// Shared handle to a [`CustomModifier`], compared by name and fingerprint
#[derive(Clone)]
pub struct CustomRef(pub Arc<dyn CustomModifier>);

impl CustomRef {
    pub fn new<M: CustomModifier + 'static>(modifier: M) -> Self {
        CustomRef(Arc::new(modifier))
    }
}

impl std::ops::Deref for CustomRef {
    type Target = dyn CustomModifier;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for CustomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for CustomRef {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.fingerprint() == other.fingerprint()
    }
}

impl Eq for CustomRef {}

impl Hash for CustomRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.fingerprint().hash(state);
    }
}
