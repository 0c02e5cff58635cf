use crate::runtime::Value;
use std::collections::HashMap;

/// Flat variable store for one session; there are no nested scopes.
pub type Environment = HashMap<String, Value>;
