/*!
 * Extended Attributes
 */

use serde::{Deserialize, Serialize};

/// Named byte blob attached to a path
///
/// Names are unique per path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtendedAttribute {
    pub name: String,
    pub content: Vec<u8>,
}

impl ExtendedAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}
