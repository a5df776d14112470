//! Composite entity identity
//!
//! Entities are identified by (group label, entity label). The pair is kept
//! as two fields rather than a joined string, so labels containing any
//! separator character can never collide.

use serde::{Deserialize, Serialize};

/// Identity of one entity record, unique within a dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Group label (league)
    pub group: String,
    /// Entity label (team)
    pub entity: String,
}

impl EntityKey {
    /// Create a key from its two labels
    pub fn new(group: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            entity: entity.into(),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.group, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_separator_in_label_does_not_collide() {
        // "A||B" + "C" and "A" + "B||C" would collide under string joining
        let a = EntityKey::new("A||B", "C");
        let b = EntityKey::new("A", "B||C");
        assert_ne!(a, b);

        let set: HashSet<EntityKey> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        let key = EntityKey::new("England Premier League", "Arsenal");
        assert_eq!(key.to_string(), "England Premier League / Arsenal");
    }
}
