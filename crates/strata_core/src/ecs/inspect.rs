//! # Inspector
//!
//! Plain snapshots of what an entity carries, for debug dumps and tests.

use std::fmt;

use super::entity::Entity;

/// One named field of a component, stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Field value rendered with `Display`.
    pub value: String,
}

/// One component of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Short type name of the component.
    pub type_name: String,
    /// Fields in declaration order. Empty for marker components.
    pub fields: Vec<FieldInfo>,
}

impl ComponentInfo {
    /// Looks up a field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }
}

/// Every component an entity currently has, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    /// The inspected entity.
    pub entity: Entity,
    /// Present components.
    pub components: Vec<ComponentInfo>,
}

impl EntityInfo {
    /// Looks up a component by its short type name.
    #[must_use]
    pub fn component(&self, type_name: &str) -> Option<&ComponentInfo> {
        self.components
            .iter()
            .find(|component| component.type_name == type_name)
    }
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity)?;
        if self.components.is_empty() {
            return write!(f, " (no components)");
        }
        for component in &self.components {
            write!(f, "\n  {}", component.type_name)?;
            if component.fields.is_empty() {
                continue;
            }
            write!(f, " {{")?;
            for (i, field) in component.fields.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                write!(f, "{sep}{}: {}", field.name, field.value)?;
            }
            write!(f, " }}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dump() {
        let info = EntityInfo {
            entity: Entity::new(2, 1),
            components: vec![
                ComponentInfo {
                    type_name: "Position".to_string(),
                    fields: vec![
                        FieldInfo {
                            name: "x".to_string(),
                            value: "1".to_string(),
                        },
                        FieldInfo {
                            name: "y".to_string(),
                            value: "2".to_string(),
                        },
                    ],
                },
                ComponentInfo {
                    type_name: "Frozen".to_string(),
                    fields: Vec::new(),
                },
            ],
        };

        assert_eq!(
            info.to_string(),
            "Entity(2v1)\n  Position { x: 1, y: 2 }\n  Frozen"
        );
        assert_eq!(info.component("Position").and_then(|c| c.field("y")), Some("2"));
    }

    #[test]
    fn test_display_empty() {
        let info = EntityInfo {
            entity: Entity::new(0, 3),
            components: Vec::new(),
        };
        assert_eq!(info.to_string(), "Entity(0v3) (no components)");
    }
}
