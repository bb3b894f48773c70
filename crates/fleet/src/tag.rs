use serde::{Deserialize, Serialize};

tms_core::record_id!(
    /// Tag identifier.
    TagId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub parent_id: Option<TagId>,
    pub color: u32,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TagId::generate(),
            name: name.into(),
            parent_id: None,
            color: 10,
        }
    }

    pub fn child_of(mut self, parent: &Tag) -> Self {
        self.parent_id = Some(parent.id);
        self
    }

    /// `parent/name`, or just `name` when the parent is unset or unknown.
    pub fn full_name(&self, tags: &[Tag]) -> String {
        match self
            .parent_id
            .and_then(|pid| tags.iter().find(|t| t.id == pid))
        {
            Some(parent) => format!("{}/{}", parent.name, self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_prefixes_parent() {
        let fragile = Tag::new("Fragile");
        let glass = Tag::new("Glass").child_of(&fragile);
        let tags = vec![fragile.clone(), glass.clone()];

        assert_eq!(glass.full_name(&tags), "Fragile/Glass");
        assert_eq!(fragile.full_name(&tags), "Fragile");
        assert_eq!(glass.full_name(&[]), "Glass");
    }
}
