//! Taxonomy model: workflow categories, sub-categories, importance levels and origins.
//!
//! The taxonomy is the vocabulary tasks are filed under. Tasks refer to entries by
//! *name*, never by id, so every lookup here returns an `Option` and a miss is an
//! ordinary outcome (a renamed or deleted entry), not a failure.
//!
//! Mutations are keyed by id and never touch tasks. The only rule they enforce is
//! that the last workflow category and the last importance level cannot be removed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BoardError, BoardResult};
use crate::fields::EntryKind;

/// Colour given to entries created without one.
pub const DEFAULT_COLOR: &str = "#6b7280";

/// Generate a fresh identifier for a taxonomy entry or task.
pub fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// One Kanban column / status value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCategory {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// A finer-grained status scoped to the category named by `parent_category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: String,
    pub name: String,
    pub parent_category: String,
}

/// Importance tag. Insertion-ordered, not ranked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportanceLevel {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Free-form provenance tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidOrigin {
    pub id: String,
    pub name: String,
}

impl WorkflowCategory {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        WorkflowCategory { id: fresh_id(), name: name.into(), color: color.into() }
    }
}

impl SubCategory {
    pub fn new(name: impl Into<String>, parent_category: impl Into<String>) -> Self {
        SubCategory { id: fresh_id(), name: name.into(), parent_category: parent_category.into() }
    }
}

impl ImportanceLevel {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        ImportanceLevel { id: fresh_id(), name: name.into(), color: color.into() }
    }
}

impl BidOrigin {
    pub fn new(name: impl Into<String>) -> Self {
        BidOrigin { id: fresh_id(), name: name.into() }
    }
}

/// The whole taxonomy as one aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub workflow_categories: Vec<WorkflowCategory>,
    pub sub_categories: Vec<SubCategory>,
    pub importance_levels: Vec<ImportanceLevel>,
    pub bid_origins: Vec<BidOrigin>,
}

/// Common surface of the four taxonomy lists, so mutations can be written once.
pub trait TaxonomyEntry: Clone {
    const KIND: EntryKind;

    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn list(settings: &AppSettings) -> &Vec<Self>;
    fn list_mut(settings: &mut AppSettings) -> &mut Vec<Self>;
}

macro_rules! taxonomy_entry {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl TaxonomyEntry for $ty {
            const KIND: EntryKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn list(settings: &AppSettings) -> &Vec<Self> {
                &settings.$field
            }

            fn list_mut(settings: &mut AppSettings) -> &mut Vec<Self> {
                &mut settings.$field
            }
        }
    };
}

taxonomy_entry!(WorkflowCategory, EntryKind::Category, workflow_categories);
taxonomy_entry!(SubCategory, EntryKind::SubCategory, sub_categories);
taxonomy_entry!(ImportanceLevel, EntryKind::Importance, importance_levels);
taxonomy_entry!(BidOrigin, EntryKind::Origin, bid_origins);

impl AppSettings {
    /// Taxonomy a brand new board starts with.
    pub fn starter() -> Self {
        AppSettings {
            workflow_categories: vec![
                WorkflowCategory::new("Not Started", "#9ca3af"),
                WorkflowCategory::new("In Progress", "#3b82f6"),
                WorkflowCategory::new("Done", "#22c55e"),
            ],
            sub_categories: Vec::new(),
            importance_levels: vec![
                ImportanceLevel::new("High", "#ef4444"),
                ImportanceLevel::new("Medium", "#f59e0b"),
                ImportanceLevel::new("Low", "#10b981"),
            ],
            bid_origins: vec![BidOrigin::new("Direct"), BidOrigin::new("Referral")],
        }
    }

    /// Check the usability invariant: at least one category and one importance level.
    pub fn validate(&self) -> BoardResult<()> {
        if self.workflow_categories.is_empty() {
            return Err(BoardError::InvalidField {
                field: "workflowCategories",
                reason: "at least one workflow category is required".into(),
            });
        }
        if self.importance_levels.is_empty() {
            return Err(BoardError::InvalidField {
                field: "importanceLevels",
                reason: "at least one importance level is required".into(),
            });
        }
        Ok(())
    }

    pub fn find_category(&self, name: &str) -> Option<&WorkflowCategory> {
        self.workflow_categories.iter().find(|c| c.name == name)
    }

    /// Sub-categories whose parent is the given status name.
    pub fn sub_categories_of<'a: 's, 's>(
        &'a self,
        status: &'s str,
    ) -> impl Iterator<Item = &'a SubCategory> + 's {
        self.sub_categories.iter().filter(move |s| s.parent_category == status)
    }

    pub fn find_importance(&self, name: &str) -> Option<&ImportanceLevel> {
        self.importance_levels.iter().find(|i| i.name == name)
    }

    pub fn find_origin(&self, name: &str) -> Option<&BidOrigin> {
        self.bid_origins.iter().find(|o| o.name == name)
    }

    /// First category, used as the fallback status for new or repaired tasks.
    pub fn first_category(&self) -> Option<&WorkflowCategory> {
        self.workflow_categories.first()
    }

    /// Importance given to tasks that arrive without one: the second level when
    /// there is one, otherwise the first.
    pub fn default_importance(&self) -> Option<&ImportanceLevel> {
        self.importance_levels.get(1).or_else(|| self.importance_levels.first())
    }

    /// Append an entry. Ids must be unique within their list.
    pub fn add<T: TaxonomyEntry>(&mut self, entry: T) -> BoardResult<()> {
        if T::list(self).iter().any(|e| e.id() == entry.id()) {
            return Err(BoardError::DuplicateId {
                kind: T::KIND.label(),
                id: entry.id().to_string(),
            });
        }
        self.warn_on_duplicate_name(&entry);
        T::list_mut(self).push(entry);
        Ok(())
    }

    /// Replace the entry with the same id.
    pub fn update<T: TaxonomyEntry>(&mut self, entry: T) -> BoardResult<()> {
        let Some(idx) = T::list(self).iter().position(|e| e.id() == entry.id()) else {
            return Err(BoardError::NotFound { kind: T::KIND.label(), id: entry.id().to_string() });
        };
        self.warn_on_duplicate_name(&entry);
        T::list_mut(self)[idx] = entry;
        Ok(())
    }

    /// Remove the entry with the given id and hand it back.
    pub fn remove<T: TaxonomyEntry>(&mut self, id: &str) -> BoardResult<T> {
        let list = T::list(self);
        let Some(idx) = list.iter().position(|e| e.id() == id) else {
            return Err(BoardError::NotFound { kind: T::KIND.label(), id: id.to_string() });
        };
        if T::KIND.must_keep_one() && list.len() == 1 {
            return Err(BoardError::LastEntry { kind: T::KIND.label() });
        }
        Ok(T::list_mut(self).remove(idx))
    }

    /// Resolve an id or an exact name to an entry id.
    pub fn resolve_id<T: TaxonomyEntry>(&self, ident: &str) -> BoardResult<String> {
        let list = T::list(self);
        list.iter()
            .find(|e| e.id() == ident)
            .or_else(|| list.iter().find(|e| e.name() == ident))
            .map(|e| e.id().to_string())
            .ok_or_else(|| BoardError::NotFound { kind: T::KIND.label(), id: ident.to_string() })
    }

    pub fn get<T: TaxonomyEntry>(&self, id: &str) -> Option<&T> {
        T::list(self).iter().find(|e| e.id() == id)
    }

    /// Reject a name that is not in the given list. Blank names pass; whether a
    /// field may be blank is the task's concern.
    pub fn check_reference(&self, kind: EntryKind, name: &str) -> BoardResult<()> {
        if name.trim().is_empty() {
            return Ok(());
        }
        let known = match kind {
            EntryKind::Category => self.find_category(name).is_some(),
            EntryKind::SubCategory => self.sub_categories.iter().any(|s| s.name == name),
            EntryKind::Importance => self.find_importance(name).is_some(),
            EntryKind::Origin => self.find_origin(name).is_some(),
        };
        if known {
            Ok(())
        } else {
            Err(BoardError::InvalidField {
                field: kind.field_name(),
                reason: format!("no {} named `{}`", kind.label(), name),
            })
        }
    }

    fn warn_on_duplicate_name<T: TaxonomyEntry>(&self, entry: &T) {
        let clash = T::list(self)
            .iter()
            .any(|e| e.id() != entry.id() && e.name() == entry.name());
        if clash {
            tracing::warn!(kind = T::KIND.label(), name = entry.name(), "duplicate taxonomy name");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AppSettings {
        AppSettings {
            workflow_categories: vec![
                WorkflowCategory::new("Not Started", DEFAULT_COLOR),
                WorkflowCategory::new("Done", DEFAULT_COLOR),
            ],
            sub_categories: vec![
                SubCategory::new("Waiting on client", "Not Started"),
                SubCategory::new("Invoiced", "Done"),
            ],
            importance_levels: vec![ImportanceLevel::new("High", DEFAULT_COLOR)],
            bid_origins: vec![BidOrigin::new("Email")],
        }
    }

    #[test]
    fn test_lookups_return_none_on_miss() {
        let s = settings();
        assert!(s.find_category("Not Started").is_some());
        assert!(s.find_category("Archived").is_none());
        assert!(s.find_importance("Low").is_none());
        assert!(s.find_origin("Email").is_some());
        assert!(s.find_origin("Phone").is_none());
    }

    #[test]
    fn test_sub_categories_of_filters_by_parent_name() {
        let s = settings();
        let names: Vec<&str> = s.sub_categories_of("Done").map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Invoiced"]);
        assert_eq!(s.sub_categories_of("Unknown").count(), 0);
    }

    #[test]
    fn test_cannot_remove_last_category_or_importance() {
        let mut s = settings();
        let first = s.workflow_categories[0].id.clone();
        let second = s.workflow_categories[1].id.clone();
        s.remove::<WorkflowCategory>(&first).unwrap();
        let err = s.remove::<WorkflowCategory>(&second).unwrap_err();
        assert!(matches!(err, BoardError::LastEntry { .. }));
        assert_eq!(s.workflow_categories.len(), 1);

        let only = s.importance_levels[0].id.clone();
        assert!(s.remove::<ImportanceLevel>(&only).is_err());
    }

    #[test]
    fn test_last_origin_and_sub_category_can_be_removed() {
        let mut s = settings();
        let origin = s.bid_origins[0].id.clone();
        s.remove::<BidOrigin>(&origin).unwrap();
        assert!(s.bid_origins.is_empty());
    }

    #[test]
    fn test_add_rejects_duplicate_id_and_update_requires_existing() {
        let mut s = settings();
        let dup = s.workflow_categories[0].clone();
        assert!(matches!(s.add(dup), Err(BoardError::DuplicateId { .. })));

        let mut renamed = s.workflow_categories[0].clone();
        renamed.name = "Backlog".into();
        s.update(renamed).unwrap();
        assert_eq!(s.workflow_categories[0].name, "Backlog");

        let ghost = WorkflowCategory::new("Ghost", DEFAULT_COLOR);
        assert!(matches!(s.update(ghost), Err(BoardError::NotFound { .. })));
    }

    #[test]
    fn test_resolve_id_by_id_or_name() {
        let s = settings();
        let id = s.workflow_categories[1].id.clone();
        assert_eq!(s.resolve_id::<WorkflowCategory>("Done").unwrap(), id);
        assert_eq!(s.resolve_id::<WorkflowCategory>(&id).unwrap(), id);
        assert!(s.resolve_id::<WorkflowCategory>("Nope").is_err());
    }

    #[test]
    fn test_default_importance_prefers_second_entry() {
        let mut s = settings();
        assert_eq!(s.default_importance().unwrap().name, "High");
        s.add(ImportanceLevel::new("Low", DEFAULT_COLOR)).unwrap();
        assert_eq!(s.default_importance().unwrap().name, "Low");
        s.importance_levels.clear();
        assert!(s.default_importance().is_none());
    }

    #[test]
    fn test_check_reference() {
        let s = settings();
        assert!(s.check_reference(EntryKind::Category, "Done").is_ok());
        assert!(s.check_reference(EntryKind::Origin, "").is_ok());
        assert!(s.check_reference(EntryKind::SubCategory, "Invoiced").is_ok());
        let err = s.check_reference(EntryKind::Importance, "Critical").unwrap_err();
        assert!(matches!(err, BoardError::InvalidField { field: "importance", .. }));
    }

    #[test]
    fn test_validate_and_empty_tolerance() {
        assert!(AppSettings::starter().validate().is_ok());
        let empty = AppSettings::default();
        assert!(empty.validate().is_err());
        assert!(empty.first_category().is_none());
        assert!(empty.find_category("Done").is_none());
    }

    #[test]
    fn test_settings_serialize_camel_case() {
        let s = settings();
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("workflowCategories").is_some());
        assert_eq!(json["subCategories"][0]["parentCategory"], "Not Started");
    }
}
