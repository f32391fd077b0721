//! Engine configuration resolved once per invocation.
//!
//! The completion category is the only piece of taxonomy the engine interprets
//! semantically. It is configured by name and resolved against the current
//! taxonomy up front, then passed explicitly to everything that needs it.

use crate::taxonomy::AppSettings;

/// Name used when nothing else is configured.
pub const DEFAULT_COMPLETION_CATEGORY: &str = "Done";

/// The workflow category whose name marks a task as finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCategory {
    name: String,
    folded: String,
}

impl CompletionCategory {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let folded = name.to_lowercase();
        CompletionCategory { name, folded }
    }

    /// Resolve the configured name against the taxonomy, adopting the taxonomy's
    /// spelling when a category matches case-insensitively.
    pub fn resolve(settings: &AppSettings, preferred: &str) -> Self {
        let folded = preferred.to_lowercase();
        match settings
            .workflow_categories
            .iter()
            .find(|c| c.name.to_lowercase() == folded)
        {
            Some(category) => CompletionCategory::new(category.name.clone()),
            None => {
                tracing::warn!(
                    completion_category = preferred,
                    "no workflow category matches the completion category"
                );
                CompletionCategory::new(preferred)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive match of a status against the completion category.
    pub fn matches(&self, status: &str) -> bool {
        status.to_lowercase() == self.folded
    }
}

impl Default for CompletionCategory {
    fn default() -> Self {
        CompletionCategory::new(DEFAULT_COMPLETION_CATEGORY)
    }
}

/// Taxonomy plus resolved completion category, threaded through every view.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub settings: &'a AppSettings,
    pub completion: &'a CompletionCategory,
}

impl<'a> ViewContext<'a> {
    pub fn new(settings: &'a AppSettings, completion: &'a CompletionCategory) -> Self {
        ViewContext { settings, completion }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{WorkflowCategory, DEFAULT_COLOR};

    #[test]
    fn test_resolve_adopts_taxonomy_spelling() {
        let mut settings = AppSettings::default();
        settings.workflow_categories.push(WorkflowCategory::new("Completed", DEFAULT_COLOR));
        let c = CompletionCategory::resolve(&settings, "completed");
        assert_eq!(c.name(), "Completed");
        assert!(c.matches("COMPLETED"));
        assert!(!c.matches("Done"));
    }

    #[test]
    fn test_resolve_falls_back_to_configured_name() {
        let c = CompletionCategory::resolve(&AppSettings::default(), "Done");
        assert_eq!(c.name(), "Done");
        assert!(c.matches("done"));
    }
}
