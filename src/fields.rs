//! Enumerations used to pick views, sort orders and taxonomy lists.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which of the four taxonomy lists an operation targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Category,
    SubCategory,
    Importance,
    Origin,
}

impl EntryKind {
    /// Human-readable name used in messages.
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Category => "workflow category",
            EntryKind::SubCategory => "sub-category",
            EntryKind::Importance => "importance level",
            EntryKind::Origin => "bid origin",
        }
    }

    /// Task field that refers into this list.
    pub fn field_name(self) -> &'static str {
        match self {
            EntryKind::Category => "status",
            EntryKind::SubCategory => "subStatus",
            EntryKind::Importance => "importance",
            EntryKind::Origin => "bidOrigin",
        }
    }

    /// Lists the board cannot work without.
    pub fn must_keep_one(self) -> bool {
        matches!(self, EntryKind::Category | EntryKind::Importance)
    }
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Taskid,
    CompletionDate,
    Remarks,
    DueDate,
    Date,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Due window filters.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DueFilter {
    Today,
    ThisWeek,
    Overdue,
}
