use serde::{Deserialize, Serialize};

use crate::engine::{CaptureFilter, GroupingMode};

/// Selection state owned by the viewer, never by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerState {
    pub project_id: Option<String>,
    pub mode: GroupingMode,
    pub filter: CaptureFilter,
    pub selected_group: Option<String>,
    /// 1-based variant index inside the selected group.
    pub selected_variant: Option<usize>,
}

impl ViewerState {
    pub fn new(mode: GroupingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Group keys are only meaningful under the mode that produced them, so a
    /// mode change drops the selection.
    pub fn set_mode(&mut self, mode: GroupingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.clear_selection();
        }
    }

    pub fn set_project(&mut self, project_id: String) {
        if self.project_id.as_deref() != Some(project_id.as_str()) {
            self.project_id = Some(project_id);
            self.clear_selection();
        }
    }

    pub fn set_filter(&mut self, filter: CaptureFilter) {
        self.filter = filter;
        self.clear_selection();
    }

    pub fn select_group(&mut self, group_key: Option<String>) {
        self.selected_group = group_key;
        self.selected_variant = None;
    }

    pub fn select_variant(&mut self, index: Option<usize>) {
        self.selected_variant = index;
    }

    pub fn clear_selection(&mut self) {
        self.selected_group = None;
        self.selected_variant = None;
    }
}
