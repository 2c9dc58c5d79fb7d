use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    db::{Blob, CaptureRecord, Database},
    engine::{
        component_captures, derive_inventory, derive_variants, group_captures,
        related_components, resolve_inventory, style_locations, CaptureFilter, Component,
        GroupingMode, ResolvedComponent, StyleEntry, StyleKind, StyleLocation,
    },
    log_debug, log_error, log_info,
};

use super::{BlobCache, RefreshGuard, RequestCursor, ViewerState};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(usize),
    /// A newer load started while this one was in flight.
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    pub state: ViewerState,
    pub components: Vec<ResolvedComponent>,
    pub styles: Vec<StyleEntry>,
}

/// A variant of the selected component, flattened for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub index: usize,
    pub key: String,
    pub count: usize,
    pub capture_ids: Vec<String>,
}

/// Where one style is used, for the style drawer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleUsageView {
    pub kind: StyleKind,
    pub value: String,
    pub locations: Vec<StyleLocation>,
    pub related_components: Vec<Component>,
}

/// Drives one viewer session: loads a project's captures, keeps selection
/// state, and derives everything else on demand.
#[derive(Clone)]
pub struct ViewerController {
    db: Database,
    state: Arc<Mutex<ViewerState>>,
    captures: Arc<Mutex<Vec<CaptureRecord>>>,
    cursor: RequestCursor,
    refresh: RefreshGuard,
    blobs: BlobCache,
}

impl ViewerController {
    pub fn new(db: Database, mode: GroupingMode) -> Self {
        Self {
            blobs: BlobCache::new(db.clone()),
            db,
            state: Arc::new(Mutex::new(ViewerState::new(mode))),
            captures: Arc::new(Mutex::new(Vec::new())),
            cursor: RequestCursor::new(),
            refresh: RefreshGuard::new(),
        }
    }

    pub async fn get_state(&self) -> ViewerState {
        self.state.lock().await.clone()
    }

    pub async fn set_mode(&self, mode: GroupingMode) {
        self.state.lock().await.set_mode(mode);
    }

    pub async fn set_filter(&self, filter: CaptureFilter) {
        self.state.lock().await.set_filter(filter);
    }

    pub async fn select_group(&self, group_key: Option<String>) {
        self.state.lock().await.select_group(group_key);
    }

    pub async fn select_variant(&self, index: Option<usize>) {
        self.state.lock().await.select_variant(index);
    }

    /// Load a project's captures. If another load starts before this one
    /// returns, this result is discarded.
    pub async fn load_project(&self, project_id: &str) -> Result<LoadOutcome> {
        let request_id = self.cursor.next();
        let captures = match self.db.list_captures_scoped(project_id).await {
            Ok(captures) => captures,
            Err(err) => {
                log_error!("Failed to load captures for project {}: {:#}", project_id, err);
                return Err(err);
            }
        };
        Ok(self.apply_load(request_id, project_id, captures).await)
    }

    async fn apply_load(
        &self,
        request_id: u64,
        project_id: &str,
        captures: Vec<CaptureRecord>,
    ) -> LoadOutcome {
        if !self.cursor.is_current(request_id) {
            log_debug!("discarding superseded load #{} for {}", request_id, project_id);
            return LoadOutcome::Superseded;
        }

        let count = captures.len();
        *self.captures.lock().await = captures;
        self.state.lock().await.set_project(project_id.to_string());
        log_info!("Loaded {} captures for project {}", count, project_id);
        LoadOutcome::Applied(count)
    }

    /// Reload the current project. Returns `None` when a refresh is already
    /// running or no project is loaded.
    pub async fn refresh(&self) -> Result<Option<LoadOutcome>> {
        let Some(_ticket) = self.refresh.try_begin() else {
            log_debug!("refresh already in flight, skipping");
            return Ok(None);
        };
        let Some(project_id) = self.state.lock().await.project_id.clone() else {
            return Ok(None);
        };
        self.load_project(&project_id).await.map(Some)
    }

    async fn filtered_captures(&self, filter: &CaptureFilter) -> Vec<CaptureRecord> {
        filter.apply(self.captures.lock().await.clone())
    }

    /// Components (with overlays applied) and styles for the loaded captures.
    pub async fn snapshot(&self) -> Result<ViewerSnapshot> {
        let state = self.get_state().await;
        let project_id = state
            .project_id
            .clone()
            .ok_or_else(|| anyhow!("no project loaded"))?;

        let captures = self.filtered_captures(&state.filter).await;
        let inventory = derive_inventory(&captures, state.mode);
        let overrides = self.db.list_overrides(&project_id).await?;
        let annotations = self.db.list_annotations(&project_id).await?;

        Ok(ViewerSnapshot {
            components: resolve_inventory(&inventory.components, &overrides, &annotations),
            styles: inventory.styles,
            state,
        })
    }

    /// Captures of the selected component, in drawer order.
    pub async fn selected_captures(&self) -> Vec<CaptureRecord> {
        let state = self.get_state().await;
        let Some(group_key) = state.selected_group.as_deref() else {
            return Vec::new();
        };
        let captures = self.filtered_captures(&state.filter).await;
        component_captures(&captures, group_key, state.mode)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn selected_variants(&self) -> Vec<VariantSummary> {
        let members = self.selected_captures().await;
        let refs: Vec<&CaptureRecord> = members.iter().collect();
        derive_variants(&refs)
            .into_iter()
            .map(|variant| VariantSummary {
                index: variant.index,
                count: variant.count(),
                capture_ids: variant.members.iter().map(|c| c.id.clone()).collect(),
                key: variant.key,
            })
            .collect()
    }

    pub async fn style_usage(&self, kind: StyleKind, value: &str) -> StyleUsageView {
        let state = self.get_state().await;
        let captures = self.filtered_captures(&state.filter).await;
        let groups = group_captures(&captures, state.mode);
        StyleUsageView {
            kind,
            value: value.to_string(),
            locations: style_locations(&captures, kind, value),
            related_components: related_components(&groups, kind, value),
        }
    }

    /// Members of the selected variant of the selected component. Empty when
    /// either selection is missing or the index no longer exists.
    pub async fn selected_variant_captures(&self) -> Vec<CaptureRecord> {
        let Some(index) = self.get_state().await.selected_variant else {
            return Vec::new();
        };
        let members = self.selected_captures().await;
        let refs: Vec<&CaptureRecord> = members.iter().collect();
        derive_variants(&refs)
            .into_iter()
            .find(|variant| variant.index == index)
            .map(|variant| variant.members.into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn screenshot(&self, blob_id: &str) -> Result<Option<Arc<Blob>>> {
        self.blobs.get(blob_id).await
    }

    /// End the session: release cached blobs and loaded captures.
    pub async fn close(&self) {
        self.blobs.teardown().await;
        self.captures.lock().await.clear();
        self.state.lock().await.clear_selection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        models::{ColorValue, StylePrimitives},
        AnnotationInput, OverrideInput,
    };

    fn capture(id: &str, session_id: &str, name: &str) -> CaptureRecord {
        CaptureRecord {
            id: id.into(),
            session_id: session_id.into(),
            project_id: None,
            url: format!("https://a.test/{id}"),
            created_at: 0,
            tag_name: Some("button".into()),
            role: Some("button".into()),
            accessible_name: Some(name.into()),
            selector: None,
            screenshot: None,
            primitives: None,
            is_draft: false,
        }
    }

    async fn setup() -> (tempfile::TempDir, Database, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("test.sqlite3")).expect("db");
        let project = db.create_project("Shop").await.expect("project");
        let session = db.create_session(None, None).await.expect("session");
        db.link_session(&project.id, &session.id).await.expect("link");
        for (id, name) in [("1", "Save"), ("2", "save"), ("3", "Cancel")] {
            db.insert_capture(&capture(id, &session.id, name))
                .await
                .expect("insert");
        }
        (dir, db, project.id)
    }

    #[tokio::test]
    async fn snapshot_resolves_overlays_onto_components() {
        let (_dir, db, project_id) = setup().await;
        let controller = ViewerController::new(db.clone(), GroupingMode::NamePlusType);
        assert_eq!(
            controller.load_project(&project_id).await.expect("load"),
            LoadOutcome::Applied(3)
        );

        db.upsert_override(OverrideInput {
            project_id: project_id.clone(),
            component_key: "button::button::save".into(),
            display_name: Some("Primary save".into()),
            ..OverrideInput::default()
        })
        .await
        .expect("override");
        db.upsert_annotation(AnnotationInput {
            project_id: project_id.clone(),
            component_key: "button::button::cancel".into(),
            notes: Some("secondary".into()),
            tags: Some(vec!["ghost".into()]),
        })
        .await
        .expect("annotation");

        let snapshot = controller.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.components.len(), 2);
        assert_eq!(snapshot.components[0].id, "button::button::save");
        assert_eq!(snapshot.components[0].name, "Primary save");
        assert_eq!(snapshot.components[1].notes, "secondary");
        assert_eq!(snapshot.components[1].tags, vec!["ghost".to_string()]);
    }

    #[tokio::test]
    async fn selection_follows_mode_and_drives_drawers() {
        let (_dir, db, project_id) = setup().await;
        let controller = ViewerController::new(db, GroupingMode::NamePlusType);
        controller.load_project(&project_id).await.expect("load");

        controller
            .select_group(Some("button::button::save".into()))
            .await;
        let ids: Vec<String> = controller
            .selected_captures()
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        let variants = controller.selected_variants().await;
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].index, 1);
        assert_eq!(variants[0].count, 2);

        controller.set_mode(GroupingMode::NameOnly).await;
        assert!(controller.get_state().await.selected_group.is_none());
        assert!(controller.selected_captures().await.is_empty());
    }

    #[tokio::test]
    async fn selected_variant_narrows_the_component() {
        let (_dir, db, project_id) = setup().await;
        let session = db.create_session(None, None).await.expect("session");
        db.link_session(&project_id, &session.id).await.expect("link");
        let mut padded = capture("9", &session.id, "Save");
        padded.primitives = Some(StylePrimitives {
            color: Some(ColorValue::Text("rgb(1, 2, 3)".into())),
            ..StylePrimitives::default()
        });
        db.insert_capture(&padded).await.expect("insert");

        let controller = ViewerController::new(db, GroupingMode::NamePlusType);
        controller.load_project(&project_id).await.expect("load");
        controller
            .select_group(Some("button::button::save".into()))
            .await;
        assert!(controller.selected_variant_captures().await.is_empty());

        // Two captures without primitives outnumber the styled one.
        controller.select_variant(Some(1)).await;
        let first: Vec<String> = controller
            .selected_variant_captures()
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(first, vec!["1", "2"]);

        controller.select_variant(Some(2)).await;
        let second: Vec<String> = controller
            .selected_variant_captures()
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(second, vec!["9"]);

        controller.select_variant(Some(3)).await;
        assert!(controller.selected_variant_captures().await.is_empty());
    }

    #[tokio::test]
    async fn superseded_loads_are_discarded() {
        let (_dir, db, project_id) = setup().await;
        let controller = ViewerController::new(db, GroupingMode::NamePlusType);

        let stale = controller.cursor.next();
        let fresh = controller.cursor.next();
        assert_eq!(
            controller.apply_load(stale, &project_id, Vec::new()).await,
            LoadOutcome::Superseded
        );
        assert!(controller.get_state().await.project_id.is_none());
        assert_eq!(
            controller
                .apply_load(fresh, &project_id, vec![capture("x", "s", "X")])
                .await,
            LoadOutcome::Applied(1)
        );
    }

    #[tokio::test]
    async fn overlapping_refresh_is_skipped() {
        let (_dir, db, project_id) = setup().await;
        let controller = ViewerController::new(db, GroupingMode::NamePlusType);
        assert!(controller.refresh().await.expect("refresh").is_none());

        controller.load_project(&project_id).await.expect("load");
        let ticket = controller.refresh.try_begin().expect("held");
        assert!(controller.refresh().await.expect("refresh").is_none());
        drop(ticket);
        assert_eq!(
            controller.refresh().await.expect("refresh"),
            Some(LoadOutcome::Applied(3))
        );
    }

    #[tokio::test]
    async fn style_usage_lists_pages_and_components() {
        let (_dir, db, project_id) = setup().await;
        let session = db.create_session(None, None).await.expect("session");
        db.link_session(&project_id, &session.id).await.expect("link");
        let mut styled = capture("4", &session.id, "Buy");
        styled.primitives = Some(StylePrimitives {
            color: Some(ColorValue::Text("rgb(1, 2, 3)".into())),
            ..StylePrimitives::default()
        });
        db.insert_capture(&styled).await.expect("insert");

        let controller = ViewerController::new(db, GroupingMode::NamePlusType);
        controller.load_project(&project_id).await.expect("load");

        let usage = controller.style_usage(StyleKind::Color, "rgb(1, 2, 3)").await;
        assert_eq!(usage.locations.len(), 1);
        assert_eq!(usage.locations[0].url, "https://a.test/4");
        assert_eq!(usage.related_components.len(), 1);
        assert_eq!(usage.related_components[0].name, "Buy");
    }

    #[tokio::test]
    async fn close_releases_the_session() {
        let (_dir, db, project_id) = setup().await;
        let controller = ViewerController::new(db, GroupingMode::NamePlusType);
        controller.load_project(&project_id).await.expect("load");
        controller.close().await;
        assert!(controller.screenshot("any").await.is_err());
        assert!(controller.snapshot().await.expect("snapshot").components.is_empty());
    }
}
