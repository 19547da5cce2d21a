//! Studio session state
//!
//! The in-memory view-model: current projects, unsaved session assets,
//! the selection set, and the pending generation preview. Every mutation
//! is written through to the persistence store, so a crash at any point
//! loses at most the operation in progress.

use forge_core::{Asset, ForgeError, GenerationOptions, Project, Result};
use forge_gen::GenerationProvider;
use forge_store::{StoredState, StudioStore};
use log::info;
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_PROJECT_NAME: &str = "My First Project";

/// The running studio: persisted state plus transient UI state
pub struct Studio {
    store: StudioStore,
    state: StoredState,
    selection: HashSet<String>,
    pending_preview: Option<Asset>,
    busy: bool,
}

impl Studio {
    /// Open the studio against the database at `path`.
    ///
    /// A first run (or a discarded corrupt state) starts with one default
    /// project so there is always somewhere to save assets to.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = StudioStore::open(path)?;
        Self::with_store(store)
    }

    /// Build a studio over an already-open store (tests use an in-memory store)
    pub fn with_store(store: StudioStore) -> Result<Self> {
        let state = store.load();
        let mut studio = Self {
            store,
            state,
            selection: HashSet::new(),
            pending_preview: None,
            busy: false,
        };

        if studio.state.projects.is_empty() {
            let project = Project::new(DEFAULT_PROJECT_NAME);
            studio.state.active_project_id = Some(project.id.clone());
            studio.state.projects.push(project);
            studio.persist()?;
        } else if !studio.active_id_resolves() {
            studio.state.active_project_id = Some(studio.state.projects[0].id.clone());
            studio.persist()?;
        }

        Ok(studio)
    }

    fn active_id_resolves(&self) -> bool {
        match &self.state.active_project_id {
            Some(id) => self.state.projects.iter().any(|p| &p.id == id),
            None => false,
        }
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&self.state)
    }

    // --- Accessors ---

    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    pub fn session_assets(&self) -> &[Asset] {
        &self.state.session_assets
    }

    pub fn active_project(&self) -> Option<&Project> {
        let id = self.state.active_project_id.as_deref()?;
        self.state.projects.iter().find(|p| p.id == id)
    }

    pub fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    pub fn pending_preview(&self) -> Option<&Asset> {
        self.pending_preview.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Find an asset anywhere: session first, then every project library
    pub fn find_asset(&self, asset_id: &str) -> Option<&Asset> {
        self.state
            .session_assets
            .iter()
            .find(|a| a.id == asset_id)
            .or_else(|| {
                self.state
                    .projects
                    .iter()
                    .flat_map(|p| p.assets.iter())
                    .find(|a| a.id == asset_id)
            })
    }

    // --- Generation ---

    /// Run a generation request and hold the result as a pending preview.
    ///
    /// At most one request is in flight; a second submission fails
    /// instead of queuing.
    pub fn generate(
        &mut self,
        provider: &dyn GenerationProvider,
        options: GenerationOptions,
    ) -> Result<&Asset> {
        if self.busy {
            return Err(ForgeError::GenerationInProgress);
        }
        self.busy = true;
        let result = provider.generate(&options);
        self.busy = false;

        let image_data = result?;
        info!("generated asset via {} for prompt '{}'", provider.name(), options.prompt);
        Ok(self.pending_preview.insert(Asset::new(image_data, options)))
    }

    /// Re-run a prior asset's generation options
    pub fn regenerate(
        &mut self,
        provider: &dyn GenerationProvider,
        asset_id: &str,
    ) -> Result<&Asset> {
        let mut options = self
            .find_asset(asset_id)
            .ok_or_else(|| ForgeError::AssetNotFound(asset_id.to_string()))?
            .options
            .clone();
        options.original_id = Some(asset_id.to_string());
        self.generate(provider, options)
    }

    /// Promote the pending preview into the session list
    pub fn accept_generation(&mut self) -> Result<Option<Asset>> {
        match self.pending_preview.take() {
            Some(asset) => {
                self.state.session_assets.insert(0, asset.clone());
                self.persist()?;
                Ok(Some(asset))
            }
            None => Ok(None),
        }
    }

    /// Drop the pending preview without saving it
    pub fn discard_generation(&mut self) {
        self.pending_preview = None;
    }

    /// Regenerate the masked region of an asset and replace it in place.
    ///
    /// The replacement gets a fresh id (relaxed identity); the original
    /// disappears from the session and the active project and is
    /// garbage-collected on the write that follows.
    pub fn inpaint(
        &mut self,
        provider: &dyn GenerationProvider,
        asset_id: &str,
        mask_b64: &str,
        prompt: &str,
    ) -> Result<Asset> {
        if self.busy {
            return Err(ForgeError::GenerationInProgress);
        }
        let source = self
            .find_asset(asset_id)
            .ok_or_else(|| ForgeError::AssetNotFound(asset_id.to_string()))?
            .clone();

        self.busy = true;
        let result = provider.inpaint(&source.image_data, mask_b64, prompt);
        self.busy = false;

        let image_data = result?;
        let mut replacement = Asset::new(image_data, source.options.clone());
        replacement.prompt = format!("(inpainted) {}", prompt);

        for asset in self.state.session_assets.iter_mut() {
            if asset.id == asset_id {
                *asset = replacement.clone();
            }
        }
        if let Some(active_id) = self.state.active_project_id.clone() {
            if let Some(project) = self.state.projects.iter_mut().find(|p| p.id == active_id) {
                for asset in project.assets.iter_mut() {
                    if asset.id == asset_id {
                        *asset = replacement.clone();
                    }
                }
            }
        }
        self.persist()?;
        Ok(replacement)
    }

    // --- Asset management ---

    /// Copy a session asset into the active project's library
    pub fn save_to_library(&mut self, asset_id: &str) -> Result<()> {
        let asset = self
            .state
            .session_assets
            .iter()
            .find(|a| a.id == asset_id)
            .cloned()
            .ok_or_else(|| ForgeError::AssetNotFound(asset_id.to_string()))?;

        let active_id = self
            .state
            .active_project_id
            .clone()
            .ok_or_else(|| ForgeError::ProjectNotFound("no active project".to_string()))?;
        let project = self
            .state
            .projects
            .iter_mut()
            .find(|p| p.id == active_id)
            .ok_or_else(|| ForgeError::ProjectNotFound(active_id.clone()))?;

        if !project.contains(asset_id) {
            project.assets.insert(0, asset);
            self.persist()?;
        }
        Ok(())
    }

    /// Remove assets from the session and the active project's library
    pub fn delete_assets(&mut self, asset_ids: &[String]) -> Result<()> {
        let ids: HashSet<&str> = asset_ids.iter().map(|s| s.as_str()).collect();

        self.state
            .session_assets
            .retain(|a| !ids.contains(a.id.as_str()));
        if let Some(active_id) = self.state.active_project_id.clone() {
            if let Some(project) = self.state.projects.iter_mut().find(|p| p.id == active_id) {
                project.assets.retain(|a| !ids.contains(a.id.as_str()));
            }
        }
        self.selection.retain(|id| !ids.contains(id.as_str()));
        self.persist()
    }

    // --- Projects ---

    /// Create a project and make it active
    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        let project = Project::new(name);
        self.state.active_project_id = Some(project.id.clone());
        self.state.projects.push(project.clone());
        self.persist()?;
        Ok(project)
    }

    /// Switch the active project
    pub fn switch_project(&mut self, project_id: &str) -> Result<()> {
        if !self.state.projects.iter().any(|p| p.id == project_id) {
            return Err(ForgeError::ProjectNotFound(project_id.to_string()));
        }
        self.state.active_project_id = Some(project_id.to_string());
        self.persist()
    }

    /// Delete a project. If it was active, the first remaining project
    /// becomes active (or none). Assets only it referenced are
    /// garbage-collected by the save.
    pub fn delete_project(&mut self, project_id: &str) -> Result<()> {
        let before = self.state.projects.len();
        self.state.projects.retain(|p| p.id != project_id);
        if self.state.projects.len() == before {
            return Err(ForgeError::ProjectNotFound(project_id.to_string()));
        }

        if self.state.active_project_id.as_deref() == Some(project_id) {
            self.state.active_project_id = self.state.projects.first().map(|p| p.id.clone());
        }
        self.persist()
    }

    // --- Selection ---

    /// Toggle an asset in or out of the selection set
    pub fn toggle_select(&mut self, asset_id: &str) -> Result<()> {
        if self.find_asset(asset_id).is_none() {
            return Err(ForgeError::AssetNotFound(asset_id.to_string()));
        }
        if !self.selection.remove(asset_id) {
            self.selection.insert(asset_id.to_string());
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Resolve the selection to assets, session entries first, then the
    /// active project's library. An asset living in both views resolves
    /// once.
    pub fn selected_assets(&self) -> Vec<Asset> {
        let library = self
            .active_project()
            .map(|p| p.assets.as_slice())
            .unwrap_or(&[]);
        let mut seen = HashSet::new();
        self.state
            .session_assets
            .iter()
            .chain(library.iter())
            .filter(|a| self.selection.contains(&a.id) && seen.insert(a.id.clone()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_gen::providers::mock::MockProvider;

    fn studio() -> Studio {
        Studio::with_store(StudioStore::open_in_memory().unwrap()).unwrap()
    }

    fn generate_and_accept(studio: &mut Studio, prompt: &str) -> Asset {
        let provider = MockProvider::new();
        studio
            .generate(&provider, GenerationOptions::from_prompt(prompt))
            .unwrap();
        studio.accept_generation().unwrap().unwrap()
    }

    #[test]
    fn test_first_run_creates_default_project() {
        let studio = studio();
        assert_eq!(studio.projects().len(), 1);
        assert_eq!(studio.projects()[0].name, DEFAULT_PROJECT_NAME);
        assert_eq!(
            studio.active_project().unwrap().id,
            studio.projects()[0].id
        );
    }

    #[test]
    fn test_generate_holds_preview_until_accepted() {
        let mut studio = studio();
        let provider = MockProvider::new();
        studio
            .generate(&provider, GenerationOptions::from_prompt("barrel"))
            .unwrap();

        assert!(studio.pending_preview().is_some());
        assert!(studio.session_assets().is_empty());

        let accepted = studio.accept_generation().unwrap().unwrap();
        assert_eq!(studio.session_assets().len(), 1);
        assert_eq!(studio.session_assets()[0].id, accepted.id);
        assert!(studio.pending_preview().is_none());
    }

    #[test]
    fn test_discard_generation_drops_preview() {
        let mut studio = studio();
        let provider = MockProvider::new();
        studio
            .generate(&provider, GenerationOptions::from_prompt("barrel"))
            .unwrap();
        studio.discard_generation();
        assert!(studio.pending_preview().is_none());
        assert!(studio.accept_generation().unwrap().is_none());
    }

    #[test]
    fn test_busy_flag_blocks_second_request() {
        let mut studio = studio();
        studio.busy = true;
        let provider = MockProvider::new();
        let err = studio
            .generate(&provider, GenerationOptions::from_prompt("x"))
            .err()
            .unwrap();
        assert!(matches!(err, ForgeError::GenerationInProgress));
    }

    #[test]
    fn test_busy_flag_cleared_after_completion() {
        let mut studio = studio();
        let provider = MockProvider::new();
        studio
            .generate(&provider, GenerationOptions::from_prompt("x"))
            .unwrap();
        assert!(!studio.is_busy());
    }

    #[test]
    fn test_save_to_library_is_idempotent() {
        let mut studio = studio();
        let asset = generate_and_accept(&mut studio, "barrel");

        studio.save_to_library(&asset.id).unwrap();
        studio.save_to_library(&asset.id).unwrap();

        assert_eq!(studio.active_project().unwrap().assets.len(), 1);
        // Session copy is untouched
        assert_eq!(studio.session_assets().len(), 1);
    }

    #[test]
    fn test_regenerate_reuses_options() {
        let mut studio = studio();
        let asset = generate_and_accept(&mut studio, "stone wall");

        let provider = MockProvider::new();
        let preview = studio.regenerate(&provider, &asset.id).unwrap();
        assert_eq!(preview.options.prompt, "stone wall");
        assert_eq!(preview.options.original_id.as_deref(), Some(asset.id.as_str()));
    }

    #[test]
    fn test_inpaint_replaces_in_place() {
        let mut studio = studio();
        let asset = generate_and_accept(&mut studio, "cottage");
        studio.save_to_library(&asset.id).unwrap();

        let provider = MockProvider::new();
        let replacement = studio
            .inpaint(&provider, &asset.id, "bWFzaw==", "red roof")
            .unwrap();

        assert_ne!(replacement.id, asset.id);
        assert_eq!(replacement.prompt, "(inpainted) red roof");
        assert_eq!(studio.session_assets()[0].id, replacement.id);
        assert_eq!(studio.active_project().unwrap().assets[0].id, replacement.id);
        assert!(studio.find_asset(&asset.id).is_none());
    }

    #[test]
    fn test_delete_assets_clears_selection() {
        let mut studio = studio();
        let asset = generate_and_accept(&mut studio, "torch");
        studio.toggle_select(&asset.id).unwrap();

        studio.delete_assets(&[asset.id.clone()]).unwrap();
        assert!(studio.session_assets().is_empty());
        assert!(studio.selection().is_empty());
    }

    #[test]
    fn test_project_lifecycle() {
        let mut studio = studio();
        let first_id = studio.projects()[0].id.clone();

        let second_id = studio.create_project("Dungeon Pack").unwrap().id.clone();
        assert_eq!(studio.active_project().unwrap().id, second_id);

        studio.switch_project(&first_id).unwrap();
        assert_eq!(studio.active_project().unwrap().id, first_id);

        studio.delete_project(&first_id).unwrap();
        assert_eq!(studio.active_project().unwrap().id, second_id);

        assert!(studio.switch_project("missing").is_err());
        assert!(studio.delete_project("missing").is_err());
    }

    #[test]
    fn test_selection_resolves_each_asset_once() {
        let mut studio = studio();
        let first = generate_and_accept(&mut studio, "first");
        let second = generate_and_accept(&mut studio, "second");
        // second now lives in both the session and the library
        studio.save_to_library(&second.id).unwrap();

        studio.toggle_select(&first.id).unwrap();
        studio.toggle_select(&second.id).unwrap();

        let selected = studio.selected_assets();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().any(|a| a.id == first.id));
        assert!(selected.iter().any(|a| a.id == second.id));
    }

    #[test]
    fn test_toggle_select_unknown_asset_fails() {
        let mut studio = studio();
        assert!(studio.toggle_select("ghost").is_err());
    }

    #[test]
    fn test_toggle_twice_deselects() {
        let mut studio = studio();
        let asset = generate_and_accept(&mut studio, "lamp");
        studio.toggle_select(&asset.id).unwrap();
        assert_eq!(studio.selection().len(), 1);
        studio.toggle_select(&asset.id).unwrap();
        assert!(studio.selection().is_empty());
    }
}
