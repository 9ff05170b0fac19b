//! # Project History
//!
//! A project owns the linear history of document snapshots and the cursor
//! addressing the current one.
//!
//! ## Design
//!
//! - Each committed edit appends one snapshot and moves the cursor onto it
//! - Undo and redo move the cursor one snapshot back or forward
//! - Committing while behind the end of history discards the redo snapshots
//! - After every commit and every step the project compares the snapshots on
//!   either side of the move and hands the [`MutationInfo`] to the registered
//!   callback, so observers see undo and redo the same way as new edits
//! - Snapshots keep their node uuids, so redo restores the very same identities
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut project = Project::new(registry, hash("Group"))?;
//! project.set_mutation_callback(|info| println!("{} node changes", info.nodes().len()));
//!
//! let root = project.current().root_id();
//! project.apply(&Mutation::insert(root, 0, hash("Group")))?;
//!
//! project.undo();
//! project.redo();
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use nodegraph_common::Identifier;
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::document::{Document, DocumentBuilder};
use crate::errors::{CoreError, EditError};
use crate::mutation_info::MutationInfo;
use crate::mutations::Mutation;
use crate::node::Node;
use crate::registry::MetadataRegistry;

/// Receives one [`MutationInfo`] per committed edit or history step
pub type MutationCallback = Box<dyn FnMut(Arc<MutationInfo>)>;

/// One entry of the history
#[derive(Debug, Clone)]
struct Snapshot {
    document: Arc<Document>,

    /// Description of the edit that produced this snapshot
    description: Option<String>,
}

pub struct Project {
    registry: Arc<MetadataRegistry>,
    config: ProjectConfig,

    /// Snapshots, oldest first; never empty
    history: Vec<Snapshot>,

    /// Index of the current snapshot
    position: usize,

    on_mutation: Option<MutationCallback>,
}

impl Project {
    /// New project whose document holds a single root of `root_type`
    pub fn new(registry: Arc<MetadataRegistry>, root_type: Identifier) -> Result<Self, EditError> {
        Self::with_config(registry, root_type, ProjectConfig::default())
    }

    pub fn with_config(
        registry: Arc<MetadataRegistry>,
        root_type: Identifier,
        config: ProjectConfig,
    ) -> Result<Self, EditError> {
        let metadata = registry.get(root_type).ok_or(EditError::UnknownNodeType(root_type))?;
        let document = Document::new(Node::new(metadata));
        Ok(Self::from_document(registry, document, config))
    }

    /// New project configured from the config file in `dir` (defaults if absent)
    pub fn open(
        dir: impl AsRef<Path>,
        registry: Arc<MetadataRegistry>,
        root_type: Identifier,
    ) -> Result<Self, CoreError> {
        let config = ProjectConfig::load(dir)?;
        debug!(max_history = config.max_history, "Loaded project config");
        Ok(Self::with_config(registry, root_type, config)?)
    }

    /// Start a history from an existing document, e.g. one handed back by a deserializer
    pub fn from_document(registry: Arc<MetadataRegistry>, document: Document, config: ProjectConfig) -> Self {
        Self {
            registry,
            config,
            history: vec![Snapshot {
                document: Arc::new(document),
                description: None,
            }],
            position: 0,
            on_mutation: None,
        }
    }

    /// Commit one edit atomically.
    ///
    /// The closure works on a builder seeded from the current document; if it
    /// returns an error nothing is committed and no notification is sent.
    ///
    /// With `validate_commits` set, debug builds run [`Document::validate`] on
    /// the new snapshot. A violation is logged as a warning and the snapshot is
    /// still committed; the check is a diagnostic, not a gate.
    pub fn edit<F>(&mut self, description: impl Into<String>, f: F) -> Result<Arc<MutationInfo>, EditError>
    where
        F: FnOnce(&mut DocumentBuilder) -> Result<(), EditError>,
    {
        let prev = self.current().clone();
        let mut builder = prev.to_builder();
        f(&mut builder)?;
        let cur = Arc::new(builder.build());

        if self.config.validate_commits && cfg!(debug_assertions) {
            if let Err(error) = cur.validate() {
                warn!(%error, "Committed document violates an invariant");
            }
        }

        let description = description.into();
        info!(description = %description, position = self.position + 1, "Committing edit");

        self.history.truncate(self.position + 1);
        self.history.push(Snapshot {
            document: cur.clone(),
            description: Some(description),
        });
        self.position += 1;
        self.trim();

        Ok(self.notify(prev, cur))
    }

    /// Commit a single validated [`Mutation`]
    pub fn apply(&mut self, mutation: &Mutation) -> Result<Arc<MutationInfo>, EditError> {
        let registry = self.registry.clone();
        self.edit(mutation.description(), |builder| mutation.apply(builder, &registry))
    }

    /// Commit several mutations as one undo step; the first failure aborts all of them
    pub fn apply_batch(
        &mut self,
        description: impl Into<String>,
        mutations: &[Mutation],
    ) -> Result<Arc<MutationInfo>, EditError> {
        let registry = self.registry.clone();
        self.edit(description, |builder| {
            mutations.iter().try_for_each(|m| m.apply(builder, &registry))
        })
    }

    /// Step back one snapshot; `None` at the start of history
    pub fn undo(&mut self) -> Option<Arc<MutationInfo>> {
        if !self.can_undo() {
            return None;
        }
        info!(description = ?self.undo_description(), position = self.position - 1, "Undo");
        Some(self.step(self.position - 1))
    }

    /// Step forward one snapshot; `None` at the end of history
    pub fn redo(&mut self) -> Option<Arc<MutationInfo>> {
        if !self.can_redo() {
            return None;
        }
        info!(description = ?self.redo_description(), position = self.position + 1, "Redo");
        Some(self.step(self.position + 1))
    }

    /// Walk to `position` one snapshot at a time, notifying after each step.
    /// Positions past the end stop at the newest snapshot.
    pub fn step_to(&mut self, position: usize) -> Vec<Arc<MutationInfo>> {
        let target = position.min(self.history.len() - 1);
        let mut steps = Vec::new();
        while self.position != target {
            let next = if target < self.position {
                self.position - 1
            } else {
                self.position + 1
            };
            steps.push(self.step(next));
        }
        steps
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.history.len()
    }

    pub fn undo_levels(&self) -> usize {
        self.position
    }

    pub fn redo_levels(&self) -> usize {
        self.history.len() - 1 - self.position
    }

    /// Description of the edit undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.history[self.position].description.as_deref()
    }

    /// Description of the edit redo would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.history.get(self.position + 1)?.description.as_deref()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of snapshots, the initial one included; never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn current(&self) -> &Arc<Document> {
        &self.history[self.position].document
    }

    pub fn document_at(&self, position: usize) -> Option<&Arc<Document>> {
        self.history.get(position).map(|s| &s.document)
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Drop all undo and redo history, keeping the current snapshot
    pub fn clear_history(&mut self) {
        let current = self.history.swap_remove(self.position);
        self.history = vec![current];
        self.position = 0;
    }

    pub fn set_mutation_callback(&mut self, callback: impl FnMut(Arc<MutationInfo>) + 'static) {
        self.on_mutation = Some(Box::new(callback));
    }

    pub fn clear_mutation_callback(&mut self) {
        self.on_mutation = None;
    }

    fn step(&mut self, to: usize) -> Arc<MutationInfo> {
        let prev = self.current().clone();
        self.position = to;
        let cur = self.current().clone();
        self.notify(prev, cur)
    }

    fn notify(&mut self, prev: Arc<Document>, cur: Arc<Document>) -> Arc<MutationInfo> {
        let info = Arc::new(MutationInfo::compare(prev, cur));
        if let Some(callback) = &mut self.on_mutation {
            callback(info.clone());
        }
        info
    }

    /// Drop the oldest snapshots beyond `max_history` undo levels
    fn trim(&mut self) {
        let max = self.config.max_history;
        if max == 0 || self.position <= max {
            return;
        }
        let excess = self.position - max;
        self.history.drain(..excess);
        self.position -= excess;
        debug!(dropped = excess, kept = self.history.len(), "Trimmed history");
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("config", &self.config)
            .field("position", &self.position)
            .field("len", &self.history.len())
            .field("has_callback", &self.on_mutation.is_some())
            .finish()
    }
}
