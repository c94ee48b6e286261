//! Build phase: files in, knowledge document out.
//!
//! Stages run strictly in sequence and each is a function of its explicit
//! inputs plus the reasoning call. Cancellation is checked between stages and
//! between chapters; a cancelled or failed build returns an error and no
//! document.

pub mod chapters;
pub mod extract;
pub mod order;
pub mod relate;

use chrono::Utc;
use tracing::{info, info_span};

use crate::cancel::CancelToken;
use crate::config::BuildConfig;
use crate::document::KnowledgeDocument;
use crate::error::{BuildStage, LoreError, Result};
use crate::models::RelationshipWarning;
use crate::reasoning::Reasoner;
use crate::store::FileStore;
use crate::utils::project_name;

pub use chapters::{write_chapter, ChapterInputs, RunningContext};
pub use extract::extract_abstractions;
pub use order::plan_order;
pub use relate::{map_relationships, RelationshipMap};

/// Progress notifications for callers that want to show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    StageStarted(BuildStage),
    ChapterStarted {
        number: usize,
        total: usize,
        name: String,
    },
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub document: KnowledgeDocument,
    /// Relationship edges dropped while mapping
    pub warnings: Vec<RelationshipWarning>,
}

type Observer<'a> = Box<dyn Fn(&BuildEvent) + 'a>;

pub struct KnowledgeBuilder<'a, R: Reasoner + ?Sized> {
    reasoner: &'a R,
    config: BuildConfig,
    cancel: CancelToken,
    project: Option<String>,
    observer: Option<Observer<'a>>,
}

impl<'a, R: Reasoner + ?Sized> KnowledgeBuilder<'a, R> {
    pub fn new(reasoner: &'a R, config: BuildConfig) -> Self {
        Self {
            reasoner,
            config,
            cancel: CancelToken::new(),
            project: None,
            observer: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override the project name derived from the store location.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_observer(mut self, observer: impl Fn(&BuildEvent) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn enter(&self, stage: BuildStage) -> Result<()> {
        self.cancel.check(stage)?;
        info!(%stage, "stage started");
        if let Some(observer) = &self.observer {
            observer(&BuildEvent::StageStarted(stage));
        }
        Ok(())
    }

    pub fn build<S: FileStore + ?Sized>(&self, store: &S) -> Result<BuildOutcome> {
        let project = self
            .project
            .clone()
            .unwrap_or_else(|| project_name(store.location()));
        let span = info_span!("build", %project);
        let _guard = span.enter();

        self.enter(BuildStage::Loading)?;
        let files = store.list();
        if files.is_empty() {
            return Err(LoreError::SourceUnavailable(format!(
                "no source files in {}",
                store.location()
            )));
        }
        info!(files = files.len(), location = store.location(), "source loaded");

        self.enter(BuildStage::Extraction)?;
        let abstractions = extract_abstractions(self.reasoner, &project, files, &self.config)?;

        self.enter(BuildStage::Relationships)?;
        let RelationshipMap {
            summary,
            relationships,
            warnings,
        } = map_relationships(self.reasoner, &project, &abstractions, files)?;

        self.enter(BuildStage::Ordering)?;
        let order = plan_order(&abstractions, &relationships);
        info!(order = ?order.as_slice(), "traversal order planned");

        self.enter(BuildStage::Chapters)?;
        let inputs = ChapterInputs {
            project: &project,
            files,
            abstractions: &abstractions,
            relationships: &relationships,
            order: &order,
            config: &self.config,
        };
        let mut context = RunningContext::new();
        let mut written = Vec::with_capacity(order.len());
        for (position, abstraction_index) in order.iter().enumerate() {
            self.cancel.check(BuildStage::Chapters)?;
            let name = abstractions[abstraction_index].name.clone();
            if let Some(observer) = &self.observer {
                observer(&BuildEvent::ChapterStarted {
                    number: position + 1,
                    total: order.len(),
                    name: name.clone(),
                });
            }
            let chapter = write_chapter(self.reasoner, &inputs, position, &context)?;
            context = context.with_chapter(chapters::chapter_title(&inputs, position), &chapter.content);
            info!(chapter = position + 1, %name, "chapter written");
            written.push(chapter);
        }

        self.enter(BuildStage::Writing)?;
        let document = KnowledgeDocument {
            project,
            generated_at: Utc::now(),
            fingerprint: store.fingerprint(),
            files: files.iter().map(|f| f.path.clone()).collect(),
            summary,
            abstractions,
            relationships,
            order,
            chapters: written,
        };
        document.validate()?;

        Ok(BuildOutcome { document, warnings })
    }
}
