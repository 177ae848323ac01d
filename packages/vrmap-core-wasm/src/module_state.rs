use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::draw_plan::FanDrawPlan;
use crate::error::PipelineError;
use crate::models::{PackedScene, RawShape, SceneSummary};
use crate::pipeline::build_scene;
use crate::query::{parse_feature_set, shape_from_points};
use crate::{console_log, console_warn};

/// A scene as the renderer sees it: the packed buffer plus the draw ranges
/// derived from it. Immutable once published.
#[derive(Debug)]
pub struct PublishedScene {
    pub scene: PackedScene,
    pub plan: FanDrawPlan,
}

/// Outcome of one rebuild.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneStatus {
    /// A new scene was published.
    Ready(SceneSummary),
    /// The query returned nothing; only the floor is drawn.
    Empty,
    /// The batch was rejected; the slot was cleared and only the floor is drawn.
    Failed(PipelineError),
}

impl SceneStatus {
    pub fn summary(&self) -> SceneSummary {
        match self {
            SceneStatus::Ready(summary) => summary.clone(),
            SceneStatus::Empty => SceneSummary::empty(),
            SceneStatus::Failed(e) => SceneSummary::failed(e.to_string()),
        }
    }
}

/// Holds the one scene the render loop may read.
///
/// The scene is swapped in whole, so a reader either sees nothing or a
/// finished scene. `None` means "not ready": draw the floor only.
#[derive(Debug, Default)]
pub struct SceneSlot {
    current: RwLock<Option<Arc<PublishedScene>>>,
}

impl SceneSlot {
    pub fn new() -> Self {
        SceneSlot::default()
    }

    pub fn publish(&self, scene: PackedScene) -> Arc<PublishedScene> {
        let plan = FanDrawPlan::from_scene(&scene);
        let published = Arc::new(PublishedScene { scene, plan });
        *self.current.write() = Some(Arc::clone(&published));
        published
    }

    pub fn current(&self) -> Option<Arc<PublishedScene>> {
        self.current.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }

    /// Build a scene from a query result and publish it.
    ///
    /// Never panics on bad input: a rejected batch leaves the slot empty.
    pub fn rebuild(&self, shapes: &[RawShape], config: &PipelineConfig) -> SceneStatus {
        if shapes.is_empty() {
            console_log!("Query returned no shapes, showing floor only");
            self.clear();
            return SceneStatus::Empty;
        }

        match build_scene(shapes, config) {
            Ok(scene) => {
                let published = self.publish(scene);
                console_log!(
                    "Published scene with {} shapes ({} drawable)",
                    published.scene.shape_count(),
                    published.plan.drawable().count()
                );
                SceneStatus::Ready(published.scene.summary())
            }
            Err(e) => {
                console_warn!("Scene rejected: {}", e);
                self.clear();
                SceneStatus::Failed(e)
            }
        }
    }

    /// Reject a request that failed before reaching the pipeline. The old
    /// scene is dropped as well, so the floor is drawn alone.
    pub fn fail(&self, error: PipelineError) -> SceneStatus {
        console_warn!("Scene request failed: {}", error);
        self.clear();
        SceneStatus::Failed(error)
    }

    /// Rebuild from coordinate lists, each point `[x, y]` or `[x, y, z]`.
    pub fn rebuild_from_points(&self, shapes: &[Vec<Vec<f64>>], config: &PipelineConfig) -> SceneStatus {
        match shapes
            .iter()
            .map(|points| shape_from_points(points))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(shapes) => self.rebuild(&shapes, config),
            Err(e) => self.fail(e),
        }
    }

    /// Rebuild from a map service feature set response.
    pub fn rebuild_from_feature_set(&self, json: &str, config: &PipelineConfig) -> SceneStatus {
        match parse_feature_set(json) {
            Ok(shapes) => self.rebuild(&shapes, config),
            Err(e) => self.fail(e),
        }
    }
}

// Create a global static instance of the scene slot shared with the render loop
lazy_static! {
    static ref SCENE_SLOT: SceneSlot = SceneSlot::new();
}

pub fn global_scene() -> &'static SceneSlot {
    &SCENE_SLOT
}
