use std::{num::NonZeroUsize, sync::Arc, thread};

use glam::Vec2;

#[cfg(feature = "debug-traces")]
use tracing::{debug, info};

use crate::{
    volume::{direction::FaceAngle, Volume},
    GenerationError,
};

use self::{
    builder::{RulesetBuilder, Unset},
    model::MeshInstance,
    observer::GenerationUpdate,
    rules::{PlacementParams, Rule},
    template::{TemplateLibrary, TemplateSource},
};

/// Defines a [`RulesetBuilder`] used to create a [`Ruleset`]
pub mod builder;
/// Defines [`model::MeshRule`], the leaf rule, and the [`MeshInstance`] it emits
pub mod model;
/// Defines different possible observers to view the results of a [`Ruleset`] generation
pub mod observer;
/// Defines the [`Rule`] tree and the container rules
pub mod rules;
/// Defines the [`TemplateSource`] used to fit mesh templates
pub mod template;

/// Everything a [`Rule`] needs while being processed: the volume being filled, the template sizes, and the output.
pub struct GenerationContext<'a> {
    volume: &'a Volume,
    templates: &'a dyn TemplateSource,
    output: &'a mut Vec<MeshInstance>,
    observers: &'a [crossbeam_channel::Sender<GenerationUpdate>],
}

impl<'a> GenerationContext<'a> {
    /// Creates a context appending generated meshes to `output`
    pub fn new(
        volume: &'a Volume,
        templates: &'a dyn TemplateSource,
        output: &'a mut Vec<MeshInstance>,
    ) -> Self {
        Self {
            volume,
            templates,
            output,
            observers: &[],
        }
    }

    /// The volume being filled
    pub fn volume(&self) -> &Volume {
        self.volume
    }

    pub fn templates(&self) -> &dyn TemplateSource {
        self.templates
    }

    /// Number of meshes emitted so far in the output
    pub fn emitted_count(&self) -> usize {
        self.output.len()
    }

    pub(crate) fn add_mesh(&mut self, instance: MeshInstance) {
        for obs in self.observers {
            let _ = obs.send(GenerationUpdate::Emitted(instance.clone()));
        }
        self.output.push(instance);
    }
}

/// Parameters given to the root rule of a generation over `volume`
pub fn root_params(volume: &Volume) -> PlacementParams {
    PlacementParams::new(
        FaceAngle::Rot0,
        volume.position(),
        Vec2::new(volume.width(), volume.height()),
    )
}

/// Owns a [`Volume`], a root [`Rule`] and the meshes generated by the last call to `generate`.
///
/// Use a [`RulesetBuilder`] to get an instance of a [`Ruleset`].
///
/// ### Example
///
/// Wrap a 5x10x5 volume with 1x1 walls and corner pillars.
/// ```
/// use ghx_proc_rules::{
///     generator::{model::MeshRule, rules::{FaceRule, Rule}, template::TemplateLibrary, Ruleset},
///     glam::Vec3,
/// };
///
/// let templates = TemplateLibrary::new()
///     .with("wall", Vec3::new(1., 1., 0.1)).unwrap()
///     .with("corner", Vec3::new(0.8, 1., 0.8)).unwrap();
/// let faces = FaceRule::new()
///     .with_main(Rule::repeat_y(1., Rule::repeat_x(1., MeshRule::new().with_template("wall")).unwrap()).unwrap())
///     .with_edge(Rule::repeat_y(1., MeshRule::new().with_template("corner")).unwrap());
///
/// let mut ruleset = Ruleset::builder()
///     .with_volume_size(Vec3::new(5., 10., 5.))
///     .with_templates(templates)
///     .with_root(Rule::top_bottom(faces))
///     .build();
/// ruleset.generate().unwrap();
/// assert_eq!(ruleset.meshes().len(), 240);
/// ```
pub struct Ruleset<S: TemplateSource> {
    // === Configuration ===
    volume: Volume,
    templates: S,
    root: Option<Arc<Rule>>,
    /// Observers signaled with updates of the output.
    observers: Vec<crossbeam_channel::Sender<GenerationUpdate>>,

    // === Output ===
    output: Vec<MeshInstance>,
}

impl Ruleset<TemplateLibrary> {
    /// Returns a new `RulesetBuilder`
    pub fn builder() -> RulesetBuilder<Unset, Unset, ()> {
        RulesetBuilder::new()
    }
}

impl<S: TemplateSource> Ruleset<S> {
    pub(crate) fn create(
        volume: Volume,
        templates: S,
        root: Option<Arc<Rule>>,
        observers: Vec<crossbeam_channel::Sender<GenerationUpdate>>,
    ) -> Self {
        Self {
            volume,
            templates,
            root,
            observers,
            output: Vec::new(),
        }
    }

    /// Clears the previous output and runs the root rule over the volume.
    ///
    /// Returns [`GenerationError::NoRootRule`] if no root rule is set. On any error, the output is left empty.
    pub fn generate(&mut self) -> Result<(), GenerationError> {
        let root = match &self.root {
            Some(root) => Arc::clone(root),
            None => {
                self.output.clear();
                self.signal(GenerationUpdate::Failed(GenerationError::NoRootRule));
                return Err(GenerationError::NoRootRule);
            }
        };

        #[cfg(feature = "debug-traces")]
        info!(
            "Generating over volume {} with {} rules",
            self.volume,
            root.count_nodes()
        );

        self.output.clear();
        self.signal(GenerationUpdate::Cleared);

        let params = root_params(&self.volume);
        let res = {
            let mut ctx = GenerationContext {
                volume: &self.volume,
                templates: &self.templates,
                output: &mut self.output,
                observers: &self.observers,
            };
            root.process(&params, &mut ctx)
        };

        match res {
            Ok(()) => {
                #[cfg(feature = "debug-traces")]
                info!("Generation done, {} meshes emitted", self.output.len());
                self.signal(GenerationUpdate::Done(self.output.len()));
                Ok(())
            }
            Err(err) => {
                #[cfg(feature = "debug-traces")]
                debug!("Generation failed: {}", err);
                self.output.clear();
                self.signal(GenerationUpdate::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Same as `generate` but returns a copy of the generated meshes.
    pub fn generate_collected(&mut self) -> Result<Vec<MeshInstance>, GenerationError> {
        self.generate()?;
        Ok(self.output.clone())
    }

    /// Replaces the volume by a volume of `size`, recentered as described in [`Volume::resize`]. The output is kept until the next generation.
    pub fn resize_volume(&mut self, size: glam::Vec3) {
        self.volume.resize(size);
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn templates(&self) -> &S {
        &self.templates
    }

    /// Returns the root rule, if any
    pub fn root(&self) -> Option<&Rule> {
        self.root.as_deref()
    }

    /// Sets the root rule
    pub fn set_root<R: Into<Rule>>(&mut self, root: R) {
        self.root = Some(Arc::new(root.into()));
    }

    /// Sets the root rule. The `Ruleset` will hold a read-only Arc onto the rule tree, which can be safely shared by multiple `Ruleset`.
    pub fn set_shared_root(&mut self, root: Arc<Rule>) {
        self.root = Some(root);
    }

    /// Removes the root rule. The next `generate` call will fail until a new one is set.
    pub fn clear_root(&mut self) {
        self.root = None;
    }

    /// Meshes generated by the last successful call to `generate`, in emission order
    pub fn meshes(&self) -> &[MeshInstance] {
        &self.output
    }

    /// Moves the generated meshes out of the ruleset, leaving its output empty
    pub fn take_meshes(&mut self) -> Vec<MeshInstance> {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn add_observer_queue(
        &mut self,
    ) -> crossbeam_channel::Receiver<GenerationUpdate> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.observers.push(sender);
        receiver
    }

    fn signal(&self, update: GenerationUpdate) {
        for obs in &self.observers {
            let _ = obs.send(update.clone());
        }
    }
}

/// Runs `root` over a single `volume` and returns the generated meshes
pub fn generate_volume<S: TemplateSource>(
    root: &Rule,
    templates: &S,
    volume: &Volume,
) -> Result<Vec<MeshInstance>, GenerationError> {
    let mut output = Vec::new();
    let mut ctx = GenerationContext::new(volume, templates, &mut output);
    root.process(&root_params(volume), &mut ctx)?;
    Ok(output)
}

/// Runs the same rule tree over many independent volumes, spread over worker threads.
///
/// Rules hold no per-invocation state, so a single tree is shared by all the workers without locking.
/// Returns one output per volume, in the order of `volumes`, or the first error encountered.
pub fn generate_volumes<S: TemplateSource + Sync>(
    root: &Rule,
    templates: &S,
    volumes: &[Volume],
) -> Result<Vec<Vec<MeshInstance>>, GenerationError> {
    if volumes.is_empty() {
        return Ok(Vec::new());
    }
    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(volumes.len());
    let chunk_size = volumes.len().div_ceil(workers);

    #[cfg(feature = "debug-traces")]
    debug!(
        "Generating {} volumes on {} workers",
        volumes.len(),
        workers
    );

    thread::scope(|scope| {
        let handles: Vec<_> = volumes
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|volume| generate_volume(root, templates, volume))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();

        let mut outputs = Vec::with_capacity(volumes.len());
        for handle in handles {
            let chunk_outputs = handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))?;
            outputs.extend(chunk_outputs);
        }
        Ok(outputs)
    })
}
