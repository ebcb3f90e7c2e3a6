use std::{marker::PhantomData, sync::Arc};

use glam::Vec3;

use crate::volume::Volume;

use super::{
    observer::{GenerationUpdate, QueuedObserver, QueuedStatefulObserver},
    rules::Rule,
    template::TemplateSource,
    Ruleset,
};

/// Internal type used to provide a type-safe builder with a [`Volume`] and a [`TemplateSource`]
pub enum Set {}
/// Internal type used to provide a type-safe builder with a [`Volume`] and a [`TemplateSource`]
pub enum Unset {}

/// Used to instantiate a new [`Ruleset`].
///
/// A [`Volume`] and a [`TemplateSource`] are the two non-optionnal members that are needed before being able to call `build`.
/// The root [`Rule`] can be given here or later, but `generate` will fail until one is set.
///
/// ### Example
///
/// ```
/// use ghx_proc_rules::{
///     generator::{builder::RulesetBuilder, model::MeshRule, template::TemplateLibrary},
///     glam::Vec3,
/// };
///
/// let templates = TemplateLibrary::new().with("crate", Vec3::ONE).unwrap();
/// let mut ruleset = RulesetBuilder::new()
///     .with_volume_size(Vec3::new(2., 2., 2.))
///     .with_templates(templates)
///     .with_root(MeshRule::new().with_template("crate"))
///     .build();
/// ruleset.generate().unwrap();
/// assert_eq!(ruleset.meshes()[0].transform.scale, Vec3::new(2., 2., 1.));
/// ```
pub struct RulesetBuilder<V, T, S> {
    volume: Option<Volume>,
    templates: Option<S>,
    root: Option<Arc<Rule>>,
    observers: Vec<crossbeam_channel::Sender<GenerationUpdate>>,
    typestate: PhantomData<(V, T)>,
}

impl RulesetBuilder<Unset, Unset, ()> {
    /// Creates a [`RulesetBuilder`] with its values set to their default.
    pub fn new() -> Self {
        Self {
            volume: None,
            templates: None,
            root: None,
            observers: Vec::new(),
            typestate: PhantomData,
        }
    }
}

impl Default for RulesetBuilder<Unset, Unset, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> RulesetBuilder<Unset, T, S> {
    /// Sets the [`Volume`] to be filled by the [`Ruleset`]
    pub fn with_volume(self, volume: Volume) -> RulesetBuilder<Set, T, S> {
        RulesetBuilder {
            volume: Some(volume),

            templates: self.templates,
            root: self.root,
            observers: self.observers,

            typestate: PhantomData,
        }
    }

    /// Sets a [`Volume`] of `size`, centered as described in [`Volume::resize`]
    pub fn with_volume_size(self, size: Vec3) -> RulesetBuilder<Set, T, S> {
        self.with_volume(Volume::from_size(size))
    }
}

impl<V, S> RulesetBuilder<V, Unset, S> {
    /// Sets the [`TemplateSource`] used to fit the mesh templates
    pub fn with_templates<N: TemplateSource>(self, templates: N) -> RulesetBuilder<V, Set, N> {
        RulesetBuilder {
            templates: Some(templates),

            volume: self.volume,
            root: self.root,
            observers: self.observers,

            typestate: PhantomData,
        }
    }
}

impl<V, T, S> RulesetBuilder<V, T, S> {
    /// Sets the root [`Rule`] to be used by the [`Ruleset`]
    pub fn with_root<R: Into<Rule>>(mut self, root: R) -> Self {
        self.root = Some(Arc::new(root.into()));
        self
    }

    /// Sets the root [`Rule`] to be used by the [`Ruleset`]. The `Ruleset` will hold a read-only Arc onto the rule tree, which can be safely shared by multiple `Ruleset`.
    pub fn with_shared_root(mut self, root: Arc<Rule>) -> Self {
        self.root = Some(root);
        self
    }

    /// Registers a [`QueuedStatefulObserver`] on the future [`Ruleset`]
    pub fn add_queued_stateful_observer(&mut self) -> QueuedStatefulObserver {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.observers.push(sender);
        QueuedStatefulObserver::create(receiver)
    }

    /// Registers a [`QueuedObserver`] on the future [`Ruleset`]
    pub fn add_queued_observer(&mut self) -> QueuedObserver {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.observers.push(sender);
        QueuedObserver::create(receiver)
    }
}

impl<S: TemplateSource> RulesetBuilder<Set, Set, S> {
    /// Instantiates a [`Ruleset`] as specified by the various builder parameters.
    pub fn build(self) -> Ruleset<S> {
        match (self.volume, self.templates) {
            (Some(volume), Some(templates)) => {
                Ruleset::create(volume, templates, self.root, self.observers)
            }
            // Both members are `Some` thanks to the typing.
            _ => unreachable!("Volume and templates are set on a RulesetBuilder<Set, Set, _>"),
        }
    }
}
