use crate::GenerationError;

use super::{model::MeshInstance, template::TemplateSource, Ruleset};

/// Update sent to the observers of a [`Ruleset`]
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationUpdate {
    /// The previous output was cleared, a generation starts.
    Cleared,
    /// A mesh has been emitted
    Emitted(MeshInstance),
    /// The generation ended successfully with this number of meshes
    Done(usize),
    /// The generation failed, its partial output was discarded
    Failed(GenerationError),
}

/// Observer mirroring the output of a [`Ruleset`].
pub struct QueuedStatefulObserver {
    meshes: Vec<MeshInstance>,
    receiver: crossbeam_channel::Receiver<GenerationUpdate>,
}

impl QueuedStatefulObserver {
    /// Creates a new [`QueuedStatefulObserver`] for a given [`Ruleset`]
    pub fn new<S: TemplateSource>(ruleset: &mut Ruleset<S>) -> Self {
        let receiver = ruleset.add_observer_queue();
        Self::create(receiver)
    }

    pub(crate) fn create(receiver: crossbeam_channel::Receiver<GenerationUpdate>) -> Self {
        QueuedStatefulObserver {
            meshes: Vec::new(),
            receiver,
        }
    }

    /// Meshes seen so far in the current generation
    pub fn meshes(&self) -> &[MeshInstance] {
        &self.meshes
    }

    /// Updates the internal state of the observer by dequeuing all queued updates.
    pub fn dequeue_all(&mut self) {
        while let Ok(update) = self.receiver.try_recv() {
            self.apply(update);
        }
    }

    /// Updates the internal state of the observer by dequeuing 1 queued update.
    ///
    /// Returns [`Some(GenerationUpdate)`] if there was an update to process, else returns `None`.
    pub fn dequeue_one(&mut self) -> Option<GenerationUpdate> {
        match self.receiver.try_recv() {
            Ok(update) => {
                self.apply(update.clone());
                Some(update)
            }
            Err(_) => None,
        }
    }

    fn apply(&mut self, update: GenerationUpdate) {
        match update {
            GenerationUpdate::Emitted(instance) => self.meshes.push(instance),
            GenerationUpdate::Cleared | GenerationUpdate::Failed(_) => self.meshes.clear(),
            GenerationUpdate::Done(_) => (),
        }
    }
}

/// Observer queuing the raw [`GenerationUpdate`] of a [`Ruleset`]
pub struct QueuedObserver {
    receiver: crossbeam_channel::Receiver<GenerationUpdate>,
}

impl QueuedObserver {
    /// Creates a new [`QueuedObserver`] for a given [`Ruleset`]
    pub fn new<S: TemplateSource>(ruleset: &mut Ruleset<S>) -> Self {
        let receiver = ruleset.add_observer_queue();
        Self::create(receiver)
    }

    pub(crate) fn create(receiver: crossbeam_channel::Receiver<GenerationUpdate>) -> Self {
        QueuedObserver { receiver }
    }

    /// Dequeues all queued updates.
    ///
    /// Returns all retrieved [`GenerationUpdate`] in a `Vec`.
    /// The `Vec` may be empty if no update was queued.
    pub fn dequeue_all(&mut self) -> Vec<GenerationUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.receiver.try_recv() {
            updates.push(update);
        }
        updates
    }

    /// Dequeues 1 queued update.
    ///
    /// Returns [`Some(GenerationUpdate)`] if there was an update to process, else returns `None`.
    pub fn dequeue_one(&mut self) -> Option<GenerationUpdate> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{GenerationUpdate, QueuedObserver, QueuedStatefulObserver};
    use crate::{
        generator::{
            builder::RulesetBuilder,
            model::MeshRule,
            rules::{FaceRule, Rule},
            template::TemplateLibrary,
        },
        GenerationError,
    };

    fn templates() -> TemplateLibrary {
        TemplateLibrary::new().with("wall", Vec3::ONE).unwrap()
    }

    #[test]
    fn queued_observer_receives_every_update() {
        let mut builder = RulesetBuilder::new()
            .with_volume_size(Vec3::new(2., 1., 1.))
            .with_templates(templates());
        let mut observer = builder.add_queued_observer();
        let mut ruleset = builder
            .with_root(FaceRule::new().with_main(MeshRule::new().with_template("wall")))
            .build();

        ruleset.generate().unwrap();
        let updates = observer.dequeue_all();
        assert_eq!(updates.len(), 6);
        assert_eq!(updates[0], GenerationUpdate::Cleared);
        assert_eq!(updates[1], GenerationUpdate::Emitted(ruleset.meshes()[0].clone()));
        assert_eq!(updates[5], GenerationUpdate::Done(4));
        assert_eq!(observer.dequeue_one(), None);

        ruleset.clear_root();
        assert!(ruleset.generate().is_err());
        assert_eq!(
            observer.dequeue_one(),
            Some(GenerationUpdate::Failed(GenerationError::NoRootRule))
        );
    }

    #[test]
    fn stateful_observer_mirrors_the_output() {
        let mut ruleset = RulesetBuilder::new()
            .with_volume_size(Vec3::new(3., 2., 1.))
            .with_templates(templates())
            .with_root(Rule::repeat_y(1., MeshRule::new().with_template("wall")).unwrap())
            .build();
        let mut observer = QueuedStatefulObserver::new(&mut ruleset);

        ruleset.generate().unwrap();
        assert_eq!(observer.dequeue_one(), Some(GenerationUpdate::Cleared));
        assert!(observer.dequeue_one().is_some());
        assert_eq!(observer.meshes().len(), 1);
        observer.dequeue_all();
        assert_eq!(observer.meshes(), ruleset.meshes());

        // A new generation clears the mirrored state first
        ruleset.generate().unwrap();
        observer.dequeue_all();
        assert_eq!(observer.meshes().len(), 2);

        ruleset.set_root(MeshRule::new());
        assert!(ruleset.generate().is_err());
        observer.dequeue_all();
        assert!(observer.meshes().is_empty());

        let mut raw = QueuedObserver::new(&mut ruleset);
        assert!(raw.dequeue_all().is_empty());
    }
}
