use std::error::Error;

use ghx_proc_rules::{
    generator::{
        builder::RulesetBuilder,
        model::{MeshInstance, MeshRule, TemplateSelection},
        observer::QueuedStatefulObserver,
        rules::{FaceRule, Rule, TopBottomRule},
        template::TemplateLibrary,
    },
    glam::Vec3,
    volume::direction::FaceAngle,
};

const ICONS: &[(&str, &str)] = &[("wall", "🧱"), ("window", "🪟"), ("door", "🚪")];

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Templates are only known by their local size here, a renderer would map the ids to real meshes
    let templates = TemplateLibrary::new()
        .with("wall", Vec3::new(1., 1., 0.2))?
        .with("window", Vec3::new(1., 1., 0.2))?
        .with("corner", Vec3::new(0.8, 1., 0.8))?
        .with("slab", Vec3::new(1., 0.2, 1.))?;

    // Each 1x1 tile of the faces is either a wall or a window, 1 window for 2 walls on average
    let tile = MeshRule::new()
        .with_weighted_template("wall", 2.)
        .with_weighted_template("window", 1.)
        .with_selection(TemplateSelection::Seeded(1234));
    let faces = FaceRule::new()
        .with_main(Rule::repeat_y(1., Rule::repeat_x(1., tile)?)?)
        .with_edge(Rule::repeat_y(1., MeshRule::new().with_template("corner"))?);
    let root = TopBottomRule::new()
        .with_middle(faces)
        .with_bottom(MeshRule::new().with_template("slab"))
        .with_top(MeshRule::new().with_template("slab"));

    let mut builder = RulesetBuilder::new()
        .with_volume_size(Vec3::new(5., 10., 5.))
        .with_templates(templates);
    let mut observer: QueuedStatefulObserver = builder.add_queued_stateful_observer();
    let mut ruleset = builder.with_root(root).build();

    ruleset.generate()?;
    observer.dequeue_all();
    println!("Tower {}: {} meshes", ruleset.volume(), observer.meshes().len());
    display_face(observer.meshes(), FaceAngle::Rot0);

    // Regenerating after a resize replaces the whole output
    ruleset.resize_volume(Vec3::new(8., 6., 3.));
    ruleset.generate()?;
    observer.dequeue_all();
    println!("Tower {}: {} meshes", ruleset.volume(), observer.meshes().len());
    display_face(observer.meshes(), FaceAngle::Rot90);

    Ok(())
}

/// Draws the tiles of one face, from top to bottom
fn display_face(meshes: &[MeshInstance], angle: FaceAngle) {
    let mut rows: Vec<(f32, Vec<&MeshInstance>)> = Vec::new();
    for mesh in meshes.iter().filter(|m| {
        m.transform.rotation_y == angle.radians() && ICONS.iter().any(|(id, _)| *id == m.template_id)
    }) {
        let y = mesh.transform.position.y;
        match rows.iter_mut().find(|(row_y, _)| (*row_y - y).abs() < 1e-3) {
            Some((_, row)) => row.push(mesh),
            None => rows.push((y, vec![mesh])),
        }
    }
    rows.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (_, row) in rows {
        for mesh in row {
            let icon = ICONS
                .iter()
                .find(|(id, _)| *id == mesh.template_id)
                .map_or("❓", |(_, icon)| *icon);
            print!("{}", icon);
        }
        println!();
    }
}
