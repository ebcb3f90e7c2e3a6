use std::{collections::BTreeMap, error::Error, sync::Arc, time::Instant};

use ghx_proc_rules::{
    generator::{
        generate_volumes,
        model::{MeshRule, TemplateSelection},
        rules::{FaceRule, Rule, TopBottomRule},
        template::TemplateLibrary,
        Ruleset,
    },
    glam::Vec3,
    volume::Volume,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let templates = TemplateLibrary::new()
        .with("wall", Vec3::new(2., 3., 0.3))?
        .with("window", Vec3::new(2., 3., 0.3))?
        .with("pillar", Vec3::new(0.8, 3., 0.8))?
        .with("roof", Vec3::new(1., 0.5, 1.))?;

    let facade = MeshRule::new()
        .with_weighted_template("wall", 1.)
        .with_weighted_template("window", 3.)
        .with_selection(TemplateSelection::Seeded(99));
    let faces = FaceRule::new()
        .with_main(Rule::repeat_y(3., Rule::repeat_x(2., facade)?)?)
        .with_edge(Rule::repeat_y(3., MeshRule::new().with_template("pillar"))?);
    // A single rule tree shared by every building of the block
    let root = Arc::new(Rule::from(
        TopBottomRule::new()
            .with_middle(faces)
            .with_top(MeshRule::new().with_template("roof"))
            .with_cap_height(0.5)?,
    ));

    let buildings: Vec<Volume> = (0..64)
        .map(|i| {
            let floors = 2 + (i * 7) % 9;
            let width = 6. + ((i * 5) % 4) as f32 * 2.;
            let depth = 6. + ((i * 3) % 3) as f32 * 2.;
            let size = Vec3::new(width, floors as f32 * 3., depth);
            // Lay the buildings out on an 8x8 grid of 16x16 lots
            let lot = Vec3::new((i % 8) as f32 * 16., 0., (i / 8) as f32 * 16.);
            Volume::new(Volume::from_size(size).position() + lot, size)
        })
        .collect();

    let start = Instant::now();
    let outputs = generate_volumes(&root, &templates, &buildings)?;
    println!(
        "Generated {} buildings in {:?}",
        outputs.len(),
        start.elapsed()
    );

    let mut totals = BTreeMap::new();
    for mesh in outputs.iter().flatten() {
        *totals.entry(mesh.template_id.as_str()).or_insert(0usize) += 1;
    }
    for (id, count) in &totals {
        println!("{:>12}: {}", id, count);
    }

    // The same tree can drive a single ruleset, the output is identical
    let mut ruleset = Ruleset::builder()
        .with_volume(buildings[0])
        .with_templates(&templates)
        .with_shared_root(Arc::clone(&root))
        .build();
    ruleset.generate()?;
    println!(
        "First building regenerated alone: {} meshes, identical: {}",
        ruleset.meshes().len(),
        ruleset.meshes() == outputs[0].as_slice()
    );

    Ok(())
}
