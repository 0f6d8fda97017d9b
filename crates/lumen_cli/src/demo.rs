//! Scene assembly from a frame configuration.

use anyhow::{Context, Result};
use lumen_core::{Environment, Material, Scene, Shape, Vertex};
use lumen_math::{Mat4, Vec2, Vec3};

use crate::config::FrameConfig;

/// Build the scene described by `config`: the demo room (if enabled) plus
/// every listed OBJ model.
pub fn build_scene(config: &FrameConfig) -> Result<Scene> {
    let mut scene = Scene::new();
    scene.set_render_params(config.render);
    scene.set_tree_params(config.tree);
    scene.set_air(Environment::from(&config.air));
    let air = scene.add_environment(*scene.air());

    if config.demo {
        add_demo_room(&mut scene, air);
    }

    for model in &config.models {
        let material = scene.add_material(Material::from(&model.material));
        let mut shape = Shape::new();
        shape
            .load_obj(&model.path, material, air, model.transform())
            .with_context(|| format!("loading model {}", model.path.display()))?;
        log::info!("Loaded {} ({} triangles)", model.path.display(), shape.len());
        scene.add_shape(shape);
    }

    Ok(scene)
}

/// Closed room with colored side walls, a ceiling light, a mirror ball, a
/// matte ball and a rippled floor.
fn add_demo_room(scene: &mut Scene, air: u32) {
    let white = scene.add_material(Material::diffuse(Vec3::splat(0.73)));
    let red = scene.add_material(Material::diffuse(Vec3::new(0.65, 0.05, 0.05)));
    let green = scene.add_material(Material::diffuse(Vec3::new(0.12, 0.45, 0.15)));
    let light = scene.add_material(Material::emissive(Vec3::splat(12.0)));
    let mirror = scene.add_material(Material::metal(Vec3::new(0.95, 0.93, 0.88), 0.05));
    let plastic = scene.add_material(Material::new(
        Vec3::new(0.2, 0.3, 0.8),
        Vec3::ZERO,
        0.4,
        0.0,
    ));

    let mut room = Shape::new();
    room.make_box(
        Vec3::new(-2.0, -2.0, -2.0),
        Vec3::new(2.0, 2.0, 5.0),
        white,
        air,
        Mat4::IDENTITY,
    );

    let wall = |min: Vec3, max: Vec3, material: u32| {
        let mut shape = Shape::new();
        shape.make_box(min, max, material, air, Mat4::IDENTITY);
        shape
    };
    let left = wall(Vec3::new(-2.0, -2.0, -2.0), Vec3::new(-1.95, 2.0, 2.0), red);
    let right = wall(Vec3::new(1.95, -2.0, -2.0), Vec3::new(2.0, 2.0, 2.0), green);
    let lamp = wall(Vec3::new(-0.6, 1.9, -0.6), Vec3::new(0.6, 1.98, 0.6), light);

    let mut ball = Shape::new();
    ball.make_sphere(Vec3::new(-0.8, -1.3, -0.6), 0.7, mirror, air, Mat4::IDENTITY);
    let mut blob = Shape::new();
    blob.make_sphere(
        Vec3::ZERO,
        0.5,
        plastic,
        air,
        Mat4::from_translation(Vec3::new(0.9, -1.5, 0.4))
            * Mat4::from_scale(Vec3::new(1.0, 1.0, 1.4)),
    );

    let mut floor = Shape::new();
    let n = 24;
    floor.make_grid(
        n,
        n,
        |row, col| {
            let u = col as f32 / (n - 1) as f32;
            let v = row as f32 / (n - 1) as f32;
            let (x, z) = (-1.9 + 3.8 * u, -1.9 + 3.8 * v);
            let y = -1.98 + 0.015 * (x * 6.0).sin() * (z * 6.0).cos();
            Vertex::new(Vec3::new(x, y, z), Vec3::Y, Vec2::new(u, v))
        },
        white,
        air,
    );

    for shape in [room, left, right, lamp, ball, blob, floor] {
        scene.add_shape(shape);
    }
}
