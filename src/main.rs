//! Headless demo: drives a scene for a few simulated frames and logs the
//! matrices each draw call would upload.
//!
//! Run with `RUST_LOG=debug cargo run` to see cache activity.

use matstack::prelude::*;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const FRAMES: u32 = 8;
const FRAME_TIME: f32 = 1.0 / 60.0;
const LINEAR_STEP: f32 = 0.1;
const ANGULAR_STEP: f32 = 5.0 * std::f32::consts::PI / 180.0;

/// Keyboard input the demo replays, one event per frame.
#[derive(Debug, Clone, Copy)]
enum Key {
    Up,
    Down,
    Left,
    Right,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,matstack=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn process_input(camera: &mut Frame, key: Key) -> Result<()> {
    match key {
        Key::Up => camera.move_forward(LINEAR_STEP)?,
        Key::Down => camera.move_forward(-LINEAR_STEP)?,
        Key::Left => camera.rotate_world(ANGULAR_STEP, 0.0, 1.0, 0.0)?,
        Key::Right => camera.rotate_world(-ANGULAR_STEP, 0.0, 1.0, 0.0)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let mut scene = SceneContext::new(&SceneConfig::default())?;
    scene.resize(1280, 720)?;

    let mut floor = Frame::new();
    floor.set_origin(Vec3::new(0.0, -0.4, 0.0));
    let mut torus = Frame::new();
    torus.set_origin(Vec3::new(0.0, 0.3, -2.5));

    let script = [Key::Up, Key::Up, Key::Left, Key::Left, Key::Right, Key::Down];
    let light_world = Vec3::new(0.0, 10.0, 5.0);

    for frame in 0..FRAMES {
        if let Some(&key) = script.get(frame as usize) {
            process_input(scene.camera_mut(), key)?;
        }
        // Spin the torus at 60 degrees per second.
        torus.rotate_world(60f32.to_radians() * FRAME_TIME, 0.0, 1.0, 0.0)?;

        let _camera = scene.begin_camera()?;

        let floor_uniforms = scene.draw(&floor, &RenderTechnique::Flat { color: GREEN })?;
        let torus_uniforms = scene.draw(
            &torus,
            &RenderTechnique::PointLightDiffuse {
                light_position: scene.light_in_eye_space(light_world),
                color: RED,
            },
        )?;

        info!(
            frame,
            camera = ?scene.camera().origin(),
            floor_uniforms = floor_uniforms.len(),
            torus_uniforms = torus_uniforms.len(),
            recomputations = scene.pipeline().recomputations(),
            "frame submitted"
        );
    }

    info!(
        depth = scene.model_view().borrow().depth(),
        "demo finished with balanced stacks"
    );
    Ok(())
}
