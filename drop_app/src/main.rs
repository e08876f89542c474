//! Sphere drop demo application
//!
//! Runs headlessly: a unit sphere falls from y = 5 onto a static ground quad
//! and the simulation reports where it comes to rest. An optional argument
//! names a `.toml` or `.ron` physics configuration file.

use rust_physics::foundation::logging;
use rust_physics::foundation::time::Timer;
use rust_physics::prelude::*;

/// Frame length fed to the world, as a 60 Hz display would
const FRAME_DT: f32 = 1.0 / 60.0;

/// Simulated frames before reporting
const FRAME_COUNT: u32 = 600;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("Physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Logs the first time the sphere touches anything
struct ImpactLogger {
    reported: bool,
}

impl CollisionListener for ImpactLogger {
    fn on_collision(&mut self, owner: EntityKey, event: &CollisionEvent) {
        if !self.reported {
            self.reported = true;
            log::info!(
                "{owner:?} first impact at {:?}, depth {:.4}",
                event.contact.point,
                event.contact.penetration_depth
            );
        }
    }
}

pub struct DropApp {
    world: PhysicsWorld,
    ball: EntityKey,
}

impl DropApp {
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        log::info!("Creating physics world...");
        let mut world = PhysicsWorld::new(config)?;

        let ground = world.spawn(Transform::identity());
        world.attach_collider(ground, Collider::new(CollisionShape::mesh(TriangleMesh::quad(50.0))))?;

        let ball = world.spawn(Transform::from_position(Vec3::new(0.0, 5.0, 0.0)));
        world.attach_collider(ball, Collider::new(CollisionShape::sphere(1.0)))?;
        let body = world.create_rigid_body();
        world.attach_rigid_body(ball, body)?;
        world.add_listener(ball, Box::new(ImpactLogger { reported: false }))?;

        world.activate_all();
        log::info!("Scene ready with {} entities", world.entity_count());

        Ok(Self { world, ball })
    }

    pub fn run(&mut self) {
        let mut timer = Timer::new();
        for frame in 0..FRAME_COUNT {
            self.world.update(FRAME_DT);
            timer.update();

            if frame % 60 == 0 {
                if let Some(transform) = self.world.transform(self.ball) {
                    log::debug!("t = {:.2}s  y = {:.4}", frame as f32 * FRAME_DT, transform.position.y);
                }
            }
        }

        log::info!(
            "Simulated {:.1}s in {:.2} ms over {} frames",
            FRAME_COUNT as f32 * FRAME_DT,
            timer.total_time() * 1000.0,
            timer.frame_count()
        );

        let resting = self.world.transform(self.ball).map(|t| t.position.y);
        let below = self.world.raycast(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 20.0);
        log::info!(
            "After {} steps the sphere rests at y = {:?}; ground ray hit at {:?}",
            self.world.step_count(),
            resting,
            below.map(|hit| hit.distance)
        );
    }
}

fn load_config() -> Result<PhysicsConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading physics configuration from {path}");
            PhysicsConfig::load_from_file(&path)
        }
        None => Ok(PhysicsConfig::default()),
    }
}

fn main() -> Result<(), AppError> {
    logging::init_with_default("info");

    let config = load_config()?;
    let mut app = DropApp::new(config)?;
    app.run();
    Ok(())
}
