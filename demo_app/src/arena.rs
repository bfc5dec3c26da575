//! The arena application: setup, per-frame input and status reporting

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::core::AssetConfig;
use scene_engine::ecs::singleton;
use scene_engine::events::{EventBus, EventSystem};
use scene_engine::{AppError, Application, Engine};

use crate::components::{Arena, Bullet, Camera, MainPlayer, Player, Position, Rock, Velocity, Weapon};
use crate::input::{InputEvent, ScriptedInput};
use crate::stats::GameStats;
use crate::systems::{
    BoundsSystem, CameraSystem, CollisionSystem, MovementSystem, PlayerControlSystem, WeaponSystem,
    BOUNDS_PRIORITY, CAMERA_PRIORITY, COLLISION_PRIORITY, CONTROL_PRIORITY, INPUT_PRIORITY, MOVEMENT_PRIORITY,
    WEAPON_PRIORITY,
};
use crate::weapons::WeaponLibrary;

const ARENA_SIZE: (f32, f32) = (640.0, 480.0);
const VIEWPORT: (f32, f32) = (320.0, 240.0);
const ROCK_COUNT: usize = 8;
const REPORT_EVERY: u64 = 60;

pub struct ArenaApp {
    weapons: WeaponLibrary,
    input: ScriptedInput,
    seed: u64,
}

impl ArenaApp {
    pub fn new(assets: &AssetConfig, seed: u64) -> Self {
        Self {
            weapons: WeaponLibrary::from_config(assets),
            input: ScriptedInput::new(seed),
            seed,
        }
    }
}

impl Application for ArenaApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        log::info!("Setting up arena...");
        let arena = Arena {
            size: Vector2::new(ARENA_SIZE.0, ARENA_SIZE.1),
        };
        let scene = engine.scene_mut();
        scene.insert_resource(arena);
        scene.insert_resource(EventBus::<InputEvent>::new());
        scene.insert_resource(Camera {
            offset: Vector2::zeros(),
            viewport: Vector2::new(VIEWPORT.0, VIEWPORT.1),
        });

        let blaster = self.weapons.get("blaster")?;
        log::info!("Player armed with {} ({} damage)", blaster.name, blaster.damage);
        let player = scene.create_entity((
            Player::new(120.0),
            Position(arena.size / 2.0),
            Velocity(Vector2::zeros()),
            Weapon::new(blaster),
        ))?;
        scene.insert_resource(MainPlayer(player));

        let mut rng = StdRng::seed_from_u64(self.seed);
        for _ in 0..ROCK_COUNT {
            let position = Vector2::new(rng.gen_range(0.0..arena.size.x), rng.gen_range(0.0..arena.size.y));
            let velocity = Vector2::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));
            scene.create_entity((
                Rock {
                    radius: rng.gen_range(8.0..24.0),
                    health: rng.gen_range(10..40),
                },
                Position(position),
                Velocity(velocity),
            ))?;
        }

        scene.add_system(EventSystem::<InputEvent>::new(), INPUT_PRIORITY);
        scene.add_system(PlayerControlSystem, CONTROL_PRIORITY);
        scene.add_system(WeaponSystem, WEAPON_PRIORITY);
        scene.add_system(MovementSystem, MOVEMENT_PRIORITY);
        scene.add_system(BoundsSystem, BOUNDS_PRIORITY);
        scene.add_system(CollisionSystem, COLLISION_PRIORITY);
        scene.add_system(CameraSystem, CAMERA_PRIORITY);
        log::info!(
            "Arena ready: {} entities, {} systems, priorities {:?}",
            scene.entity_count(),
            scene.system_count(),
            scene.priorities()
        );
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        let bus = engine.scene().resource::<EventBus<InputEvent>>()?;
        self.input.feed(&mut bus.borrow_mut());
        Ok(())
    }

    fn after_update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        let scene = engine.scene();
        if scene.component_count::<Rock>() == 0 {
            log::info!("All rocks destroyed after {} frames", engine.frame_count());
            engine.quit();
            return Ok(());
        }
        if engine.frame_count() % REPORT_EVERY == 0 {
            let MainPlayer(player) = *scene.resource::<MainPlayer>()?.borrow();
            let position = scene.get_component::<Position>(player)?.borrow().0;
            let camera = scene.resource::<Camera>()?.borrow().offset;
            log::info!(
                "t={:.1}s player=({:.0}, {:.0}) camera=({:.0}, {:.0}) rocks={} bullets={}",
                engine.total_time(),
                position.x,
                position.y,
                camera.x,
                camera.y,
                scene.component_count::<Rock>(),
                scene.component_count::<Bullet>()
            );
        }
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        let stats = singleton::instance::<GameStats>();
        let stats = singleton::lock(&stats);
        log::info!(
            "Session over after {} frames: {} shots fired, {} rocks destroyed, {} weapon kinds loaded",
            engine.frame_count(),
            stats.shots_fired,
            stats.rocks_destroyed,
            self.weapons.loaded()
        );
    }
}
