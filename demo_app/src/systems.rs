//! Arena systems, listed in execution order

use nalgebra::Vector2;
use scene_engine::ecs::{singleton, EcsResult, Entity, Priority, Scene, System};

use crate::components::{Arena, Bullet, Camera, MainPlayer, Player, Position, Rock, Velocity, Weapon};
use crate::stats::GameStats;

pub const INPUT_PRIORITY: Priority = 100;
pub const CONTROL_PRIORITY: Priority = 90;
pub const WEAPON_PRIORITY: Priority = 80;
pub const MOVEMENT_PRIORITY: Priority = 50;
pub const BOUNDS_PRIORITY: Priority = 40;
pub const COLLISION_PRIORITY: Priority = 30;
pub const CAMERA_PRIORITY: Priority = 10;

/// Turns held keys into player velocity
pub struct PlayerControlSystem;

impl System for PlayerControlSystem {
    fn update(&mut self, scene: &mut Scene, _delta_time: f32) -> EcsResult<()> {
        for (_, (player, velocity)) in scene.get_entities_with::<(Player, Velocity)>() {
            let player = player.borrow();
            velocity.borrow_mut().0 = player.heading() * player.speed;
        }
        Ok(())
    }
}

/// Spawns bullets from players holding the fire key
pub struct WeaponSystem;

impl System for WeaponSystem {
    fn update(&mut self, scene: &mut Scene, delta_time: f32) -> EcsResult<()> {
        let mut shots = Vec::new();
        for (_, (player, weapon, position)) in scene.get_entities_with::<(Player, Weapon, Position)>() {
            let player = player.borrow();
            let mut weapon = weapon.borrow_mut();
            if weapon.tick(delta_time, player.is_firing()) {
                let heading = player.heading();
                let direction = if heading == Vector2::zeros() { -Vector2::y() } else { heading };
                let bullet = Bullet {
                    damage: weapon.damage(),
                    ttl: weapon.bullet_ttl(),
                };
                shots.push((position.borrow().0, direction * weapon.bullet_speed(), bullet));
            }
        }

        if shots.is_empty() {
            return Ok(());
        }
        let fired = shots.len() as u64;
        for (origin, velocity, bullet) in shots {
            scene.create_entity((Position(origin), Velocity(velocity), bullet))?;
        }
        singleton::lock(&singleton::instance::<GameStats>()).shots_fired += fired;
        Ok(())
    }
}

/// Integrates velocity into position
pub struct MovementSystem;

impl System for MovementSystem {
    fn update(&mut self, scene: &mut Scene, delta_time: f32) -> EcsResult<()> {
        for (_, (position, velocity)) in scene.get_entities_with::<(Position, Velocity)>() {
            position.borrow_mut().0 += velocity.borrow().0 * delta_time;
        }
        Ok(())
    }
}

/// Keeps players inside the arena, bounces rocks off the walls and expires bullets
pub struct BoundsSystem;

impl System for BoundsSystem {
    fn update(&mut self, scene: &mut Scene, delta_time: f32) -> EcsResult<()> {
        let arena = *scene.resource::<Arena>()?.borrow();

        for (_, (_, position)) in scene.get_entities_with::<(Player, Position)>() {
            let mut position = position.borrow_mut();
            position.0 = arena.clamp(position.0);
        }

        for (_, (_, position, velocity)) in scene.get_entities_with::<(Rock, Position, Velocity)>() {
            let mut position = position.borrow_mut();
            let mut velocity = velocity.borrow_mut();
            let clamped = arena.clamp(position.0);
            if clamped.x != position.0.x {
                velocity.0.x = -velocity.0.x;
            }
            if clamped.y != position.0.y {
                velocity.0.y = -velocity.0.y;
            }
            position.0 = clamped;
        }

        let mut expired = Vec::new();
        for (entity, (bullet, position)) in scene.get_entities_with::<(Bullet, Position)>() {
            let mut bullet = bullet.borrow_mut();
            bullet.ttl -= delta_time;
            if bullet.ttl <= 0.0 || !arena.contains(&position.borrow().0) {
                expired.push(entity);
            }
        }
        for entity in expired {
            scene.del_entity(entity)?;
        }
        Ok(())
    }
}

/// Bullets damage the rocks they hit
pub struct CollisionSystem;

impl System for CollisionSystem {
    fn update(&mut self, scene: &mut Scene, _delta_time: f32) -> EcsResult<()> {
        let rocks: Vec<(Entity, Vector2<f32>, f32)> = scene
            .get_entities_with::<(Rock, Position)>()
            .map(|(entity, (rock, position))| (entity, position.borrow().0, rock.borrow().radius))
            .collect();
        if rocks.is_empty() {
            return Ok(());
        }

        let mut spent = Vec::new();
        for (entity, (bullet, position)) in scene.get_entities_with::<(Bullet, Position)>() {
            let point = position.borrow().0;
            let hit = rocks
                .iter()
                .find(|(_, center, radius)| (point - center).norm() <= *radius);
            if let Some((rock, _, _)) = hit {
                scene.get_component::<Rock>(*rock)?.borrow_mut().health -= i32::try_from(bullet.borrow().damage).unwrap_or(i32::MAX);
                spent.push(entity);
            }
        }

        let destroyed: Vec<Entity> = rocks
            .iter()
            .map(|(entity, _, _)| *entity)
            .filter(|entity| {
                scene
                    .get_component::<Rock>(*entity)
                    .is_ok_and(|rock| rock.borrow().health <= 0)
            })
            .collect();

        for entity in spent {
            scene.del_entity(entity)?;
        }
        for &entity in &destroyed {
            log::info!("Rock {} destroyed", entity);
            scene.del_entity(entity)?;
        }
        if !destroyed.is_empty() {
            singleton::lock(&singleton::instance::<GameStats>()).rocks_destroyed += destroyed.len() as u64;
        }
        Ok(())
    }
}

/// Centres the camera on the main player without leaving the arena
pub struct CameraSystem;

impl System for CameraSystem {
    fn update(&mut self, scene: &mut Scene, _delta_time: f32) -> EcsResult<()> {
        let arena = *scene.resource::<Arena>()?.borrow();
        let MainPlayer(player) = *scene.resource::<MainPlayer>()?.borrow();
        let target = scene.get_component::<Position>(player)?.borrow().0;

        let camera = scene.resource::<Camera>()?;
        let mut camera = camera.borrow_mut();
        let limit = (arena.size - camera.viewport).sup(&Vector2::zeros());
        let offset = target - camera.viewport / 2.0;
        camera.offset = Vector2::new(offset.x.clamp(0.0, limit.x), offset.y.clamp(0.0, limit.y));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{InputEvent, Key};
    use crate::weapons::WeaponStats;
    use approx::assert_relative_eq;
    use scene_engine::events::{EventBus, EventSystem};
    use std::sync::Arc;

    fn arena_scene() -> Scene {
        let mut scene = Scene::new();
        scene.insert_resource(Arena {
            size: Vector2::new(100.0, 80.0),
        });
        scene.insert_resource(EventBus::<InputEvent>::new());
        scene
    }

    fn blaster() -> Arc<WeaponStats> {
        Arc::new(WeaponStats {
            name: "Test Blaster".to_string(),
            damage: 5,
            fire_rate: 2.0,
            bullet_speed: 10.0,
            bullet_ttl: 1.0,
        })
    }

    #[test]
    fn test_movement_integrates_velocity() {
        let mut scene = arena_scene();
        let entity = scene
            .create_entity((Position(Vector2::new(1.0, 2.0)), Velocity(Vector2::new(4.0, -2.0))))
            .unwrap();
        scene.add_system(MovementSystem, MOVEMENT_PRIORITY);
        for _ in 0..4 {
            scene.update(0.25).unwrap();
        }
        let position = scene.get_component::<Position>(entity).unwrap().borrow().0;
        assert_relative_eq!(position, Vector2::new(5.0, 0.0));
    }

    #[test]
    fn test_held_keys_steer_and_fire() {
        let mut scene = arena_scene();
        let player = scene
            .create_entity((
                Player::new(20.0),
                Position(Vector2::new(50.0, 40.0)),
                Velocity(Vector2::zeros()),
                Weapon::new(blaster()),
            ))
            .unwrap();
        scene.add_system(EventSystem::<InputEvent>::new(), INPUT_PRIORITY);
        scene.add_system(PlayerControlSystem, CONTROL_PRIORITY);
        scene.add_system(WeaponSystem, WEAPON_PRIORITY);

        let bus = scene.resource::<EventBus<InputEvent>>().unwrap();
        bus.borrow_mut().send(InputEvent::KeyDown(Key::Right));
        bus.borrow_mut().send(InputEvent::KeyDown(Key::Fire));
        scene.update(0.1).unwrap();

        let velocity = scene.get_component::<Velocity>(player).unwrap().borrow().0;
        assert_relative_eq!(velocity, Vector2::new(20.0, 0.0));
        assert_eq!(scene.component_count::<Bullet>(), 1);

        // 0.5s cooldown: nothing until it runs out
        scene.update(0.1).unwrap();
        assert_eq!(scene.component_count::<Bullet>(), 1);
        for _ in 0..5 {
            scene.update(0.1).unwrap();
        }
        assert_eq!(scene.component_count::<Bullet>(), 2);
    }

    #[test]
    fn test_detached_player_stops_listening() {
        let mut scene = arena_scene();
        let player = scene.create_entity((Player::new(1.0),)).unwrap();
        let bus = scene.resource::<EventBus<InputEvent>>().unwrap();
        assert_eq!(bus.borrow().listener_count(), 2);
        assert_eq!(
            scene.get_component::<Player>(player).unwrap().borrow().entity(),
            Some(player)
        );
        scene.del_entity(player).unwrap();
        assert_eq!(bus.borrow().listener_count(), 0);
    }

    #[test]
    fn test_bounds_clamp_bounce_and_expire() {
        let mut scene = arena_scene();
        let player = scene
            .create_entity((Player::new(1.0), Position(Vector2::new(-5.0, 90.0))))
            .unwrap();
        let rock = scene
            .create_entity((
                Rock { radius: 3.0, health: 10 },
                Position(Vector2::new(120.0, 10.0)),
                Velocity(Vector2::new(5.0, 1.0)),
            ))
            .unwrap();
        scene
            .create_entity((Bullet { damage: 1, ttl: 0.05 }, Position(Vector2::new(10.0, 10.0))))
            .unwrap();
        scene
            .create_entity((Bullet { damage: 1, ttl: 5.0 }, Position(Vector2::new(500.0, 10.0))))
            .unwrap();
        scene.add_system(BoundsSystem, BOUNDS_PRIORITY);
        scene.update(0.1).unwrap();

        let position = scene.get_component::<Position>(player).unwrap().borrow().0;
        assert_relative_eq!(position, Vector2::new(0.0, 80.0));
        let velocity = scene.get_component::<Velocity>(rock).unwrap().borrow().0;
        assert_relative_eq!(velocity, Vector2::new(-5.0, 1.0));
        assert_eq!(scene.component_count::<Bullet>(), 0);
    }

    #[test]
    fn test_bullets_destroy_rocks() {
        let mut scene = arena_scene();
        let rock = scene
            .create_entity((Rock { radius: 5.0, health: 3 }, Position(Vector2::new(20.0, 20.0))))
            .unwrap();
        for offset in [0.0, 2.0] {
            scene
                .create_entity((Bullet { damage: 2, ttl: 1.0 }, Position(Vector2::new(20.0 + offset, 20.0))))
                .unwrap();
        }
        scene.add_system(CollisionSystem, COLLISION_PRIORITY);
        scene.update(0.0).unwrap();
        assert!(!scene.contains_entity(rock));
        assert_eq!(scene.component_count::<Bullet>(), 0);
        scene.verify_integrity().unwrap();
    }

    #[test]
    fn test_camera_follows_player_within_arena() {
        let mut scene = arena_scene();
        let player = scene
            .create_entity((Player::new(1.0), Position(Vector2::new(50.0, 40.0))))
            .unwrap();
        scene.insert_resource(MainPlayer(player));
        scene.insert_resource(Camera {
            offset: Vector2::zeros(),
            viewport: Vector2::new(40.0, 20.0),
        });
        scene.add_system(CameraSystem, CAMERA_PRIORITY);

        scene.update(0.0).unwrap();
        let offset = scene.resource::<Camera>().unwrap().borrow().offset;
        assert_relative_eq!(offset, Vector2::new(30.0, 30.0));

        scene.get_component::<Position>(player).unwrap().borrow_mut().0 = Vector2::new(99.0, 1.0);
        scene.update(0.0).unwrap();
        let offset = scene.resource::<Camera>().unwrap().borrow().offset;
        assert_relative_eq!(offset, Vector2::new(60.0, 0.0));
    }
}
