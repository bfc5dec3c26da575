//! Arena components and scene resources

use std::collections::HashSet;
use std::sync::Arc;

use nalgebra::Vector2;
use scene_engine::ecs::{Component, EcsResult, Entity, Owner, Scene};
use scene_engine::events::{EventBus, ListenerKey};

use crate::input::{InputEvent, InputKind, Key};
use crate::weapons::WeaponStats;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vector2<f32>);
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vector2<f32>);
impl Component for Velocity {}

/// Player-controlled ship; steers from the keys currently held
#[derive(Debug)]
pub struct Player {
    pub speed: f32,
    held: HashSet<Key>,
    owner: Owner,
    listeners: Vec<ListenerKey>,
}

impl Player {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            held: HashSet::new(),
            owner: Owner::default(),
            listeners: Vec::new(),
        }
    }

    fn on_input(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::KeyDown(key) => self.held.insert(key),
            InputEvent::KeyUp(key) => self.held.remove(&key),
        };
        false
    }

    /// Unit direction from the held arrow keys, zero when idle
    pub fn heading(&self) -> Vector2<f32> {
        let axis = |negative: Key, positive: Key| {
            f32::from(u8::from(self.held.contains(&positive))) - f32::from(u8::from(self.held.contains(&negative)))
        };
        let direction = Vector2::new(axis(Key::Left, Key::Right), axis(Key::Up, Key::Down));
        direction.try_normalize(f32::EPSILON).unwrap_or_else(Vector2::zeros)
    }

    pub fn is_firing(&self) -> bool {
        self.held.contains(&Key::Fire)
    }

    pub fn entity(&self) -> Option<Entity> {
        self.owner.entity()
    }
}

impl Component for Player {
    fn on_attach(&mut self, scene: &Scene, entity: Entity) -> EcsResult<()> {
        self.owner.bind(scene, entity);
        let this = scene.get_component::<Self>(entity)?;
        let bus = scene.resource::<EventBus<InputEvent>>()?;
        let mut bus = bus.borrow_mut();
        for kind in [InputKind::KeyDown, InputKind::KeyUp] {
            self.listeners.push(bus.listen(kind, &this, Self::on_input));
        }
        Ok(())
    }

    fn on_detach(&mut self, scene: &Scene, _entity: Entity) {
        if let Some(bus) = scene.try_resource::<EventBus<InputEvent>>() {
            let mut bus = bus.borrow_mut();
            for key in self.listeners.drain(..) {
                bus.unlisten(key);
            }
        }
        self.owner.clear();
    }
}

/// A weapon; stats are shared with every weapon of the same kind
#[derive(Debug)]
pub struct Weapon {
    stats: Arc<WeaponStats>,
    cooldown: f32,
}

impl Weapon {
    pub fn new(stats: Arc<WeaponStats>) -> Self {
        Self { stats, cooldown: 0.0 }
    }

    pub fn name(&self) -> &str {
        &self.stats.name
    }

    pub fn damage(&self) -> u32 {
        self.stats.damage
    }

    pub fn bullet_speed(&self) -> f32 {
        self.stats.bullet_speed
    }

    pub fn bullet_ttl(&self) -> f32 {
        self.stats.bullet_ttl
    }

    /// Count down the cooldown; `true` when a shot is released
    pub fn tick(&mut self, delta_time: f32, trigger: bool) -> bool {
        self.cooldown = (self.cooldown - delta_time).max(0.0);
        if trigger && self.cooldown <= 0.0 {
            self.cooldown = 1.0 / self.stats.fire_rate;
            true
        } else {
            false
        }
    }
}

impl Component for Weapon {}

#[derive(Debug, Clone, Copy)]
pub struct Bullet {
    pub damage: u32,
    /// Seconds left before the bullet fizzles
    pub ttl: f32,
}
impl Component for Bullet {}

/// Drifting obstacle, destroyed once its health runs out
#[derive(Debug, Clone, Copy)]
pub struct Rock {
    pub radius: f32,
    pub health: i32,
}
impl Component for Rock {}

/// Playfield size, in pixels
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    pub size: Vector2<f32>,
}

impl Arena {
    pub fn contains(&self, point: &Vector2<f32>) -> bool {
        (0.0..=self.size.x).contains(&point.x) && (0.0..=self.size.y).contains(&point.y)
    }

    pub fn clamp(&self, point: Vector2<f32>) -> Vector2<f32> {
        Vector2::new(point.x.clamp(0.0, self.size.x), point.y.clamp(0.0, self.size.y))
    }
}

/// The entity the camera follows
#[derive(Debug, Clone, Copy)]
pub struct MainPlayer(pub Entity);

/// Top-left corner of the visible window into the arena
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub offset: Vector2<f32>,
    pub viewport: Vector2<f32>,
}
