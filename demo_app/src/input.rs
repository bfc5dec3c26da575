//! Keyboard-style input events and a scripted input source

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_engine::events::{Event, EventBus};

/// Keys the arena reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Fire,
}

impl Key {
    pub const ALL: [Self; 5] = [Self::Up, Self::Down, Self::Left, Self::Right, Self::Fire];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    KeyDown,
    KeyUp,
}

impl Event for InputEvent {
    type Kind = InputKind;

    fn kind(&self) -> InputKind {
        match self {
            Self::KeyDown(_) => InputKind::KeyDown,
            Self::KeyUp(_) => InputKind::KeyUp,
        }
    }
}

/// Presses and releases random keys, standing in for a keyboard
pub struct ScriptedInput {
    rng: StdRng,
    held: HashSet<Key>,
    /// Chance per frame that some key changes state
    change_chance: f64,
}

impl ScriptedInput {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            held: HashSet::new(),
            change_chance: 0.2,
        }
    }

    /// Queue this frame's key changes on the bus
    pub fn feed(&mut self, bus: &mut EventBus<InputEvent>) {
        if !self.rng.gen_bool(self.change_chance) {
            return;
        }
        let key = Key::ALL[self.rng.gen_range(0..Key::ALL.len())];
        let event = if self.held.remove(&key) {
            InputEvent::KeyUp(key)
        } else {
            self.held.insert(key);
            InputEvent::KeyDown(key)
        };
        log::trace!("Scripted input {:?}", event);
        bus.send(event);
    }
}
