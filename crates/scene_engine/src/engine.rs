//! Core engine implementation
//!
//! The engine owns the [`Scene`] and runs the frame loop: application
//! update, scene systems, application post-update, frame pacing.

use crate::{
    application::{AppError, Application},
    config::ConfigError,
    core::config::EngineConfig,
    ecs::{EcsError, Scene},
    foundation::time::{FrameLimiter, Timer},
};
use thiserror::Error;

/// Main engine struct
///
/// The engine coordinates the scene and manages the main loop.
pub struct Engine {
    /// Scene holding every entity, component and system
    scene: Scene,

    /// Frame timing
    timer: Timer,

    /// Frame rate cap
    limiter: FrameLimiter,

    /// Engine configuration
    config: EngineConfig,

    /// Whether the engine should continue running
    running: bool,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(ConfigError::Invalid)?;
        log::info!("Initializing engine...");
        Ok(Self {
            scene: Scene::new(),
            timer: Timer::new(),
            limiter: FrameLimiter::new(config.target_fps.unwrap_or(0)),
            config,
            running: false,
        })
    }

    /// Run the main loop with the given application until it quits
    ///
    /// `cleanup` runs even when a frame fails; the first error is returned.
    pub fn run<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::application("initialization", e))?;

        log::info!("Starting main loop...");
        self.running = true;
        self.timer.reset_clock();

        let mut outcome = Ok(());
        while self.running {
            if self.frame_limit_reached() {
                log::info!("Reached frame limit of {}", self.frame_count());
                break;
            }
            if let Err(err) = self.frame(app) {
                log::error!("Frame {} failed: {}", self.frame_count(), err);
                outcome = Err(err);
                break;
            }
        }
        self.running = false;

        app.cleanup(self);
        log::info!(
            "Engine shutdown complete after {} frames ({:.1} fps average)",
            self.frame_count(),
            self.timer.average_fps()
        );
        outcome
    }

    fn frame<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        let delta_time = self.tick();
        app.update(self, delta_time)
            .map_err(|e| EngineError::application("update", e))?;
        self.scene.update(delta_time)?;
        app.after_update(self, delta_time)
            .map_err(|e| EngineError::application("post-update", e))?;
        self.limiter.wait();
        Ok(())
    }

    /// Run one frame of the scene's systems without an application
    ///
    /// Returns the delta time the frame used.
    pub fn step(&mut self) -> Result<f32, EngineError> {
        let delta_time = self.tick();
        self.scene.update(delta_time)?;
        Ok(delta_time)
    }

    /// Advance the timer and return this frame's delta
    fn tick(&mut self) -> f32 {
        match self.config.fixed_delta {
            Some(step) => self.timer.advance(step),
            None => self.timer.update(),
        }
        let measured = self.timer.delta_time();
        if measured > self.config.max_delta {
            log::trace!("Clamping frame delta {:.3}s to {:.3}s", measured, self.config.max_delta);
        }
        measured.min(self.config.max_delta)
    }

    /// Whether the configured frame budget is used up
    pub fn frame_limit_reached(&self) -> bool {
        self.config
            .max_frames
            .is_some_and(|max_frames| self.timer.frame_count() >= max_frames)
    }

    /// Request engine shutdown at the end of the current frame
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the main loop is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Get the scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get mutable access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Number of frames run so far
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }

    /// Get the total simulated time in seconds
    pub fn total_time(&self) -> f32 {
        self.timer.total_time()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A scene system failed
    #[error("Scene error: {0}")]
    Scene(#[from] EcsError),

    /// The application failed
    #[error("Application error during {stage}: {source}")]
    Application {
        /// Lifecycle step that failed
        stage: &'static str,
        /// Error returned by the application
        #[source]
        source: Box<AppError>,
    },
}

impl EngineError {
    fn application(stage: &'static str, source: AppError) -> Self {
        Self::Application {
            stage,
            source: Box::new(source),
        }
    }
}
