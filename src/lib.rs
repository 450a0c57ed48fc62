//! # Spark Engine
//!
//! Particle emission and frame-tick scheduling core for 2D games.
//!
//! ## Features
//!
//! - **Particle Emitters**: Fixed-capacity particle pools with cone and ring emission shapes
//! - **Emitter Factory**: Seeded, explicitly passed factory for reproducible emitters
//! - **Tick Scheduler**: Deferred one-shot calls driven by the frame loop
//! - **Named Operations**: Late-bound calls resolved when they fire
//! - **Configuration**: TOML/JSON configuration with environment overrides
//!
//! ## Architecture Design
//!
//! Everything runs on the thread that owns the frame loop:
//! - **Emitters** advance live particles, recycle expired ones and spawn new ones
//! - **Scheduler** counts down pending calls after the emitters have ticked
//! - **Renderer** is an external consumer of the live particle set
//!
//! ### Example
//!
//! ```
//! use spark_engine::config::EngineConfig;
//! use spark_engine::core::Engine;
//!
//! let config = EngineConfig::default();
//! let mut engine = Engine::new(&config).unwrap();
//! let ids = engine.spawn_presets(&config.emitters).unwrap();
//!
//! engine
//!     .schedule_emitter(ids[0], 1.0, |emitter| emitter.set_enabled(false))
//!     .unwrap();
//! engine.run_fixed(120, 1.0 / 60.0).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Engine loop, scheduler and error types
//! - [`render`]: Particle system and renderer contract
//! - [`config`]: Configuration system

/// Core engine functionality including the frame loop and scheduler
pub mod core;
/// Particle system and rendering contract
pub mod render;
/// Configuration system
pub mod config;
