//! CPU 粒子系统模块
//!
//! 单线程、按帧推进的粒子发射与回收。
//!
//! ## 架构设计
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  CPU Particle System                     │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. EmitterType                                          │
//! │     - Cone：扇形内随机方向，原点生成                       │
//! │     - Ring：固定方向，圆周上随机位置生成                   │
//! │                                                          │
//! │  2. ParticleEmitter                                      │
//! │     - 固定容量粒子池 + 空闲索引列表                        │
//! │     - 推进存活粒子，回收过期粒子                           │
//! │     - 按速率生成，饱和时按策略丢弃或覆盖                   │
//! │                                                          │
//! │  3. ParticleSystemManager                                │
//! │     - 统一 tick 与渲染遍历                                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 使用示例
//!
//! ```
//! use glam::Vec2;
//! use spark_engine::render::particles::{GeneratorConfig, ParticleGenerator};
//!
//! let mut generator = ParticleGenerator::new(GeneratorConfig {
//!     seed: Some(7),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let mut emitter = generator
//!     .create_cone_emitter(Vec2::ZERO, Vec2::Y, 0.6)
//!     .unwrap();
//! emitter.tick(1.0 / 60.0);
//! assert!(emitter.alive_count() > 0);
//! ```

pub mod emitter;
pub mod emitter_type;
pub mod generator;
pub mod particle;
pub mod system;


pub use emitter::{
    Emission, EmitterParticleState, EmitterSettings, EmitterStats, ParticleEmitter,
    SaturationPolicy, ValueRange,
};
pub use emitter_type::{ConeEmitter, EmitterKind, EmitterShape, EmitterType, RingEmitter};
pub use generator::{EmitterBuilder, GeneratorConfig, ParticleGenerator};
pub use particle::{Particle, ParticleSpawn};
pub use system::{EmitterId, ParticleSystemManager, SharedEmitter};
