//! 粒子发射器工厂
//!
//! 显式构造、由持有发射器的一方传递使用，不依赖全局状态。

use crate::core::error::{ParticleError, ParticleResult};
use crate::render::particles::emitter::{
    Emission, EmitterParticleState, EmitterSettings, ParticleEmitter, SaturationPolicy,
};
use crate::render::particles::emitter_type::{EmitterShape, EmitterType};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 工厂配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 新建发射器的默认设置
    pub defaults: EmitterSettings,
    /// 随机种子；为空时从系统熵源取种子
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn validate(&self) -> ParticleResult<()> {
        self.defaults.validate()
    }
}

/// 粒子发射器工厂
#[derive(Debug)]
pub struct ParticleGenerator {
    defaults: EmitterSettings,
    rng: StdRng,
}

impl ParticleGenerator {
    /// 创建工厂
    ///
    /// # 错误
    ///
    /// 默认设置无效时返回 `ParticleError`。
    pub fn new(config: GeneratorConfig) -> ParticleResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            defaults: config.defaults,
            rng,
        })
    }

    pub fn defaults(&self) -> &EmitterSettings {
        &self.defaults
    }

    /// 按默认设置创建发射器
    pub fn create_emitter(
        &mut self,
        emitter_type: Arc<EmitterType>,
        origin: Vec2,
    ) -> ParticleResult<ParticleEmitter> {
        self.builder(emitter_type).origin(origin).build()
    }

    /// 创建圆锥发射器
    pub fn create_cone_emitter(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        spread: f32,
    ) -> ParticleResult<ParticleEmitter> {
        let emitter_type = Arc::new(EmitterType::cone(direction, spread)?);
        self.create_emitter(emitter_type, origin)
    }

    /// 创建圆环发射器
    pub fn create_ring_emitter(
        &mut self,
        origin: Vec2,
        direction: Vec2,
        radius: f32,
    ) -> ParticleResult<ParticleEmitter> {
        let emitter_type = Arc::new(EmitterType::ring(direction, radius)?);
        self.create_emitter(emitter_type, origin)
    }

    /// 从形状描述创建发射器
    pub fn create_from_shape(
        &mut self,
        shape: &EmitterShape,
        origin: Vec2,
    ) -> ParticleResult<ParticleEmitter> {
        let emitter_type = Arc::new(EmitterType::try_from(*shape)?);
        self.create_emitter(emitter_type, origin)
    }

    /// 以默认设置为起点，逐项覆盖后再创建
    pub fn builder(&mut self, emitter_type: Arc<EmitterType>) -> EmitterBuilder<'_> {
        EmitterBuilder {
            settings: self.defaults,
            origin: Vec2::ZERO,
            emitter_type,
            generator: self,
        }
    }

    fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}

/// 发射器构建器
pub struct EmitterBuilder<'a> {
    generator: &'a mut ParticleGenerator,
    emitter_type: Arc<EmitterType>,
    origin: Vec2,
    settings: EmitterSettings,
}

impl EmitterBuilder<'_> {
    pub fn origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// 设置粒子池容量
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.settings.capacity = capacity;
        self
    }

    /// 设置发射速率
    pub fn emission(mut self, emission: Emission) -> Self {
        self.settings.emission = emission;
        self
    }

    /// 设置每次 tick 的发射数量
    pub fn particles_per_update(self, count: u32) -> Self {
        self.emission(Emission::PerTick(count))
    }

    /// 设置生成模板
    pub fn particle_state(mut self, state: EmitterParticleState) -> Self {
        self.settings.particle_state = state;
        self
    }

    /// 设置饱和策略
    pub fn saturation(mut self, saturation: SaturationPolicy) -> Self {
        self.settings.saturation = saturation;
        self
    }

    pub fn build(self) -> ParticleResult<ParticleEmitter> {
        let seed = self.generator.next_seed();
        ParticleEmitter::new(self.emitter_type, self.origin, self.settings, seed)
    }
}

impl TryFrom<GeneratorConfig> for ParticleGenerator {
    type Error = ParticleError;

    fn try_from(config: GeneratorConfig) -> ParticleResult<Self> {
        Self::new(config)
    }
}
