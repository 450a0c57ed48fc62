//! 粒子发射器
//!
//! 发射器持有固定容量的粒子池（预分配槽位 + 空闲索引列表），每帧推进存活粒子、
//! 回收过期粒子，并按发射速率生成新粒子。容量在构造后不会改变。
//!
//! 粒子池饱和时的行为由 `SaturationPolicy` 决定，默认丢弃新生成请求。

use crate::core::error::{ParticleError, ParticleResult};
use crate::impl_default;
use crate::render::particles::emitter_type::EmitterType;
use crate::render::particles::particle::{Particle, ParticleSpawn};
use crate::render::ParticleInstance;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// 生成参数
// ============================================================================

/// 均匀采样区间 `[min, max)`
///
/// `min == max` 时固定返回 `min`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// 固定值区间
    pub const fn fixed(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// 采样
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }

    /// 验证区间有限、`min <= max` 且宽度不溢出
    pub fn validate(&self, field: &'static str) -> ParticleResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ParticleError::NonFinite { field });
        }
        if self.min > self.max || !(self.max - self.min).is_finite() {
            return Err(ParticleError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// 发射器的粒子生成模板
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterParticleState {
    /// 生命周期范围（秒）
    pub lifespan: ValueRange,
    /// 初始速度范围
    pub velocity: ValueRange,
    /// 每帧速度倍率范围
    pub acceleration: ValueRange,
    /// 初始缩放范围
    pub scale: ValueRange,
    /// 初始旋转范围（弧度）
    pub rotation: ValueRange,
    /// 初始不透明度范围
    pub opacity: ValueRange,
    /// 每帧不透明度倍率范围
    pub opacity_fade_rate: ValueRange,
    /// 每帧叠加到方向上的重力
    pub gravity: Vec2,
}

impl_default!(EmitterParticleState {
    lifespan: ValueRange::new(1.0, 3.0),
    velocity: ValueRange::new(1.0, 2.0),
    acceleration: ValueRange::fixed(1.0),
    scale: ValueRange::new(0.1, 0.3),
    rotation: ValueRange::new(0.0, TAU),
    opacity: ValueRange::fixed(1.0),
    opacity_fade_rate: ValueRange::fixed(0.98),
    gravity: Vec2::new(0.0, -0.01),
});

impl EmitterParticleState {
    /// 固定寿命，其余参数取默认值
    pub fn with_fixed_lifespan(lifespan: f32) -> Self {
        Self {
            lifespan: ValueRange::fixed(lifespan),
            ..Default::default()
        }
    }

    /// 验证所有区间，并要求最小寿命为正
    pub fn validate(&self) -> ParticleResult<()> {
        self.lifespan.validate("lifespan")?;
        self.velocity.validate("velocity")?;
        self.acceleration.validate("acceleration")?;
        self.scale.validate("scale")?;
        self.rotation.validate("rotation")?;
        self.opacity.validate("opacity")?;
        self.opacity_fade_rate.validate("opacity_fade_rate")?;
        if !self.gravity.is_finite() {
            return Err(ParticleError::NonFinite { field: "gravity" });
        }
        if self.lifespan.min <= 0.0 {
            return Err(ParticleError::NonPositiveLifespan(self.lifespan.min));
        }
        Ok(())
    }

    /// 按模板采样一次生成参数
    pub fn sample_spawn<R: Rng + ?Sized>(
        &self,
        position: Vec2,
        direction: Vec2,
        rng: &mut R,
    ) -> ParticleSpawn {
        ParticleSpawn {
            lifespan: self.lifespan.sample(rng),
            position,
            direction,
            gravity: self.gravity,
            velocity: self.velocity.sample(rng),
            acceleration: self.acceleration.sample(rng),
            scale: self.scale.sample(rng),
            rotation: self.rotation.sample(rng),
            opacity: self.opacity.sample(rng),
            opacity_fade_rate: self.opacity_fade_rate.sample(rng),
        }
    }
}

/// 发射速率
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emission {
    /// 每次 tick 固定生成数量
    PerTick(u32),
    /// 每秒生成数量，跨帧累积小数部分
    PerSecond(f32),
}

impl Default for Emission {
    fn default() -> Self {
        Self::PerTick(1)
    }
}

impl Emission {
    pub fn validate(&self) -> ParticleResult<()> {
        match *self {
            Self::PerTick(_) => Ok(()),
            Self::PerSecond(rate) if rate.is_finite() && rate >= 0.0 => Ok(()),
            Self::PerSecond(rate) => Err(ParticleError::InvalidEmissionRate(rate)),
        }
    }
}

/// 粒子池饱和策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationPolicy {
    /// 丢弃新的生成请求
    #[default]
    DropNew,
    /// 覆盖最早生成的存活粒子
    EvictOldest,
}

/// 发射器设置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterSettings {
    /// 粒子池容量
    pub capacity: usize,
    /// 发射速率
    pub emission: Emission,
    /// 粒子生成模板
    pub particle_state: EmitterParticleState,
    /// 饱和策略
    pub saturation: SaturationPolicy,
}

impl_default!(EmitterSettings {
    capacity: 1024,
    emission: Emission::PerTick(8),
    particle_state: EmitterParticleState::default(),
    saturation: SaturationPolicy::DropNew,
});

impl EmitterSettings {
    pub fn validate(&self) -> ParticleResult<()> {
        if self.capacity == 0 {
            return Err(ParticleError::ZeroCapacity);
        }
        self.emission.validate()?;
        self.particle_state.validate()
    }
}

/// 发射器统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitterStats {
    /// 当前存活粒子数
    pub alive_count: usize,
    /// 总发射数
    pub total_emitted: u64,
    /// 本帧发射数
    pub frame_emitted: u32,
    /// 因粒子池饱和被丢弃的生成请求
    pub dropped: u64,
    /// 被覆盖的存活粒子
    pub evicted: u64,
}

// ============================================================================
// 粒子发射器
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    particle: Particle,
    /// 生成序号，越小越早
    serial: u64,
}

/// 粒子发射器
pub struct ParticleEmitter {
    slots: Vec<Slot>,
    free: Vec<usize>,
    emitter_type: Arc<EmitterType>,
    settings: EmitterSettings,
    origin: Vec2,
    enabled: bool,
    emission_accumulator: f32,
    elapsed_time: f32,
    next_serial: u64,
    rng: StdRng,
    stats: EmitterStats,
}

impl fmt::Debug for ParticleEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticleEmitter")
            .field("emitter_type", &self.emitter_type)
            .field("capacity", &self.slots.len())
            .field("origin", &self.origin)
            .field("enabled", &self.enabled)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl ParticleEmitter {
    /// 创建发射器
    ///
    /// # 参数
    ///
    /// * `emitter_type` - 共享的发射类型
    /// * `origin` - 发射原点
    /// * `settings` - 容量、速率、模板与饱和策略
    /// * `seed` - 随机数种子
    ///
    /// # 错误
    ///
    /// 设置无效时返回 `ParticleError`。
    pub fn new(
        emitter_type: Arc<EmitterType>,
        origin: Vec2,
        settings: EmitterSettings,
        seed: u64,
    ) -> ParticleResult<Self> {
        settings.validate()?;
        if !origin.is_finite() {
            return Err(ParticleError::NonFinite { field: "origin" });
        }

        let capacity = settings.capacity;
        tracing::debug!(
            target: "particles",
            "Creating {} emitter with {} slots",
            emitter_type,
            capacity
        );

        Ok(Self {
            slots: vec![Slot::default(); capacity],
            free: (0..capacity).rev().collect(),
            emitter_type,
            settings,
            origin,
            enabled: true,
            emission_accumulator: 0.0,
            elapsed_time: 0.0,
            next_serial: 0,
            rng: StdRng::seed_from_u64(seed),
            stats: EmitterStats::default(),
        })
    }

    /// 推进一帧
    ///
    /// 先推进所有存活粒子并回收过期粒子，再按发射速率生成新粒子。
    /// 负值或非有限的 `delta_time` 按 0 处理。
    pub fn tick(&mut self, delta_time: f32) {
        let delta_time = if delta_time.is_finite() && delta_time > 0.0 {
            delta_time
        } else {
            0.0
        };
        self.elapsed_time += delta_time;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.particle.is_alive() && !slot.particle.advance(delta_time) {
                self.free.push(index);
            }
        }

        let count = self.particles_to_emit(delta_time);
        self.stats.frame_emitted = self.emit(count);
        self.stats.alive_count = self.alive_count();

        tracing::trace!(
            target: "particles",
            "Emitter tick: {} emitted, {} alive",
            self.stats.frame_emitted,
            self.stats.alive_count
        );
    }

    /// 立即生成指定数量的粒子，不受发射速率和启用状态影响
    ///
    /// 返回实际生成的数量。
    pub fn burst(&mut self, count: u32) -> u32 {
        let emitted = self.emit(count);
        self.stats.frame_emitted += emitted;
        self.stats.alive_count = self.alive_count();
        emitted
    }

    /// 计算本帧应发射的粒子数
    fn particles_to_emit(&mut self, delta_time: f32) -> u32 {
        if !self.enabled {
            return 0;
        }

        match self.settings.emission {
            Emission::PerTick(count) => count,
            Emission::PerSecond(rate) => {
                self.emission_accumulator += rate * delta_time;
                let count = self.emission_accumulator.floor();
                self.emission_accumulator -= count;
                count as u32
            }
        }
    }

    fn emit(&mut self, count: u32) -> u32 {
        // 单帧生成数不超过容量，超出部分视为丢弃
        let capacity = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        if count > capacity {
            let excess = count - capacity;
            self.stats.dropped += u64::from(excess);
            tracing::warn!(
                target: "particles",
                "Spawn request of {} exceeds capacity {}, dropped {}",
                count,
                capacity,
                excess
            );
        }
        let count = count.min(capacity);

        let mut emitted = 0;
        for attempt in 0..count {
            let index = match self.free.pop() {
                Some(index) => index,
                None => match self.settings.saturation {
                    SaturationPolicy::DropNew => {
                        let dropped = count - attempt;
                        self.stats.dropped += u64::from(dropped);
                        tracing::warn!(
                            target: "particles",
                            "Particle pool saturated, dropped {} spawn(s)",
                            dropped
                        );
                        break;
                    }
                    SaturationPolicy::EvictOldest => match self.oldest_slot() {
                        Some(index) => {
                            self.stats.evicted += 1;
                            index
                        }
                        None => break,
                    },
                },
            };
            self.spawn_into(index);
            emitted += 1;
        }
        emitted
    }

    fn spawn_into(&mut self, index: usize) {
        let direction = self.emitter_type.direction(&mut self.rng);
        let position = self.emitter_type.position(self.origin, &mut self.rng);
        let spawn = self
            .settings
            .particle_state
            .sample_spawn(position, direction, &mut self.rng);

        let slot = &mut self.slots[index];
        slot.particle.activate(spawn);
        slot.serial = self.next_serial;
        self.next_serial += 1;
        self.stats.total_emitted += 1;
    }

    fn oldest_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.particle.is_alive())
            .min_by_key(|(_, slot)| slot.serial)
            .map(|(index, _)| index)
    }

    /// 遍历当前存活的粒子
    pub fn particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.slots
            .iter()
            .map(|slot| &slot.particle)
            .filter(|particle| particle.is_alive())
    }

    /// 写出存活粒子的渲染实例数据
    ///
    /// 不清空 `out`，便于多个发射器写入同一批次。
    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) {
        out.extend(self.particles().map(ParticleInstance::from));
    }

    pub fn alive_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// 移动发射原点（例如跟随所属游戏对象）
    pub fn set_origin(&mut self, origin: Vec2) {
        self.origin = origin;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 停止或恢复按速率发射；已有粒子继续推进
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn emitter_type(&self) -> &Arc<EmitterType> {
        &self.emitter_type
    }

    pub fn emission(&self) -> Emission {
        self.settings.emission
    }

    /// 设置发射速率
    pub fn set_emission(&mut self, emission: Emission) -> ParticleResult<()> {
        emission.validate()?;
        self.settings.emission = emission;
        self.emission_accumulator = 0.0;
        Ok(())
    }

    pub fn particle_state(&self) -> &EmitterParticleState {
        &self.settings.particle_state
    }

    /// 替换生成模板，只影响之后生成的粒子
    pub fn set_particle_state(&mut self, state: EmitterParticleState) -> ParticleResult<()> {
        state.validate()?;
        self.settings.particle_state = state;
        Ok(())
    }

    pub fn saturation(&self) -> SaturationPolicy {
        self.settings.saturation
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn stats(&self) -> EmitterStats {
        self.stats
    }

    /// 重置发射器：清空所有粒子与累积器
    pub fn reset(&mut self) {
        let capacity = self.slots.len();
        self.slots.iter_mut().for_each(|slot| *slot = Slot::default());
        self.free.clear();
        self.free.extend((0..capacity).rev());
        self.emission_accumulator = 0.0;
        self.elapsed_time = 0.0;
        self.stats.alive_count = 0;
        self.stats.frame_emitted = 0;
    }
}

// ============================================================================
// 测试
// ============================================================================
