//! 引擎主入口
//!
//! 定义Engine结构和无头帧循环

use crate::config::{EmitterPreset, EngineConfig, LoggingConfig};
use crate::core::scheduler::{ScheduleHandle, Scheduler};
use crate::render::particles::{
    EmitterId, EmitterType, ParticleEmitter, ParticleGenerator, ParticleSystemManager,
};
use crate::render::ParticleRenderer;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use super::error::{EngineResult, ParticleError};

/// 引擎运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStats {
    /// 已执行帧数
    pub frame: u64,
    /// 累计模拟时间（秒）
    pub elapsed: f64,
    /// 发射器数量
    pub emitters: usize,
    /// 存活粒子总数
    pub alive_particles: usize,
    /// 待执行的延迟调用
    pub pending_calls: usize,
}

/// 引擎主结构
///
/// `Engine` 持有粒子系统、调度器和发射器工厂，负责：
/// - 按配置创建预设发射器
/// - 每帧先推进所有发射器，再推进调度器
/// - 汇总运行统计
///
/// # 示例
///
/// ```
/// use spark_engine::config::EngineConfig;
/// use spark_engine::core::Engine;
///
/// let mut config = EngineConfig::default();
/// config.particles.seed = Some(1);
///
/// let mut engine = Engine::new(&config).unwrap();
/// engine.spawn_presets(&config.emitters).unwrap();
/// engine.run_fixed(10, config.simulation.fixed_delta).unwrap();
/// assert_eq!(engine.frame(), 10);
/// ```
///
/// # 帧顺序
///
/// 1. **发射器阶段**：推进存活粒子，回收过期粒子，生成新粒子
/// 2. **调度阶段**：扣减倒计时，执行到期调用
#[derive(Debug)]
pub struct Engine {
    particles: ParticleSystemManager,
    scheduler: Scheduler,
    generator: ParticleGenerator,
    frame: u64,
    elapsed: f64,
}

impl Engine {
    /// 按配置创建引擎
    ///
    /// # 错误
    ///
    /// 配置验证失败或工厂默认设置无效时返回错误。
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let generator = ParticleGenerator::new(config.particles)?;

        tracing::debug!(
            target: "engine",
            "Engine created (max_emitters = {}, seed = {:?})",
            config.simulation.max_emitters,
            config.particles.seed
        );

        Ok(Self {
            particles: ParticleSystemManager::new(config.simulation.max_emitters),
            scheduler: Scheduler::new(),
            generator,
            frame: 0,
            elapsed: 0.0,
        })
    }

    /// 初始化日志系统
    ///
    /// 配置tracing日志框架。`RUST_LOG`环境变量存在时优先，
    /// 否则使用配置中的日志级别。重复调用是安全的。
    pub fn init_logging(config: &LoggingConfig) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .with_ansi(config.ansi)
            .try_init();
        tracing::info!(target: "engine", "Engine starting");
    }

    /// 创建配置中的预设发射器
    pub fn spawn_presets(&mut self, presets: &[EmitterPreset]) -> EngineResult<Vec<EmitterId>> {
        let mut ids = Vec::with_capacity(presets.len());
        for preset in presets {
            let emitter_type = Arc::new(EmitterType::try_from(preset.shape)?);
            let mut builder = self
                .generator
                .builder(emitter_type)
                .origin(preset.origin);
            if let Some(capacity) = preset.capacity {
                builder = builder.capacity(capacity);
            }
            if let Some(emission) = preset.emission {
                builder = builder.emission(emission);
            }

            let id = self.particles.add(builder.build()?)?;
            tracing::info!(target: "engine", "Spawned preset '{}' as {}", preset.name, id);
            ids.push(id);
        }
        Ok(ids)
    }

    /// 注册发射器
    pub fn add_emitter(&mut self, emitter: ParticleEmitter) -> EngineResult<EmitterId> {
        Ok(self.particles.add(emitter)?)
    }

    /// 延迟对发射器执行操作
    ///
    /// 发射器在到期前被移除时，该操作被跳过。
    ///
    /// # 错误
    ///
    /// 发射器不存在时返回 `ParticleError::UnknownEmitter`，延迟无效时返回调度错误。
    pub fn schedule_emitter<F>(
        &mut self,
        id: EmitterId,
        delay: f64,
        op: F,
    ) -> EngineResult<ScheduleHandle>
    where
        F: FnOnce(&mut ParticleEmitter) + 'static,
    {
        let emitter = self
            .particles
            .get(id)
            .ok_or(ParticleError::UnknownEmitter(id))?;
        Ok(self.scheduler.schedule_for(&emitter, delay, op)?)
    }

    /// 推进一帧
    ///
    /// 先推进所有发射器，再推进调度器；调度错误在发射器阶段完成后返回。
    /// 负值或非有限的 `delta_time` 按 0 处理。
    pub fn update(&mut self, delta_time: f32) -> EngineResult<()> {
        let delta_time = if delta_time.is_finite() && delta_time > 0.0 {
            delta_time
        } else {
            0.0
        };
        let _span = tracing::trace_span!(target: "engine", "update", frame = self.frame).entered();

        self.particles.tick_all(delta_time)?;
        self.frame += 1;
        self.elapsed += delta_time as f64;

        let fired = self.scheduler.tick(delta_time as f64)?;
        tracing::trace!(
            target: "engine",
            "Frame {} done: {} particles alive, {} call(s) fired",
            self.frame,
            self.particles.total_alive(),
            fired
        );
        Ok(())
    }

    /// 以固定步长运行指定帧数
    pub fn run_fixed(&mut self, frames: u64, delta_time: f32) -> EngineResult<()> {
        for _ in 0..frames {
            self.update(delta_time)?;
        }
        tracing::info!(
            target: "engine",
            "Ran {} frame(s), {:.3}s simulated",
            frames,
            frames as f64 * delta_time as f64
        );
        Ok(())
    }

    /// 把所有存活粒子交给渲染器
    pub fn render<R: ParticleRenderer + ?Sized>(&self, renderer: &mut R) {
        self.particles.render(renderer);
    }

    pub fn particles(&self) -> &ParticleSystemManager {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSystemManager {
        &mut self.particles
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn generator_mut(&mut self) -> &mut ParticleGenerator {
        &mut self.generator
    }

    /// 已执行帧数
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 累计模拟时间（秒）
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            frame: self.frame,
            elapsed: self.elapsed,
            emitters: self.particles.emitter_count(),
            alive_particles: self.particles.total_alive(),
            pending_calls: self.scheduler.pending_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{EngineError, ScheduleError};
    use crate::render::InstanceCollector;
    use glam::Vec2;

    fn seeded_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.particles.seed = Some(11);
        config
    }

    #[test]
    fn test_spawn_presets() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        let ids = engine.spawn_presets(&config.emitters).unwrap();

        assert_eq!(ids.len(), config.emitters.len());
        assert_eq!(engine.particles().emitter_count(), ids.len());
    }

    #[test]
    fn test_update_advances_time() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        engine.spawn_presets(&config.emitters).unwrap();

        engine.run_fixed(4, 0.25).unwrap();
        let stats = engine.stats();
        assert_eq!(stats.frame, 4);
        assert!((stats.elapsed - 1.0).abs() < 1e-9);
        assert!(stats.alive_particles > 0);
    }

    #[test]
    fn test_scheduled_emitter_shutdown() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        let emitter = engine
            .generator_mut()
            .create_cone_emitter(Vec2::ZERO, Vec2::Y, 0.3)
            .unwrap();
        let id = engine.add_emitter(emitter).unwrap();

        engine
            .schedule_emitter(id, 0.5, |emitter| emitter.set_enabled(false))
            .unwrap();

        engine.run_fixed(2, 0.2).unwrap();
        assert!(engine.particles().get(id).unwrap().borrow().is_enabled());

        engine.update(0.2).unwrap();
        assert!(!engine.particles().get(id).unwrap().borrow().is_enabled());
        assert_eq!(engine.scheduler().pending_count(), 0);
    }

    #[test]
    fn test_schedule_unknown_emitter() {
        let mut engine = Engine::new(&seeded_config()).unwrap();
        let mut other = ParticleSystemManager::new(1);
        let stray = other
            .add(
                engine
                    .generator_mut()
                    .create_ring_emitter(Vec2::ZERO, Vec2::X, 1.0)
                    .unwrap(),
            )
            .unwrap();

        let result = engine.schedule_emitter(stray, 0.1, |_| {});
        assert!(matches!(
            result,
            Err(EngineError::Particle(ParticleError::UnknownEmitter(_)))
        ));
    }

    #[test]
    fn test_removed_emitter_skips_scheduled_call() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        let ids = engine.spawn_presets(&config.emitters).unwrap();

        engine
            .schedule_emitter(ids[0], 0.1, |emitter| emitter.set_enabled(false))
            .unwrap();
        assert!(engine.particles_mut().remove(ids[0]));

        engine.update(0.2).unwrap();
        assert_eq!(engine.scheduler().pending_count(), 0);
    }

    #[test]
    fn test_binding_error_surfaces_from_update() {
        let mut engine = Engine::new(&seeded_config()).unwrap();
        engine
            .scheduler_mut()
            .schedule_named("missing_op", Vec::new(), 0.0)
            .unwrap();

        let result = engine.update(0.016);
        assert!(matches!(
            result,
            Err(EngineError::Schedule(ScheduleError::UnknownOperation(_)))
        ));
        // 帧计数在调度阶段之前已推进
        assert_eq!(engine.frame(), 1);
    }

    #[test]
    fn test_invalid_delta_counts_as_zero() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        engine.spawn_presets(&config.emitters).unwrap();

        engine.update(-1.0).unwrap();
        engine.update(f32::NAN).unwrap();
        assert_eq!(engine.frame(), 2);
        assert_eq!(engine.elapsed(), 0.0);

        engine.update(0.5).unwrap();
        assert!((engine.elapsed() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stats_with_borrowed_emitter() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        let ids = engine.spawn_presets(&config.emitters).unwrap();
        engine.update(0.016).unwrap();
        let total = engine.particles().try_total_alive().unwrap();

        let shared = engine.particles().get(ids[0]).unwrap();
        let held = shared.borrow_mut();
        let stats = engine.stats();
        assert_eq!(stats.emitters, 2);
        assert_eq!(stats.alive_particles, total - held.alive_count());
        drop(held);

        assert_eq!(engine.stats().alive_particles, total);
    }

    #[test]
    fn test_render() {
        let config = seeded_config();
        let mut engine = Engine::new(&config).unwrap();
        engine.spawn_presets(&config.emitters).unwrap();
        engine.update(0.016).unwrap();

        let mut collector = InstanceCollector::new();
        engine.render(&mut collector);
        assert_eq!(collector.instances().len(), engine.stats().alive_particles);
    }
}
