//! 渲染接口
//!
//! 引擎本身不绘制任何东西：外部渲染器实现 `ParticleRenderer`，
//! 或者通过 `ParticleInstance` 批量上传实例数据。

pub mod particles;

use crate::impl_default_and_new;
use bytemuck::{Pod, Zeroable};
use particles::{EmitterId, Particle, ParticleEmitter};

// Re-export CPU Particle System components
pub use particles::{
    EmitterShape, EmitterType, GeneratorConfig, ParticleGenerator, ParticleSystemManager,
};

/// 粒子渲染回调
///
/// `ParticleSystemManager::render` 对每个发射器先调用一次 `begin_emitter`，
/// 再对它的每个存活粒子调用 `draw`。
pub trait ParticleRenderer {
    /// 开始绘制一个发射器的粒子（可用于切换材质或批次）
    fn begin_emitter(&mut self, _id: EmitterId, _emitter: &ParticleEmitter) {}

    /// 绘制单个粒子
    fn draw(&mut self, id: EmitterId, particle: &Particle);
}

/// 粒子实例数据（对应渲染端的实例顶点布局）
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    /// 位置
    pub position: [f32; 2],
    /// 缩放
    pub scale: f32,
    /// 旋转
    pub rotation: f32,
    /// 不透明度
    pub opacity: f32,
    /// 归一化年龄（0-1）
    pub age: f32,
}

impl From<&Particle> for ParticleInstance {
    fn from(particle: &Particle) -> Self {
        Self {
            position: particle.position().to_array(),
            scale: particle.scale(),
            rotation: particle.rotation(),
            opacity: particle.opacity(),
            age: particle.normalized_age(),
        }
    }
}

/// 收集实例数据的渲染器
///
/// 适合每帧把全部粒子一次性上传到 GPU 缓冲区。
#[derive(Debug)]
pub struct InstanceCollector {
    instances: Vec<ParticleInstance>,
}

impl_default_and_new!(InstanceCollector {
    instances: Vec::new(),
});

impl InstanceCollector {
    /// 清空上一帧数据，保留容量
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn instances(&self) -> &[ParticleInstance] {
        &self.instances
    }

    /// 原始字节，可直接写入顶点缓冲区
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

impl ParticleRenderer for InstanceCollector {
    fn begin_emitter(&mut self, _id: EmitterId, emitter: &ParticleEmitter) {
        self.instances.reserve(emitter.alive_count());
    }

    fn draw(&mut self, _id: EmitterId, particle: &Particle) {
        self.instances.push(ParticleInstance::from(particle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 24);
    }

    #[test]
    fn test_instance_collector_starts_empty() {
        assert!(InstanceCollector::new().instances().is_empty());
        assert!(InstanceCollector::default().as_bytes().is_empty());
    }

    #[test]
    fn test_instance_collector() {
        let mut generator = ParticleGenerator::new(GeneratorConfig {
            seed: Some(5),
            ..Default::default()
        })
        .unwrap();
        let emitter = generator
            .builder(std::sync::Arc::new(EmitterType::cone(Vec2::X, 0.0).unwrap()))
            .particles_per_update(3)
            .build()
            .unwrap();

        let mut manager = ParticleSystemManager::default();
        manager.add(emitter).unwrap();
        manager.tick_all(0.016).unwrap();

        let mut collector = InstanceCollector::new();
        manager.render(&mut collector);
        assert_eq!(collector.instances().len(), 3);
        assert_eq!(
            collector.as_bytes().len(),
            3 * std::mem::size_of::<ParticleInstance>()
        );
        assert!(collector.instances().iter().all(|i| i.age == 0.0));

        collector.clear();
        assert!(collector.instances().is_empty());
    }
}
