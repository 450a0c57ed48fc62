//! 单个粒子
//!
//! 粒子常驻于发射器的粒子池槽位中，通过 `activate` 复用而不是重新分配。

use glam::Vec2;

/// 粒子激活参数
///
/// 对应一次生成时写入槽位的全部初始值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpawn {
    /// 生命周期（秒）
    pub lifespan: f32,
    /// 初始位置
    pub position: Vec2,
    /// 初始方向
    pub direction: Vec2,
    /// 每帧叠加到方向上的重力
    pub gravity: Vec2,
    /// 初始速度标量
    pub velocity: f32,
    /// 每帧速度倍率
    pub acceleration: f32,
    /// 缩放
    pub scale: f32,
    /// 旋转（弧度）
    pub rotation: f32,
    /// 不透明度
    pub opacity: f32,
    /// 每帧不透明度倍率
    pub opacity_fade_rate: f32,
}

impl Default for ParticleSpawn {
    fn default() -> Self {
        Self {
            lifespan: 1.0,
            position: Vec2::ZERO,
            direction: Vec2::ZERO,
            gravity: Vec2::ZERO,
            velocity: 0.0,
            acceleration: 1.0,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            opacity_fade_rate: 1.0,
        }
    }
}

/// 粒子
///
/// 当且仅当 `age < lifespan` 时存活。默认构造的粒子寿命为 0，处于死亡状态。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Particle {
    position: Vec2,
    velocity: f32,
    direction: Vec2,
    acceleration: f32,
    gravity: Vec2,
    scale: f32,
    rotation: f32,
    opacity: f32,
    opacity_fade_rate: f32,
    age: f32,
    lifespan: f32,
}

impl Particle {
    /// 以新的参数重新激活粒子，年龄归零
    ///
    /// 不做任何校验：调用方保证所有值有限且 `lifespan > 0`。
    pub fn activate(&mut self, spawn: ParticleSpawn) {
        self.lifespan = spawn.lifespan;
        self.position = spawn.position;
        self.direction = spawn.direction;
        self.gravity = spawn.gravity;
        self.velocity = spawn.velocity;
        self.acceleration = spawn.acceleration;
        self.scale = spawn.scale;
        self.rotation = spawn.rotation;
        self.opacity = spawn.opacity;
        self.opacity_fade_rate = spawn.opacity_fade_rate;
        self.age = 0.0;
    }

    /// 推进一帧，返回推进后是否仍然存活
    ///
    /// 速度与不透明度按帧做乘法衰减，而不是按时间积分，
    /// 因此结果依赖帧率，除非调用方按 `delta_time` 归一化倍率。
    pub fn advance(&mut self, delta_time: f32) -> bool {
        self.velocity *= self.acceleration;
        self.direction += self.gravity;
        self.position += self.direction * self.velocity;
        self.opacity *= self.opacity_fade_rate;
        self.age += delta_time;
        self.is_alive()
    }

    pub fn is_alive(&self) -> bool {
        self.age < self.lifespan
    }

    /// 归一化年龄（0..1），用于渲染端插值
    pub fn normalized_age(&self) -> f32 {
        if self.lifespan > 0.0 {
            (self.age / self.lifespan).min(1.0)
        } else {
            0.0
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn opacity_fade_rate(&self) -> f32 {
        self.opacity_fade_rate
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn lifespan(&self) -> f32 {
        self.lifespan
    }
}
