//! 发射类型
//!
//! 决定新粒子的初始方向与生成位置。所有变体在构造时校验参数，
//! 采样函数为纯函数，只消耗调用方提供的随机数源。
//!
//! - `Cone`：在基准方向两侧 `spread / 2` 的扇形内均匀随机方向，位置固定为发射原点。
//! - `Ring`：方向固定为基准方向（不随机），位置均匀分布在半径为 `radius` 的圆周上。

use crate::core::error::{ParticleError, ParticleResult};
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;

/// 发射类型种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitterKind {
    Cone,
    Ring,
}

impl fmt::Display for EmitterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cone => f.write_str("cone"),
            Self::Ring => f.write_str("ring"),
        }
    }
}

/// 圆锥发射
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeEmitter {
    direction: Vec2,
    base_angle: f32,
    spread: f32,
}

impl ConeEmitter {
    /// 基准方向（单位向量）
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// 基准角度（弧度，atan2）
    pub fn base_angle(&self) -> f32 {
        self.base_angle
    }

    /// 扇形总张角（弧度）
    pub fn spread(&self) -> f32 {
        self.spread
    }
}

/// 圆环发射
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingEmitter {
    direction: Vec2,
    radius: f32,
}

impl RingEmitter {
    /// 粒子初始方向（单位向量，或零向量）
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

/// 发射类型
///
/// 由多个发射器共享（`Arc<EmitterType>`），自身不持有任何粒子。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmitterType {
    Cone(ConeEmitter),
    Ring(RingEmitter),
}

impl EmitterType {
    /// 创建圆锥发射类型
    ///
    /// # 错误
    ///
    /// - 方向为零向量或包含非有限值
    /// - `spread` 为负、非有限或超过一整圈
    pub fn cone(direction: Vec2, spread: f32) -> ParticleResult<Self> {
        ensure_finite_vec(direction, "direction")?;
        if direction.length_squared() == 0.0 {
            return Err(ParticleError::ZeroDirection);
        }
        if !spread.is_finite() {
            return Err(ParticleError::NonFinite { field: "spread" });
        }
        if spread < 0.0 {
            return Err(ParticleError::NegativeSpread(spread));
        }
        if spread > TAU {
            return Err(ParticleError::SpreadTooWide(spread));
        }

        let direction = direction.normalize();
        Ok(Self::Cone(ConeEmitter {
            direction,
            base_angle: direction.y.atan2(direction.x),
            spread,
        }))
    }

    /// 创建圆环发射类型
    ///
    /// 零方向是允许的：粒子生成在圆周上但没有初始朝向。
    pub fn ring(direction: Vec2, radius: f32) -> ParticleResult<Self> {
        ensure_finite_vec(direction, "direction")?;
        if !radius.is_finite() {
            return Err(ParticleError::NonFinite { field: "radius" });
        }
        if radius < 0.0 {
            return Err(ParticleError::NegativeRadius(radius));
        }

        Ok(Self::Ring(RingEmitter {
            direction: direction.normalize_or_zero(),
            radius,
        }))
    }

    pub fn kind(&self) -> EmitterKind {
        match self {
            Self::Cone(_) => EmitterKind::Cone,
            Self::Ring(_) => EmitterKind::Ring,
        }
    }

    /// 采样新粒子的初始方向
    pub fn direction<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        match self {
            Self::Cone(cone) => {
                if cone.spread == 0.0 {
                    return cone.direction;
                }
                let half = cone.spread * 0.5;
                let angle = cone.base_angle + rng.gen_range(-half..=half);
                Vec2::from_angle(angle)
            }
            Self::Ring(ring) => ring.direction,
        }
    }

    /// 采样新粒子的生成位置
    pub fn position<R: Rng + ?Sized>(&self, origin: Vec2, rng: &mut R) -> Vec2 {
        match self {
            Self::Cone(_) => origin,
            Self::Ring(ring) => {
                let theta = rng.gen_range(0.0..TAU);
                origin + Vec2::from_angle(theta) * ring.radius
            }
        }
    }
}

impl fmt::Display for EmitterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cone(cone) => write!(
                f,
                "cone(direction: {}, spread: {:.3})",
                cone.direction, cone.spread
            ),
            Self::Ring(ring) => write!(
                f,
                "ring(direction: {}, radius: {:.3})",
                ring.direction, ring.radius
            ),
        }
    }
}

/// 发射形状描述（可序列化）
///
/// 配置文件中的原始描述，通过 `TryFrom` 校验后得到 `EmitterType`。
///
/// ```toml
/// [shape]
/// kind = "cone"
/// direction = [0.0, 1.0]
/// spread = 0.5
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmitterShape {
    Cone { direction: Vec2, spread: f32 },
    Ring { direction: Vec2, radius: f32 },
}

impl TryFrom<EmitterShape> for EmitterType {
    type Error = ParticleError;

    fn try_from(shape: EmitterShape) -> ParticleResult<Self> {
        match shape {
            EmitterShape::Cone { direction, spread } => Self::cone(direction, spread),
            EmitterShape::Ring { direction, radius } => Self::ring(direction, radius),
        }
    }
}

impl From<&EmitterType> for EmitterShape {
    fn from(emitter_type: &EmitterType) -> Self {
        match emitter_type {
            EmitterType::Cone(cone) => Self::Cone {
                direction: cone.direction,
                spread: cone.spread,
            },
            EmitterType::Ring(ring) => Self::Ring {
                direction: ring.direction,
                radius: ring.radius,
            },
        }
    }
}

fn ensure_finite_vec(v: Vec2, field: &'static str) -> ParticleResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ParticleError::NonFinite { field })
    }
}
