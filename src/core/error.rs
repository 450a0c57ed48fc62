//! 统一错误处理模块
//!
//! 提供引擎范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **粒子错误** (`ParticleError`): 发射器配置、粒子池与管理器的错误
//! - **调度错误** (`ScheduleError`): 延迟调用的注册与绑定错误
//! - **配置错误** (`config::ConfigError`): 配置文件读取、解析与验证
//!
//! `EngineError` 汇总以上所有错误，供帧循环和二进制入口使用。

use crate::config::ConfigError;
use crate::render::particles::EmitterId;
use thiserror::Error;

/// 引擎核心错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Particle error: {0}")]
    Particle(#[from] ParticleError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

/// 粒子系统错误
///
/// 除 `UnknownEmitter` 和 `EmitterBusy` 外均为配置错误，在构造时立即返回。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParticleError {
    #[error("Emitter direction must not be zero-length")]
    ZeroDirection,

    #[error("Value of `{field}` must be finite")]
    NonFinite { field: &'static str },

    #[error("Cone spread must not be negative, got {0}")]
    NegativeSpread(f32),

    #[error("Cone spread must not exceed a full turn, got {0}")]
    SpreadTooWide(f32),

    #[error("Ring radius must not be negative, got {0}")]
    NegativeRadius(f32),

    #[error("Invalid range for `{field}`: min {min} > max {max}")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("Particle lifespan must be positive, got minimum {0}")]
    NonPositiveLifespan(f32),

    #[error("Emitter capacity must be at least one particle")]
    ZeroCapacity,

    #[error("Emission rate must be finite and non-negative, got {0}")]
    InvalidEmissionRate(f32),

    #[error("Emitter limit reached ({0})")]
    TooManyEmitters(usize),

    #[error("Unknown emitter: {0}")]
    UnknownEmitter(EmitterId),

    #[error("Emitter {0} is borrowed elsewhere during tick")]
    EmitterBusy(EmitterId),
}

/// 调度系统错误
///
/// 绑定错误（未知操作、参数数量或类型不符）属于编程缺陷，由 `Scheduler::tick`
/// 直接返回，不会重试。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Delay must be finite and non-negative, got {0}")]
    InvalidDelay(f64),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Operation `{operation}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        found: usize,
    },

    #[error("Operation `{operation}` argument {index} is not a {expected}")]
    ArgumentType {
        operation: String,
        index: usize,
        expected: &'static str,
    },

    #[error("Operation already registered: {0}")]
    DuplicateOperation(String),

    #[error("Schedule target is already borrowed")]
    TargetBusy,
}

/// 引擎结果类型别名
pub type EngineResult<T> = Result<T, EngineError>;
pub type ParticleResult<T> = Result<T, ParticleError>;
pub type ScheduleResult<T> = Result<T, ScheduleError>;
