//! 核心模块
//!
//! 包含引擎的核心功能：
//! - `engine` - 引擎入口和帧循环
//! - `error` - 错误类型定义
//! - `scheduler` - 延迟调用调度
//! - `operations` - 具名操作注册表

pub mod engine;
pub mod error;
pub mod operations;
pub mod scheduler;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    EngineError, EngineResult, ParticleError, ParticleResult, ScheduleError, ScheduleResult,
};

// 重新导出主要类型
pub use engine::{Engine, EngineStats};
pub use operations::{Arguments, OperationRegistry, ScheduleArg};
pub use scheduler::{Schedulable, ScheduleHandle, Scheduler};
