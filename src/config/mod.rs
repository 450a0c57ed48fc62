/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和配置验证
use crate::impl_default;
use crate::render::particles::{Emission, EmitterShape, GeneratorConfig};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// 引擎配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 引擎主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 模拟配置
    pub simulation: SimulationConfig,

    /// 粒子工厂配置
    pub particles: GeneratorConfig,

    /// 启动时创建的发射器
    pub emitters: Vec<EmitterPreset>,

    /// 日志配置
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            particles: GeneratorConfig::default(),
            emitters: vec![
                EmitterPreset::new(
                    "sparks",
                    Vec2::ZERO,
                    EmitterShape::Cone {
                        direction: Vec2::Y,
                        spread: 0.6,
                    },
                ),
                EmitterPreset::new(
                    "halo",
                    Vec2::new(4.0, 0.0),
                    EmitterShape::Ring {
                        direction: Vec2::Y,
                        radius: 1.5,
                    },
                ),
            ],
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// 从任意键值来源覆盖配置，无法解析的值被忽略
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // 模拟配置
        if let Some(val) = lookup("ENGINE_SIM_FIXED_DELTA") {
            if let Ok(delta) = val.parse() {
                self.simulation.fixed_delta = delta;
            }
        }
        if let Some(val) = lookup("ENGINE_SIM_FRAMES") {
            if let Ok(frames) = val.parse() {
                self.simulation.frames = frames;
            }
        }

        // 粒子配置
        if let Some(val) = lookup("ENGINE_PARTICLES_SEED") {
            if let Ok(seed) = val.parse() {
                self.particles.seed = Some(seed);
            }
        }

        // 日志配置
        if let Some(val) = lookup("ENGINE_LOG_LEVEL") {
            self.logging.level = val.parse().unwrap_or(self.logging.level);
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()?;
        self.particles
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("particles: {}", e)))?;

        if self.emitters.len() > self.simulation.max_emitters {
            return Err(ConfigError::ValidationError(format!(
                "{} emitter presets exceed max_emitters = {}",
                self.emitters.len(),
                self.simulation.max_emitters
            )));
        }
        for preset in &self.emitters {
            preset.validate()?;
        }
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./config.toml
    /// 2. ./config.json
    /// 3. ~/.config/spark_engine/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        // 尝试当前目录的TOML
        if let Ok(config) = Self::from_toml_file("config.toml") {
            println!("Loaded config from config.toml");
            return config;
        }

        // 尝试当前目录的JSON
        if let Ok(config) = Self::from_json_file("config.json") {
            println!("Loaded config from config.json");
            return config;
        }

        // 尝试用户配置目录
        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("spark_engine")
                .join("config.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                println!("Loaded config from {:?}", config_path);
                return config;
            }
        }

        // 使用默认配置
        println!("Using default configuration");
        Self::default()
    }
}

/// 模拟配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 固定时间步长（秒）
    pub fixed_delta: f32,

    /// 无头运行的帧数
    pub frames: u64,

    /// 最大发射器数
    pub max_emitters: usize,
}

impl_default!(SimulationConfig {
    fixed_delta: 1.0 / 60.0,
    frames: 600,
    max_emitters: 64,
});

impl SimulationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.fixed_delta.is_finite() || self.fixed_delta <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid fixed delta: {}",
                self.fixed_delta
            )));
        }
        if self.max_emitters == 0 {
            return Err(ConfigError::ValidationError(
                "max_emitters must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// 发射器预设
///
/// ```toml
/// [[emitters]]
/// name = "sparks"
/// origin = [0.0, 0.0]
///
/// [emitters.shape]
/// kind = "cone"
/// direction = [0.0, 1.0]
/// spread = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterPreset {
    /// 名称（仅用于日志）
    pub name: String,

    /// 发射原点
    #[serde(default)]
    pub origin: Vec2,

    /// 发射形状
    pub shape: EmitterShape,

    /// 覆盖默认粒子池容量
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,

    /// 覆盖默认发射速率
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emission: Option<Emission>,
}

impl EmitterPreset {
    pub fn new(name: &str, origin: Vec2, shape: EmitterShape) -> Self {
        Self {
            name: name.to_string(),
            origin,
            shape,
            capacity: None,
            emission: None,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.origin.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "emitter '{}': origin must be finite",
                self.name
            )));
        }
        if self.capacity == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "emitter '{}': capacity must be at least 1",
                self.name
            )));
        }
        if let Some(emission) = self.emission {
            emission
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("emitter '{}': {}", self.name, e)))?;
        }
        crate::render::particles::EmitterType::try_from(self.shape)
            .map(|_| ())
            .map_err(|e| ConfigError::ValidationError(format!("emitter '{}': {}", self.name, e)))
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 优先）
    pub level: LogLevel,

    /// 是否输出日志目标
    pub with_target: bool,

    /// 是否使用 ANSI 颜色
    pub ansi: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    with_target: true,
    ansi: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 对应的过滤指令
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::ParseError(format!("Unknown log level: {}", other))),
        }
    }
}
