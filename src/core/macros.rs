//! 核心宏定义
//!
//! 提供统一的宏来减少配置和统计结构体中的样板代码

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use spark_engine::impl_default;
///
/// struct SpawnLimits {
///     max_per_tick: u32,
///     label: String,
/// }
///
/// impl_default!(SpawnLimits {
///     max_per_tick: 16,
///     label: String::from("sparks"),
/// });
///
/// assert_eq!(SpawnLimits::default().max_per_tick, 16);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

/// 同时实现Default和new()的宏
///
/// 使用示例:
/// ```rust
/// use spark_engine::impl_default_and_new;
///
/// struct FrameCounter {
///     frames: u64,
///     elapsed: f64,
/// }
///
/// impl_default_and_new!(FrameCounter {
///     frames: 0,
///     elapsed: 0.0,
/// });
///
/// assert_eq!(FrameCounter::new().frames, 0);
/// ```
#[macro_export]
macro_rules! impl_default_and_new {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }

        impl $struct_name {
            pub fn new() -> Self {
                Self::default()
            }
        }
    };
}
