//! 具名操作注册表
//!
//! 允许按名称延迟调用已注册的操作（例如来自配置或脚本的调度）。
//! 名称解析和参数数量检查在调用时进行，失败即为绑定错误。

use crate::core::error::{ScheduleError, ScheduleResult};
use glam::Vec2;
use std::collections::HashMap;
use std::fmt;

/// 调度参数
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleArg {
    Float(f32),
    Int(i64),
    Bool(bool),
    Text(String),
    Vector(Vec2),
}

impl From<f32> for ScheduleArg {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for ScheduleArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ScheduleArg {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ScheduleArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScheduleArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec2> for ScheduleArg {
    fn from(value: Vec2) -> Self {
        Self::Vector(value)
    }
}

/// 传给操作处理函数的参数视图，提供带类型检查的访问
pub struct Arguments<'a> {
    operation: &'a str,
    args: &'a [ScheduleArg],
}

impl<'a> Arguments<'a> {
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn raw(&self) -> &'a [ScheduleArg] {
        self.args
    }

    fn mismatch(&self, index: usize, expected: &'static str) -> ScheduleError {
        ScheduleError::ArgumentType {
            operation: self.operation.to_string(),
            index,
            expected,
        }
    }

    /// 浮点参数，整数参数会被转换
    pub fn float(&self, index: usize) -> ScheduleResult<f32> {
        match self.args.get(index) {
            Some(ScheduleArg::Float(v)) => Ok(*v),
            Some(ScheduleArg::Int(v)) => Ok(*v as f32),
            _ => Err(self.mismatch(index, "float")),
        }
    }

    pub fn int(&self, index: usize) -> ScheduleResult<i64> {
        match self.args.get(index) {
            Some(ScheduleArg::Int(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "int")),
        }
    }

    pub fn bool(&self, index: usize) -> ScheduleResult<bool> {
        match self.args.get(index) {
            Some(ScheduleArg::Bool(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "bool")),
        }
    }

    pub fn text(&self, index: usize) -> ScheduleResult<&'a str> {
        match self.args.get(index) {
            Some(ScheduleArg::Text(v)) => Ok(v.as_str()),
            _ => Err(self.mismatch(index, "text")),
        }
    }

    pub fn vector(&self, index: usize) -> ScheduleResult<Vec2> {
        match self.args.get(index) {
            Some(ScheduleArg::Vector(v)) => Ok(*v),
            _ => Err(self.mismatch(index, "vector")),
        }
    }
}

type Handler = Box<dyn FnMut(&Arguments<'_>) -> ScheduleResult<()>>;

struct Operation {
    arity: usize,
    handler: Handler,
}

/// 具名操作注册表
#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Operation>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册操作
    ///
    /// # 参数
    ///
    /// * `name` - 操作名
    /// * `arity` - 参数数量
    /// * `handler` - 处理函数
    ///
    /// # 错误
    ///
    /// 名称已被占用时返回 `ScheduleError::DuplicateOperation`。
    pub fn register<F>(&mut self, name: &str, arity: usize, handler: F) -> ScheduleResult<()>
    where
        F: FnMut(&Arguments<'_>) -> ScheduleResult<()> + 'static,
    {
        if self.operations.contains_key(name) {
            return Err(ScheduleError::DuplicateOperation(name.to_string()));
        }
        self.operations.insert(
            name.to_string(),
            Operation {
                arity,
                handler: Box::new(handler),
            },
        );
        Ok(())
    }

    /// 注销操作，返回是否存在
    pub fn unregister(&mut self, name: &str) -> bool {
        self.operations.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// 调用操作
    ///
    /// # 错误
    ///
    /// - `UnknownOperation`：名称未注册
    /// - `ArityMismatch`：参数数量不符
    /// - 处理函数自身返回的错误
    pub fn invoke(&mut self, name: &str, args: &[ScheduleArg]) -> ScheduleResult<()> {
        let operation = self
            .operations
            .get_mut(name)
            .ok_or_else(|| ScheduleError::UnknownOperation(name.to_string()))?;

        if operation.arity != args.len() {
            return Err(ScheduleError::ArityMismatch {
                operation: name.to_string(),
                expected: operation.arity,
                found: args.len(),
            });
        }

        (operation.handler)(&Arguments {
            operation: name,
            args,
        })
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("OperationRegistry")
            .field("operations", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_register_and_invoke() {
        let mut registry = OperationRegistry::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();

        registry
            .register("spawn_burst", 2, move |args| {
                sink.borrow_mut()
                    .push((args.text(0)?.to_string(), args.int(1)?));
                Ok(())
            })
            .unwrap();

        registry
            .invoke("spawn_burst", &["sparks".into(), 12i64.into()])
            .unwrap();
        assert_eq!(*received.borrow(), vec![("sparks".to_string(), 12)]);
    }

    #[test]
    fn test_binding_errors() {
        let mut registry = OperationRegistry::new();
        registry.register("noop", 0, |_| Ok(())).unwrap();

        assert_eq!(
            registry.register("noop", 0, |_| Ok(())),
            Err(ScheduleError::DuplicateOperation("noop".to_string()))
        );
        assert_eq!(
            registry.invoke("missing", &[]),
            Err(ScheduleError::UnknownOperation("missing".to_string()))
        );
        assert_eq!(
            registry.invoke("noop", &[ScheduleArg::Bool(true)]),
            Err(ScheduleError::ArityMismatch {
                operation: "noop".to_string(),
                expected: 0,
                found: 1,
            })
        );
    }

    #[test]
    fn test_argument_type_mismatch() {
        let mut registry = OperationRegistry::new();
        registry
            .register("move_to", 1, |args| args.vector(0).map(|_| ()))
            .unwrap();

        assert_eq!(
            registry.invoke("move_to", &[ScheduleArg::Float(1.0)]),
            Err(ScheduleError::ArgumentType {
                operation: "move_to".to_string(),
                index: 0,
                expected: "vector",
            })
        );
        assert!(registry
            .invoke("move_to", &[Vec2::new(1.0, 2.0).into()])
            .is_ok());
    }

    #[test]
    fn test_unregister() {
        let mut registry = OperationRegistry::new();
        registry.register("noop", 0, |_| Ok(())).unwrap();
        assert!(registry.contains("noop"));
        assert!(registry.unregister("noop"));
        assert!(!registry.unregister("noop"));
        assert!(registry.is_empty());
    }
}
