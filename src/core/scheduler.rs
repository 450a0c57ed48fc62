//! 延迟调用调度
//!
//! 每帧由主循环驱动的单线程调度器：登记带倒计时的一次性调用，
//! 每次 `tick` 扣减倒计时，归零后按登记顺序执行并移除。
//!
//! ## 功能特性
//!
//! - 闭包调用：调度时绑定具体闭包，编译期检查类型
//! - 目标弱引用：目标对象销毁后自动跳过
//! - 具名操作：通过 `OperationRegistry` 延迟绑定，绑定失败立即返回错误
//! - 任务取消

use crate::core::error::{ScheduleError, ScheduleResult};
use crate::core::operations::{OperationRegistry, ScheduleArg};
use crate::impl_default_and_new;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// 倒计时容差，吸收多帧累加的浮点误差
const COUNTDOWN_EPSILON: f64 = 1e-9;

/// 调度句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle {
    id: u64,
}

impl ScheduleHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// 闭包任务
type Callback = Box<dyn FnOnce() -> ScheduleResult<()>>;

enum Action {
    Call(Callback),
    Named {
        operation: String,
        args: Vec<ScheduleArg>,
    },
}

/// 延迟调用记录
///
/// 倒计时归零时执行一次，随后从待执行集合中移除，永不重试。
pub struct Schedulable {
    id: u64,
    remaining: f64,
    action: Action,
}

impl Schedulable {
    pub fn handle(&self) -> ScheduleHandle {
        ScheduleHandle { id: self.id }
    }

    /// 剩余倒计时（秒）
    pub fn remaining(&self) -> f64 {
        self.remaining
    }
}

impl fmt::Debug for Schedulable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match &self.action {
            Action::Call(_) => "<function>".to_string(),
            Action::Named { operation, .. } => operation.clone(),
        };
        f.debug_struct("Schedulable")
            .field("id", &self.id)
            .field("remaining", &self.remaining)
            .field("action", &action)
            .finish()
    }
}

/// 调度器
///
/// # 示例
///
/// ```
/// use spark_engine::core::scheduler::Scheduler;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let mut scheduler = Scheduler::new();
/// let fired = Rc::new(Cell::new(false));
/// let flag = fired.clone();
///
/// scheduler.schedule(0.5, move || flag.set(true)).unwrap();
///
/// scheduler.tick(0.25).unwrap();
/// assert!(!fired.get());
/// scheduler.tick(0.25).unwrap();
/// assert!(fired.get());
/// ```
pub struct Scheduler {
    /// 待执行记录，按登记顺序排列
    pending: Vec<Schedulable>,
    operations: OperationRegistry,
    next_id: u64,
    fired_total: u64,
}

impl_default_and_new!(Scheduler {
    pending: Vec::new(),
    operations: OperationRegistry::new(),
    next_id: 0,
    fired_total: 0,
});

impl Scheduler {
    /// 使用已有的操作注册表创建调度器
    pub fn with_operations(operations: OperationRegistry) -> Self {
        Self {
            operations,
            ..Self::default()
        }
    }

    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut OperationRegistry {
        &mut self.operations
    }

    /// 延迟执行闭包
    ///
    /// # 参数
    ///
    /// * `delay` - 延迟时间（秒），0 表示在下一次 `tick` 执行
    /// * `action` - 要执行的闭包
    ///
    /// # 错误
    ///
    /// `delay` 为负或非有限值时返回 `ScheduleError::InvalidDelay`。
    pub fn schedule<F>(&mut self, delay: f64, action: F) -> ScheduleResult<ScheduleHandle>
    where
        F: FnOnce() + 'static,
    {
        self.schedule_fallible(delay, move || {
            action();
            Ok(())
        })
    }

    /// 延迟执行可能失败的闭包，错误从 `tick` 返回
    pub fn schedule_fallible<F>(&mut self, delay: f64, action: F) -> ScheduleResult<ScheduleHandle>
    where
        F: FnOnce() -> ScheduleResult<()> + 'static,
    {
        self.push(delay, Action::Call(Box::new(action)))
    }

    /// 延迟对目标对象执行操作
    ///
    /// 只持有目标的弱引用：目标在执行前被销毁时，该调用被跳过。
    /// 执行时目标正被借用则返回 `ScheduleError::TargetBusy`。
    pub fn schedule_for<T, F>(
        &mut self,
        target: &Rc<RefCell<T>>,
        delay: f64,
        op: F,
    ) -> ScheduleResult<ScheduleHandle>
    where
        T: 'static,
        F: FnOnce(&mut T) + 'static,
    {
        let target = Rc::downgrade(target);
        self.schedule_fallible(delay, move || {
            let Some(strong) = target.upgrade() else {
                tracing::debug!(target: "scheduler", "Schedule target dropped, skipping");
                return Ok(());
            };
            let mut guard = strong
                .try_borrow_mut()
                .map_err(|_| ScheduleError::TargetBusy)?;
            op(&mut *guard);
            Ok(())
        })
    }

    /// 延迟调用具名操作
    ///
    /// 名称与参数数量在执行时解析，失败时 `tick` 返回绑定错误。
    pub fn schedule_named(
        &mut self,
        operation: &str,
        args: Vec<ScheduleArg>,
        delay: f64,
    ) -> ScheduleResult<ScheduleHandle> {
        self.push(
            delay,
            Action::Named {
                operation: operation.to_string(),
                args,
            },
        )
    }

    fn push(&mut self, delay: f64, action: Action) -> ScheduleResult<ScheduleHandle> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ScheduleError::InvalidDelay(delay));
        }

        let id = self.next_id;
        self.next_id += 1;
        let item = Schedulable {
            id,
            remaining: delay,
            action,
        };
        tracing::trace!(target: "scheduler", "Scheduled {:?}", item);
        self.pending.push(item);
        Ok(ScheduleHandle { id })
    }

    /// 取消尚未执行的调用
    ///
    /// 如果成功取消返回`true`；已执行或已取消的句柄返回`false`。
    pub fn cancel(&mut self, handle: ScheduleHandle) -> bool {
        match self.pending.iter().position(|item| item.id == handle.id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: ScheduleHandle) -> bool {
        self.pending.iter().any(|item| item.id == handle.id)
    }

    /// 剩余倒计时
    pub fn remaining(&self, handle: ScheduleHandle) -> Option<f64> {
        self.pending
            .iter()
            .find(|item| item.id == handle.id)
            .map(Schedulable::remaining)
    }

    /// 获取待执行任务数
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 累计成功执行的调用数，失败的调用不计入
    pub fn fired_total(&self) -> u64 {
        self.fired_total
    }

    /// 清空所有待执行调用
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// 推进一帧并执行到期调用
    ///
    /// 所有待执行记录的倒计时扣减 `delta_time`（最低为 0），
    /// 归零的记录按登记顺序执行。返回本帧执行的数量。
    ///
    /// # 错误
    ///
    /// 第一个失败的调用立即返回错误：失败的记录被丢弃，
    /// 本帧尚未执行的到期记录保持挂起，在下一次 `tick` 按原顺序执行。
    pub fn tick(&mut self, delta_time: f64) -> ScheduleResult<usize> {
        let delta_time = if delta_time.is_finite() && delta_time > 0.0 {
            delta_time
        } else {
            0.0
        };

        for item in &mut self.pending {
            item.remaining = (item.remaining - delta_time).max(0.0);
            if item.remaining <= COUNTDOWN_EPSILON {
                item.remaining = 0.0;
            }
        }

        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|item| item.remaining == 0.0);
        self.pending = waiting;

        let mut fired = 0;
        let mut ready = ready.into_iter();
        while let Some(item) = ready.next() {
            let id = item.id;
            if let Err(err) = self.fire(item) {
                tracing::error!(target: "scheduler", "Scheduled call {} failed: {}", id, err);
                self.pending.extend(ready);
                self.pending.sort_by_key(|item| item.id);
                return Err(err);
            }
            fired += 1;
        }

        if fired > 0 {
            tracing::trace!(target: "scheduler", "Fired {} scheduled call(s)", fired);
        }
        Ok(fired)
    }

    fn fire(&mut self, item: Schedulable) -> ScheduleResult<()> {
        let result = match item.action {
            Action::Call(callback) => callback(),
            Action::Named { operation, args } => self.operations.invoke(&operation, &args),
        };
        if result.is_ok() {
            self.fired_total += 1;
        }
        result
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending)
            .field("operations", &self.operations)
            .field("fired_total", &self.fired_total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, Rc<RefCell<Vec<&'static str>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (log.clone(), log)
    }

    #[test]
    fn test_delayed_call() {
        let mut scheduler = Scheduler::new();
        let counter = Rc::new(Cell::new(0u32));
        let counter_clone = counter.clone();

        scheduler
            .schedule(0.5, move || counter_clone.set(counter_clone.get() + 1))
            .unwrap();
        assert_eq!(scheduler.pending_count(), 1);

        // 更新但未到时间
        assert_eq!(scheduler.tick(0.3).unwrap(), 0);
        assert_eq!(counter.get(), 0);
        assert_eq!(scheduler.pending_count(), 1);

        // 更新超过时间
        assert_eq!(scheduler.tick(0.3).unwrap(), 1);
        assert_eq!(counter.get(), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_zero_delay_fires_in_insertion_order() {
        let mut scheduler = Scheduler::new();
        let (log, sink) = recorder();
        let sink2 = sink.clone();

        scheduler.schedule(0.0, move || sink.borrow_mut().push("first")).unwrap();
        scheduler.schedule(0.0, move || sink2.borrow_mut().push("second")).unwrap();

        assert_eq!(scheduler.tick(0.016).unwrap(), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_fires_exactly_once() {
        let mut scheduler = Scheduler::new();
        let counter = Rc::new(Cell::new(0u32));
        let counter_clone = counter.clone();

        let handle = scheduler
            .schedule(0.1, move || counter_clone.set(counter_clone.get() + 1))
            .unwrap();

        scheduler.tick(0.2).unwrap();
        assert!(!scheduler.is_pending(handle));
        scheduler.tick(0.2).unwrap();
        scheduler.tick(5.0).unwrap();
        assert_eq!(counter.get(), 1);
        assert_eq!(scheduler.fired_total(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();

        let handle = scheduler.schedule(1.0, move || flag.set(true)).unwrap();
        assert_eq!(scheduler.remaining(handle), Some(1.0));
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));

        scheduler.tick(2.0).unwrap();
        assert!(!fired.get());
        assert_eq!(scheduler.remaining(handle), None);
    }

    #[test]
    fn test_invalid_delay() {
        let mut scheduler = Scheduler::new();
        assert_eq!(
            scheduler.schedule(-1.0, || {}),
            Err(ScheduleError::InvalidDelay(-1.0))
        );
        assert!(scheduler.schedule(f64::NAN, || {}).is_err());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule_named("never", Vec::new(), 0.3).unwrap();
        scheduler.tick(0.1).unwrap();
        let remaining = scheduler.remaining(handle).unwrap();
        assert!((remaining - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_for_target() {
        let mut scheduler = Scheduler::new();
        let target = Rc::new(RefCell::new(10i32));

        scheduler.schedule_for(&target, 0.0, |value| *value += 5).unwrap();
        scheduler.tick(0.1).unwrap();
        assert_eq!(*target.borrow(), 15);
    }

    #[test]
    fn test_schedule_for_dropped_target_is_skipped() {
        let mut scheduler = Scheduler::new();
        let target = Rc::new(RefCell::new(String::from("alive")));
        scheduler
            .schedule_for(&target, 0.5, |value| value.push_str("!"))
            .unwrap();

        drop(target);
        assert_eq!(scheduler.tick(1.0).unwrap(), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_schedule_for_busy_target() {
        let mut scheduler = Scheduler::new();
        let target = Rc::new(RefCell::new(0u8));
        scheduler.schedule_for(&target, 0.0, |value| *value = 1).unwrap();

        let _guard = target.borrow_mut();
        assert_eq!(scheduler.tick(0.1), Err(ScheduleError::TargetBusy));
        // 失败的调用不会重试
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_named_operation() {
        let mut scheduler = Scheduler::new();
        let total = Rc::new(Cell::new(0.0f32));
        let sink = total.clone();

        scheduler
            .operations_mut()
            .register("add", 1, move |args| {
                sink.set(sink.get() + args.float(0)?);
                Ok(())
            })
            .unwrap();

        scheduler
            .schedule_named("add", vec![ScheduleArg::Float(2.5)], 0.0)
            .unwrap();
        scheduler.tick(0.1).unwrap();
        assert_eq!(total.get(), 2.5);
    }

    #[test]
    fn test_binding_error_surfaces_and_keeps_remaining_ready() {
        let mut scheduler = Scheduler::new();
        let (log, sink) = recorder();
        let sink2 = sink.clone();

        scheduler.schedule(0.0, move || sink.borrow_mut().push("before")).unwrap();
        scheduler.schedule_named("renamed_op", Vec::new(), 0.0).unwrap();
        let after = scheduler
            .schedule(0.0, move || sink2.borrow_mut().push("after"))
            .unwrap();

        assert_eq!(
            scheduler.tick(0.1),
            Err(ScheduleError::UnknownOperation("renamed_op".to_string()))
        );
        assert_eq!(*log.borrow(), vec!["before"]);
        assert_eq!(scheduler.fired_total(), 1);
        assert!(scheduler.is_pending(after));
        assert_eq!(scheduler.pending_count(), 1);

        assert_eq!(scheduler.tick(0.1).unwrap(), 1);
        assert_eq!(*log.borrow(), vec!["before", "after"]);
        assert_eq!(scheduler.fired_total(), 2);
    }

    #[test]
    fn test_arity_mismatch() {
        let mut scheduler = Scheduler::new();
        scheduler
            .operations_mut()
            .register("explode", 2, |_| Ok(()))
            .unwrap();
        scheduler
            .schedule_named("explode", vec![ScheduleArg::Int(1)], 0.0)
            .unwrap();

        assert!(matches!(
            scheduler.tick(0.1),
            Err(ScheduleError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    proptest! {
        #[test]
        fn fires_within_tick_bounds(
            delay in 0.01f64..5.0,
            delta in 0.01f64..0.5
        ) {
            let mut scheduler = Scheduler::new();
            let fired_at = Rc::new(Cell::new(None));
            let sink = fired_at.clone();
            let tick = Rc::new(Cell::new(0u32));
            let current = tick.clone();

            scheduler
                .schedule(delay, move || sink.set(Some(current.get())))
                .unwrap();

            let limit = (delay / delta).ceil() as u32 + 2;
            for n in 1..=limit {
                tick.set(n);
                scheduler.tick(delta).unwrap();
                if fired_at.get().is_some() {
                    break;
                }
            }

            let k = fired_at.get().expect("scheduled call never fired") as f64;
            prop_assert!(k >= (delay / delta).floor());
            prop_assert!(k < (delay / delta).ceil() + 1.0);
        }

        #[test]
        fn pending_set_shrinks_to_zero(
            delays in proptest::collection::vec(0.0f64..2.0, 1..20)
        ) {
            let mut scheduler = Scheduler::new();
            for delay in &delays {
                scheduler.schedule(*delay, || {}).unwrap();
            }

            let mut fired = 0;
            for _ in 0..30 {
                fired += scheduler.tick(0.1).unwrap();
            }
            prop_assert_eq!(fired, delays.len());
            prop_assert_eq!(scheduler.pending_count(), 0);
        }
    }
}
