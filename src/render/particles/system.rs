//! 粒子系统管理器
//!
//! 管理多个发射器，提供统一的更新和渲染接口。
//! 发射器以 `Rc<RefCell<_>>` 保存，调度器中的延迟操作可以持有弱引用；
//! 所属游戏对象销毁时调用 `remove`，弱引用随之失效。

use crate::core::error::{ParticleError, ParticleResult};
use crate::render::particles::emitter::ParticleEmitter;
use crate::render::ParticleRenderer;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// 发射器 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmitterId(u32);

impl EmitterId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emitter#{}", self.0)
    }
}

/// 共享的发射器句柄
pub type SharedEmitter = Rc<RefCell<ParticleEmitter>>;

/// 粒子系统管理器
pub struct ParticleSystemManager {
    /// 发射器列表（按 ID 有序，保证更新与渲染顺序稳定）
    emitters: BTreeMap<EmitterId, SharedEmitter>,
    /// 最大发射器数
    max_emitters: usize,
    next_id: u32,
}

impl ParticleSystemManager {
    /// 创建新的粒子系统管理器
    ///
    /// # 参数
    ///
    /// * `max_emitters` - 最大发射器数
    pub fn new(max_emitters: usize) -> Self {
        Self {
            emitters: BTreeMap::new(),
            max_emitters,
            next_id: 0,
        }
    }

    /// 添加发射器
    ///
    /// # 错误
    ///
    /// 达到上限时返回 `ParticleError::TooManyEmitters`。
    pub fn add(&mut self, emitter: ParticleEmitter) -> ParticleResult<EmitterId> {
        if self.emitters.len() >= self.max_emitters {
            return Err(ParticleError::TooManyEmitters(self.max_emitters));
        }

        let id = EmitterId(self.next_id);
        self.next_id += 1;
        self.emitters.insert(id, Rc::new(RefCell::new(emitter)));
        tracing::debug!(target: "particles", "Registered {}", id);
        Ok(id)
    }

    /// 获取发射器句柄
    pub fn get(&self, id: EmitterId) -> Option<SharedEmitter> {
        self.emitters.get(&id).cloned()
    }

    /// 获取发射器弱引用，供延迟操作使用
    pub fn downgrade(&self, id: EmitterId) -> Option<Weak<RefCell<ParticleEmitter>>> {
        self.emitters.get(&id).map(Rc::downgrade)
    }

    /// 移除发射器
    ///
    /// 如果成功移除返回`true`，否则返回`false`。
    pub fn remove(&mut self, id: EmitterId) -> bool {
        let removed = self.emitters.remove(&id).is_some();
        if removed {
            tracing::debug!(target: "particles", "Removed {}", id);
        }
        removed
    }

    /// 推进所有发射器
    ///
    /// # 错误
    ///
    /// 发射器正被其他地方借用时返回 `ParticleError::EmitterBusy`。
    pub fn tick_all(&mut self, delta_time: f32) -> ParticleResult<()> {
        for (&id, emitter) in &self.emitters {
            let mut emitter = emitter
                .try_borrow_mut()
                .map_err(|_| ParticleError::EmitterBusy(id))?;
            emitter.tick(delta_time);
        }
        Ok(())
    }

    /// 把所有存活粒子交给渲染器，按发射器分组
    ///
    /// 正被可变借用的发射器本帧跳过。
    pub fn render<R: ParticleRenderer + ?Sized>(&self, renderer: &mut R) {
        for (&id, emitter) in &self.emitters {
            let Ok(emitter) = emitter.try_borrow() else {
                tracing::warn!(target: "particles", "Skipping render of busy {}", id);
                continue;
            };
            renderer.begin_emitter(id, &emitter);
            for particle in emitter.particles() {
                renderer.draw(id, particle);
            }
        }
    }

    /// 所有发射器的存活粒子总数
    ///
    /// # 错误
    ///
    /// 发射器正被可变借用时返回 `ParticleError::EmitterBusy`。
    pub fn try_total_alive(&self) -> ParticleResult<usize> {
        self.emitters.iter().try_fold(0, |total, (&id, emitter)| {
            let emitter = emitter
                .try_borrow()
                .map_err(|_| ParticleError::EmitterBusy(id))?;
            Ok(total + emitter.alive_count())
        })
    }

    /// 可借用发射器的存活粒子总数，正被可变借用的发射器不计入
    pub fn total_alive(&self) -> usize {
        self.emitters
            .values()
            .filter_map(|emitter| emitter.try_borrow().ok())
            .map(|emitter| emitter.alive_count())
            .sum()
    }

    pub fn ids(&self) -> impl Iterator<Item = EmitterId> + '_ {
        self.emitters.keys().copied()
    }

    /// 获取发射器数量
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// 清空所有发射器
    pub fn clear(&mut self) {
        self.emitters.clear();
    }
}

impl Default for ParticleSystemManager {
    fn default() -> Self {
        Self::new(64)
    }
}

impl fmt::Debug for ParticleSystemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticleSystemManager")
            .field("emitters", &self.emitters.len())
            .field("max_emitters", &self.max_emitters)
            .finish()
    }
}
