//! 分析进度上报
//!
//! 进度是"已处理菜品数 / 菜品总数"的百分比，展示层通过观察者接口订阅。
//! 同一轮分析中观察到的值保证单调不减，最后一次上报必定是 100。

use std::sync::atomic::{AtomicU8, Ordering};

/// 进度观察者
///
/// 展示层实现该接口来渲染进度条和加载状态，默认实现什么都不做
pub trait ProgressObserver: Send + Sync {
    /// 进度更新（0-100）
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// 分析状态切换（整轮开始 / 结束）
    fn on_analyzing(&self, analyzing: bool) {
        let _ = analyzing;
    }
}

/// 不做任何事的观察者
pub struct NullObserver;

impl ProgressObserver for NullObserver {}

/// 进度百分比
///
/// 四舍五入，封顶 100；总数为 0 时直接视为完成
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let raw = (processed as f64 / total as f64 * 100.0).round() as u64;
    raw.min(100) as u8
}

/// 进度上报器
///
/// 包装观察者并维护上一次上报的值，保证单调不减
pub struct ProgressReporter<'a> {
    observer: &'a dyn ProgressObserver,
    last: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(observer: &'a dyn ProgressObserver) -> Self {
        Self {
            observer,
            last: AtomicU8::new(0),
        }
    }

    /// 上报当前进度
    pub fn report(&self, processed: usize, total: usize) {
        let value = percent(processed, total).max(self.last.load(Ordering::Relaxed));
        self.last.store(value, Ordering::Relaxed);
        self.observer.on_progress(value);
    }

    /// 整轮结束，无条件上报 100
    pub fn finish(&self) {
        self.last.store(100, Ordering::Relaxed);
        self.observer.on_progress(100);
    }
}
