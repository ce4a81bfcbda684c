// src/print.rs — 打印模式：纯状态机 + 可取消的定时器

use crate::config::Config;
use crate::form::ViewState;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 打印流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrintPhase {
    /// 表单、二维码、"打印"可见，"返回"隐藏
    #[default]
    Editing,
    /// 表单隐藏，显示全屏提示，等待打印对话框
    Preparing,
    /// "返回"出现
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintEvent {
    /// 用户点了"打印"
    Print,
    /// 第一个定时器：该弹打印对话框了
    DialogDue,
    /// 第二个定时器：该显示"返回"了
    BackDue,
    /// 用户点了"返回"
    Back,
}

impl PrintPhase {
    /// 非法事件原样保持当前阶段
    pub fn next(self, event: PrintEvent) -> PrintPhase {
        match (self, event) {
            (PrintPhase::Editing, PrintEvent::Print) => PrintPhase::Preparing,
            (PrintPhase::Preparing, PrintEvent::BackDue) => PrintPhase::Ready,
            (PrintPhase::Ready, PrintEvent::Back) => PrintPhase::Editing,
            (phase, _) => phase,
        }
    }

    pub fn form_hidden(self) -> bool {
        self != PrintPhase::Editing
    }

    pub fn banner_visible(self) -> bool {
        self.form_hidden()
    }

    pub fn print_action_visible(self) -> bool {
        !self.form_hidden()
    }

    pub fn back_visible(self) -> bool {
        self == PrintPhase::Ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintDelays {
    pub dialog: Duration,
    pub back: Duration,
}

impl From<&Config> for PrintDelays {
    fn from(cfg: &Config) -> Self {
        Self {
            dialog: cfg.print_dialog_delay,
            back: cfg.back_delay,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerFired {
    generation: u64,
    event: PrintEvent,
}

/// 定时器来源。每次 arm 都有自己的子 token，
/// 重新 arm / cancel / drop 都会作废还没触发的定时器
pub struct PrintFlow {
    delays: PrintDelays,
    root: CancellationToken,
    armed: Option<CancellationToken>,
    generation: u64,
    tx: mpsc::UnboundedSender<TimerFired>,
    rx: mpsc::UnboundedReceiver<TimerFired>,
}

impl PrintFlow {
    pub fn new(delays: PrintDelays, root: CancellationToken) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delays,
            root,
            armed: None,
            generation: 0,
            tx,
            rx,
        }
    }

    /// 进入 Preparing 时调用：两个定时器都从此刻开始计时
    pub fn arm(&mut self) {
        self.cancel();
        self.generation += 1;
        let token = self.root.child_token();
        spawn_timer(&token, self.delays.dialog, self.tx.clone(), TimerFired {
            generation: self.generation,
            event: PrintEvent::DialogDue,
        });
        spawn_timer(&token, self.delays.back, self.tx.clone(), TimerFired {
            generation: self.generation,
            event: PrintEvent::BackDue,
        });
        tracing::debug!(generation = self.generation, delays = ?self.delays, "打印定时器已启动");
        self.armed = Some(token);
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.armed.take() {
            token.cancel();
            tracing::debug!(generation = self.generation, "打印定时器已取消");
        }
    }

    /// 等下一个有效的定时事件；整体被取消（Ctrl-C）时返回 None
    pub async fn next(&mut self) -> Option<PrintEvent> {
        loop {
            let fired = tokio::select! {
                biased;
                _ = self.root.cancelled() => return None,
                msg = self.rx.recv() => msg?,
            };
            if fired.generation == self.generation {
                return Some(fired.event);
            }
            tracing::debug!(stale = fired.generation, current = self.generation, "丢弃过期定时事件");
        }
    }
}

impl Drop for PrintFlow {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn spawn_timer(
    token: &CancellationToken,
    delay: Duration,
    tx: mpsc::UnboundedSender<TimerFired>,
    fired: TimerFired,
) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                let _ = tx.send(fired);
            }
        }
    });
}

/// 外部打印能力：只负责唤起，不反馈结果
pub trait Printer {
    fn print(&self, page: &Path) -> Result<()>;
}

/// 调用系统打印命令（默认 lp）
pub struct SystemPrinter {
    command: Vec<String>,
}

impl SystemPrinter {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Printer for SystemPrinter {
    fn print(&self, page: &Path) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("未配置打印命令");
        };
        // 不等待子进程结束，与打印对话框一样"发出去就算"
        tokio::process::Command::new(program)
            .args(args)
            .arg(page)
            .spawn()
            .with_context(|| format!("无法启动打印命令 {program}"))?;
        Ok(())
    }
}

/// 从 Preparing 推进到 Ready。打印是否成功不影响状态推进。
/// 两个定时器谁先到都行：打印对话框一定会弹出，即使"返回"已经出现。
/// 返回 false 表示中途被取消
pub async fn drive_to_ready<P: Printer>(
    flow: &mut PrintFlow,
    view: &mut ViewState,
    printer: &P,
    page: &Path,
) -> bool {
    let mut dialog_done = false;
    while view.print == PrintPhase::Preparing || !dialog_done {
        let Some(event) = flow.next().await else {
            return false;
        };
        if event == PrintEvent::DialogDue {
            dialog_done = true;
            match printer.print(page) {
                Ok(()) => tracing::info!(page = %page.display(), "已发送到打印机"),
                Err(e) => tracing::warn!("打印失败: {e:#}"),
            }
        }
        view.apply_print(event);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn delays() -> PrintDelays {
        PrintDelays {
            dialog: Duration::from_secs(2),
            back: Duration::from_secs(4),
        }
    }

    #[derive(Default)]
    struct RecordingPrinter {
        pages: Mutex<Vec<std::path::PathBuf>>,
        fail: bool,
    }

    impl Printer for RecordingPrinter {
        fn print(&self, page: &Path) -> Result<()> {
            self.pages.lock().unwrap().push(page.to_path_buf());
            if self.fail {
                bail!("printer on fire");
            }
            Ok(())
        }
    }

    #[test]
    fn transitions_follow_the_print_cycle() {
        use PrintEvent::*;
        use PrintPhase::*;
        assert_eq!(Editing.next(Print), Preparing);
        assert_eq!(Preparing.next(DialogDue), Preparing);
        assert_eq!(Preparing.next(BackDue), Ready);
        assert_eq!(Ready.next(Back), Editing);
    }

    #[test]
    fn illegal_events_are_ignored() {
        use PrintEvent::*;
        use PrintPhase::*;
        assert_eq!(Editing.next(Back), Editing);
        assert_eq!(Editing.next(BackDue), Editing);
        assert_eq!(Preparing.next(Print), Preparing);
        assert_eq!(Preparing.next(Back), Preparing);
        assert_eq!(Ready.next(Print), Ready);
    }

    #[test]
    fn visibility_flags_per_phase() {
        let e = PrintPhase::Editing;
        assert!(!e.form_hidden() && e.print_action_visible() && !e.back_visible() && !e.banner_visible());
        let p = PrintPhase::Preparing;
        assert!(p.form_hidden() && !p.print_action_visible() && !p.back_visible() && p.banner_visible());
        let r = PrintPhase::Ready;
        assert!(r.form_hidden() && r.back_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_after_configured_delays() {
        let mut flow = PrintFlow::new(delays(), CancellationToken::new());
        let start = Instant::now();
        flow.arm();

        assert_eq!(flow.next().await, Some(PrintEvent::DialogDue));
        assert_eq!(start.elapsed().as_secs(), 2);
        assert_eq!(flow.next().await, Some(PrintEvent::BackDue));
        assert_eq!(start.elapsed().as_secs(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn print_scenario_end_to_end() {
        let mut view = ViewState::new(&Config::default());
        view.set_ssid("HomeNet");
        view.set_password("letmein123");
        view.submit().unwrap();

        let printer = RecordingPrinter::default();
        let mut flow = PrintFlow::new(delays(), CancellationToken::new());
        let page = Path::new("/tmp/page.png");

        view.apply_print(PrintEvent::Print);
        assert!(view.print.form_hidden());
        assert!(view.print.banner_visible());
        assert!(!view.print.back_visible());
        flow.arm();

        let start = Instant::now();
        assert!(drive_to_ready(&mut flow, &mut view, &printer, page).await);
        assert_eq!(start.elapsed().as_secs(), 4);
        assert_eq!(printer.pages.lock().unwrap().as_slice(), [page.to_path_buf()]);
        assert!(view.print.back_visible());

        view.apply_print(PrintEvent::Back);
        flow.cancel();
        assert_eq!(view.print, PrintPhase::Editing);
        assert!(!view.print.form_hidden());
        assert!(!view.print.back_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn printer_runs_even_when_back_is_due_first() {
        let quick_back = PrintDelays {
            dialog: Duration::from_secs(2),
            back: Duration::from_secs(1),
        };
        let mut view = ViewState::new(&Config::default());
        let printer = RecordingPrinter::default();
        let mut flow = PrintFlow::new(quick_back, CancellationToken::new());
        view.apply_print(PrintEvent::Print);
        flow.arm();

        let start = Instant::now();
        assert!(drive_to_ready(&mut flow, &mut view, &printer, Path::new("p.png")).await);
        assert_eq!(start.elapsed().as_secs(), 2);
        assert_eq!(printer.pages.lock().unwrap().len(), 1);
        assert_eq!(view.print, PrintPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn equal_delays_still_print_once() {
        let same = PrintDelays {
            dialog: Duration::from_secs(3),
            back: Duration::from_secs(3),
        };
        let mut view = ViewState::new(&Config::default());
        let printer = RecordingPrinter::default();
        let mut flow = PrintFlow::new(same, CancellationToken::new());
        view.apply_print(PrintEvent::Print);
        flow.arm();

        assert!(drive_to_ready(&mut flow, &mut view, &printer, Path::new("p.png")).await);
        assert_eq!(printer.pages.lock().unwrap().len(), 1);
        assert_eq!(view.print, PrintPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn printer_failure_does_not_stop_the_flow() {
        let mut view = ViewState::new(&Config::default());
        let printer = RecordingPrinter {
            fail: true,
            ..Default::default()
        };
        let mut flow = PrintFlow::new(delays(), CancellationToken::new());
        view.apply_print(PrintEvent::Print);
        flow.arm();
        assert!(drive_to_ready(&mut flow, &mut view, &printer, Path::new("p.png")).await);
        assert_eq!(view.print, PrintPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let mut flow = PrintFlow::new(delays(), CancellationToken::new());
        flow.arm();
        flow.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(flow.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_restarts_the_clock() {
        let mut flow = PrintFlow::new(delays(), CancellationToken::new());
        let start = Instant::now();
        flow.arm();
        tokio::time::sleep(Duration::from_secs(1)).await;
        flow.arm();
        assert_eq!(flow.next().await, Some(PrintEvent::DialogDue));
        assert_eq!(start.elapsed().as_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_generation_is_dropped() {
        let mut flow = PrintFlow::new(delays(), CancellationToken::new());
        flow.arm();
        flow.tx
            .send(TimerFired {
                generation: 0,
                event: PrintEvent::BackDue,
            })
            .unwrap();
        assert_eq!(flow.next().await, Some(PrintEvent::DialogDue));
    }

    #[tokio::test(start_paused = true)]
    async fn root_cancellation_ends_the_wait() {
        let root = CancellationToken::new();
        let mut flow = PrintFlow::new(delays(), root.clone());
        let mut view = ViewState::new(&Config::default());
        view.apply_print(PrintEvent::Print);
        flow.arm();
        root.cancel();
        let printer = RecordingPrinter::default();
        assert!(!drive_to_ready(&mut flow, &mut view, &printer, Path::new("p.png")).await);
        assert!(printer.pages.lock().unwrap().is_empty());
        assert_eq!(view.print, PrintPhase::Preparing);
    }
}
