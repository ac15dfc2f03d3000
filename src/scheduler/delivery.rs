//! Reminder delivery.

use crate::datetime::DisplayTimezone;
use crate::types::Task;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Application name shown in desktop notifications.
pub const APP_NAME: &str = "DailyTaskReminder";

/// How long a desktop notifier process may run before it is killed.
const DESKTOP_TIMEOUT: Duration = Duration::from_secs(5);

const BOLD: &str = "\x1b[1m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

/// Something that can surface a reminder to a human.
///
/// Implementations should return quickly. The scheduler marks the task
/// notified whatever the outcome.
pub trait Deliver: Send + Sync {
    fn deliver(&self, task: &Task) -> DeliveryOutcome;
}

impl<F> Deliver for F
where
    F: Fn(&Task) -> DeliveryOutcome + Send + Sync,
{
    fn deliver(&self, task: &Task) -> DeliveryOutcome {
        self(task)
    }
}

/// Stream the terminal alert goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalTarget {
    #[default]
    Stdout,
    /// Used when stdout carries a protocol stream.
    Stderr,
}

/// Terminal alert plus a best-effort desktop popup.
#[derive(Debug)]
pub struct Notifier {
    app_name: String,
    timezone: DisplayTimezone,
    target: TerminalTarget,
    desktop: bool,
    notify_send: OnceLock<Option<PathBuf>>,
}

impl Notifier {
    pub fn new(timezone: DisplayTimezone) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            timezone,
            target: TerminalTarget::default(),
            desktop: true,
            notify_send: OnceLock::new(),
        }
    }

    pub fn with_target(mut self, target: TerminalTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_desktop(mut self, enabled: bool) -> Self {
        self.desktop = enabled;
        self
    }

    /// One-line alert text, without styling.
    pub fn alert_line(&self, task: &Task) -> String {
        match task.due_at {
            Some(due) => format!("[REMINDER] {} (due: {})", task.title, self.timezone.format(&due)),
            None => format!("[REMINDER] {}", task.title),
        }
    }

    fn desktop_body(&self, task: &Task) -> String {
        let mut body = task.title.clone();
        if let Some(due) = task.due_at {
            body.push_str(&format!("\nDue: {}", self.timezone.format(&due)));
        }
        if let Some(desc) = task.description.as_deref().filter(|d| !d.is_empty()) {
            body.push('\n');
            body.push_str(desc);
        }
        body
    }

    fn write_terminal(&self, task: &Task) -> std::io::Result<()> {
        let line = self.alert_line(task);
        match self.target {
            TerminalTarget::Stdout => {
                let out = std::io::stdout();
                let styled = out.is_terminal();
                write_alert(&mut out.lock(), &line, styled)
            }
            TerminalTarget::Stderr => {
                let err = std::io::stderr();
                let styled = err.is_terminal();
                write_alert(&mut err.lock(), &line, styled)
            }
        }
    }

    fn notify_send(&self) -> Option<&PathBuf> {
        self.notify_send
            .get_or_init(|| {
                let found = which::which("notify-send").ok();
                debug!(found = found.is_some(), "Probed for notify-send");
                found
            })
            .as_ref()
    }

    fn send_desktop(&self, task: &Task) {
        let Some(program) = self.notify_send() else {
            return;
        };

        let spawned = Command::new(program)
            .arg(&self.app_name)
            .arg(self.desktop_body(task))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Failed to launch notify-send");
                return;
            }
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        warn!(task_id = %task.id, %status, "notify-send exited with failure");
                    }
                    return;
                }
                Ok(None) if started.elapsed() >= DESKTOP_TIMEOUT => {
                    warn!(task_id = %task.id, "notify-send timed out, killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(25)),
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "Failed to wait for notify-send");
                    return;
                }
            }
        }
    }
}

impl Deliver for Notifier {
    fn deliver(&self, task: &Task) -> DeliveryOutcome {
        if let Err(e) = self.write_terminal(task) {
            return DeliveryOutcome::Failed(format!("terminal alert failed: {}", e));
        }
        if self.desktop {
            self.send_desktop(task);
        }
        DeliveryOutcome::Delivered
    }
}

fn write_alert<W: Write>(out: &mut W, line: &str, styled: bool) -> std::io::Result<()> {
    if styled {
        let rest = line.strip_prefix("[REMINDER] ").unwrap_or(line);
        writeln!(out, "\n{BOLD}{YELLOW}[REMINDER]{RESET} {BOLD}{rest}{RESET}")?;
    } else {
        writeln!(out, "{}", line)?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskStatus;
    use chrono::{TimeZone, Utc};

    fn task(due: bool) -> Task {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        Task {
            id: "0123456789abcdef0123456789abcdef".to_string(),
            title: "Water plants".to_string(),
            description: Some("balcony".to_string()),
            due_at: due.then_some(at),
            remind_at: Some(at),
            status: TaskStatus::Pending,
            notified: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn alert_line_includes_due_in_display_timezone() {
        let notifier = Notifier::new(DisplayTimezone::Utc);
        assert_eq!(
            notifier.alert_line(&task(true)),
            "[REMINDER] Water plants (due: 2025-03-01 09:30 UTC)"
        );
        assert_eq!(notifier.alert_line(&task(false)), "[REMINDER] Water plants");
    }

    #[test]
    fn desktop_body_lists_due_and_description() {
        let notifier = Notifier::new(DisplayTimezone::Utc);
        assert_eq!(
            notifier.desktop_body(&task(true)),
            "Water plants\nDue: 2025-03-01 09:30 UTC\nbalcony"
        );
    }

    #[test]
    fn plain_alert_has_no_escape_codes() {
        let mut buf = Vec::new();
        write_alert(&mut buf, "[REMINDER] x", false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[REMINDER] x\n");

        let mut styled = Vec::new();
        write_alert(&mut styled, "[REMINDER] x", true).unwrap();
        assert!(String::from_utf8(styled).unwrap().contains(YELLOW));
    }

    #[test]
    fn closures_deliver() {
        let failing = |_: &Task| DeliveryOutcome::Failed("nope".into());
        assert_eq!(failing.deliver(&task(false)), DeliveryOutcome::Failed("nope".into()));
    }
}
