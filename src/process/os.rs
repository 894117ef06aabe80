/*
** Copyright (C) 2026 Sylvain Fargier
**
** This software is provided 'as-is', without any express or implied
** warranty.  In no event will the authors be held liable for any damages
** arising from the use of this software.
**
** Permission is granted to anyone to use this software for any purpose,
** including commercial applications, and to alter it and redistribute it
** freely, subject to the following restrictions:
**
** 1. The origin of this software must not be misrepresented; you must not
**    claim that you wrote the original software. If you use this software
**    in a product, an acknowledgment in the product documentation would be
**    appreciated but is not required.
** 2. Altered source versions must be plainly marked as such, and must not be
**    misrepresented as being the original software.
** 3. This notice may not be removed or altered from any source distribution.
**
** Created on: 2026-06-18T10:32:09
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    fs::OpenOptions,
    io::{ErrorKind, Read, Write},
    os::unix::process::CommandExt,
    path::Path,
    process,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use libc::pid_t;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};

use super::{Identity, POLL_INTERVAL, ProcessHandle, WaitOutcome};
use crate::{
    config::Config,
    utils::{
        libc::{access, waitpid},
        signal::{Signal, SignalSet},
    },
};

/// Process attached by pid
///
/// Spawned daemons lead their own session, the stored pid doubles as the
/// process-group id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OsProcess {
    pid: pid_t,
}

impl OsProcess {
    fn refresh(&self, kind: ProcessRefreshKind) -> System {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[Pid::from(self.pid as usize)]),
            false,
            kind,
        );
        system
    }

    /// An orphan nobody reaps stays in the table as a zombie
    fn is_zombie(&self) -> bool {
        self.refresh(ProcessRefreshKind::nothing())
            .process(Pid::from(self.pid as usize))
            .is_some_and(|proc| {
                matches!(proc.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
            })
    }

    /// Runs on the forked child, returns only when exec failed
    fn child_exec(config: &Config, identity: Option<&Identity>) -> std::io::Error {
        if unsafe { libc::setsid() } < 0 {
            return std::io::Error::last_os_error();
        }
        // the daemon must start from default signal dispositions
        if let Err(err) = SignalSet::full().restore() {
            return std::io::Error::other(format!("failed to restore signals: {err}"));
        }
        if let Some(identity) = identity
            && let Err(err) = identity.apply()
        {
            return std::io::Error::other(format!("{err:#}"));
        }

        let mut cmd = process::Command::new(&config.daemon.path);
        cmd.args(&config.daemon.args).stdin(process::Stdio::null());
        match config.log_file.as_ref() {
            Some(path) => {
                let file = match OpenOptions::new().append(true).create(true).open(path) {
                    Ok(file) => file,
                    Err(err) => return err,
                };
                let clone = match file.try_clone() {
                    Ok(clone) => clone,
                    Err(err) => return err,
                };
                cmd.stdout(file).stderr(clone);
            }
            None => {
                cmd.stdout(process::Stdio::null())
                    .stderr(process::Stdio::null());
            }
        }
        if let Some(workdir) = config.workdir.as_ref() {
            cmd.current_dir(workdir);
        }
        if let Some(env) = config.daemon.env.as_ref() {
            cmd.env_clear();
            cmd.envs(env);
        }
        cmd.exec()
    }
}

impl ProcessHandle for OsProcess {
    fn adopt(pid: pid_t) -> Self {
        Self { pid }
    }

    #[tracing::instrument(skip(config, identity), fields(daemon = ?config.daemon.path))]
    fn spawn(config: &Config, identity: Option<&Identity>) -> Result<Self> {
        let path = config.daemon.path.as_path();
        // bare names go through PATH at exec time, skip the early check
        if path.components().count() > 1 {
            access(path, libc::X_OK)
                .with_context(|| format!("cannot execute {}", path.display()))?;
        }

        // close-on-exec pipe, only an exec failure can reach the parent
        let (mut rx, mut tx) = std::io::pipe().context("failed to create pipe")?;
        match unsafe { libc::fork() } {
            x if x < 0 => Err(std::io::Error::last_os_error()).context("failed to fork"),
            0 => {
                drop(rx);
                let err = Self::child_exec(config, identity);
                tracing::error!(?err, "failed to start daemon");
                let _ = tx.write_all(&err.raw_os_error().unwrap_or(0).to_ne_bytes());
                drop(tx);
                unsafe { libc::_exit(127) }
            }
            pid => {
                drop(tx);
                let mut errno = [0u8; 4];
                match rx.read_exact(&mut errno) {
                    Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                        tracing::debug!(pid, "daemon spawned");
                        Ok(Self { pid })
                    }
                    Ok(()) => {
                        waitpid(pid, true);
                        let errno = i32::from_ne_bytes(errno);
                        let err = if errno != 0 {
                            anyhow::Error::from(std::io::Error::from_raw_os_error(errno))
                        } else {
                            anyhow::anyhow!("daemon setup failed before exec")
                        };
                        Err(err).with_context(|| {
                            format!("failed to spawn {}", config.daemon.path.display())
                        })
                    }
                    Err(err) => Err(err).context("failed to read spawn status"),
                }
            }
        }
    }

    fn pid(&self) -> pid_t {
        self.pid
    }

    fn is_alive(&self) -> bool {
        // collect the zombie when the target happens to be our own child
        waitpid(self.pid, false);
        Signal::exists(self.pid) && !self.is_zombie()
    }

    fn matches(&self, daemon: &Path) -> Option<bool> {
        let system = self.refresh(ProcessRefreshKind::nothing().with_exe(UpdateKind::Always));
        let proc = system.process(Pid::from(self.pid as usize))?;
        let configured = daemon.file_name()?;

        if let Some(exe) = proc.exe() {
            if exe == daemon {
                return Some(true);
            }
            if let Ok(canonical) = daemon.canonicalize()
                && exe == canonical
            {
                return Some(true);
            }
            if exe.file_name() == Some(configured) {
                return Some(true);
            }
        }
        // scripts run through an interpreter, their exe is the shell while
        // the process name still carries the script, possibly truncated
        let name = proc.name().to_string_lossy();
        let configured = configured.to_string_lossy();
        if !name.is_empty()
            && (configured == name || (name.len() >= 15 && configured.starts_with(name.as_ref())))
        {
            return Some(true);
        }
        if proc.exe().is_some() {
            Some(false)
        } else {
            None
        }
    }

    #[tracing::instrument(skip(self), fields(pid = self.pid))]
    fn send_signal(&self, signal: Signal) -> Result<()> {
        // adopted pids may not lead a group of their own
        Signal::killpg(self.pid, signal).or_else(|_| Signal::kill(self.pid, signal))
    }

    fn wait(&self, timeout: Duration) -> WaitOutcome {
        let start = Instant::now();
        loop {
            if !self.is_alive() {
                return WaitOutcome::Exited;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return WaitOutcome::TimedOut;
            }
            std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Daemon;
    use crate::utils::mktemp::MkTemp;
    use crate::utils::signal::{SIGKILL, SIGTERM};
    use anyhow::Result;
    use serial_test::serial;

    #[ctor::ctor]
    fn prepare() {
        use tracing_subscriber::{
            EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
        };
        Registry::default()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .ok();
    }

    fn sleeper() -> Config {
        Config {
            daemon: Daemon {
                path: "sleep".into(),
                args: vec!["300".into()],
                env: None,
            },
            pidfile: "/tmp/unused.pid".into(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    #[serial(spawn)]
    fn spawn_lifecycle() -> Result<()> {
        let proc = OsProcess::spawn(&sleeper(), None)?;

        assert!(proc.pid() > 0);
        assert!(proc.is_alive());

        proc.send_signal(SIGTERM)?;
        assert_eq!(proc.wait(Duration::from_secs(5)), WaitOutcome::Exited);
        assert!(!proc.is_alive());
        Ok(())
    }

    #[test]
    #[serial(spawn)]
    fn wait_timeout() -> Result<()> {
        let proc = OsProcess::spawn(&sleeper(), None)?;

        assert_eq!(proc.wait(Duration::from_millis(150)), WaitOutcome::TimedOut);

        proc.send_signal(SIGKILL)?;
        assert_eq!(proc.wait(Duration::from_secs(5)), WaitOutcome::Exited);
        Ok(())
    }

    #[test]
    #[serial(spawn)]
    fn process_identity() -> Result<()> {
        let proc = OsProcess::spawn(&sleeper(), None)?;

        assert_eq!(proc.matches(Path::new("sleep")), Some(true));
        assert_eq!(proc.matches(Path::new("/opt/other/binary")), Some(false));

        proc.send_signal(SIGKILL)?;
        assert_eq!(proc.wait(Duration::from_secs(5)), WaitOutcome::Exited);
        Ok(())
    }

    #[test]
    #[serial(spawn)]
    fn workdir_and_log() -> Result<()> {
        let tmp = MkTemp::dir("svctl-spawn")?;
        let log_file = tmp.path().join("daemon.log");
        let mut config = sleeper();
        config.daemon = Daemon {
            path: "sh".into(),
            args: vec!["-c".into(), "pwd; sleep 300".into()],
            env: None,
        };
        config.workdir = Some(tmp.path().to_path_buf());
        config.log_file = Some(log_file.clone());

        let proc = OsProcess::spawn(&config, None)?;
        let needle = tmp.path().canonicalize()?.display().to_string();
        let mut logged = String::new();
        for _ in 0..50 {
            logged = std::fs::read_to_string(&log_file).unwrap_or_default();
            if logged.contains(&needle) {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        proc.send_signal(SIGKILL)?;
        assert_eq!(proc.wait(Duration::from_secs(5)), WaitOutcome::Exited);
        assert!(logged.contains(&needle), "log: {logged:?}");
        Ok(())
    }

    #[test]
    #[serial(spawn)]
    fn spawn_failures() {
        let mut config = sleeper();
        config.daemon.path = "/no/such/svctl-daemon".into();
        assert!(
            OsProcess::spawn(&config, None)
                .is_err_and(|err| format!("{err:#}").contains("cannot execute"))
        );

        // bare names are only resolved at exec time
        config.daemon.path = "svctl-no-such-daemon".into();
        assert!(
            OsProcess::spawn(&config, None)
                .is_err_and(|err| format!("{err:#}").contains("failed to spawn"))
        );
    }

    #[test]
    fn adopt_dead() -> Result<()> {
        let mut child = process::Command::new("true")
            .stdout(process::Stdio::null())
            .spawn()?;
        let pid = child.id() as pid_t;
        child.wait()?;

        let proc = OsProcess::adopt(pid);
        assert!(!proc.is_alive());
        assert_eq!(proc.wait(Duration::from_millis(10)), WaitOutcome::Exited);
        Ok(())
    }
}
