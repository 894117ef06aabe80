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
** Created on: 2026-06-17T11:45:03
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{fs, marker::PhantomData, path::Path};

use anyhow::{Context, Result, anyhow};
use libc::pid_t;

use crate::{
    config::Config,
    pidfile::{PidFile, Record},
    process::{Identity, OsProcess, ProcessHandle, WaitOutcome},
};

mod status;
pub use status::RunState;

/// Result of a state-changing operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// the operation changed the service state
    Done,
    /// the service already was in the requested state
    Unchanged,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Done => 0,
            Outcome::Unchanged => 1,
        }
    }
}

/// What the pid record currently points at
enum Probe<H> {
    /// live managed process
    Live(H),
    /// live process, identity unverifiable
    Unsure(H),
    /// record exists but no matching live process
    Stale(Option<pid_t>),
    /// no record at all
    Absent,
}

/// Service lifecycle controller
///
/// Drives one external daemon through its pid record, every process access
/// goes through the [ProcessHandle] implementation.
pub struct Controller<H = OsProcess>
where
    H: ProcessHandle,
{
    config: Config,
    pidfile: PidFile,
    _handle: PhantomData<H>,
}

impl<H> Controller<H>
where
    H: ProcessHandle,
{
    pub fn new(config: Config) -> Self {
        let pidfile = PidFile::new(config.pidfile.clone());
        Self {
            config,
            pidfile,
            _handle: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[tracing::instrument(fields(name=self.config.name), skip(self))]
    pub fn start(&self) -> Result<Outcome> {
        match self.probe()? {
            Probe::Live(handle) => {
                tracing::info!(pid = handle.pid(), "already running");
                Ok(Outcome::Unchanged)
            }
            Probe::Unsure(handle) => {
                // never risk a second instance behind an unverifiable one
                tracing::warn!(
                    pid = handle.pid(),
                    "pid record owner cannot be verified, not starting"
                );
                Ok(Outcome::Unchanged)
            }
            Probe::Stale(pid) => {
                tracing::warn!(?pid, "removing stale pid record");
                self.pidfile.remove()?;
                self.spawn()
            }
            Probe::Absent => self.spawn(),
        }
    }

    #[tracing::instrument(fields(name=self.config.name), skip(self))]
    pub fn stop(&self) -> Result<Outcome> {
        let handle = match self.probe()? {
            Probe::Live(handle) => handle,
            // the record is ours even when its owner cannot be inspected,
            // an unrelated survivor simply outlives the escalation below
            Probe::Unsure(handle) => handle,
            Probe::Stale(pid) => {
                tracing::info!(?pid, "removing stale pid record");
                self.pidfile.remove()?;
                return Ok(Outcome::Unchanged);
            }
            Probe::Absent => {
                tracing::info!("process (already) stopped");
                return Ok(Outcome::Unchanged);
            }
        };

        let pid = handle.pid();
        for stage in &self.config.stop.escalation {
            tracing::debug!(signal = ?stage.signal, pid, "requesting termination");
            if let Err(err) = handle.send_signal(stage.signal) {
                // racing against process exit, the wait below decides
                tracing::debug!(?err, "signal not delivered");
            }
            if handle.wait(stage.timeout) == WaitOutcome::Exited {
                self.pidfile.remove()?;
                tracing::info!(pid, "process stopped");
                return Ok(Outcome::Done);
            }
            tracing::warn!(
                signal = ?stage.signal,
                pid,
                timeout = %humantime::format_duration(stage.timeout),
                "process still alive"
            );
        }
        // keep the record, the process is still out there
        Err(anyhow!("process {pid} survived the stop escalation"))
    }

    #[tracing::instrument(fields(name=self.config.name), skip(self))]
    pub fn restart(&self) -> Result<Outcome> {
        self.stop().context("failed to stop, not restarting")?;
        self.start()
    }

    #[tracing::instrument(fields(name=self.config.name), skip(self))]
    pub fn status(&self) -> RunState {
        match self.probe() {
            Ok(Probe::Live(handle)) => RunState::Running(handle.pid()),
            Ok(Probe::Unsure(_)) => RunState::Unknown,
            Ok(Probe::Stale(pid)) => RunState::Stale(pid),
            Ok(Probe::Absent) => RunState::NotRunning,
            Err(err) => {
                tracing::warn!(?err, "cannot inspect pid record");
                RunState::Unknown
            }
        }
    }

    fn spawn(&self) -> Result<Outcome> {
        let identity =
            Identity::resolve(self.config.user.as_deref(), self.config.group.as_deref())?;
        self.ensure_dirs(identity.as_ref())?;

        let handle = H::spawn(&self.config, identity.as_ref())?;
        self.pidfile.write(handle.pid())?;
        if let Some(identity) = &identity {
            identity.chown(self.pidfile.path())?;
        }
        tracing::info!(pid = handle.pid(), "process started");
        Ok(Outcome::Done)
    }

    /// Create the daemon state directory and the pid record location
    fn ensure_dirs(&self, identity: Option<&Identity>) -> Result<()> {
        let mut dirs: Vec<&Path> = Vec::with_capacity(2);
        if let Some(workdir) = self.config.workdir.as_deref() {
            dirs.push(workdir);
        }
        if let Some(parent) = self.pidfile.path().parent()
            && !parent.as_os_str().is_empty()
        {
            dirs.push(parent);
        }
        for dir in dirs {
            if !dir.is_dir() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                if let Some(identity) = identity {
                    identity.chown(dir)?;
                }
            }
        }
        Ok(())
    }

    fn probe(&self) -> Result<Probe<H>> {
        let pid = match self.pidfile.read().context("failed to read pid record")? {
            Record::Absent => return Ok(Probe::Absent),
            Record::Corrupt => return Ok(Probe::Stale(None)),
            Record::Pid(pid) => pid,
        };
        let handle = H::adopt(pid);
        if !handle.is_alive() {
            return Ok(Probe::Stale(Some(pid)));
        }
        Ok(match handle.matches(&self.config.daemon.path) {
            // the pid got recycled by an unrelated program
            Some(false) => Probe::Stale(Some(pid)),
            Some(true) => Probe::Live(handle),
            None => Probe::Unsure(handle),
        })
    }
}
