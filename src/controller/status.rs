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
** Created on: 2026-06-17T15:28:47
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use colored::Colorize;
use libc::pid_t;
use serde::{Deserialize, Serialize};

use crate::utils::IS_OUT_COLORED;

/// Observable service state
///
/// Maps onto the conventional init-script status codes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RunState {
    /// record present, process alive and matching
    Running(pid_t),
    /// record present but its process is gone or unrelated
    Stale(Option<pid_t>),
    /// no record
    NotRunning,
    /// liveness or identity cannot be determined
    Unknown,
}

impl RunState {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunState::Running(_) => 0,
            RunState::Stale(_) => 1,
            RunState::NotRunning => 3,
            RunState::Unknown => 4,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RunState::Running(pid) => format!("running (pid {pid})"),
            RunState::Stale(Some(pid)) => format!("dead, pid file still names {pid}"),
            RunState::Stale(None) => String::from("dead, unreadable pid file"),
            RunState::NotRunning => String::from("not running"),
            RunState::Unknown => String::from("unknown"),
        };
        if IS_OUT_COLORED.get() {
            f.write_str(&match self {
                RunState::Running(_) => text.green().to_string(),
                RunState::Stale(_) => text.red().to_string(),
                RunState::NotRunning => text.bright_black().to_string(),
                RunState::Unknown => text.bright_yellow().to_string(),
            })
        } else {
            f.write_str(&text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(RunState::Running(42).exit_code(), 0);
        assert_eq!(RunState::Stale(Some(42)).exit_code(), 1);
        assert_eq!(RunState::Stale(None).exit_code(), 1);
        assert_eq!(RunState::NotRunning.exit_code(), 3);
        assert_eq!(RunState::Unknown.exit_code(), 4);
    }

    #[test]
    fn display() {
        IS_OUT_COLORED.set(false);
        assert_eq!(RunState::Running(42).to_string(), "running (pid 42)");
        assert_eq!(
            RunState::Stale(Some(42)).to_string(),
            "dead, pid file still names 42"
        );
        assert_eq!(RunState::NotRunning.to_string(), "not running");
    }

    #[test]
    fn serde() {
        let state = RunState::Running(42);
        let data = serde_yaml_ng::to_string(&state).unwrap();
        assert_eq!(
            serde_yaml_ng::from_str::<RunState>(&data).unwrap(),
            state
        );
    }
}
