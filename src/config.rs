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
** Created on: 2026-06-16T14:21:55
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::utils::signal::{SIGKILL, SIGTERM, Signal};

/// Environment override for the configuration file location
pub const CONFIG_ENV: &str = "SVCTL_CONFIG";

const CONFIG_FILE: &str = "svctl.yml";

/// Command to run as the managed daemon
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Daemon {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Replaces the inherited environment when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

/// One stage of the stop escalation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopStage {
    pub signal: Signal,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopPolicy {
    /// Signals sent in order, each given `timeout` to take effect
    pub escalation: Vec<StopStage>,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            escalation: vec![
                StopStage {
                    signal: SIGTERM,
                    timeout: Duration::from_secs(30),
                },
                StopStage {
                    signal: SIGKILL,
                    timeout: Duration::from_secs(5),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name, defaults to the daemon's file name
    pub name: String,
    /// Daemon to manage
    pub daemon: Daemon,
    /// Daemon state directory, created on start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    /// Run-as user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Run-as group, defaults to the user's primary group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Process-id record location
    pub pidfile: PathBuf,
    /// Daemon stdout/stderr destination, discarded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub stop: StopPolicy,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml_ng::from_str::<Self>(&data)
            .with_context(|| format!("invalid configuration in {}", path.display()))?
            .validate()
    }

    pub fn validate(mut self) -> Result<Self> {
        if self.daemon.path.as_os_str().is_empty() {
            return Err(anyhow!("invalid daemon, missing `path`"));
        } else if self.pidfile.as_os_str().is_empty() {
            return Err(anyhow!("`pidfile` missing"));
        }
        if self.name.is_empty() {
            self.name = self
                .daemon
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| String::from("daemon"));
        }
        if self.stop.escalation.is_empty() {
            self.stop.escalation = StopPolicy::default().escalation;
        }
        Ok(self)
    }

    /// Locate the configuration file
    ///
    /// `--config` and `SVCTL_CONFIG` are taken as-is, the usual locations
    /// are probed otherwise.
    pub fn locate(arg: Option<PathBuf>) -> Option<PathBuf> {
        arg.or_else(|| {
            env::var_os(CONFIG_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .or_else(|| {
            first_existing([
                Some(PathBuf::from(CONFIG_FILE)),
                dirs::config_dir().map(|dir| dir.join("svctl").join("config.yml")),
                Some(PathBuf::from("/etc/svctl.yml")),
            ])
        })
    }
}

fn first_existing<I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = Option<PathBuf>>,
{
    paths.into_iter().flatten().find(|path| path.is_file())
}
