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
** Created on: 2026-06-16T09:54:18
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use libc::pid_t;

/// On-disk record of the managed process id
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record {
    /// no file, nothing was started
    Absent,
    /// recorded process id
    Pid(pid_t),
    /// file exists but does not name a process
    Corrupt,
}

/// The pid record of one managed service
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record, distinguishing absence from garbage
    pub fn read(&self) -> io::Result<Record> {
        match fs::read_to_string(&self.path) {
            Ok(data) => Ok(match data.trim().parse::<pid_t>() {
                Ok(pid) if pid > 0 => Record::Pid(pid),
                _ => Record::Corrupt,
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Record::Absent),
            Err(err) => Err(err),
        }
    }

    /// Write the record through a temporary file renamed in place
    ///
    /// Readers never observe a partially written record
    pub fn write(&self, pid: pid_t) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            writeln!(file, "{pid}")?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move {} in place", tmp.display()))?;
        Ok(())
    }

    /// Remove the record, tolerating prior removal
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err)
                .with_context(|| format!("failed to remove {}", self.path.display())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mktemp::MkTemp;
    use anyhow::Result;

    #[test]
    fn read_write_cycle() -> Result<()> {
        let tmp = MkTemp::dir("svctl-pidfile")?;
        let pidfile = PidFile::new(tmp.path().join("worker.pid"));

        assert_eq!(pidfile.read()?, Record::Absent);

        pidfile.write(4242)?;
        assert_eq!(pidfile.read()?, Record::Pid(4242));
        assert_eq!(fs::read_to_string(pidfile.path())?, "4242\n");
        assert!(!tmp.path().join("worker.tmp").exists());

        pidfile.write(17)?;
        assert_eq!(pidfile.read()?, Record::Pid(17));

        pidfile.remove()?;
        assert_eq!(pidfile.read()?, Record::Absent);
        pidfile.remove()?;
        Ok(())
    }

    #[test]
    fn garbage_records() -> Result<()> {
        let tmp = MkTemp::dir("svctl-pidfile")?;
        let pidfile = PidFile::new(tmp.path().join("worker.pid"));

        for garbage in ["", "bogus", "-3", "0", "12 13"] {
            fs::write(pidfile.path(), garbage)?;
            assert_eq!(pidfile.read()?, Record::Corrupt, "garbage: {garbage:?}");
        }

        fs::write(pidfile.path(), " 4242\n")?;
        assert_eq!(pidfile.read()?, Record::Pid(4242));
        Ok(())
    }
}
