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
** Created on: 2026-06-19T16:40:22
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use libc::{gid_t, uid_t};

use crate::utils::libc::{chown, getgrnam, getpwnam, initgroups, setgid, setuid};

/// Resolved run-as identity
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    user: Option<String>,
    uid: Option<uid_t>,
    gid: Option<gid_t>,
}

impl Identity {
    /// Resolve the configured user/group names
    ///
    /// `None` when no identity change is requested
    pub fn resolve(user: Option<&str>, group: Option<&str>) -> Result<Option<Self>> {
        if user.is_none() && group.is_none() {
            return Ok(None);
        }
        let mut ident = Self {
            user: user.map(str::to_owned),
            uid: None,
            gid: None,
        };
        if let Some(name) = user {
            let (uid, gid) = getpwnam(name)?.ok_or_else(|| anyhow!("unknown user: {name}"))?;
            ident.uid = Some(uid);
            ident.gid = Some(gid);
        }
        if let Some(name) = group {
            ident.gid = Some(getgrnam(name)?.ok_or_else(|| anyhow!("unknown group: {name}"))?);
        }
        Ok(Some(ident))
    }

    /// Drop privileges, group ids first while we still can
    pub fn apply(&self) -> Result<()> {
        if let Some(gid) = self.gid {
            setgid(gid).context("failed to switch group")?;
            if let Some(user) = self.user.as_deref() {
                initgroups(user, gid).context("failed to set supplementary groups")?;
            }
        }
        if let Some(uid) = self.uid {
            setuid(uid).context("failed to switch user")?;
        }
        Ok(())
    }

    /// Hand a controller-created file or directory over to this identity
    pub fn chown(&self, path: &Path) -> Result<()> {
        // MAX leaves the id unchanged
        chown(
            path,
            self.uid.unwrap_or(uid_t::MAX),
            self.gid.unwrap_or(gid_t::MAX),
        )
        .with_context(|| format!("failed to chown {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::libc::{geteuid, getpwuid};
    use anyhow::Result;

    #[test]
    fn no_identity() -> Result<()> {
        assert_eq!(Identity::resolve(None, None)?, None);
        Ok(())
    }

    #[test]
    fn current_user() -> Result<()> {
        let name = getpwuid(geteuid())?.expect("current user should have a passwd entry");
        let ident = Identity::resolve(Some(&name), None)?.expect("identity expected");

        assert_eq!(ident.uid, Some(geteuid()));
        assert!(ident.gid.is_some());
        Ok(())
    }

    #[test]
    fn unknown_names() {
        assert!(
            Identity::resolve(Some("no-such-user-svctl"), None)
                .is_err_and(|err| err.to_string().contains("no-such-user-svctl"))
        );
        assert!(Identity::resolve(None, Some("no-such-group-svctl")).is_err());
    }
}
