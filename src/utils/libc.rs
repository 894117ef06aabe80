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
** Created on: 2026-06-18T11:42:07
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    ffi::{CStr, CString},
    os::unix::ffi::OsStrExt,
    path::Path,
};

use anyhow::{Context, Result};
use libc::{c_char, c_int, gid_t, pid_t, uid_t};

/// assert for libc functions
pub fn check(res: c_int) -> Result<()> {
    if res != 0 {
        let err = std::io::Error::last_os_error();
        tracing::trace_span!("libc_check", ?err);
        Err(err.into())
    } else {
        Ok(())
    }
}

/// assert for libc functions returning an errno value
fn check_ret(res: c_int) -> Result<()> {
    if res != 0 {
        Err(std::io::Error::from_raw_os_error(res).into())
    } else {
        Ok(())
    }
}

fn cstring(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).context("path contains a nul byte")
}

#[allow(dead_code)] // used in tests
pub fn getpid() -> pid_t {
    unsafe { libc::getpid() }
}

#[allow(dead_code)] // used in tests
pub fn geteuid() -> uid_t {
    unsafe { libc::geteuid() }
}

/// Invoke waitpid, reaping the child when it has exited
pub fn waitpid(pid: pid_t, blocking: bool) -> Option<(pid_t, c_int)> {
    let mut status: c_int = 0;
    let ret =
        unsafe { libc::waitpid(pid, &mut status, if blocking { 0 } else { libc::WNOHANG }) };
    if ret > 0 { Some((ret, status)) } else { None }
}

/// Check `path` accessibility, `mode` being `R_OK`, `W_OK`, `X_OK` or `F_OK`
pub fn access(path: &Path, mode: c_int) -> Result<()> {
    let cpath = cstring(path)?;
    check(unsafe { libc::access(cpath.as_ptr(), mode) })
}

/// Change a file's owner, `uid_t::MAX`/`gid_t::MAX` leave the id unchanged
pub fn chown(path: &Path, uid: uid_t, gid: gid_t) -> Result<()> {
    let cpath = cstring(path)?;
    check(unsafe { libc::chown(cpath.as_ptr(), uid, gid) })
}

pub fn setgid(gid: gid_t) -> Result<()> {
    check(unsafe { libc::setgid(gid) })
}

pub fn setuid(uid: uid_t) -> Result<()> {
    check(unsafe { libc::setuid(uid) })
}

pub fn initgroups(user: &str, gid: gid_t) -> Result<()> {
    let cname = CString::new(user).context("user name contains a nul byte")?;
    check(unsafe { libc::initgroups(cname.as_ptr(), gid as _) })
}

/// Lookup a user by name
///
/// Returns its `(uid, primary gid)` when the user exists
pub fn getpwnam(name: &str) -> Result<Option<(uid_t, gid_t)>> {
    let cname = CString::new(name).context("user name contains a nul byte")?;
    let mut buf = vec![0 as c_char; 1024];
    loop {
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let ret = unsafe {
            libc::getpwnam_r(cname.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if ret == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        check_ret(ret)?;
        return Ok((!result.is_null()).then(|| (pwd.pw_uid, pwd.pw_gid)));
    }
}

/// Lookup a user name by id
#[allow(dead_code)] // used in tests
pub fn getpwuid(uid: uid_t) -> Result<Option<String>> {
    let mut buf = vec![0 as c_char; 1024];
    loop {
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let ret = unsafe {
            libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if ret == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        check_ret(ret)?;
        if result.is_null() {
            return Ok(None);
        }
        let name = unsafe { CStr::from_ptr(pwd.pw_name) };
        return Ok(Some(name.to_string_lossy().into_owned()));
    }
}

/// Lookup a group by name
pub fn getgrnam(name: &str) -> Result<Option<gid_t>> {
    let cname = CString::new(name).context("group name contains a nul byte")?;
    let mut buf = vec![0 as c_char; 1024];
    loop {
        let mut grp: libc::group = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::group = std::ptr::null_mut();
        let ret = unsafe {
            libc::getgrnam_r(cname.as_ptr(), &mut grp, buf.as_mut_ptr(), buf.len(), &mut result)
        };
        if ret == libc::ERANGE {
            buf.resize(buf.len() * 2, 0);
            continue;
        }
        check_ret(ret)?;
        return Ok((!result.is_null()).then(|| grp.gr_gid));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn user_lookup() -> Result<()> {
        let name = getpwuid(geteuid())?.expect("current user should have a passwd entry");
        let (uid, _gid) = getpwnam(&name)?.expect("current user should resolve by name");
        assert_eq!(uid, geteuid());

        assert_eq!(getpwnam("no-such-user-svctl")?, None);
        assert_eq!(getgrnam("no-such-group-svctl")?, None);
        Ok(())
    }

    #[test]
    fn access_probe() -> Result<()> {
        access(Path::new("/"), libc::F_OK)?;
        assert!(access(Path::new("/no/such/path"), libc::X_OK).is_err());
        Ok(())
    }
}
