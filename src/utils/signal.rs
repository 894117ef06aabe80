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
** Created on: 2026-06-17T19:08:54
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{fmt::Debug, ops::Deref, ptr::null_mut, sync::LazyLock};

use anyhow::{Result, anyhow};

/// POSIX Signal wrapper
#[derive(Clone, Copy, PartialEq)]
pub struct Signal(pub libc::c_int);

pub const SIGKILL: Signal = Signal(libc::SIGKILL);
pub const SIGTERM: Signal = Signal(libc::SIGTERM);

const NAMES: &[(libc::c_int, &str)] = &[
    (libc::SIGHUP, "HUP"),
    (libc::SIGINT, "INT"),
    (libc::SIGQUIT, "QUIT"),
    (libc::SIGKILL, "KILL"),
    (libc::SIGUSR1, "USR1"),
    (libc::SIGUSR2, "USR2"),
    (libc::SIGTERM, "TERM"),
    (libc::SIGCONT, "CONT"),
    (libc::SIGSTOP, "STOP"),
];

static FULL_SET: LazyLock<SignalSet> = LazyLock::new(|| {
    SignalSet(unsafe {
        let mut sigset: libc::sigset_t = std::mem::zeroed();
        libc_check(libc::sigfillset(&mut sigset)).unwrap();
        // remove signals that can't be controlled from the set
        libc_check(libc::sigdelset(&mut sigset, libc::SIGSTOP)).unwrap();
        libc_check(libc::sigdelset(&mut sigset, libc::SIGKILL)).unwrap();
        #[cfg(target_os = "macos")]
        libc_check(libc::sigdelset(&mut sigset, 32)).unwrap();
        sigset
    })
});

impl Signal {
    pub fn kill(pid: libc::pid_t, signal: Signal) -> Result<()> {
        unsafe { libc_check(libc::kill(pid, *signal)) }
    }

    /// Deliver to a whole process group
    pub fn killpg(pgid: libc::pid_t, signal: Signal) -> Result<()> {
        unsafe { libc_check(libc::killpg(pgid, *signal)) }
    }

    /// Probe for process existence
    ///
    /// A permission error still proves the process exists
    pub fn exists(pid: libc::pid_t) -> bool {
        if unsafe { libc::kill(pid, 0) } == 0 {
            true
        } else {
            std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
        }
    }

    pub fn set_handler(&self, handler: usize) -> Result<()> {
        let ret = unsafe { libc::signal(self.0, handler) };
        libc_check(if ret == libc::SIG_ERR { -1 } else { 0 })
    }

    fn name(&self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(num, _)| *num == self.0)
            .map(|(_, name)| *name)
    }
}

impl Deref for Signal {
    type Target = libc::c_int;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "SIG{name}"),
            None => write!(f, "SIG({})", self.0),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl std::str::FromStr for Signal {
    type Err = anyhow::Error;

    /// Parse a signal name (`TERM`, `SIGTERM`, any case) or raw number
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim();
        // get() keeps multi-byte input from splitting mid-character
        let name = match name.get(..3) {
            Some(prefix) if prefix.eq_ignore_ascii_case("SIG") => &name[3..],
            _ => name,
        };
        if let Some((num, _)) = NAMES.iter().find(|(_, n)| name.eq_ignore_ascii_case(n)) {
            return Ok(Signal(*num));
        }
        match name.parse::<libc::c_int>() {
            Ok(num) if num > 0 => Ok(Signal(num)),
            _ => Err(anyhow!("unknown signal: {value}")),
        }
    }
}

impl serde::Serialize for Signal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.name() {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_i32(self.0),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Signal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SignalVisitor;

        impl<'de> serde::de::Visitor<'de> for SignalVisitor {
            type Value = Signal;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a signal name (\"TERM\") or number")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match libc::c_int::try_from(value) {
                    Ok(num) if num > 0 => Ok(Signal(num)),
                    _ => Err(serde::de::Error::custom(format!("unknown signal: {value}"))),
                }
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match libc::c_int::try_from(value) {
                    Ok(num) if num > 0 => Ok(Signal(num)),
                    _ => Err(serde::de::Error::custom(format!("unknown signal: {value}"))),
                }
            }
        }
        deserializer.deserialize_any(SignalVisitor)
    }
}

/// assert for libc functions
fn libc_check(res: libc::c_int) -> Result<()> {
    if res != 0 {
        let err = std::io::Error::last_os_error();
        tracing::trace_span!("libc_check", ?err);
        Err(err.into())
    } else {
        Ok(())
    }
}

pub struct SignalSet(pub libc::sigset_t);

impl Debug for SignalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SignalSet")
            .field(&format_args!("{:X}", unsafe {
                *(&self.0 as *const _ as *const u32)
            }))
            .finish()
    }
}

impl SignalSet {
    /// Build a full-set
    pub fn full() -> Self {
        Self(FULL_SET.0)
    }

    /// Build an empty set
    pub fn empty() -> Self {
        Self(unsafe {
            let mut set: libc::sigset_t = std::mem::zeroed();
            libc_check(libc::sigemptyset(&mut set)).unwrap();
            set
        })
    }

    /// Unblock signals in the set
    #[tracing::instrument(level = "TRACE")]
    pub fn unblock(&self) -> Result<()> {
        unsafe {
            libc_check(libc::pthread_sigmask(
                libc::SIG_UNBLOCK,
                &self.0,
                null_mut(),
            ))
        }
    }

    pub fn iter<'a>(&'a self) -> SignalSetIterator<'a> {
        SignalSetIterator {
            index: 0,
            sigset: self,
        }
    }

    /// Reset handlers to their default disposition and unblock the set
    #[tracing::instrument(level = "TRACE")]
    pub fn restore(&self) -> Result<()> {
        for sig in self {
            sig.set_handler(libc::SIG_DFL)
                .inspect_err(|err| tracing::error!(?sig, ?err, "failed to reset handler"))?;
        }
        self.unblock()
    }
}

impl Default for SignalSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::ops::Add<Signal> for SignalSet {
    type Output = SignalSet;

    /// Add a signal in the set
    fn add(self, rhs: Signal) -> Self::Output {
        unsafe {
            let mut ret = self;
            libc_check(libc::sigaddset(&mut ret.0, *rhs)).unwrap();
            ret
        }
    }
}

impl std::ops::Sub<Signal> for SignalSet {
    type Output = SignalSet;

    fn sub(self, rhs: Signal) -> Self::Output {
        unsafe {
            let mut ret = self;
            libc_check(libc::sigdelset(&mut ret.0, *rhs)).unwrap();
            ret
        }
    }
}

pub struct SignalSetIterator<'a> {
    index: u8,
    sigset: &'a SignalSet,
}

impl Iterator for SignalSetIterator<'_> {
    type Item = Signal;

    fn next(&mut self) -> Option<Self::Item> {
        for i in self.index..32 {
            if unsafe { libc::sigismember(&self.sigset.0, i as i32) } == 1 {
                self.index = i + 1;
                return Some(Signal(i as i32));
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a SignalSet {
    type Item = Signal;
    type IntoIter = SignalSetIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::libc::getpid;
    use anyhow::Result;

    #[test]
    fn debug() {
        assert_eq!(format!("{:?}", SIGTERM), "SIGTERM");
        assert_eq!(format!("{}", SIGKILL), "SIGKILL");
        assert_eq!(format!("{:?}", Signal(64)), "SIG(64)");
    }

    #[test]
    fn parse() -> Result<()> {
        assert_eq!("TERM".parse::<Signal>()?, SIGTERM);
        assert_eq!("sigkill".parse::<Signal>()?, SIGKILL);
        assert_eq!("Sigterm".parse::<Signal>()?, SIGTERM);
        assert_eq!("HUP".parse::<Signal>()?, Signal(libc::SIGHUP));
        assert_eq!("10".parse::<Signal>()?, Signal(10));
        assert!("WHATEVER".parse::<Signal>().is_err());
        assert!("T€RM".parse::<Signal>().is_err());
        assert!("-2".parse::<Signal>().is_err());
        Ok(())
    }

    #[test]
    fn serde() -> Result<()> {
        assert_eq!(serde_yaml_ng::to_string(&SIGTERM)?, "TERM\n");
        assert_eq!(serde_yaml_ng::from_str::<Signal>("KILL")?, SIGKILL);
        assert_eq!(serde_yaml_ng::from_str::<Signal>("9")?, Signal(9));
        assert!(serde_yaml_ng::from_str::<Signal>("0").is_err());
        assert!(serde_yaml_ng::from_str::<Signal>("-9").is_err());
        assert!(serde_yaml_ng::from_str::<Signal>("99999999999").is_err());
        Ok(())
    }

    #[test]
    fn exists() {
        assert!(Signal::exists(getpid()));
        assert!(!Signal::exists(libc::pid_t::MAX));
    }

    #[test]
    fn signalset() {
        let (usr1, usr2) = (Signal(libc::SIGUSR1), Signal(libc::SIGUSR2));
        let sigset = SignalSet::default() + usr1 + usr2;

        let sigs: Vec<Signal> = sigset.iter().collect();
        assert_eq!(sigs.as_slice(), &[usr1, usr2]);

        let sigset = sigset - usr2;
        assert_eq!(sigset.iter().count(), 1);
    }
}
