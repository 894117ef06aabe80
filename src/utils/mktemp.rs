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
** Author: Sylvain Fargier <fargier.sylvain@gmail.com>
*/

use std::{
    env::temp_dir,
    fs::create_dir,
    io::{ErrorKind, Result},
    path::{Path, PathBuf},
};

/// Convenience empty struct
///
/// See [MkTemp::dir]
pub struct MkTemp();

/// A temporary directory
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<PathBuf> for TempDir {
    fn as_ref(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.path).expect("failed to remove temporary dir: {self.path}");
    }
}

impl MkTemp {
    /// Create a temporary directory
    ///
    /// The temporary directory is deleted when object is dropped
    pub fn dir(prefix: &str) -> Result<TempDir> {
        let temp_dir = temp_dir();
        let mut suffix = 0;
        loop {
            let path = temp_dir.join(format!("{prefix}-{suffix}"));
            match create_dir(&path) {
                Ok(_) => return Ok(TempDir { path }),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(err) => panic!("failed to create temporary dir: {err}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir() {
        let path: PathBuf = {
            let dir = MkTemp::dir("svctl-test").unwrap();

            assert!(dir.path().exists());
            assert!(dir.path().is_dir());
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
