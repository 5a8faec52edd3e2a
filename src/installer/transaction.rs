//! Rollback-on-drop swap of a staged package into the store
//!
//! ## Usage
//!
//! ```ignore
//! let mut transaction = InstallTransaction::new(&target, &backup_dir);
//! transaction.displace_existing()?;
//! transaction.move_into_place(&staged)?;
//!
//! // On success:
//! transaction.commit();
//!
//! // On error (automatic via Drop if not committed) the previous copy
//! // is restored.
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, install};

#[derive(Debug)]
pub struct InstallTransaction {
    /// Final location of the package
    target: PathBuf,

    /// Where a previous copy is parked while the new one moves in
    backup: PathBuf,

    /// Whether a previous copy was moved to `backup`
    displaced: bool,

    /// Whether the new copy reached `target`
    installed: bool,

    committed: bool,
}

impl InstallTransaction {
    pub fn new(target: &Path, backup: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
            backup: backup.to_path_buf(),
            displaced: false,
            installed: false,
            committed: false,
        }
    }

    /// Move any existing copy of the target aside
    pub fn displace_existing(&mut self) -> Result<()> {
        if !self.target.exists() {
            return Ok(());
        }
        if self.backup.exists() {
            fs::remove_dir_all(&self.backup).map_err(|e| install::store_io(&self.backup, &e))?;
        }
        fs::rename(&self.target, &self.backup).map_err(|e| install::store_io(&self.target, &e))?;
        self.displaced = true;
        Ok(())
    }

    /// Rename the staged directory onto the target
    pub fn move_into_place(&mut self, staged: &Path) -> Result<()> {
        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).map_err(|e| install::store_io(parent, &e))?;
        }
        fs::rename(staged, &self.target).map_err(|e| install::store_io(&self.target, &e))?;
        self.installed = true;
        Ok(())
    }

    /// Keep the new copy and discard the previous one
    pub fn commit(mut self) {
        self.committed = true;
        if self.displaced {
            let _ = fs::remove_dir_all(&self.backup);
        }
    }

    /// Put the previous state back
    pub fn rollback(&mut self) -> Result<()> {
        if self.committed {
            return Ok(());
        }

        if self.installed {
            fs::remove_dir_all(&self.target).map_err(|e| install::store_io(&self.target, &e))?;
            self.installed = false;
        }

        if self.displaced {
            fs::rename(&self.backup, &self.target)
                .map_err(|e| install::store_io(&self.target, &e))?;
            self.displaced = false;
        }

        Ok(())
    }
}

impl Drop for InstallTransaction {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = self.rollback() {
                eprintln!("Warning: Rollback failed: {e}");
            }
        }
    }
}
