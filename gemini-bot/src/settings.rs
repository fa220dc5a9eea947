//! Admin list and system instruction, persisted in a key-value env file.
//!
//! Values are swapped whole ([`ArcSwap`]); readers never observe a partial update. Every write goes to
//! the env file first and is then re-read, so the in-memory values always mirror the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use gemini_client::InstructionSource;
use thiserror::Error;
use tracing::{info, warn};

pub const ADMINS_KEY: &str = "ADMINS";
pub const INSTRUCTION_KEY: &str = "SYSTEM_INSTRUCTION";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read env file {path}: {source}")]
    Read {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("failed to write env file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Process-wide bot settings. Admin id 0 in the list is the owner.
pub struct BotSettings {
    env_file: PathBuf,
    admins: ArcSwap<Vec<i64>>,
    instruction: ArcSwap<Option<String>>,
}

impl BotSettings {
    /// Loads from `env_file`; keys missing from the file fall back to the process environment.
    pub fn load(env_file: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let env_file = env_file.into();
        let (admins, instruction) = read_values(&env_file)?;
        info!(
            env_file = %env_file.display(),
            admins = ?admins,
            has_instruction = instruction.is_some(),
            "Settings loaded"
        );
        Ok(Self {
            env_file,
            admins: ArcSwap::from_pointee(admins),
            instruction: ArcSwap::from_pointee(instruction),
        })
    }

    pub fn admins(&self) -> Arc<Vec<i64>> {
        self.admins.load_full()
    }

    pub fn owner(&self) -> Option<i64> {
        self.admins.load().first().copied()
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.load().contains(&user_id)
    }

    pub fn instruction(&self) -> Option<String> {
        self.instruction.load().as_ref().clone()
    }

    /// Persists a new admin list and reloads.
    pub fn replace_admins(&self, admins: Vec<i64>) -> Result<(), SettingsError> {
        let value = admins
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write_key(&self.env_file, ADMINS_KEY, &value)?;
        self.reload()
    }

    /// Persists a new system instruction (empty clears it) and reloads.
    pub fn replace_instruction(&self, instruction: &str) -> Result<(), SettingsError> {
        write_key(&self.env_file, INSTRUCTION_KEY, &quote(instruction))?;
        self.reload()
    }

    /// Re-reads the env file and swaps in its values.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let (admins, instruction) = read_values(&self.env_file)?;
        self.admins.store(Arc::new(admins));
        self.instruction.store(Arc::new(instruction));
        Ok(())
    }
}

impl InstructionSource for BotSettings {
    fn system_instruction(&self) -> Option<String> {
        self.instruction()
    }
}

/// Comma-separated ids; anything that is not a number is skipped.
pub fn parse_admins(value: &str) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::new();
    for id in value.split(',').filter_map(|s| s.trim().parse::<i64>().ok()) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn read_values(path: &Path) -> Result<(Vec<i64>, Option<String>), SettingsError> {
    let mut file_values: HashMap<String, String> = HashMap::new();
    if path.exists() {
        let iter = dotenvy::from_path_iter(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        for item in iter {
            let (key, value) = item.map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            file_values.insert(key, value);
        }
    }
    let lookup = |key: &str| {
        file_values
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    };
    let admins = lookup(ADMINS_KEY)
        .map(|v| parse_admins(&v))
        .unwrap_or_default();
    let instruction = lookup(INSTRUCTION_KEY).filter(|s| !s.trim().is_empty());
    Ok((admins, instruction))
}

/// Double-quotes a value using the escapes the env-file parser understands.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Sets `key=value` in the env file, replacing an existing assignment or appending one.
fn write_key(path: &Path, key: &str, value: &str) -> Result<(), SettingsError> {
    let write_err = |source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    };
    let existing = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(write_err(e)),
    };

    let line = format!("{}={}", key, value);
    let mut replaced = false;
    let mut lines: Vec<String> = Vec::new();
    for l in existing.lines() {
        let assigned = l
            .trim_start()
            .strip_prefix("export ")
            .unwrap_or(l.trim_start())
            .split_once('=')
            .map(|(k, _)| k.trim() == key)
            .unwrap_or(false);
        if assigned {
            if !replaced {
                lines.push(line.clone());
                replaced = true;
            }
        } else {
            lines.push(l.to_string());
        }
    }
    if !replaced {
        lines.push(line);
    }

    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content).map_err(write_err)?;
    if !replaced {
        warn!(key = key, env_file = %path.display(), "key was not in env file; appended");
    }
    Ok(())
}
