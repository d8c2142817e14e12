//! Append-only, hash-chained log of security decisions.
//!
//! Stored at `<state_dir>/lockgate.audit.jsonl`. Each line is one JSON
//! entry carrying the SHA-256 of the previous line, so edits or deletions
//! break the chain. The first entry links to [`GENESIS_HASH`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const AUDIT_FILENAME: &str = "lockgate.audit.jsonl";

/// Chain link used by the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp.
    pub ts: String,
    pub action: AuditAction,
    /// What the decision was about: a command name, config key, URL or session id.
    pub subject: String,
    /// SHA-256 of the previous JSONL line.
    pub prev_entry_sha256: String,
    /// Who triggered it, e.g. `cli`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A new server secret was generated.
    SecretCreated,
    /// A command was refused by lockdown.
    CommandDenied,
    /// A config change was refused by lockdown.
    ConfigChangeDenied,
    /// A config change was applied.
    ConfigChanged,
    /// A CSRF token failed validation.
    CsrfRejected,
    /// A web fetch was refused by policy.
    FetchBlocked,
    /// The previous line was unreadable; a new chain segment starts here.
    ChainRecovery,
}

pub fn append_audit_entry(
    state_dir: &Path,
    action: AuditAction,
    subject: &str,
    source: &str,
) -> Result<()> {
    append_audit_entry_with_detail(state_dir, action, subject, source, None)
}

/// Append an entry, linking it to the last line of the log.
///
/// If the last line is not a valid entry, a `ChainRecovery` entry linking
/// to the raw bytes of that line is written first.
pub fn append_audit_entry_with_detail(
    state_dir: &Path,
    action: AuditAction,
    subject: &str,
    source: &str,
    detail: Option<&str>,
) -> Result<()> {
    let path = audit_file_path(state_dir);

    let prev_hash = match last_line(&path)? {
        Some(line) if serde_json::from_str::<AuditEntry>(&line).is_ok() => {
            sha256_hex(line.as_bytes())
        }
        Some(line) => {
            let recovery = AuditEntry {
                ts: chrono::Utc::now().to_rfc3339(),
                action: AuditAction::ChainRecovery,
                subject: String::new(),
                prev_entry_sha256: sha256_hex(line.as_bytes()),
                source: "audit_system".to_string(),
                detail: Some(format!(
                    "Previous entry corrupted ({} bytes), new chain segment",
                    line.len()
                )),
            };
            let json =
                serde_json::to_string(&recovery).context("Failed to serialize recovery entry")?;
            append_line(&path, &json)?;
            sha256_hex(json.as_bytes())
        }
        None => GENESIS_HASH.to_string(),
    };

    let entry = AuditEntry {
        ts: chrono::Utc::now().to_rfc3339(),
        action,
        subject: subject.to_string(),
        prev_entry_sha256: prev_hash,
        source: source.to_string(),
        detail: detail.map(str::to_string),
    };

    let json = serde_json::to_string(&entry).context("Failed to serialize audit entry")?;
    append_line(&path, &json)
}

fn last_line(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).context("Failed to read audit log")?;
    Ok(content
        .lines()
        .rev()
        .find(|l| !l.is_empty())
        .map(str::to_string))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open audit log")?;
    writeln!(file, "{}", line).context("Failed to write audit entry")?;
    Ok(())
}

/// Read every parseable entry. Corrupted lines are skipped.
pub fn read_audit_log(state_dir: &Path) -> Result<Vec<AuditEntry>> {
    let path = audit_file_path(state_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path).context("Failed to read audit log")?;
    Ok(content
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

/// Return the indices of lines whose chain link does not match.
///
/// Unparseable lines are reported as broken. An empty result means the
/// chain is intact.
pub fn verify_audit_chain(state_dir: &Path) -> Result<Vec<usize>> {
    let path = audit_file_path(state_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&path).context("Failed to read audit log")?;
    let lines: Vec<&str> = content.lines().filter(|l| !l.is_empty()).collect();

    let mut broken = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Ok(entry) = serde_json::from_str::<AuditEntry>(line) else {
            broken.push(i);
            continue;
        };
        let expected = match i {
            0 => GENESIS_HASH.to_string(),
            _ => sha256_hex(lines[i - 1].as_bytes()),
        };
        if entry.prev_entry_sha256 != expected {
            broken.push(i);
        }
    }

    Ok(broken)
}

pub fn audit_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(AUDIT_FILENAME)
}

fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
