//! How every command prints: framed sections for people at a terminal,
//! plain rows when piped, or JSON.
//!
//! The mode is picked once per invocation. `--format` beats `--json`, which
//! beats `FORMAT` and the user config `output` key. With none of those set,
//! a terminal gets [`OutputMode::Pretty`] and a pipe gets [`OutputMode::Text`].
//!
//! Results go to stdout, errors to stderr, in the same mode.

use cabin_core::PortalError;
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(PRETTY_RULE_WIDTH))
}

/// Heading line underlined by a rule.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<12} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and rules for reading at a terminal.
    Pretty,
    /// One record per line.
    Text,
    Json,
}

impl OutputMode {
    /// Parse the already-resolved config string; unknown values fall back to text.
    pub fn from_resolved(value: &str) -> Self {
        match value {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

pub fn resolve_output_mode(format_flag: Option<OutputMode>, resolved: &str) -> OutputMode {
    format_flag.unwrap_or_else(|| OutputMode::from_resolved(resolved))
}

/// What a failed command reports, in any mode.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code, when the failure came from the portal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }
}

impl From<&PortalError> for CliError {
    fn from(err: &PortalError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        err.downcast_ref::<PortalError>()
            .map_or_else(|| Self::new(format!("{err:#}")), Self::from)
    }
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Print `value` as JSON, or through `human_fn` in both human modes.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if mode == OutputMode::Json {
        return write_json(&mut out, value);
    }
    human_fn(value, &mut out)?;
    Ok(())
}

/// Like [`render`], with a separate layout for text and pretty modes.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => return write_json(&mut out, value),
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// A one-line confirmation; `{"ok": true, "message": ...}` in JSON.
pub fn render_success(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if mode == OutputMode::Json {
        return write_json(&mut out, &serde_json::json!({ "ok": true, "message": message }));
    }
    writeln!(out, "✓ {message}")?;
    Ok(())
}

pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    write_error(mode, error, &mut io::stderr().lock())
}

fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        return write_json(out, &serde_json::json!({ "error": error }));
    }
    match &error.error_code {
        Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
        None => writeln!(out, "error: {}", error.message)?,
    }
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_wins_over_resolved_config() {
        assert_eq!(resolve_output_mode(Some(OutputMode::Text), "json"), OutputMode::Text);
        assert_eq!(resolve_output_mode(None, "json"), OutputMode::Json);
        assert_eq!(resolve_output_mode(None, "pretty"), OutputMode::Pretty);
        assert_eq!(resolve_output_mode(None, "bogus"), OutputMode::Text);
    }

    #[test]
    fn portal_errors_carry_code_and_hint() {
        let err = PortalError::ThreadLocked("TH-003".into());
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2004"));
        assert!(cli.suggestion.is_some());
        assert!(cli.message.contains("TH-003"));
    }

    #[test]
    fn anyhow_errors_downcast_to_portal_errors() {
        let err = anyhow::Error::from(PortalError::NoSession);
        assert_eq!(CliError::from(&err).error_code.as_deref(), Some("E1001"));

        let other = anyhow::anyhow!("disk on fire");
        let cli = CliError::from(&other);
        assert_eq!(cli.message, "disk on fire");
        assert!(cli.error_code.is_none());
    }

    #[test]
    fn human_error_includes_code_and_suggestion() {
        let mut buf = Vec::new();
        let err = CliError::from(&PortalError::NoSession);
        write_error(OutputMode::Text, &err, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("error[E1001]: no session user"));
        assert!(text.contains("suggestion: Run `cabin session demo`"));
    }

    #[test]
    fn uncoded_error_prints_plain_prefix() {
        let mut buf = Vec::new();
        write_error(OutputMode::Pretty, &CliError::new("disk on fire"), &mut buf).expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "error: disk on fire\n");
    }

    #[test]
    fn json_error_is_wrapped() {
        let mut buf = Vec::new();
        write_error(OutputMode::Json, &CliError::new("boom"), &mut buf).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["error"]["message"], "boom");
        assert!(value["error"].get("error_code").is_none());
    }
}
