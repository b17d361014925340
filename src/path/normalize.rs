//! Separator conversion and dot-segment canonicalization.
//!
//! Normalization is purely lexical. It never consults the filesystem and it
//! does not reject malformed input beyond the empty string; syntax problems
//! are reported by [`super::format`], which runs first.

use crate::platform::PlatformProfile;
use crate::{AppError, Result};

/// Normalize `path` under the rules of `profile`.
///
/// Windows: `/` becomes `\`, `.`/`..` are collapsed, the drive letter is
/// uppercased, and UNC prefixes keep exactly two leading backslashes with
/// the server and share segments left verbatim. POSIX: `\` becomes `/` and
/// `.`/`..` are collapsed. Trailing separators are dropped except on a root.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` if `path` is empty.
pub fn normalize(path: &str, profile: &PlatformProfile) -> Result<String> {
    if path.is_empty() {
        return Err(AppError::InvalidArgument("path must be a non-empty string".into()));
    }

    let separator = profile.separator();
    let converted = path.replace(profile.foreign_separator(), &separator.to_string());

    if profile.is_windows() {
        Ok(normalize_windows(&converted))
    } else {
        Ok(normalize_posix(&converted))
    }
}

/// Resolve `path` against `base` (or the current directory) and normalize.
///
/// Absolute paths are normalized as-is; `base` is ignored for them.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` if `path` is empty, or `AppError::Io`
/// if the current directory is needed and cannot be read.
pub fn resolve_relative(
    path: &str,
    base: Option<&str>,
    profile: &PlatformProfile,
) -> Result<String> {
    if path.is_empty() {
        return Err(AppError::InvalidArgument("path must be a non-empty string".into()));
    }

    if profile.is_absolute(path) {
        return normalize(path, profile);
    }

    let base = match base.filter(|base| !base.is_empty()) {
        Some(base) => base.to_owned(),
        None => std::env::current_dir()
            .map_err(|err| AppError::Io(format!("cannot read current directory: {err}")))?
            .to_string_lossy()
            .into_owned(),
    };

    let joined = format!("{base}{}{path}", profile.separator());
    normalize(&joined, profile)
}

fn normalize_posix(path: &str) -> String {
    let rooted = path.starts_with('/');
    let segments = collapse(path.split('/'), rooted);

    match (rooted, segments.is_empty()) {
        (true, _) => format!("/{}", segments.join("/")),
        (false, true) => ".".to_owned(),
        (false, false) => segments.join("/"),
    }
}

fn normalize_windows(path: &str) -> String {
    if path.starts_with(r"\\") {
        return normalize_unc(path);
    }

    let (prefix, rest) = split_drive(path);
    let rooted = rest.starts_with('\\');
    let segments = collapse(rest.split('\\'), rooted);
    let body = segments.join("\\");

    match (rooted, body.is_empty(), prefix.is_empty()) {
        (true, _, _) => format!("{prefix}\\{body}"),
        (false, true, true) => ".".to_owned(),
        (false, _, _) => format!("{prefix}{body}"),
    }
}

fn normalize_unc(path: &str) -> String {
    let trimmed = path.trim_start_matches('\\');
    let mut parts = trimmed.splitn(3, '\\');
    let server = parts.next().unwrap_or_default();
    let share = parts.next();
    let remainder = parts.next().unwrap_or_default();

    let Some(share) = share else {
        return format!(r"\\{server}");
    };

    let segments = collapse(remainder.split('\\'), true);
    if segments.is_empty() {
        format!(r"\\{server}\{share}")
    } else {
        format!(r"\\{server}\{share}\{}", segments.join("\\"))
    }
}

/// Split a leading `X:` off `path`, uppercasing the letter.
fn split_drive(path: &str) -> (String, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let letter = char::from(bytes[0].to_ascii_uppercase());
        (format!("{letter}:"), &path[2..])
    } else {
        (String::new(), path)
    }
}

/// Drop empty and `.` segments and resolve `..` against its predecessor.
///
/// On a rooted path `..` cannot climb past the root and is discarded; on a
/// relative path leading `..` segments are preserved.
fn collapse<'a>(segments: impl Iterator<Item = &'a str>, rooted: bool) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ if rooted => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}
