//! Platform rule sets for path validation.
//!
//! All Windows/POSIX branching lives behind a single [`PlatformProfile`]
//! value that is injected into the engine at construction time, so the
//! format and permission logic is written once against the profile.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Device names Windows refuses as file or directory names.
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters Windows forbids anywhere after the drive prefix.
const WINDOWS_FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Directories that repository roots should never live under on Windows.
const WINDOWS_SYSTEM_DIRS: &[&str] = &[
    r"C:\Windows",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
    r"C:\System Volume Information",
    r"C:\$Recycle.Bin",
];

/// Operating-system family whose path semantics are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Drive letters, UNC shares, reserved device names.
    Windows,
    /// Single root, `/` separator, few name restrictions.
    Posix,
}

/// How the total path length limit is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLengthLimit {
    /// Exceeding the limit is an error (`PATH_TOO_LONG`).
    Hard(usize),
    /// Exceeding the limit only raises a warning (`VERY_LONG_PATH`).
    Advisory(usize),
}

/// Strategy value describing the rules of one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    kind: PlatformKind,
    separator: char,
    foreign_separator: char,
    path_length: PathLengthLimit,
    max_component_length: Option<usize>,
    reserved_names: &'static [&'static str],
    forbidden_chars: &'static [char],
    system_dirs: &'static [&'static str],
}

impl PlatformProfile {
    /// Windows rule set: 260-char paths, reserved names, drive letters, UNC.
    #[must_use]
    pub const fn windows() -> Self {
        Self {
            kind: PlatformKind::Windows,
            separator: '\\',
            foreign_separator: '/',
            path_length: PathLengthLimit::Hard(260),
            max_component_length: Some(255),
            reserved_names: WINDOWS_RESERVED_NAMES,
            forbidden_chars: WINDOWS_FORBIDDEN_CHARS,
            system_dirs: WINDOWS_SYSTEM_DIRS,
        }
    }

    /// POSIX rule set: only an advisory 4096-char length threshold.
    #[must_use]
    pub const fn posix() -> Self {
        Self {
            kind: PlatformKind::Posix,
            separator: '/',
            foreign_separator: '\\',
            path_length: PathLengthLimit::Advisory(4096),
            max_component_length: None,
            reserved_names: &[],
            forbidden_chars: &[],
            system_dirs: &[],
        }
    }

    /// Profile matching the compile target of the running binary.
    ///
    /// Only called explicitly by bootstrap code; the engine itself never
    /// queries the live OS.
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::posix()
        }
    }

    /// Resolve a profile from a platform identifier.
    ///
    /// Accepts `"win32"`/`"windows"` for Windows, `"auto"` for the compile
    /// target, and the usual POSIX identifiers (`"posix"`, `"linux"`,
    /// `"darwin"`, `"macos"`, `"freebsd"`, ...) for POSIX.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an empty identifier.
    pub fn from_name(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::Config("platform name must not be empty".into()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::detect()),
            "win32" | "windows" => Ok(Self::windows()),
            _ => Ok(Self::posix()),
        }
    }

    /// Platform family of this profile.
    #[must_use]
    pub const fn kind(&self) -> PlatformKind {
        self.kind
    }

    /// Whether Windows semantics apply.
    #[must_use]
    pub const fn is_windows(&self) -> bool {
        matches!(self.kind, PlatformKind::Windows)
    }

    /// Native separator.
    #[must_use]
    pub const fn separator(&self) -> char {
        self.separator
    }

    /// Separator that normalization rewrites into [`Self::separator`].
    #[must_use]
    pub const fn foreign_separator(&self) -> char {
        self.foreign_separator
    }

    /// Total path length rule.
    #[must_use]
    pub const fn path_length(&self) -> PathLengthLimit {
        self.path_length
    }

    /// Per-component length above which a warning is raised, if any.
    #[must_use]
    pub const fn max_component_length(&self) -> Option<usize> {
        self.max_component_length
    }

    /// Characters that may not appear outside the drive prefix.
    #[must_use]
    pub const fn forbidden_chars(&self) -> &'static [char] {
        self.forbidden_chars
    }

    /// Stable tag used in cache keys and logs.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self.kind {
            PlatformKind::Windows => "win32",
            PlatformKind::Posix => "posix",
        }
    }

    /// Whether `component` (extension stripped) is a reserved device name.
    #[must_use]
    pub fn is_reserved_name(&self, component: &str) -> bool {
        let stem = component.split('.').next().unwrap_or(component);
        self.reserved_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(stem))
    }

    /// Whether `path` lies inside one of the protected system directories.
    ///
    /// Matching is a case-insensitive prefix test on the raw string.
    #[must_use]
    pub fn is_system_path(&self, path: &str) -> bool {
        let lowered = path.to_lowercase();
        self.system_dirs
            .iter()
            .any(|dir| lowered.starts_with(&dir.to_lowercase()))
    }

    /// Whether `path` is absolute under this profile's rules.
    #[must_use]
    pub fn is_absolute(&self, path: &str) -> bool {
        match self.kind {
            PlatformKind::Posix => path.starts_with('/'),
            PlatformKind::Windows => {
                let bytes = path.as_bytes();
                let drive_rooted = bytes.len() >= 3
                    && bytes[0].is_ascii_alphabetic()
                    && bytes[1] == b':'
                    && (bytes[2] == b'\\' || bytes[2] == b'/');
                drive_rooted || path.starts_with("\\\\") || path.starts_with("//")
            }
        }
    }
}

impl Display for PlatformProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
