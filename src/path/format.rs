//! Syntax validation of raw path strings.
//!
//! Pure and synchronous: nothing here touches the filesystem. Rules come
//! from the injected [`PlatformProfile`].

use crate::models::{ErrorCode, PathError, PathWarning, WarningCode};
use crate::platform::{PathLengthLimit, PlatformProfile};

/// Errors and warnings produced by [`validate_format`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatReport {
    /// Blocking problems.
    pub errors: Vec<PathError>,
    /// Advisories.
    pub warnings: Vec<PathWarning>,
}

impl FormatReport {
    /// True iff no errors were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check `path` against the syntax rules of `profile`.
///
/// Empty input and embedded null bytes short-circuit; every other rule is
/// evaluated and all findings are accumulated.
#[must_use]
pub fn validate_format(path: &str, profile: &PlatformProfile) -> FormatReport {
    let mut report = FormatReport::default();

    if path.is_empty() {
        report.errors.push(
            PathError::new(ErrorCode::InvalidInput, "Path must be a non-empty string")
                .with_suggestions(["Provide the path to a repository directory"]),
        );
        return report;
    }

    if path.contains('\0') {
        report.errors.push(
            PathError::new(ErrorCode::NullByteInPath, "Path contains a null byte")
                .with_suggestions(["Remove the null character from the path"]),
        );
        return report;
    }

    check_length(path, profile, &mut report);

    if profile.is_windows() {
        check_components(path, profile, &mut report);
        check_drive_letter(path, &mut report);
        check_characters(path, profile, &mut report);
        check_unc(path, &mut report);
    }

    report
}

fn check_length(path: &str, profile: &PlatformProfile, report: &mut FormatReport) {
    let length = path.chars().count();
    match profile.path_length() {
        PathLengthLimit::Hard(limit) if length > limit => {
            report.errors.push(
                PathError::new(
                    ErrorCode::PathTooLong,
                    format!("Path exceeds the maximum length of {limit} characters"),
                )
                .with_details(format!("Current length: {length}"))
                .with_suggestions([
                    "Move the repository closer to the drive root",
                    "Enable long path support in Windows",
                ]),
            );
        }
        PathLengthLimit::Advisory(limit) if length > limit => {
            report.warnings.push(PathWarning::new(
                WarningCode::VeryLongPath,
                format!("Path is longer than {limit} characters and may cause problems"),
                Some(format!("Current length: {length}")),
            ));
        }
        _ => {}
    }
}

fn check_components(path: &str, profile: &PlatformProfile, report: &mut FormatReport) {
    let components = path
        .split(['\\', '/'])
        .filter(|component| !component.is_empty() && *component != "." && *component != "..");

    for component in components {
        if profile.is_reserved_name(component) {
            report.errors.push(
                PathError::new(
                    ErrorCode::ReservedName,
                    format!("'{component}' is a reserved name on Windows"),
                )
                .with_details(component.to_owned())
                .with_suggestions(["Rename the file or directory"]),
            );
        }

        if let Some(limit) = profile.max_component_length() {
            let length = component.chars().count();
            if length > limit {
                report.warnings.push(PathWarning::new(
                    WarningCode::ComponentTooLong,
                    format!("Path component exceeds {limit} characters"),
                    Some(format!("Component length: {length}")),
                ));
            }
        }

        if component.ends_with(' ') || component.ends_with('.') {
            report.errors.push(
                PathError::new(
                    ErrorCode::InvalidComponentEnding,
                    "Path components cannot end with a space or a dot on Windows",
                )
                .with_details(component.to_owned())
                .with_suggestions(["Remove the trailing space or dot"]),
            );
        }
    }
}

/// Length of a well-formed `X:` prefix, if `path` starts with one.
fn valid_drive_prefix(path: &str) -> Option<usize> {
    let bytes = path.as_bytes();
    let has_letter = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if !has_letter {
        return None;
    }
    match bytes.get(2) {
        None | Some(b'\\' | b'/') => Some(2),
        Some(_) => None,
    }
}

fn check_drive_letter(path: &str, report: &mut FormatReport) {
    let mut chars = path.chars();
    let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
        return;
    };
    if second != ':' {
        return;
    }

    let malformed = if first.is_ascii_alphabetic() {
        valid_drive_prefix(path).is_none()
    } else {
        true
    };

    if malformed {
        report.errors.push(
            PathError::new(ErrorCode::InvalidDriveLetter, "Invalid drive letter format")
                .with_details(path.chars().take(3).collect::<String>())
                .with_suggestions([r"Use the form C:\path\to\repository"]),
        );
    }
}

fn check_characters(path: &str, profile: &PlatformProfile, report: &mut FormatReport) {
    let remainder = valid_drive_prefix(path).map_or(path, |prefix| &path[prefix..]);

    let mut offending: Vec<char> = Vec::new();
    for ch in remainder.chars() {
        if profile.forbidden_chars().contains(&ch) && !offending.contains(&ch) {
            offending.push(ch);
        }
    }

    if !offending.is_empty() {
        let listed = offending
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        report.errors.push(
            PathError::new(ErrorCode::InvalidCharacters, "Path contains invalid characters")
                .with_details(format!("Invalid characters: {listed}"))
                .with_suggestions([r#"Remove the characters < > : " | ? *"#]),
        );
    }

    if path.chars().any(|ch| ch < '\u{20}') {
        report.errors.push(
            PathError::new(ErrorCode::ControlCharacters, "Path contains control characters")
                .with_suggestions(["Remove non-printable characters from the path"]),
        );
    }
}

fn check_unc(path: &str, report: &mut FormatReport) {
    if !path.starts_with(r"\\") || path.starts_with(r"\\\") {
        return;
    }

    let mut parts = path[2..].split(['\\', '/']);
    let server = parts.next().unwrap_or_default();
    let share = parts.next().unwrap_or_default();

    if server.is_empty() || share.is_empty() {
        report.errors.push(
            PathError::new(ErrorCode::InvalidUncPath, "Invalid UNC path format")
                .with_details(path.to_owned())
                .with_suggestions([r"Use the form \\server\share\path"]),
        );
    }
}
