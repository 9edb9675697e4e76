//! Per-field answer validation.
//!
//! `apply_answer` checks a user answer against the field's constraint and,
//! on success, writes it into the draft. On failure the draft is untouched.

use url::Url;

use kbuilder_types::build::{BuildConfiguration, BuildField, KsuMode};
use kbuilder_types::error::ValidationError;

use crate::presentation::inbound::{Token, KEYWORD_DEFAULT, KEYWORD_SKIP};

/// URL schemes accepted for the kernel repository.
const REPO_URL_SCHEMES: &[&str] = &["https", "http", "git", "ssh"];

/// Validate `token` for `field` and store it in `draft`.
///
/// - Required fields: non-empty; `default` keeps the current draft value.
///   The repository must look like a URL; branch and container image must
///   not contain whitespace.
/// - Notes: anything; `skip` leaves notes empty.
/// - KernelSU: one of `both`, `sus`, `ksu`, `skip` (`skip` means none).
pub fn apply_answer(
    draft: &mut BuildConfiguration,
    field: BuildField,
    token: &Token,
) -> Result<(), ValidationError> {
    match field {
        BuildField::Notes => {
            draft.notes = if token.is_keyword(KEYWORD_SKIP) {
                String::new()
            } else {
                token.as_str().to_string()
            };
            Ok(())
        }
        BuildField::KsuMode => {
            draft.kernel_su_mode =
                token
                    .as_str()
                    .parse::<KsuMode>()
                    .map_err(|_| ValidationError::UnknownKsuMode {
                        value: token.as_str().to_string(),
                    })?;
            Ok(())
        }
        required => {
            let value = if token.is_keyword(KEYWORD_DEFAULT) {
                draft.value_of(required).to_string()
            } else {
                token.as_str().to_string()
            };
            validate_required(required, &value)?;
            if let Some(slot) = required_slot(draft, required) {
                *slot = value;
            }
            Ok(())
        }
    }
}

fn validate_required(field: BuildField, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: field.label(),
        });
    }

    match field {
        BuildField::KernelRepositoryUrl if !looks_like_repo_url(value) => {
            Err(ValidationError::NotAUrl {
                value: value.to_string(),
            })
        }
        BuildField::KernelBranch | BuildField::ContainerImage
            if value.chars().any(char::is_whitespace) =>
        {
            Err(ValidationError::ContainsWhitespace {
                field: field.label(),
            })
        }
        _ => Ok(()),
    }
}

fn required_slot(draft: &mut BuildConfiguration, field: BuildField) -> Option<&mut String> {
    match field {
        BuildField::Compiler => Some(&mut draft.compiler),
        BuildField::KernelRepositoryUrl => Some(&mut draft.kernel_repository_url),
        BuildField::KernelBranch => Some(&mut draft.kernel_branch),
        BuildField::ContainerImage => Some(&mut draft.container_image),
        BuildField::Notes | BuildField::KsuMode => None,
    }
}

/// Whether `value` looks like a clonable git URL.
///
/// Accepts `scheme://host/path` for the schemes in [`REPO_URL_SCHEMES`] and
/// scp-style `git@host:path`.
pub fn looks_like_repo_url(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }

    if value.contains("://") {
        let Ok(parsed) = Url::parse(value) else {
            return false;
        };
        return REPO_URL_SCHEMES.contains(&parsed.scheme())
            && parsed.host_str().is_some_and(|host| !host.is_empty())
            && !parsed.path().trim_matches('/').is_empty();
    }

    // scp-style remotes are not URLs as far as `Url::parse` is concerned.
    if let Some(rest) = value.strip_prefix("git@") {
        return match rest.split_once(':') {
            Some((host, path)) => !host.is_empty() && !path.is_empty(),
            None => false,
        };
    }

    false
}
