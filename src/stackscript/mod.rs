//! StackScript references and their resolution against the remote catalog.

use std::fmt;

use tracing::info;

use crate::config::ConfigError;
use crate::error::{DriverError, Stage};
use crate::linode::{ComputeApi, StackScriptFilter, Stackscript};

/// Catalog entry a reference resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackScript {
    /// Catalog identifier.
    pub id: u64,
    /// Owning account.
    pub owner: String,
    /// Script label.
    pub label: String,
}

impl From<Stackscript> for StackScript {
    fn from(value: Stackscript) -> Self {
        Self {
            id: value.id,
            owner: value.username,
            label: value.label,
        }
    }
}

impl fmt::Display for StackScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.owner, self.label, self.id)
    }
}

/// StackScript named in the configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StackScriptRef {
    /// Concrete catalog identifier.
    Id(u64),
    /// Owner and label that still need a catalog lookup.
    Named {
        /// Owning account.
        owner: String,
        /// Script label.
        label: String,
    },
    /// Reference already resolved against the catalog.
    Resolved(StackScript),
}

impl StackScriptRef {
    /// Parses `<owner>/<label>` or a positive decimal identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedStackScript`] for any other shape,
    /// including an identifier of zero or one that overflows `u64`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedStackScript(raw.to_owned());
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            let id = trimmed.parse::<u64>().map_err(|_| malformed())?;
            if id == 0 {
                return Err(malformed());
            }
            return Ok(Self::Id(id));
        }

        let (owner, label) = trimmed.split_once('/').ok_or_else(malformed)?;
        if owner.is_empty() || label.is_empty() || label.contains('/') {
            return Err(malformed());
        }
        Ok(Self::Named {
            owner: owner.to_owned(),
            label: label.to_owned(),
        })
    }

    /// Returns the catalog identifier when it is already known.
    #[must_use]
    pub const fn id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Resolved(script) => Some(script.id),
            Self::Named { .. } => None,
        }
    }
}

impl fmt::Display for StackScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Named { owner, label } => write!(f, "{owner}/{label}"),
            Self::Resolved(script) => fmt::Display::fmt(script, f),
        }
    }
}

/// Resolves `reference` to a concrete catalog entry.
///
/// Identifiers are fetched directly and never trigger a catalog listing.
/// Named references list entries filtered by label and pick the first one
/// whose owner matches exactly, because the API does not guarantee the owner
/// filter is applied server side.
///
/// # Errors
///
/// Returns [`DriverError::NotFound`] when no entry matches and
/// [`DriverError::Provider`] for any other API failure.
pub async fn resolve<A>(api: &A, reference: &StackScriptRef) -> Result<StackScript, DriverError>
where
    A: ComputeApi + ?Sized,
{
    let script = match reference {
        StackScriptRef::Resolved(script) => return Ok(script.clone()),
        StackScriptRef::Id(id) => api
            .get_stackscript(*id)
            .await
            .map(StackScript::from)
            .map_err(|err| {
                if err.is_not_found() {
                    not_found(reference)
                } else {
                    DriverError::provider(Stage::GetStackScript, err)
                }
            })?,
        StackScriptRef::Named { owner, label } => {
            let filter = StackScriptFilter {
                username: owner.clone(),
                label: label.clone(),
            };
            let candidates = api
                .list_stackscripts(&filter)
                .await
                .map_err(|err| DriverError::provider(Stage::ListStackScripts, err))?;
            candidates
                .into_iter()
                .find(|candidate| candidate.username == *owner)
                .map(StackScript::from)
                .ok_or_else(|| not_found(reference))?
        }
    };
    info!(stackscript = %script, "using StackScript");
    Ok(script)
}

fn not_found(reference: &StackScriptRef) -> DriverError {
    DriverError::NotFound {
        resource: format!("StackScript {reference}"),
    }
}
