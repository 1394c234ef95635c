//! Candidate resolution: which ports are worth probing, and in what order.
//!
//! Aliases matching an [`IdentifierPattern`] are probed first and exclusively.
//! Only when the alias namespace is missing or has no match does the resolver
//! fall back to every raw port the host lists.

use {
    crate::{
        device::{AliasNamespace, DeviceIdentifier, IdentifierPattern},
        error::Result,
        port::PortEnumerator,
    },
    log::{debug, info},
    serde::Serialize,
    std::{collections::HashSet, fmt},
};

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Provenance {
    /// A stable alias matched an identifier pattern.
    Alias,
    /// The raw port list, used when no alias matched.
    Fallback,
    /// Named directly by the caller.
    Explicit,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alias => "alias",
            Self::Fallback => "fallback",
            Self::Explicit => "explicit",
        })
    }
}

/// Probe priority; lower ranks are probed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    /// Narrowed through the alias namespace.
    Narrowed,
    /// From the raw fallback list.
    Fallback,
}

/// A port considered for probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Raw port address.
    pub address: String,
    /// Alias the address was found through, if any.
    pub identifier: Option<DeviceIdentifier>,
    /// Narrowed or fallback.
    pub provenance: Provenance,
}

impl Candidate {
    /// Create a candidate.
    pub fn new(
        address: impl Into<String>,
        identifier: Option<DeviceIdentifier>,
        provenance: Provenance,
    ) -> Self {
        Self {
            address: address.into(),
            identifier,
            provenance,
        }
    }

    /// Probe priority implied by the provenance.
    pub fn priority(&self) -> Priority {
        match self.provenance {
            Provenance::Alias | Provenance::Explicit => Priority::Narrowed,
            Provenance::Fallback => Priority::Fallback,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{} ({}, {})", self.address, id, self.provenance),
            None => write!(f, "{} ({})", self.address, self.provenance),
        }
    }
}

/// Build the ordered candidate list.
///
/// The alias namespace is read first. The raw port list is only queried when
/// the namespace is unavailable or none of its aliases match `patterns`. Each
/// address appears at most once.
pub fn resolve_candidates<E, A>(
    enumerator: &E,
    aliases: &A,
    patterns: &[IdentifierPattern],
) -> Result<Vec<Candidate>>
where
    E: PortEnumerator + ?Sized,
    A: AliasNamespace + ?Sized,
{
    let mut seen = HashSet::new();

    match aliases.aliases()? {
        Some(aliases) => {
            let narrowed: Vec<Candidate> = aliases
                .into_iter()
                .filter(|alias| {
                    patterns
                        .iter()
                        .any(|p| p.matches(&alias.identifier))
                })
                .filter(|alias| seen.insert(alias.target.clone()))
                .map(|alias| Candidate::new(alias.target, Some(alias.identifier), Provenance::Alias))
                .collect();

            if !narrowed.is_empty() {
                info!("{} candidate(s) from stable identifiers", narrowed.len());
                return Ok(narrowed);
            }
            debug!("No alias matched the laser identifier patterns");
        },
        None => debug!("Alias namespace unavailable"),
    }

    let fallback: Vec<Candidate> = enumerator
        .list_ports()?
        .into_iter()
        .filter(|port| seen.insert(port.name.clone()))
        .map(|port| {
            debug!("Fallback candidate {port}");
            Candidate::new(port.name, None, Provenance::Fallback)
        })
        .collect();

    info!("{} candidate(s) from the raw port list", fallback.len());
    Ok(fallback)
}
