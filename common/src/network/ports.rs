//! Port list syntax, e.g. `22,80,443,8080-8090`.

use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::PortSpecError;

/// A sorted, duplicate-free set of TCP ports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortSet(BTreeSet<u16>);

impl PortSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }

    pub fn to_vec(&self) -> Vec<u16> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<PortSet> for Vec<u16> {
    fn from(set: PortSet) -> Self {
        set.0.into_iter().collect()
    }
}

impl FromStr for PortSet {
    type Err = PortSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ports = BTreeSet::new();

        for part in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_port(start)?;
                    let end = parse_port(end)?;
                    if start > end {
                        return Err(PortSpecError::Reversed(part.to_string()));
                    }
                    ports.extend(start..=end);
                }
                None => {
                    ports.insert(parse_port(part)?);
                }
            }
        }

        if ports.is_empty() {
            return Err(PortSpecError::Empty);
        }
        Ok(Self(ports))
    }
}

fn parse_port(s: &str) -> Result<u16, PortSpecError> {
    let s = s.trim();
    let port = s
        .parse::<u16>()
        .map_err(|_| PortSpecError::Invalid(s.to_string()))?;
    if port == 0 {
        return Err(PortSpecError::Zero);
    }
    Ok(port)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
