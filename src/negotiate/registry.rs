//! Write-once name registry.
//!
//! Every configuration name is defined at most once per compilation unit.
//! Names the build invocation already defined are tracked separately so
//! overridable constants can adopt them while everything else reports a
//! conflict.

use std::collections::BTreeMap;
use std::fmt;

use crate::negotiate::error::NegotiationError;

/// Who defined a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Defined before negotiation, with its value.
    External(String),
    Flag,
    Constant,
    Shim,
    Marker,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::External(value) if value.is_empty() => write!(f, "external definition"),
            Origin::External(value) => write!(f, "external definition = {}", value),
            Origin::Flag => write!(f, "capability flag"),
            Origin::Constant => write!(f, "derived constant"),
            Origin::Shim => write!(f, "attribute shim"),
            Origin::Marker => write!(f, "attribute marker"),
        }
    }
}

/// Tracks defined names for one negotiation pass.
#[derive(Debug)]
pub struct Registry<'a> {
    prefix: &'a str,
    external: &'a BTreeMap<String, String>,
    defined: BTreeMap<&'static str, Origin>,
}

impl<'a> Registry<'a> {
    /// `external` maps unprefixed names to their pre-existing values.
    pub fn new(prefix: &'a str, external: &'a BTreeMap<String, String>) -> Self {
        Registry {
            prefix,
            external,
            defined: BTreeMap::new(),
        }
    }

    fn qualified(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.prefix, name)
        }
    }

    fn conflict(&self, name: &str, existing: &Origin, attempted: &Origin) -> NegotiationError {
        NegotiationError::ConfigurationConflict {
            name: self.qualified(name),
            existing: existing.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// Fail if `name` is already defined by anyone, without defining it.
    pub fn ensure_undefined(&self, name: &str, origin: &Origin) -> Result<(), NegotiationError> {
        if let Some(value) = self.external.get(name) {
            return Err(self.conflict(name, &Origin::External(value.clone()), origin));
        }
        if let Some(existing) = self.defined.get(name) {
            return Err(self.conflict(name, existing, origin));
        }
        Ok(())
    }

    /// Define `name`; fails if it is already defined by anyone.
    pub fn define(&mut self, name: &'static str, origin: Origin) -> Result<(), NegotiationError> {
        self.ensure_undefined(name, &origin)?;
        self.defined.insert(name, origin);
        Ok(())
    }

    /// Define `name`, ignoring definitions made outside this pass.
    pub fn define_unguarded(
        &mut self,
        name: &'static str,
        origin: Origin,
    ) -> Result<(), NegotiationError> {
        if let Some(existing) = self.defined.get(name) {
            return Err(self.conflict(name, existing, &origin));
        }
        self.defined.insert(name, origin);
        Ok(())
    }

    /// Claim `name` for an overridable value.
    ///
    /// Returns the external value when the build already defined it, in
    /// which case that definition stands.
    pub fn adopt(
        &mut self,
        name: &'static str,
        origin: Origin,
    ) -> Result<Option<&'a str>, NegotiationError> {
        if let Some(existing) = self.defined.get(name) {
            return Err(self.conflict(name, existing, &origin));
        }
        let external: &'a BTreeMap<String, String> = self.external;
        match external.get(name) {
            Some(value) => {
                self.defined.insert(name, Origin::External(value.clone()));
                Ok(Some(value.as_str()))
            }
            None => {
                self.defined.insert(name, origin);
                Ok(None)
            }
        }
    }

    /// Whether `name` has been defined in this pass.
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains_key(name)
    }

    /// Number of names defined in this pass.
    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_once() {
        let external = BTreeMap::new();
        let mut reg = Registry::new("PORTCFG", &external);
        reg.define("HAVE_MMAP", Origin::Flag).unwrap();
        assert!(reg.is_defined("HAVE_MMAP"));

        let err = reg.define("HAVE_MMAP", Origin::Flag).unwrap_err();
        match err {
            NegotiationError::ConfigurationConflict { name, .. } => {
                assert_eq!(name, "PORTCFG_HAVE_MMAP");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_external_definition_conflicts() {
        let external = BTreeMap::from([("HAVE_TLS".to_string(), "1".to_string())]);
        let mut reg = Registry::new("PORTCFG", &external);
        let err = reg.define("HAVE_TLS", Origin::Flag).unwrap_err();
        assert!(err.to_string().contains("external definition = 1"));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_unguarded_ignores_external() {
        let external = BTreeMap::from([("ATTRIBUTE_WEAK".to_string(), String::new())]);
        let mut reg = Registry::new("PORTCFG", &external);
        reg.define_unguarded("ATTRIBUTE_WEAK", Origin::Shim).unwrap();
        assert!(reg.define_unguarded("ATTRIBUTE_WEAK", Origin::Shim).is_err());
    }

    #[test]
    fn test_adopt_external_value() {
        let external = BTreeMap::from([("HAVE_SSE2".to_string(), "0".to_string())]);
        let mut reg = Registry::new("PORTCFG", &external);
        assert_eq!(reg.adopt("HAVE_SSE2", Origin::Constant).unwrap(), Some("0"));
        assert_eq!(reg.adopt("HAVE_SSSE3", Origin::Constant).unwrap(), None);
        assert_eq!(reg.len(), 2);
        assert!(reg.adopt("HAVE_SSE2", Origin::Constant).is_err());
    }
}
