//! Element name alphabets of interleave branches

use super::name_class::NameClass;
use crate::error::RestrictionViolation;

/// Name classes of the elements a branch can start with
#[derive(Debug, Clone, Default)]
pub struct Alphabet {
    name_classes: Vec<NameClass>,
}

impl Alphabet {
    /// Create an empty alphabet
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no element was added
    pub fn is_empty(&self) -> bool {
        self.name_classes.is_empty()
    }

    /// Add the name class of an element the branch may contain
    pub fn add_element(&mut self, name_class: &NameClass) {
        if !self.name_classes.contains(name_class) {
            self.name_classes.push(name_class.clone());
        }
    }

    /// Add every name class of `other`
    pub fn add_alphabet(&mut self, other: &Alphabet) {
        for name_class in &other.name_classes {
            self.add_element(name_class);
        }
    }

    /// Fail with `interleave_element_overlap` if some element name is in both
    pub fn check_overlap(&self, other: &Alphabet) -> Result<(), RestrictionViolation> {
        if self.is_empty() || other.is_empty() {
            return Ok(());
        }
        let overlap = self
            .name_classes
            .iter()
            .any(|a| other.name_classes.iter().any(|b| a.overlaps(b)));
        if overlap {
            Err(RestrictionViolation::new("interleave_element_overlap"))
        } else {
            Ok(())
        }
    }

    /// The collected name classes, in insertion order
    pub fn name_classes(&self) -> &[NameClass] {
        &self.name_classes
    }
}
