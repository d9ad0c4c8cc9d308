//! Duplicate attribute detection within one element
//!
//! Two attribute patterns of the same element must not be able to match the
//! same attribute name, unless they sit in different branches of a choice.

use super::name_class::NameClass;
use crate::error::RestrictionViolation;

#[derive(Debug, Clone)]
struct Alternative {
    // first index recorded inside the choice
    start_index: usize,
    // first index recorded by the current branch
    end_index: usize,
}

/// Attribute name classes seen so far in one element's content
#[derive(Debug, Clone, Default)]
pub struct DuplicateAttributeDetector {
    name_classes: Vec<NameClass>,
    alternatives: Vec<Alternative>,
}

impl DuplicateAttributeDetector {
    /// Create a detector with no attributes seen
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attribute, failing with `duplicate_attribute` if it overlaps
    /// one already recorded outside the sibling branches of enclosing choices
    pub fn add_attribute(&mut self, name_class: &NameClass) -> Result<(), RestrictionViolation> {
        let mut limit = self.name_classes.len();
        for alternative in self.alternatives.iter().rev() {
            if self.overlaps_range(name_class, alternative.end_index, limit) {
                return Err(RestrictionViolation::new("duplicate_attribute"));
            }
            limit = alternative.start_index;
        }
        if self.overlaps_range(name_class, 0, limit) {
            return Err(RestrictionViolation::new("duplicate_attribute"));
        }
        self.name_classes.push(name_class.clone());
        Ok(())
    }

    fn overlaps_range(&self, name_class: &NameClass, from: usize, to: usize) -> bool {
        self.name_classes
            .get(from..to)
            .map(|seen| seen.iter().any(|nc| nc.overlaps(name_class)))
            .unwrap_or(false)
    }

    /// Enter a choice; its branches may repeat names
    pub fn start_choice(&mut self) {
        let index = self.name_classes.len();
        self.alternatives.push(Alternative {
            start_index: index,
            end_index: index,
        });
    }

    /// Begin the next branch of the innermost choice
    pub fn alternative(&mut self) {
        let index = self.name_classes.len();
        if let Some(current) = self.alternatives.last_mut() {
            current.end_index = index;
        }
    }

    /// Leave the innermost choice
    pub fn end_choice(&mut self) {
        self.alternatives.pop();
    }
}
