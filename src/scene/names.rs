use std::collections::HashMap;

use super::ObjectKind;

/// Hands out default object names and serial numbers.
///
/// Names are `"<Kind> <n>"` with one counter per [`ObjectKind`]; serials
/// are unique across all kinds. An allocator belongs to one scene and is
/// passed in at construction, so two scenes never share counters.
#[derive(Debug, Clone, Default)]
pub struct NameAllocator {
    per_kind: HashMap<ObjectKind, usize>,
    next_serial: u32,
}

impl NameAllocator {
    /// Creates an allocator whose counters all start at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next default name for an object of `kind`.
    pub fn next_name(&mut self, kind: ObjectKind) -> String {
        let counter = self.per_kind.entry(kind).or_insert(0);
        *counter += 1;
        format!("{} {}", kind.label(), counter)
    }

    /// Next serial number.
    pub fn next_serial(&mut self) -> u32 {
        let serial = self.next_serial;
        self.next_serial += 1;
        serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_kind() {
        let mut names = NameAllocator::new();
        assert_eq!(names.next_name(ObjectKind::Torus), "Torus 1");
        assert_eq!(names.next_name(ObjectKind::Point), "Point 1");
        assert_eq!(names.next_name(ObjectKind::Torus), "Torus 2");
    }

    #[test]
    fn serials_are_global() {
        let mut names = NameAllocator::new();
        assert_eq!(names.next_serial(), 0);
        assert_eq!(names.next_serial(), 1);
        let mut other = NameAllocator::new();
        assert_eq!(other.next_serial(), 0);
    }
}
