// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Structural equality over a chosen subset of fields

/// Types comparable field by field, with some fields optionally ignored.
pub trait FieldEq {
    /// Field selector enum
    type Field: Copy + PartialEq + 'static;

    /// Every field, in declaration order
    const FIELDS: &'static [Self::Field];

    /// Compare one field
    fn field_eq(&self, other: &Self, field: Self::Field) -> bool;

    /// Equal on every field not listed in `ignore`
    fn eq_ignoring(&self, other: &Self, ignore: &[Self::Field]) -> bool {
        Self::FIELDS
            .iter()
            .filter(|f| !ignore.contains(f))
            .all(|&f| self.field_eq(other, f))
    }
}

/// Whether `items` holds something equal to `item` under `ignore`
pub fn contains_ignoring<T: FieldEq>(items: &[T], item: &T, ignore: &[T::Field]) -> bool {
    items.iter().any(|i| i.eq_ignoring(item, ignore))
}

/// First occurrence of each equivalence class, order preserved
pub fn unique_ignoring<T: FieldEq + Clone>(items: &[T], ignore: &[T::Field]) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !contains_ignoring(&unique, item, ignore) {
            unique.push(item.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        left: u8,
        right: u8,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum PairField {
        Left,
        Right,
    }

    impl FieldEq for Pair {
        type Field = PairField;
        const FIELDS: &'static [PairField] = &[PairField::Left, PairField::Right];

        fn field_eq(&self, other: &Self, field: PairField) -> bool {
            match field {
                PairField::Left => self.left == other.left,
                PairField::Right => self.right == other.right,
            }
        }
    }

    #[test]
    fn test_eq_ignoring() {
        let a = Pair { left: 1, right: 2 };
        let b = Pair { left: 1, right: 3 };
        assert!(!a.eq_ignoring(&b, &[]));
        assert!(a.eq_ignoring(&b, &[PairField::Right]));
    }

    #[test]
    fn test_unique_ignoring_keeps_first() {
        let items = vec![
            Pair { left: 1, right: 2 },
            Pair { left: 1, right: 3 },
            Pair { left: 2, right: 2 },
        ];
        assert_eq!(unique_ignoring(&items, &[]).len(), 3);
        let by_left = unique_ignoring(&items, &[PairField::Right]);
        assert_eq!(
            by_left,
            vec![Pair { left: 1, right: 2 }, Pair { left: 2, right: 2 }]
        );
        assert!(contains_ignoring(&items, &Pair { left: 9, right: 3 }, &[PairField::Left]));
    }
}
