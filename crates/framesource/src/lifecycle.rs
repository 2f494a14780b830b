//! Reuse-or-allocate policy shared by both copy paths.
//!
//! Destinations are reused only on an exact size match and otherwise replaced
//! by a fresh allocation of exactly the required size. Nothing is resized in
//! place and nothing is over-allocated, so code downstream can index by
//! `width * height` without bounds juggling.

/// Anything with pixel dimensions that can serve as a copy destination.
pub trait Dimensions {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// Outcome of the lifecycle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation<T> {
    Reuse,
    Allocate(T),
}

impl<T> Allocation<T> {
    pub fn is_reuse(&self) -> bool {
        matches!(self, Allocation::Reuse)
    }
}

/// Decides whether `current` can hold a `width` x `height` frame.
pub fn plan_for<D: Dimensions + ?Sized>(
    current: Option<&D>,
    width: u32,
    height: u32,
) -> Allocation<(u32, u32)> {
    match current {
        Some(dest) if dest.dimensions() == (width, height) => Allocation::Reuse,
        _ => Allocation::Allocate((width, height)),
    }
}

/// Decides whether a buffer of `current` elements can hold `required` ones.
pub fn plan_for_len(current: Option<usize>, required: usize) -> Allocation<usize> {
    match current {
        Some(len) if len == required => Allocation::Reuse,
        _ => Allocation::Allocate(required),
    }
}

/// Applies [`plan_for`] to the destination held in `slot`, calling
/// `allocate` only when it cannot be reused. Returns whether a fresh
/// destination was stored. When `allocate` fails the slot keeps its old
/// contents.
pub fn reuse_or_allocate<D, E, F>(
    slot: &mut Option<D>,
    width: u32,
    height: u32,
    allocate: F,
) -> Result<bool, E>
where
    D: Dimensions,
    F: FnOnce(u32, u32) -> Result<D, E>,
{
    match plan_for(slot.as_ref(), width, height) {
        Allocation::Reuse => Ok(false),
        Allocation::Allocate((width, height)) => {
            *slot = Some(allocate(width, height)?);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Rect(u32, u32);

    impl Dimensions for Rect {
        fn width(&self) -> u32 {
            self.0
        }
        fn height(&self) -> u32 {
            self.1
        }
    }

    #[test]
    fn exact_match_is_reused() {
        assert!(plan_for(Some(&Rect(640, 480)), 640, 480).is_reuse());
    }

    #[test]
    fn missing_or_mismatched_allocates_exact_size() {
        assert_eq!(
            plan_for::<Rect>(None, 320, 240),
            Allocation::Allocate((320, 240))
        );
        assert_eq!(
            plan_for(Some(&Rect(640, 480)), 640, 481),
            Allocation::Allocate((640, 481))
        );
        // Larger destinations are not reused either.
        assert_eq!(
            plan_for(Some(&Rect(1920, 1080)), 640, 480),
            Allocation::Allocate((640, 480))
        );
    }

    #[test]
    fn element_count_policy() {
        assert!(plan_for_len(Some(12), 12).is_reuse());
        assert_eq!(plan_for_len(Some(16), 12), Allocation::Allocate(12));
        assert_eq!(plan_for_len(None, 0), Allocation::Allocate(0));
    }

    #[test]
    fn reuse_or_allocate_skips_allocator_on_match() {
        let mut slot = Some(Rect(2, 2));
        let fresh = reuse_or_allocate::<_, (), _>(&mut slot, 2, 2, |_, _| {
            panic!("allocator must not run")
        })
        .unwrap();
        assert_eq!(slot, Some(Rect(2, 2)));
        assert!(!fresh);

        let fresh =
            reuse_or_allocate::<_, (), _>(&mut slot, 3, 1, |w, h| Ok(Rect(w, h))).unwrap();
        assert_eq!(slot, Some(Rect(3, 1)));
        assert!(fresh);
    }

    #[test]
    fn failed_allocation_keeps_previous_destination() {
        let mut slot = Some(Rect(2, 2));
        let err = reuse_or_allocate(&mut slot, 4, 4, |_, _| Err("out of memory")).unwrap_err();
        assert_eq!(err, "out of memory");
        assert_eq!(slot, Some(Rect(2, 2)));
    }
}
