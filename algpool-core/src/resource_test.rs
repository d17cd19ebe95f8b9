#[cfg(test)]
mod tests {
    use crate::resource::{ReservationResult, ResourceTable};
    use crate::types::{ResourceMask, UnitKey};

    // =========================================================================
    // Helper
    // =========================================================================
    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn mask_of(len: usize, bits: &[usize]) -> ResourceMask {
        let mut mask = ResourceMask::new(len);
        for b in bits {
            mask.set(*b, true);
        }
        mask
    }

    // =========================================================================
    // ResourceMask
    // =========================================================================

    #[test]
    fn empty_mask_is_subset_of_anything() {
        let empty = ResourceMask::new(0);
        assert!(empty.is_subset_of(&ResourceMask::new(0)));
        assert!(empty.is_subset_of(&mask_of(3, &[1])));
    }

    #[test]
    fn subset_detects_missing_bit() {
        let need = mask_of(4, &[0, 2]);
        assert!(need.is_subset_of(&mask_of(4, &[0, 1, 2])));
        assert!(!need.is_subset_of(&mask_of(4, &[0, 1, 3])));
    }

    #[test]
    fn resize_fills_new_bits_as_requested() {
        let mut free = ResourceMask::full(2);
        free.resize(70, true);
        assert_eq!(free.count_ones(), 70);

        let mut need = mask_of(2, &[1]);
        need.resize(70, false);
        assert_eq!(need.ones().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn clear_and_union_are_inverse_for_held_bits() {
        let mut free = ResourceMask::full(5);
        let need = mask_of(5, &[1, 4]);
        free.clear_bits(&need);
        assert_eq!(free.to_string(), "01101");
        free.union_with(&need);
        assert_eq!(free, ResourceMask::full(5));
    }

    // =========================================================================
    // ResourceTable
    // =========================================================================

    #[test]
    fn new_names_get_monotonic_indices() {
        let table = ResourceTable::new();
        table.register_resource_needs(UnitKey::of("a"), &names(&["Det", "Geo"]));
        table.register_resource_needs(UnitKey::of("b"), &names(&["Geo", "Mag"]));

        assert_eq!(table.resource_names(), names(&["Det", "Geo", "Mag"]));
        assert_eq!(table.index_of("Mag"), Some(2));
    }

    #[test]
    fn earlier_requirements_grow_with_the_table() {
        let table = ResourceTable::new();
        table.register_resource_needs(UnitKey::of("a"), &names(&["Det"]));
        table.register_resource_needs(UnitKey::of("b"), &names(&["Geo", "Mag"]));

        let a = table.requirements(UnitKey::of("a")).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(table.available().count_ones(), 3);
    }

    #[test]
    fn reservation_is_exclusive_until_freed() {
        let table = ResourceTable::new();
        let a = table.register_resource_needs(UnitKey::of("a"), &names(&["Det"]));
        let b = table.register_resource_needs(UnitKey::of("b"), &names(&["Det"]));
        table.set_all_available();

        assert!(table.try_reserve(&a));
        assert!(!table.try_reserve(&b));
        table.free(&a);
        assert!(table.try_reserve(&b));
    }

    #[test]
    fn failed_reservation_leaves_availability_untouched() {
        let table = ResourceTable::new();
        table.register_resource_needs(UnitKey::of("holder"), &names(&["r2"]));
        table.register_resource_needs(UnitKey::of("both"), &names(&["r1", "r2"]));
        table.set_all_available();

        assert_eq!(table.try_reserve_for(UnitKey::of("holder")), ReservationResult::Reserved);
        let before = table.available();

        let result = table.try_reserve_for(UnitKey::of("both"));
        assert_eq!(
            result,
            ReservationResult::Busy {
                held: names(&["r2"])
            }
        );
        assert_eq!(table.available(), before);
        assert_eq!(table.is_available("r1"), Some(true));
    }

    #[test]
    fn unit_without_requirements_always_reserves() {
        let table = ResourceTable::new();
        table.register_resource_needs(UnitKey::of("free"), &[]);
        table.register_resource_needs(UnitKey::of("det"), &names(&["Det"]));
        table.set_all_available();
        table.reserve_by_name("Det");

        for _ in 0..3 {
            assert_eq!(table.try_reserve_for(UnitKey::of("free")), ReservationResult::Reserved);
        }
    }

    #[test]
    fn named_reservation_round_trip() {
        let table = ResourceTable::new();
        table.register_resource_needs(UnitKey::of("a"), &names(&["Det"]));
        table.set_all_available();

        assert!(table.reserve_by_name("Det"));
        assert_eq!(table.is_available("Det"), Some(false));
        assert!(table.release_by_name("Det"));
        assert_eq!(table.is_available("Det"), Some(true));
        assert!(!table.reserve_by_name("Nope"));
    }

    #[test]
    fn concurrent_reservers_never_overlap() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let table = ResourceTable::new();
        let need = table.register_resource_needs(UnitKey::of("a"), &names(&["Det"]));
        table.set_all_available();
        let holders = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..500 {
                        if table.try_reserve(&need) {
                            let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            holders.fetch_sub(1, Ordering::SeqCst);
                            table.free(&need);
                        }
                    }
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(table.is_available("Det"), Some(true));
    }
}
