#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;

// Filter-map over a slice, in parallel once it is longer than `threshold`.
// Output order always follows input order.
#[inline]
pub fn filter_map_collect<T, R, F>(collection: &[T], threshold: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Option<R> + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if collection.len() > threshold {
            return collection.par_iter().filter_map(f).collect();
        }
        collection.iter().filter_map(f).collect()
    }
    #[cfg(any(not(feature = "parallel"), target_arch = "wasm32"))]
    {
        let _ = threshold;
        collection.iter().filter_map(f).collect()
    }
}

// Helper for mutable iteration
#[inline]
pub fn iterate_mut<T, F>(collection: &mut [T], threshold: usize, f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if collection.len() > threshold {
            collection.par_iter_mut().for_each(f);
        } else {
            collection.iter_mut().for_each(f);
        }
    }
    #[cfg(any(not(feature = "parallel"), target_arch = "wasm32"))]
    {
        let _ = threshold;
        collection.iter_mut().for_each(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_map_keeps_order_across_threshold() {
        let input: Vec<u32> = (0..5000).collect();
        let sequential = filter_map_collect(&input, usize::MAX, |x| (x % 3 == 0).then_some(x * 2));
        let parallel = filter_map_collect(&input, 10, |x| (x % 3 == 0).then_some(x * 2));
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[1], 6);
    }

    #[test]
    fn test_iterate_mut() {
        let mut values = vec![3, 1, 2];
        iterate_mut(&mut values, 0, |v| *v *= 10);
        assert_eq!(values, vec![30, 10, 20]);
    }
}
