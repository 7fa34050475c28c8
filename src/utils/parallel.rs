#[cfg(feature = "parallel")]
use rayon::prelude::*;

// Heuristic: Don't spin up Rayon for < 1000 cheap items
const PAR_THRESHOLD: usize = 1000;

// Helper for mutable iteration over many small items
#[inline]
pub fn iterate_mut<T, F>(collection: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if collection.len() > PAR_THRESHOLD {
            collection.par_iter_mut().for_each(f);
        } else {
            collection.iter_mut().for_each(f);
        }
    }
    #[cfg(any(not(feature = "parallel"), target_arch = "wasm32"))]
    {
        collection.iter_mut().for_each(f);
    }
}

/// Maps over a few expensive, independent tasks (one per recursion
/// branch). Output order always matches input order.
#[inline]
pub fn map_tasks<T, R, F>(tasks: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if tasks.len() > 1 {
            tasks.into_par_iter().map(f).collect()
        } else {
            tasks.into_iter().map(f).collect()
        }
    }
    #[cfg(any(not(feature = "parallel"), target_arch = "wasm32"))]
    {
        tasks.into_iter().map(f).collect()
    }
}
