/// Probe indices `start..max_index` and return the ones that hit.
///
/// Before the first hit the scan runs all the way to `max_index`. Once
/// something has been found, `miss_streak_limit` consecutive misses end it.
pub fn scan(start: usize, max_index: usize, miss_streak_limit: usize, mut probe: impl FnMut(usize) -> bool) -> Vec<usize> {
    let mut found = Vec::new();
    let mut misses = 0;

    for index in start..max_index {
        if probe(index) {
            found.push(index);
            misses = 0;
        } else if !found.is_empty() {
            misses += 1;
            if misses >= miss_streak_limit {
                break;
            }
        }
    }
    found
}
