use crate::models::TimeStamped;

/// Binary searches over a slice already sorted ascending by time.
///
/// All three are O(log n). Results are meaningless if the slice is not sorted.
pub trait SortedByTime {
    /// Index of an element whose time equals `time` exactly, if any.
    fn index_of_time(&self, time: f64) -> Option<usize>;

    /// First index whose time is `>= time` (`len()` if none).
    fn insertion_index(&self, time: f64) -> usize;

    /// First index whose time is `> time` (`len()` if none).
    fn insertion_index_strict(&self, time: f64) -> usize;
}

impl<T: TimeStamped> SortedByTime for [T] {
    fn index_of_time(&self, time: f64) -> Option<usize> {
        let (mut lower, mut upper) = (0usize, self.len());
        while lower < upper {
            let mid = lower + (upper - lower) / 2;
            let mid_time = self[mid].time();
            if mid_time == time {
                return Some(mid);
            } else if mid_time < time {
                lower = mid + 1;
            } else {
                upper = mid;
            }
        }
        None
    }

    fn insertion_index(&self, time: f64) -> usize {
        self.partition_point(|sample| sample.time() < time)
    }

    fn insertion_index_strict(&self, time: f64) -> usize {
        self.partition_point(|sample| sample.time() <= time)
    }
}

/// True when times never decrease along the slice.
pub fn is_sorted_by_time<T: TimeStamped>(samples: &[T]) -> bool {
    samples.windows(2).all(|pair| pair[0].time() <= pair[1].time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measurement;

    fn series(times: &[f64]) -> Vec<Measurement> {
        times.iter().map(|&t| Measurement::new(t, t * 10.0)).collect()
    }

    #[test]
    fn index_of_time_finds_exact_matches_only() {
        let samples = series(&[1.0, 2.0, 3.0, 5.0]);
        assert_eq!(samples.index_of_time(1.0), Some(0));
        assert_eq!(samples.index_of_time(5.0), Some(3));
        assert_eq!(samples.index_of_time(4.0), None);
        assert_eq!(samples.index_of_time(0.5), None);
        assert_eq!(samples.index_of_time(9.0), None);
        assert_eq!(series(&[]).index_of_time(1.0), None);
    }

    #[test]
    fn insertion_index_is_first_not_earlier() {
        let samples = series(&[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(samples.insertion_index(0.0), 0);
        assert_eq!(samples.insertion_index(2.0), 1);
        assert_eq!(samples.insertion_index(2.5), 3);
        assert_eq!(samples.insertion_index(3.0), 3);
        assert_eq!(samples.insertion_index(4.0), 4);
    }

    #[test]
    fn strict_insertion_index_is_first_later() {
        let samples = series(&[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(samples.insertion_index_strict(0.0), 0);
        assert_eq!(samples.insertion_index_strict(2.0), 3);
        assert_eq!(samples.insertion_index_strict(3.0), 4);
        assert_eq!(series(&[]).insertion_index_strict(1.0), 0);
    }

    #[test]
    fn sortedness_allows_equal_neighbours() {
        assert!(is_sorted_by_time(&series(&[1.0, 1.0, 2.0])));
        assert!(!is_sorted_by_time(&series(&[2.0, 1.0])));
        assert!(is_sorted_by_time::<Measurement>(&[]));
    }
}
