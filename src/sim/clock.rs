/// A simulation clock that steps through the hours of a horizon window.
///
/// The `Clock` covers the half-open range `[start, end)` and hands out one
/// absolute hour per `tick`.
///
/// # Examples
///
/// ```
/// use home_ems::sim::clock::Clock;
///
/// let mut clock = Clock::new(2, 5);
/// let mut hours = Vec::new();
///
/// while let Some(hour) = clock.tick() {
///     hours.push(hour);
/// }
/// assert_eq!(hours, vec![2, 3, 4]);
/// ```
pub struct Clock {
    /// Next hour to hand out
    current: usize,
    /// First hour past the window
    end: usize,
}

impl Clock {
    /// Creates a clock over `[start, end)`.
    ///
    /// # Arguments
    ///
    /// * `start` - First absolute hour
    /// * `end` - Horizon length; the clock stops before this hour
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            current: start,
            end,
        }
    }

    /// Advances the clock by one hour.
    ///
    /// # Returns
    ///
    /// * `Some(hour)` - The current hour before advancing
    /// * `None` - If the clock has reached the end of the window
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.end {
            let hour = self.current;
            self.current += 1;
            Some(hour)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock() {
        let clock = Clock::new(3, 8);
        assert_eq!(clock.current, 3);
        assert_eq!(clock.end, 8);
    }

    #[test]
    fn test_tick() {
        let mut clock = Clock::new(0, 2);
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.tick(), Some(1));
        assert_eq!(clock.tick(), None);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(5, 5);
        assert_eq!(clock.tick(), None);
        assert_eq!(Clock::new(6, 5).tick(), None);
    }
}
