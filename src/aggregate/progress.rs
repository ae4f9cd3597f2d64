/// Completion counter for a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    /// `completed / total`; an empty fan-out counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0) as u32
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_is_completed_over_total() {
        let progress = Progress {
            completed: 2,
            total: 5,
        };
        assert_eq!(progress.fraction(), 0.4);
        assert_eq!(progress.percent(), 40);
        assert!(!progress.is_done());
    }

    #[test]
    fn test_percent_truncates() {
        let progress = Progress {
            completed: 1,
            total: 3,
        };
        assert_eq!(progress.percent(), 33);
    }

    #[test]
    fn test_empty_total_is_done() {
        let progress = Progress::new(0);
        assert_eq!(progress.fraction(), 1.0);
        assert!(progress.is_done());
    }
}
