use chrono::{Days, NaiveDate};

use crate::error::InvalidRange;

/// Largest span the daily-values endpoint reliably answers for all stations.
pub const DEFAULT_CHUNK_DAYS: u32 = 15;

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    /// Every day in the range, in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Splits the range into consecutive chunks of at most `max_days` days.
    ///
    /// The last chunk may be shorter. A `max_days` of zero is treated as one.
    pub fn chunks(&self, max_days: u32) -> Chunks {
        Chunks {
            next: Some(self.start),
            end: self.end,
            span: u64::from(max_days.max(1)),
        }
    }
}

/// Lazy iterator returned by [`DateRange::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks {
    next: Option<NaiveDate>,
    end: NaiveDate,
    span: u64,
}

impl Iterator for Chunks {
    type Item = DateRange;

    fn next(&mut self) -> Option<DateRange> {
        let start = self.next?;
        let chunk_end = start
            .checked_add_days(Days::new(self.span - 1))
            .map_or(self.end, |d| d.min(self.end));

        self.next = if chunk_end < self.end {
            chunk_end.succ_opt()
        } else {
            None
        };

        Some(DateRange {
            start,
            end: chunk_end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            None => (0, Some(0)),
            Some(start) => {
                let days = (self.end - start).num_days() as u64 + 1;
                let n = days.div_ceil(self.span) as usize;
                (n, Some(n))
            }
        }
    }
}

impl ExactSizeIterator for Chunks {}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(d(a), d(b)).unwrap()
    }

    #[test]
    fn short_range_is_one_chunk() {
        let chunks: Vec<_> = range("2020-01-01", "2020-01-10").chunks(15).collect();
        assert_eq!(chunks, vec![range("2020-01-01", "2020-01-10")]);
    }

    #[test]
    fn single_day() {
        let chunks: Vec<_> = range("2024-02-29", "2024-02-29").chunks(15).collect();
        assert_eq!(chunks, vec![range("2024-02-29", "2024-02-29")]);
    }

    #[test]
    fn reversed_range_rejected() {
        let err = DateRange::new(d("2020-02-01"), d("2020-01-01")).unwrap_err();
        assert_eq!(err.start, d("2020-02-01"));
    }

    #[test]
    fn exact_multiple_has_no_stub() {
        let chunks: Vec<_> = range("2025-01-01", "2025-01-30").chunks(15).collect();
        assert_eq!(
            chunks,
            vec![
                range("2025-01-01", "2025-01-15"),
                range("2025-01-16", "2025-01-30"),
            ]
        );
    }

    #[test]
    fn covers_without_gaps_or_oversize() {
        let whole = range("2019-12-20", "2021-03-07");
        for span in [1u32, 2, 7, 15, 31, 365, 1000] {
            let chunks: Vec<_> = whole.chunks(span).collect();
            assert_eq!(chunks.len(), whole.chunks(span).len());
            assert_eq!(chunks.first().unwrap().start(), whole.start());
            assert_eq!(chunks.last().unwrap().end(), whole.end());
            for c in &chunks {
                assert!(c.days() <= u64::from(span));
            }
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].end().succ_opt().unwrap(), pair[1].start());
            }
            let total: u64 = chunks.iter().map(DateRange::days).sum();
            assert_eq!(total, whole.days());
        }
    }

    #[test]
    fn deterministic() {
        let r = range("2000-01-01", "2000-12-31");
        let a: Vec<_> = r.chunks(15).collect();
        let b: Vec<_> = r.chunks(15).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_span_behaves_as_one() {
        let chunks: Vec<_> = range("2020-01-01", "2020-01-03").chunks(0).collect();
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn ends_at_max_date() {
        let r = DateRange::new(NaiveDate::MAX.pred_opt().unwrap(), NaiveDate::MAX).unwrap();
        let chunks: Vec<_> = r.chunks(15).collect();
        assert_eq!(chunks, vec![r]);
    }

    #[test]
    fn iter_days_inclusive() {
        let days: Vec<_> = range("2020-02-27", "2020-03-01").iter_days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], d("2020-02-29"));
    }
}
