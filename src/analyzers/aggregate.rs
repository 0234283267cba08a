use crate::analyzers::types::{AverageDelayRow, CancellationRateRow, DelayRateRow};
use crate::analyzers::utility::{cmp_desc_none_last, max, mean, median, pct, sample_stddev};
use crate::records::{FlightRecord, FlightTable, GroupBy, flag_is_set};
use std::collections::BTreeMap;
use tracing::debug;

/// Running count of non-null flags and of flags set to 1.
#[derive(Default)]
struct FlagTally {
    total: usize,
    set: usize,
}

impl FlagTally {
    fn push(&mut self, flag: Option<f64>) {
        if flag.is_some() {
            self.total += 1;
        }
        if flag_is_set(flag) {
            self.set += 1;
        }
    }
}

fn tally_by<'a>(
    records: impl Iterator<Item = &'a FlightRecord>,
    group_by: GroupBy,
    flag: impl Fn(&FlightRecord) -> Option<f64>,
) -> BTreeMap<String, FlagTally> {
    let mut groups: BTreeMap<String, FlagTally> = BTreeMap::new();
    for record in records {
        groups
            .entry(group_by.key(record))
            .or_default()
            .push(flag(record));
    }
    groups
}

/// Share of flights with `ArrDelay15` set, per group, worst first.
///
/// With `exclude_cancelled`, only flights whose cancellation flag is
/// present and clear are considered. Flights with a null delay flag do not
/// count towards `total_flights`.
pub fn compute_delay_rate(
    table: &FlightTable,
    group_by: GroupBy,
    exclude_cancelled: bool,
) -> Vec<DelayRateRow> {
    let records = table
        .records()
        .iter()
        .filter(|r| !exclude_cancelled || r.is_completed());

    let mut rows: Vec<DelayRateRow> = tally_by(records, group_by, |r| r.arr_delay15)
        .into_iter()
        .map(|(group, tally)| DelayRateRow {
            group,
            total_flights: tally.total,
            delayed_flights: tally.set,
            delay_rate_pct: pct(tally.set, tally.total),
        })
        .collect();

    rows.sort_by(|a, b| b.delay_rate_pct.total_cmp(&a.delay_rate_pct));

    debug!(%group_by, exclude_cancelled, groups = rows.len(), "Delay rate computed");
    rows
}

/// Share of cancelled flights per group over every row, worst first.
pub fn compute_cancellation_rate(table: &FlightTable, group_by: GroupBy) -> Vec<CancellationRateRow> {
    let mut rows: Vec<CancellationRateRow> =
        tally_by(table.records().iter(), group_by, |r| r.cancelled)
            .into_iter()
            .map(|(group, tally)| CancellationRateRow {
                group,
                total_flights: tally.total,
                cancelled_flights: tally.set,
                cancellation_rate_pct: pct(tally.set, tally.total),
            })
            .collect();

    rows.sort_by(|a, b| b.cancellation_rate_pct.total_cmp(&a.cancellation_rate_pct));

    debug!(%group_by, groups = rows.len(), "Cancellation rate computed");
    rows
}

/// Delay magnitude per group, largest mean first.
///
/// Cancelled flights are always dropped. With `delayed_only`, only flights
/// with `ArrDelay15` set contribute; otherwise every completed flight does.
/// Null minute values are skipped.
pub fn compute_average_delay(
    table: &FlightTable,
    group_by: GroupBy,
    delayed_only: bool,
) -> Vec<AverageDelayRow> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for record in table
        .records()
        .iter()
        .filter(|r| r.is_completed() && (!delayed_only || r.is_delayed()))
    {
        let minutes = groups.entry(group_by.key(record)).or_default();
        if let Some(m) = record.arr_delay_minutes {
            minutes.push(m);
        }
    }

    let mut rows: Vec<AverageDelayRow> = groups
        .into_iter()
        .map(|(group, minutes)| AverageDelayRow {
            group,
            avg_delay_minutes: mean(&minutes),
            median_delay_minutes: median(&minutes),
            max_delay_minutes: max(&minutes),
            std_delay_minutes: sample_stddev(&minutes),
        })
        .collect();

    rows.sort_by(|a, b| cmp_desc_none_last(a.avg_delay_minutes, b.avg_delay_minutes));

    debug!(%group_by, delayed_only, groups = rows.len(), "Average delay computed");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flights(carrier: &str, total: usize, delayed: usize, cancelled: usize) -> Vec<FlightRecord> {
        (0..total)
            .map(|i| {
                let r = FlightRecord::new(carrier, 2023, 1);
                if i < cancelled {
                    r.cancelled()
                } else if i < cancelled + delayed {
                    r.delayed(20.0 + i as f64)
                } else {
                    r
                }
            })
            .collect()
    }

    fn abc_table() -> FlightTable {
        let mut records = flights("A", 10, 2, 0);
        records.extend(flights("B", 10, 5, 1));
        records.extend(flights("C", 10, 0, 0));
        FlightTable::from_records(records)
    }

    #[test]
    fn test_delay_rate_example() {
        let rows = compute_delay_rate(&abc_table(), GroupBy::Carrier, true);

        let order: Vec<_> = rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);

        assert_eq!(rows[0].total_flights, 9);
        assert_eq!(rows[0].delayed_flights, 5);
        assert!((rows[0].delay_rate_pct - 55.555_555).abs() < 1e-4);
        assert_eq!(rows[1].delay_rate_pct, 20.0);
        assert_eq!(rows[2].delay_rate_pct, 0.0);
    }

    #[test]
    fn test_no_delays_no_cancellations_is_zero() {
        let mut records = flights("A", 5, 0, 0);
        records.extend(flights("B", 3, 0, 0));
        let table = FlightTable::from_records(records);

        for row in compute_delay_rate(&table, GroupBy::Carrier, true) {
            assert_eq!(row.delay_rate_pct, 0.0);
        }
        for row in compute_cancellation_rate(&table, GroupBy::Carrier) {
            assert_eq!(row.cancellation_rate_pct, 0.0);
        }
    }

    #[test]
    fn test_all_delayed_is_hundred() {
        let table = FlightTable::from_records(flights("A", 4, 4, 0));
        let rows = compute_delay_rate(&table, GroupBy::Carrier, true);
        assert_eq!(rows[0].delay_rate_pct, 100.0);
    }

    #[test]
    fn test_cancelled_rows_count_towards_cancellation_rate() {
        let rows = compute_cancellation_rate(&abc_table(), GroupBy::Carrier);

        assert_eq!(rows[0].group, "B");
        assert_eq!(rows[0].total_flights, 10);
        assert_eq!(rows[0].cancelled_flights, 1);
        assert_eq!(rows[0].cancellation_rate_pct, 10.0);
    }

    #[test]
    fn test_including_cancelled_ignores_null_delay_flags() {
        let rows = compute_delay_rate(&abc_table(), GroupBy::Carrier, false);
        let b = rows.iter().find(|r| r.group == "B").unwrap();
        // the cancelled flight has a null delay flag, so it is not counted
        assert_eq!(b.total_flights, 9);
    }

    #[test]
    fn test_cancelled_flight_with_delay_flag_is_excluded() {
        let mut odd = FlightRecord::new("A", 2023, 1).delayed(90.0);
        odd.cancelled = Some(1.0);
        let table = FlightTable::from_records(vec![odd, FlightRecord::new("A", 2023, 1)]);

        let excluded = compute_delay_rate(&table, GroupBy::Carrier, true);
        assert_eq!(excluded[0].total_flights, 1);
        assert_eq!(excluded[0].delay_rate_pct, 0.0);

        let included = compute_delay_rate(&table, GroupBy::Carrier, false);
        assert_eq!(included[0].delay_rate_pct, 50.0);

        let avg = compute_average_delay(&table, GroupBy::Carrier, false);
        assert_eq!(avg[0].max_delay_minutes, Some(0.0));
    }

    #[test]
    fn test_average_delay_delayed_only() {
        let records = vec![
            FlightRecord::new("A", 2023, 1).delayed(20.0),
            FlightRecord::new("A", 2023, 1).delayed(40.0),
            FlightRecord::new("A", 2023, 1).delayed(90.0),
            FlightRecord::new("A", 2023, 1),
            FlightRecord::new("B", 2023, 1).delayed(100.0),
            FlightRecord::new("B", 2023, 1).cancelled(),
        ];
        let table = FlightTable::from_records(records);

        let rows = compute_average_delay(&table, GroupBy::Carrier, true);
        assert_eq!(rows[0].group, "B");
        assert_eq!(rows[0].avg_delay_minutes, Some(100.0));
        assert_eq!(rows[0].std_delay_minutes, None);

        let a = &rows[1];
        assert_eq!(a.avg_delay_minutes, Some(50.0));
        assert_eq!(a.median_delay_minutes, Some(40.0));
        assert_eq!(a.max_delay_minutes, Some(90.0));
        assert!((a.std_delay_minutes.unwrap() - 36.055_512_754_639_89).abs() < 1e-9);

        let all = compute_average_delay(&table, GroupBy::Carrier, false);
        let a_all = all.iter().find(|r| r.group == "A").unwrap();
        assert_eq!(a_all.avg_delay_minutes, Some(37.5));
    }

    #[test]
    fn test_group_without_minutes_sorts_last() {
        let mut no_minutes = FlightRecord::new("Z", 2023, 1).delayed(0.0);
        no_minutes.arr_delay_minutes = None;
        let table = FlightTable::from_records(vec![
            no_minutes,
            FlightRecord::new("A", 2023, 1).delayed(15.0),
        ]);

        let rows = compute_average_delay(&table, GroupBy::Carrier, true);
        assert_eq!(rows[0].group, "A");
        assert_eq!(rows[1].group, "Z");
        assert_eq!(rows[1].avg_delay_minutes, None);
    }

    #[test]
    fn test_null_tokens_are_not_counted() {
        let csv = "CarrierName,Year,Month,ArrDelay15,ArrDelayMinutes,Cancelled\n\
                   A,2023,1,1,30,0\n\
                   A,2023,1,NaN,NaN,0\n\
                   A,2023,1,1,NaN,0\n\
                   A,2023,2,NA,NA,NA\n";
        let table = FlightTable::from_reader(csv.as_bytes()).unwrap();

        let delay = compute_delay_rate(&table, GroupBy::Carrier, true);
        assert_eq!(delay[0].total_flights, 2);
        assert_eq!(delay[0].delayed_flights, 2);
        assert_eq!(delay[0].delay_rate_pct, 100.0);

        let cancellation = compute_cancellation_rate(&table, GroupBy::Carrier);
        assert_eq!(cancellation[0].total_flights, 3);

        let average = compute_average_delay(&table, GroupBy::Carrier, true);
        assert_eq!(average[0].avg_delay_minutes, Some(30.0));
        assert_eq!(average[0].median_delay_minutes, Some(30.0));
        assert_eq!(average[0].max_delay_minutes, Some(30.0));
    }

    #[test]
    fn test_group_by_month() {
        let table = FlightTable::from_records(vec![
            FlightRecord::new("A", 2023, 1).delayed(30.0),
            FlightRecord::new("B", 2023, 1),
            FlightRecord::new("A", 2023, 2),
        ]);

        let rows = compute_delay_rate(&table, GroupBy::Month, true);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].group, "01");
        assert_eq!(rows[0].delay_rate_pct, 50.0);
        assert_eq!(rows[1].group, "02");
    }
}
