//! # Obstacle Reducer
//!
//! Reduces one range-finder scan to its closest valid obstacle.
//!
//! A sample `d` is valid when it is finite and `range_min < d < range_max`
//! (both bounds exclusive). The smallest valid sample wins; on ties the
//! lowest index wins. The bearing is `angle_min + index * angle_increment`,
//! reported in degrees.
//!
//! The reducer keeps no state between calls and never fails: an empty
//! scan, a scan with no valid sample, or degenerate bounds
//! (`range_min >= range_max`) all yield [`ObstacleResult::NotFound`].
//!
//! ```
//! use contracts::{ObstacleResult, ScanRecord};
//! use obstacle_reducer::nearest_obstacle;
//!
//! let scan = ScanRecord {
//!     ranges: vec![5.0, 3.0, 3.0, 4.0],
//!     angle_min: 0.0,
//!     angle_increment: 0.0,
//!     range_min: 0.0,
//!     range_max: 10.0,
//! };
//! assert!(matches!(
//!     nearest_obstacle(&scan),
//!     ObstacleResult::Found { index: 1, .. }
//! ));
//! ```

pub use contracts::{ObstacleReport, ObstacleResult, ScanPacket, ScanRecord};

/// Single-sample bounds check.
#[inline]
pub fn is_valid_sample(d: f64, range_min: f64, range_max: f64) -> bool {
    // NaN fails both comparisons; infinities are rejected even with infinite bounds
    d.is_finite() && range_min < d && d < range_max
}

/// Bearing of sample `index`, in degrees.
#[inline]
pub fn bearing_degrees(scan: &ScanRecord, index: usize) -> f64 {
    (scan.angle_min + index as f64 * scan.angle_increment).to_degrees()
}

/// Closest valid sample of `scan`.
pub fn nearest_obstacle(scan: &ScanRecord) -> ObstacleResult {
    let mut nearest: Option<(usize, f64)> = None;

    for (index, &d) in scan.ranges.iter().enumerate() {
        if !is_valid_sample(d, scan.range_min, scan.range_max) {
            continue;
        }
        // strict: an equal later sample keeps the earlier index
        if nearest.is_none_or(|(_, min)| d < min) {
            nearest = Some((index, d));
        }
    }

    match nearest {
        Some((index, distance)) => ObstacleResult::Found {
            distance,
            index,
            angle_degrees: bearing_degrees(scan, index),
        },
        None => ObstacleResult::NotFound,
    }
}

/// Reduce a packet and carry its envelope over to the report.
pub fn reduce_packet(packet: &ScanPacket) -> ObstacleReport {
    ObstacleReport {
        source_id: packet.source_id.clone(),
        timestamp: packet.timestamp,
        seq: packet.seq,
        result: nearest_obstacle(&packet.scan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn scan(ranges: Vec<f64>, range_min: f64, range_max: f64) -> ScanRecord {
        ScanRecord {
            ranges,
            angle_min: 0.0,
            angle_increment: 0.0,
            range_min,
            range_max,
        }
    }

    fn found(result: ObstacleResult) -> (f64, usize, f64) {
        match result {
            ObstacleResult::Found {
                distance,
                index,
                angle_degrees,
            } => (distance, index, angle_degrees),
            ObstacleResult::NotFound => panic!("expected an obstacle"),
        }
    }

    #[test]
    fn empty_scan_has_no_obstacle() {
        assert_eq!(
            nearest_obstacle(&scan(vec![], 0.0, 10.0)),
            ObstacleResult::NotFound
        );
    }

    #[test]
    fn single_valid_sample() {
        let result = nearest_obstacle(&scan(vec![1.0], 0.0, 2.0));
        assert_eq!(
            result,
            ObstacleResult::Found {
                distance: 1.0,
                index: 0,
                angle_degrees: 0.0
            }
        );
    }

    #[test]
    fn earliest_of_tied_minima_wins() {
        let (distance, index, _) = found(nearest_obstacle(&scan(
            vec![5.0, 3.0, 3.0, 4.0],
            0.0,
            10.0,
        )));
        assert_eq!(distance, 3.0);
        assert_eq!(index, 1);
    }

    #[test]
    fn skips_infinite_and_nan() {
        let mut s = scan(vec![f64::INFINITY, f64::NAN, 0.5], 0.0, 1.0);
        s.angle_min = -0.5;
        s.angle_increment = 0.25;

        let (distance, index, angle) = found(nearest_obstacle(&s));
        assert_eq!(distance, 0.5);
        assert_eq!(index, 2);
        assert!((angle - (-0.5f64 + 2.0 * 0.25).to_degrees()).abs() < 1e-12);
    }

    #[test]
    fn bounds_are_exclusive() {
        assert_eq!(
            nearest_obstacle(&scan(vec![0.2, 8.0], 0.2, 8.0)),
            ObstacleResult::NotFound
        );

        let (distance, index, _) = found(nearest_obstacle(&scan(vec![0.2, 4.0, 8.0], 0.2, 8.0)));
        assert_eq!(distance, 4.0);
        assert_eq!(index, 1);
    }

    #[test]
    fn negative_infinity_is_rejected_with_open_bounds() {
        let s = scan(vec![f64::NEG_INFINITY, 3.0], f64::NEG_INFINITY, f64::INFINITY);
        let (distance, index, _) = found(nearest_obstacle(&s));
        assert_eq!(distance, 3.0);
        assert_eq!(index, 1);
    }

    #[test]
    fn degenerate_bounds_reject_everything() {
        assert_eq!(
            nearest_obstacle(&scan(vec![1.0, 2.0, 3.0], 5.0, 5.0)),
            ObstacleResult::NotFound
        );
        assert_eq!(
            nearest_obstacle(&scan(vec![1.0, 2.0, 3.0], 4.0, 1.0)),
            ObstacleResult::NotFound
        );
    }

    #[test]
    fn all_invalid_has_no_obstacle() {
        let s = scan(vec![f64::INFINITY, f64::NAN, 0.05, 30.0], 0.1, 12.0);
        assert_eq!(nearest_obstacle(&s), ObstacleResult::NotFound);
    }

    #[test]
    fn bearing_follows_index() {
        let s = ScanRecord {
            ranges: vec![4.0, 4.0, 1.0, 4.0],
            angle_min: -std::f64::consts::FRAC_PI_2,
            angle_increment: std::f64::consts::FRAC_PI_4,
            range_min: 0.0,
            range_max: 10.0,
        };
        let (_, index, angle) = found(nearest_obstacle(&s));
        assert_eq!(index, 2);
        assert!(angle.abs() < 1e-9, "angle = {angle}");
        assert!((bearing_degrees(&s, 0) + 90.0).abs() < 1e-9);
    }

    #[test]
    fn reduction_is_idempotent_and_leaves_input_untouched() {
        let s = ScanRecord {
            ranges: vec![2.5, f64::NAN, 1.5, 1.5],
            angle_min: 0.1,
            angle_increment: 0.02,
            range_min: 0.1,
            range_max: 10.0,
        };
        let before = s.ranges.clone();

        let first = nearest_obstacle(&s);
        let second = nearest_obstacle(&s);
        assert_eq!(first, second);
        assert_eq!(s.ranges[0], before[0]);
        assert!(s.ranges[1].is_nan());
        assert_eq!(&s.ranges[2..], &before[2..]);
    }

    #[test]
    fn packet_envelope_is_preserved() {
        let packet = ScanPacket {
            source_id: "front".into(),
            timestamp: 12.5,
            seq: 99,
            scan: scan(vec![3.0, 2.0], 0.0, 5.0),
        };
        let report = reduce_packet(&packet);
        assert_eq!(report.source_id, "front");
        assert_eq!(report.timestamp, 12.5);
        assert_eq!(report.seq, 99);
        assert_eq!(report.result.distance(), Some(2.0));
    }

    /// Random sample: mostly in-range, some out of range, some non-finite.
    fn random_sample(rng: &mut StdRng, range_min: f64, range_max: f64) -> f64 {
        match rng.random_range(0..10) {
            0 => f64::INFINITY,
            1 => f64::NAN,
            2 => range_min - rng.random_range(0.0..1.0),
            3 => range_max + rng.random_range(0.0..1.0),
            4 => range_min,
            5 => range_max,
            // coarse grid so that ties actually happen
            _ => range_min + (rng.random_range(1..20) as f64) * (range_max - range_min) / 20.0,
        }
    }

    #[test]
    fn matches_brute_force_on_random_scans() {
        let mut rng = StdRng::seed_from_u64(0x5ca9);

        for _ in 0..500 {
            let range_min = rng.random_range(0.0..0.5);
            let range_max = rng.random_range(1.0..20.0);
            let len = rng.random_range(0..64);
            let s = ScanRecord {
                ranges: (0..len)
                    .map(|_| random_sample(&mut rng, range_min, range_max))
                    .collect(),
                angle_min: rng.random_range(-3.2..0.0),
                angle_increment: rng.random_range(0.0..0.1),
                range_min,
                range_max,
            };

            let valid: Vec<(usize, f64)> = s
                .ranges
                .iter()
                .copied()
                .enumerate()
                .filter(|&(_, d)| d.is_finite() && d > range_min && d < range_max)
                .collect();

            match nearest_obstacle(&s) {
                ObstacleResult::NotFound => assert!(valid.is_empty()),
                ObstacleResult::Found {
                    distance,
                    index,
                    angle_degrees,
                } => {
                    let min = valid.iter().map(|&(_, d)| d).fold(f64::INFINITY, f64::min);
                    let first = valid.iter().find(|&&(_, d)| d == min).unwrap().0;
                    assert_eq!(distance, min);
                    assert_eq!(index, first);
                    assert_eq!(angle_degrees, bearing_degrees(&s, index));
                }
            }
        }
    }
}
