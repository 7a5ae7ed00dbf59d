//! Sector-relative PER comparison

use crate::model::{PeerSummary, StockCode, finite};
use crate::sources::SectorData;

/// Benchmark the target's PER against the average of its sector peers.
///
/// Only peers with a finite, positive PER count; the target itself is never
/// its own peer. Without any usable peer the summary is
/// [`PeerSummary::unavailable`]. Without a usable target PER the sector
/// average is still reported but relative multiple and discount are not.
pub fn compare(target: &StockCode, target_per: Option<f64>, sector: Option<&SectorData>) -> PeerSummary {
    let Some(sector) = sector else {
        return PeerSummary::unavailable();
    };

    let pers: Vec<f64> = sector
        .peers
        .iter()
        .filter(|peer| &peer.code != target)
        .filter_map(|peer| valid_multiple(peer.per))
        .collect();

    if pers.is_empty() {
        return PeerSummary::unavailable();
    }

    let sector_avg = pers.iter().sum::<f64>() / pers.len() as f64;
    if !(sector_avg.is_finite() && sector_avg > 0.0) {
        return PeerSummary::unavailable();
    }

    let target_value = valid_multiple(target_per);

    PeerSummary {
        sector_name: sector.sector_name.clone(),
        sector_avg: Some(sector_avg),
        target_value,
        relative: target_value.map(|per| per / sector_avg),
        discount_pct: target_value.map(|per| (sector_avg - per) / sector_avg * 100.0),
        peer_count_used: pers.len(),
    }
}

fn valid_multiple(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::PeerMultiple;

    fn code(raw: &str) -> StockCode {
        StockCode::parse(raw).expect("code")
    }

    fn peer(raw: &str, per: Option<f64>) -> PeerMultiple {
        PeerMultiple {
            code: code(raw),
            name: None,
            per,
        }
    }

    fn sector(peers: Vec<PeerMultiple>) -> SectorData {
        SectorData {
            sector_name: Some("전기전자".to_string()),
            as_of: None,
            peers,
        }
    }

    fn assert_no_comparison(summary: &PeerSummary) {
        assert_eq!(summary, &PeerSummary::unavailable());
        assert!(!summary.has_comparison());
    }

    #[test]
    fn test_discount_to_sector() {
        let data = sector(vec![
            peer("000660", Some(15.0)),
            peer("006400", Some(25.0)),
            peer("066570", None),
            peer("009150", Some(-3.0)),
            peer("005930", Some(14.0)),
        ]);

        let summary = compare(&code("005930"), Some(14.0), Some(&data));

        assert_eq!(summary.peer_count_used, 2);
        assert_eq!(summary.sector_name.as_deref(), Some("전기전자"));
        assert_eq!(summary.sector_avg, Some(20.0));
        assert_eq!(summary.target_value, Some(14.0));
        assert!((summary.relative.expect("relative") - 0.7).abs() < 1e-12);
        assert!((summary.discount_pct.expect("discount") - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_premium_is_negative_discount() {
        let data = sector(vec![peer("000660", Some(10.0))]);
        let summary = compare(&code("005930"), Some(15.0), Some(&data));
        assert!((summary.discount_pct.expect("discount") + 50.0).abs() < 1e-12);
        assert!((summary.relative.expect("relative") - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_peers() {
        assert_no_comparison(&compare(&code("005930"), Some(14.0), Some(&sector(vec![]))));
        assert_no_comparison(&compare(&code("005930"), Some(14.0), None));
    }

    #[test]
    fn test_only_invalid_peers() {
        let data = sector(vec![
            peer("000660", Some(0.0)),
            peer("006400", Some(f64::NAN)),
            peer("005930", Some(12.0)),
        ]);
        assert_no_comparison(&compare(&code("005930"), Some(12.0), Some(&data)));
    }

    #[test]
    fn test_missing_target_per_keeps_sector_average() {
        let data = sector(vec![peer("000660", Some(12.0)), peer("006400", Some(18.0))]);

        for target_per in [None, Some(-4.0)] {
            let summary = compare(&code("005930"), target_per, Some(&data));
            assert_eq!(summary.peer_count_used, 2);
            assert_eq!(summary.sector_avg, Some(15.0));
            assert_eq!(summary.target_value, None);
            assert_eq!(summary.relative, None);
            assert_eq!(summary.discount_pct, None);
        }
    }
}
