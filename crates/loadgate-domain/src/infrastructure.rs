//! Infrastructure impact classification between two environment profiles.

use loadgate_types::{
    AspectComparison, CachingInfo, CdnInfo, CompressionInfo, Impact, InfrastructureComparison,
    InfrastructureProfile, ProtocolSupport, SecurityInfo,
};
use std::collections::BTreeSet;

/// Compression ratio delta, in percentage points, beyond which the impact is "significant".
pub const COMPRESSION_SIGNIFICANT_PTS: f64 = 10.0;
pub const COMPRESSION_NOTABLE_PTS: f64 = 5.0;
pub const SECURITY_DELTA: f64 = 10.0;

/// Result of comparing two profiles: the compared aspects, and the aspects one side lacked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfrastructureOutcome {
    pub comparison: InfrastructureComparison,
    pub skipped: Vec<&'static str>,
}

pub fn compare_profiles(
    baseline: &InfrastructureProfile,
    comparison: &InfrastructureProfile,
) -> InfrastructureOutcome {
    let mut skipped = Vec::new();

    fn both<'a, T>(
        name: &'static str,
        a: &'a Option<T>,
        b: &'a Option<T>,
        skipped: &mut Vec<&'static str>,
    ) -> Option<(&'a T, &'a T)> {
        match (a, b) {
            (Some(a), Some(b)) => Some((a, b)),
            (None, None) => None,
            _ => {
                skipped.push(name);
                None
            }
        }
    }

    let cdn = both("cdn", &baseline.cdn, &comparison.cdn, &mut skipped).map(|(a, b)| compare_cdn(a, b));
    let compression = both("compression", &baseline.compression, &comparison.compression, &mut skipped)
        .map(|(a, b)| compare_compression(a, b));
    let protocols = both("protocols", &baseline.protocols, &comparison.protocols, &mut skipped)
        .map(|(a, b)| compare_protocols(a, b));
    let security = both("security", &baseline.security, &comparison.security, &mut skipped)
        .map(|(a, b)| compare_security(a, b));
    let caching = both("caching", &baseline.caching, &comparison.caching, &mut skipped)
        .map(|(a, b)| compare_caching(a, b));

    InfrastructureOutcome {
        comparison: InfrastructureComparison {
            cdn,
            compression,
            protocols,
            security,
            caching,
        },
        skipped,
    }
}

pub fn compare_cdn(baseline: &CdnInfo, comparison: &CdnInfo) -> AspectComparison {
    let mut details = Vec::new();
    let impact = match (baseline.detected, comparison.detected) {
        (true, false) => {
            details.push(format!(
                "CDN no longer detected (was {})",
                baseline.provider.as_deref().unwrap_or("unknown provider")
            ));
            Impact::Negative
        }
        (false, true) => {
            details.push(format!(
                "CDN now detected ({})",
                comparison.provider.as_deref().unwrap_or("unknown provider")
            ));
            Impact::Positive
        }
        _ if baseline.provider != comparison.provider => {
            details.push(format!(
                "CDN provider changed from {} to {}",
                baseline.provider.as_deref().unwrap_or("none"),
                comparison.provider.as_deref().unwrap_or("none")
            ));
            Impact::Change
        }
        _ => Impact::Neutral,
    };
    if baseline.pop_location != comparison.pop_location && comparison.detected {
        details.push(format!(
            "PoP location {} -> {}",
            baseline.pop_location.as_deref().unwrap_or("unknown"),
            comparison.pop_location.as_deref().unwrap_or("unknown")
        ));
    }
    AspectComparison { impact, details }
}

pub fn compare_compression(baseline: &CompressionInfo, comparison: &CompressionInfo) -> AspectComparison {
    let mut details = Vec::new();
    let delta_pts = (comparison.ratio - baseline.ratio) * 100.0;

    let banded = if delta_pts > COMPRESSION_SIGNIFICANT_PTS {
        Impact::SignificantPositive
    } else if delta_pts > COMPRESSION_NOTABLE_PTS {
        Impact::Positive
    } else if delta_pts < -COMPRESSION_SIGNIFICANT_PTS {
        Impact::SignificantNegative
    } else if delta_pts < -COMPRESSION_NOTABLE_PTS {
        Impact::Negative
    } else {
        Impact::Neutral
    };
    if banded != Impact::Neutral {
        details.push(format!(
            "compression ratio {:.1}% -> {:.1}% ({delta_pts:+.1} pts)",
            baseline.ratio * 100.0,
            comparison.ratio * 100.0
        ));
    }

    let algorithm_changed = baseline.algorithm != comparison.algorithm;
    if algorithm_changed {
        details.push(format!(
            "algorithm changed from {} to {}",
            baseline.algorithm.as_deref().unwrap_or("none"),
            comparison.algorithm.as_deref().unwrap_or("none")
        ));
    }

    let impact = if banded == Impact::Neutral && algorithm_changed {
        Impact::Change
    } else {
        banded
    };
    AspectComparison { impact, details }
}

pub fn compare_protocols(baseline: &ProtocolSupport, comparison: &ProtocolSupport) -> AspectComparison {
    let mut details = Vec::new();
    let mut lost = false;
    let mut gained = false;
    for (name, before, after) in [
        ("HTTP/2", baseline.http2_support, comparison.http2_support),
        ("HTTP/3", baseline.http3_support, comparison.http3_support),
    ] {
        match (before, after) {
            (true, false) => {
                lost = true;
                details.push(format!("{name} support lost"));
            }
            (false, true) => {
                gained = true;
                details.push(format!("{name} support gained"));
            }
            _ => {}
        }
    }
    let impact = if lost {
        Impact::Negative
    } else if gained {
        Impact::Positive
    } else {
        Impact::Neutral
    };
    AspectComparison { impact, details }
}

pub fn compare_security(baseline: &SecurityInfo, comparison: &SecurityInfo) -> AspectComparison {
    let delta = comparison.score - baseline.score;
    let impact = if delta > SECURITY_DELTA {
        Impact::Positive
    } else if delta < -SECURITY_DELTA {
        Impact::Negative
    } else {
        Impact::Neutral
    };
    let details = if delta != 0.0 {
        vec![format!(
            "security score {:.0} -> {:.0} ({delta:+.0})",
            baseline.score, comparison.score
        )]
    } else {
        Vec::new()
    };
    AspectComparison { impact, details }
}

pub fn compare_caching(baseline: &CachingInfo, comparison: &CachingInfo) -> AspectComparison {
    let before: BTreeSet<String> = baseline.headers.keys().map(|h| h.to_ascii_lowercase()).collect();
    let after: BTreeSet<String> = comparison.headers.keys().map(|h| h.to_ascii_lowercase()).collect();

    let mut details: Vec<String> = after
        .difference(&before)
        .map(|h| format!("cache header added: {h}"))
        .collect();
    details.extend(before.difference(&after).map(|h| format!("cache header removed: {h}")));

    let impact = if details.is_empty() {
        Impact::Neutral
    } else {
        Impact::Change
    };
    AspectComparison { impact, details }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn cdn(detected: bool, provider: Option<&str>) -> CdnInfo {
        CdnInfo {
            detected,
            provider: provider.map(str::to_string),
            pop_location: None,
        }
    }

    fn compression(algorithm: Option<&str>, ratio: f64) -> CompressionInfo {
        CompressionInfo {
            algorithm: algorithm.map(str::to_string),
            ratio,
            effectiveness: None,
        }
    }

    #[test]
    fn cdn_rules() {
        let cf = cdn(true, Some("cloudflare"));
        let fastly = cdn(true, Some("fastly"));
        let none = cdn(false, None);

        assert_eq!(compare_cdn(&cf, &none).impact, Impact::Negative);
        assert_eq!(compare_cdn(&none, &cf).impact, Impact::Positive);
        assert_eq!(compare_cdn(&cf, &fastly).impact, Impact::Change);
        assert_eq!(compare_cdn(&cf, &cf).impact, Impact::Neutral);
        assert!(compare_cdn(&cf, &cf).details.is_empty());
    }

    #[test]
    fn compression_bands_in_percentage_points() {
        let base = compression(Some("gzip"), 0.60);
        let cases = [
            (0.75, Impact::SignificantPositive),
            (0.67, Impact::Positive),
            (0.62, Impact::Neutral),
            (0.53, Impact::Negative),
            (0.45, Impact::SignificantNegative),
        ];
        for (ratio, expected) in cases {
            let got = compare_compression(&base, &compression(Some("gzip"), ratio));
            assert_eq!(got.impact, expected, "ratio {ratio}");
        }
    }

    #[test]
    fn compression_algorithm_change_alone_is_a_change() {
        let got = compare_compression(&compression(Some("gzip"), 0.7), &compression(Some("br"), 0.72));
        assert_eq!(got.impact, Impact::Change);
        assert_eq!(got.details, vec!["algorithm changed from gzip to br".to_string()]);

        // A ratio band wins over the algorithm change.
        let got = compare_compression(&compression(Some("gzip"), 0.7), &compression(None, 0.0));
        assert_eq!(got.impact, Impact::SignificantNegative);
        assert_eq!(got.details.len(), 2);
    }

    #[test]
    fn protocol_loss_outweighs_gain() {
        let h2 = ProtocolSupport {
            http2_support: true,
            http3_support: false,
        };
        let h3 = ProtocolSupport {
            http2_support: false,
            http3_support: true,
        };
        let both = ProtocolSupport {
            http2_support: true,
            http3_support: true,
        };
        assert_eq!(compare_protocols(&h2, &both).impact, Impact::Positive);
        assert_eq!(compare_protocols(&both, &h2).impact, Impact::Negative);
        assert_eq!(compare_protocols(&h2, &h3).impact, Impact::Negative);
        assert_eq!(compare_protocols(&h2, &h3).details.len(), 2);
    }

    #[test]
    fn security_delta_bands() {
        let s = |score| SecurityInfo {
            score,
            headers: BTreeMap::new(),
        };
        assert_eq!(compare_security(&s(60.0), &s(75.0)).impact, Impact::Positive);
        assert_eq!(compare_security(&s(80.0), &s(70.0)).impact, Impact::Neutral);
        assert_eq!(compare_security(&s(80.0), &s(65.0)).impact, Impact::Negative);
    }

    #[test]
    fn caching_header_set_difference_is_a_change() {
        let headers = |names: &[&str]| CachingInfo {
            strategy: None,
            effectiveness: None,
            headers: names.iter().map(|n| (n.to_string(), "x".to_string())).collect(),
        };
        let same = compare_caching(&headers(&["Cache-Control", "ETag"]), &headers(&["cache-control", "etag"]));
        assert_eq!(same.impact, Impact::Neutral);

        let diff = compare_caching(&headers(&["cache-control", "etag"]), &headers(&["cache-control", "age"]));
        assert_eq!(diff.impact, Impact::Change);
        assert_eq!(
            diff.details,
            vec!["cache header added: age".to_string(), "cache header removed: etag".to_string()]
        );
    }

    #[test]
    fn one_sided_aspects_are_skipped() {
        let baseline = InfrastructureProfile {
            cdn: Some(cdn(true, Some("cloudflare"))),
            compression: Some(compression(Some("br"), 0.7)),
            ..Default::default()
        };
        let comparison = InfrastructureProfile {
            cdn: Some(cdn(true, Some("cloudflare"))),
            ..Default::default()
        };
        let out = compare_profiles(&baseline, &comparison);
        assert_eq!(out.skipped, vec!["compression"]);
        assert!(out.comparison.cdn.is_some());
        assert!(out.comparison.compression.is_none());
        assert!(out.comparison.protocols.is_none());
    }
}
