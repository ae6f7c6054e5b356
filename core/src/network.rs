//! Known Explorer deployments and base-URL normalization.

/// Short aliases for public Explorer networks.
const KNOWN_NETWORKS: &[(&str, &str)] = &[
    ("hifisolves", "hifisolves.org"),
    ("neuroscience", "neuroscience.ai"),
    ("asap", "cloud.parkinsonsroadmap.org"),
    ("parkinsons", "cloud.parkinsonsroadmap.org"),
    ("biomedical", "biomedical.ai"),
    ("viral", "viral.ai"),
    ("targetals", "dataportal.targetals.org"),
];

/// All known `(alias, domain)` pairs, in declaration order.
pub fn known_networks() -> &'static [(&'static str, &'static str)] {
    KNOWN_NETWORKS
}

/// Map a short alias to its domain. Anything else is returned unchanged and
/// treated as an already-qualified domain.
pub fn resolve(network: &str) -> &str {
    KNOWN_NETWORKS
        .iter()
        .find(|(alias, _)| *alias == network)
        .map(|(_, domain)| *domain)
        .unwrap_or(network)
}

/// Resolve `network` and turn it into a base URL with a scheme and no
/// trailing slash.
pub fn base_url(network: &str) -> String {
    let domain = resolve(network.trim());
    let url = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    };
    url.trim_end_matches('/').to_string()
}
