// * Fingerprints
// * Stable record ids and page-body fingerprints used to skip sub-pages that
// * serve the same content under another path (/about vs /about-us).

use xxhash_rust::xxh64::xxh64;

// * Seed shared by every record id so ids stay stable across runs
const RECORD_SEED: u64 = 0x7072_6f73_7065_6374;

/// Deterministic record id for one person at one company
pub fn record_id(company_url: &str, merge_key: &str) -> String {
    let canonical = format!("{}\n{}", company_url.trim_end_matches('/').to_lowercase(), merge_key);
    format!("{:016x}", xxh64(canonical.as_bytes(), RECORD_SEED))
}

// * Computes a 64-bit fingerprint of cleaned page text, ignoring whitespace runs
pub fn compute_page_fingerprint(text: &str) -> u64 {
    let canonical = text.split_whitespace().collect::<Vec<_>>().join(" ");
    xxh64(canonical.as_bytes(), 0)
}

// * Checks if content has changed by comparing fingerprints
pub fn has_content_changed(new_fingerprint: u64, cached_fingerprint: u64) -> bool {
    new_fingerprint != cached_fingerprint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_stable() {
        let a = record_id("https://andrewrileyheating.co.uk/", "andrew riley");
        let b = record_id("https://andrewrileyheating.co.uk", "andrew riley");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_record_id_differs_per_person() {
        let a = record_id("https://andrewrileyheating.co.uk/", "andrew riley");
        let b = record_id("https://andrewrileyheating.co.uk/", "sarah jones");
        assert_ne!(a, b);
    }

    #[test]
    fn test_page_fingerprint_ignores_whitespace() {
        let fp1 = compute_page_fingerprint("Meet the team\nAndrew Riley");
        let fp2 = compute_page_fingerprint("Meet  the team   Andrew Riley\n");
        assert_eq!(fp1, fp2);
        assert!(has_content_changed(fp1, compute_page_fingerprint("Meet the team")));
        assert!(!has_content_changed(fp1, fp2));
    }
}
