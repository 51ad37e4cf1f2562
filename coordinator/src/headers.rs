//! Outgoing-header sanitizer.
//!
//! When metadata stripping is enabled the host consults this filter
//! for every outgoing request to a supported source host and replaces
//! the request's header list with the returned set.

use common::HttpHeader;

/// Header names removed from outgoing requests.
///
/// Matching is exact and case-sensitive: the host normalizes these two
/// header names before delivery, so a looser match would only hide
/// bugs in the event bridge.
pub const STRIPPED_HEADER_NAMES: [&str; 2] = ["Origin", "Referer"];

/// Remove privacy-sensitive headers from an outgoing header list.
///
/// Every `Origin` and `Referer` header is dropped, including adjacent
/// duplicates; the relative order of the remaining headers is
/// preserved.
pub fn strip_metadata(headers: Vec<HttpHeader>) -> Vec<HttpHeader> {
    headers
        .into_iter()
        .filter(|header| !STRIPPED_HEADER_NAMES.contains(&header.name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str) -> HttpHeader {
        HttpHeader::new(name, "value")
    }

    #[test]
    fn test_strips_origin_and_referer() {
        let headers = vec![
            header("Accept"),
            header("Origin"),
            header("User-Agent"),
            header("Referer"),
            header("Accept-Language"),
        ];

        let filtered = strip_metadata(headers);
        let names: Vec<&str> = filtered.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["Accept", "User-Agent", "Accept-Language"]);
    }

    #[test]
    fn test_adjacent_matches_all_removed() {
        let headers = vec![
            header("Origin"),
            header("Origin"),
            header("Referer"),
            header("Accept"),
        ];

        let filtered = strip_metadata(headers);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Accept");
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let headers = vec![header("origin"), header("REFERER"), header("Referer")];

        let filtered = strip_metadata(headers);
        let names: Vec<&str> = filtered.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["origin", "REFERER"]);
    }

    #[test]
    fn test_empty_list() {
        assert!(strip_metadata(Vec::new()).is_empty());
    }
}
