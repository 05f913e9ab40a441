//! Search bundle paging links.

use url::Url;

use meridian_model::BundleLink;
use meridian_search::query::{COUNT_PARAM, DEFAULT_COUNT, OFFSET_PARAM};
use meridian_search::{Query, QueryParams};

/// Builds the `self`/`first`/`previous`/`next`/`last` links for a search
/// result page.
///
/// `next` and `last` need the total; when counting is disabled `next` is
/// emitted only while pages come back full, and `last` is omitted.
pub fn generate_paging_links(
    base_url: &Url,
    query: &Query,
    total: u32,
    num_results: u32,
    count_totals: bool,
) -> Vec<BundleLink> {
    // queries that cannot page get only a verbatim self link
    if !query.supports_paging() {
        return vec![raw_self_link(base_url, query)];
    }

    let params = query.params();
    let offset = params
        .get(OFFSET_PARAM)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(0) as usize;
    let count = params
        .get(COUNT_PARAM)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n >= 1)
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_COUNT);

    let mut links = Vec::with_capacity(5);
    links.push(link("self", base_url, &params, offset, count));
    links.push(link("first", base_url, &params, 0, count));

    if offset > 0 {
        // uneven paging (e.g. count=10&offset=5) shortens the previous page
        let prev_offset = offset.saturating_sub(count);
        let prev_count = offset - prev_offset;
        links.push(link("previous", base_url, &params, prev_offset, prev_count));
    }

    if count_totals {
        let total = total as usize;
        if total > offset + count {
            links.push(link("next", base_url, &params, offset + count, count));
        }

        let remainder = if total < offset { 0 } else { (total - offset) % count };
        let mut last_offset = total.saturating_sub(remainder);
        if remainder == 0 && total > count {
            last_offset = total - count;
        }
        links.push(link("last", base_url, &params, last_offset, count));
    } else if num_results as usize == count {
        // without a total the last link cannot be computed
        links.push(link("next", base_url, &params, offset + count, count));
    }

    links
}

fn raw_self_link(base_url: &Url, query: &Query) -> BundleLink {
    let url = if query.query.is_empty() {
        base_url.to_string()
    } else {
        format!("{}?{}", base_url, query.query)
    };
    BundleLink {
        relation: "self".to_string(),
        url,
    }
}

fn link(relation: &str, base_url: &Url, params: &QueryParams, offset: usize, count: usize) -> BundleLink {
    let mut params = params.clone();
    params.set(OFFSET_PARAM, &offset.to_string());
    params.set(COUNT_PARAM, &count.to_string());
    let mut url = base_url.clone();
    url.set_query(Some(&params.encode()));
    BundleLink {
        relation: relation.to_string(),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost/Patient").unwrap()
    }

    fn relations(links: &[BundleLink]) -> Vec<&str> {
        links.iter().map(|l| l.relation.as_str()).collect()
    }

    fn find<'a>(links: &'a [BundleLink], relation: &str) -> &'a BundleLink {
        links.iter().find(|l| l.relation == relation).unwrap()
    }

    #[test]
    fn first_page_with_totals() {
        let query = Query::new("Patient", "gender=male&_count=10");
        let links = generate_paging_links(&base(), &query, 25, 10, true);
        assert_eq!(relations(&links), vec!["self", "first", "next", "last"]);
        assert!(find(&links, "next").url.contains("_offset=10"));
        assert!(find(&links, "last").url.contains("_offset=20"));
    }

    #[test]
    fn middle_page_has_previous() {
        let query = Query::new("Patient", "gender=male&_count=10&_offset=10");
        let links = generate_paging_links(&base(), &query, 25, 10, true);
        assert_eq!(relations(&links), vec!["self", "first", "previous", "next", "last"]);
        assert!(find(&links, "previous").url.contains("_offset=0"));
    }

    #[test]
    fn uneven_offset_shortens_previous_page() {
        let query = Query::new("Patient", "_count=10&_offset=5");
        let links = generate_paging_links(&base(), &query, 25, 10, true);
        let previous = find(&links, "previous");
        assert!(previous.url.contains("_offset=0"));
        assert!(previous.url.contains("_count=5"));
    }

    #[test]
    fn exact_multiple_total_ends_on_full_page() {
        let query = Query::new("Patient", "_count=10");
        let links = generate_paging_links(&base(), &query, 20, 10, true);
        assert!(find(&links, "last").url.contains("_offset=10"));
    }

    #[test]
    fn without_totals_next_depends_on_page_fullness() {
        let query = Query::new("Patient", "_count=10");
        let links = generate_paging_links(&base(), &query, 0, 10, false);
        assert_eq!(relations(&links), vec!["self", "first", "next"]);

        let links = generate_paging_links(&base(), &query, 0, 7, false);
        assert_eq!(relations(&links), vec!["self", "first"]);
    }

    #[test]
    fn summary_count_gets_raw_self_link_only() {
        let query = Query::new("Patient", "_summary=count");
        let links = generate_paging_links(&base(), &query, 8, 0, true);
        assert_eq!(relations(&links), vec!["self"]);
        assert_eq!(links[0].url, "http://localhost/Patient?_summary=count");
    }
}
