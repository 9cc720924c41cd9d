// Client-side lease search
use crate::models::{AnnotatedLease, LeaseRecord};

/// Case-insensitive match on the first car's model name or brand.
/// A blank query matches everything; otherwise surrounding whitespace is
/// part of the query.
pub fn matches(lease: &LeaseRecord, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let query = query.to_lowercase();

    [lease.car_model(), lease.car_brand()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&query))
}

pub fn filter_annotated<'a>(
    leases: &'a [AnnotatedLease],
    query: &'a str,
) -> impl Iterator<Item = &'a AnnotatedLease> + 'a {
    leases.iter().filter(move |a| matches(&a.lease, query))
}
