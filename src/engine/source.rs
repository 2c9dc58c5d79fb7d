use std::collections::HashMap;

use log::debug;
use url::Url;

pub const NO_SOURCE: &str = "—";

/// Host part of a capture URL. Unparseable or host-less URLs give `"—"`.
pub fn source_label(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_string(),
            None => NO_SOURCE.to_string(),
        },
        Err(err) => {
            debug!("unparseable capture url {url:?}: {err}");
            NO_SOURCE.to_string()
        }
    }
}

/// Most frequent label; the first one seen wins ties. `"—"` when empty.
pub fn representative_source<I, S>(labels: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, label) in labels.into_iter().enumerate() {
        counts
            .entry(label.as_ref().to_string())
            .or_insert((0, position))
            .0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then_with(|| first_b.cmp(first_a))
        })
        .map(|(label, _)| label)
        .unwrap_or_else(|| NO_SOURCE.to_string())
}
