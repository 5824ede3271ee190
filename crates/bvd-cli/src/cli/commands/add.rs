//! `bvd add` – preview range expansion for URLs.

use bvd_core::url_expand;

pub fn run_add(urls: &[String]) {
    for url in urls {
        let expanded = url_expand::expand(url);
        if expanded.is_empty() {
            println!("{url}: range is empty, expands to nothing");
            continue;
        }
        for concrete in expanded {
            println!("{concrete}");
        }
    }
}
