// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::BTreeMap;

use pop_scrape::config::consts::CRITICAL_COUNTRIES;
use pop_scrape::model::RawTable;
use pop_scrape::specs::world;

/// Raw label as the source page shows it; canonicalizes to `name`.
fn label(name: &str) -> String {
    match name {
        "USA" => s("United States"),
        other => s(other),
    }
}

fn s(v: &str) -> String {
    v.to_string()
}

/// One 12-cell ranking row.
pub fn row(rank: usize, name: &str, population: i64) -> Vec<String> {
    vec![
        rank.to_string(),
        label(name),
        format_thousands(population),
        s("0.91 %"),
        s("1,234,567"),
        s("123"),
        s("9,388,211"),
        s("-35,000"),
        s("2.1"),
        s("29"),
        s("55 %"),
        s("1.2 %"),
    ]
}

pub fn format_thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 { format!("-{out}") } else { out }
}

/// `n` rows: the critical countries first, then filler, populations descending.
pub fn country_rows(n: usize) -> Vec<Vec<String>> {
    let mut names: Vec<String> = CRITICAL_COUNTRIES.iter().map(|c| s(c)).collect();
    let mut i = 0;
    while names.len() < n {
        names.push(format!("Territory {i}"));
        i += 1;
    }
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| row(idx + 1, name, 1_500_000_000 - (idx as i64) * 1_000_000))
        .collect()
}

pub fn country_table(n: usize) -> RawTable {
    RawTable::from_rows(country_rows(n))
}

pub fn world_table(population: &str) -> RawTable {
    let mut c = BTreeMap::new();
    c.insert(s(world::CURRENT_POPULATION), s(population));
    c.insert(s(world::BIRTHS_TODAY), s("183,211"));
    c.insert(s(world::DEATHS_TODAY), s("78,350"));
    c.insert(s(world::POPULATION_GROWTH), s("104,861"));
    RawTable::Counters(c)
}

/// Server-rendered ranking page.
pub fn countries_html(n: usize) -> String {
    let body: String = country_rows(n)
        .into_iter()
        .map(|cells| {
            let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
            format!("<tr>{tds}</tr>\n")
        })
        .collect();
    format!(
        r#"<html><body><table id="example2"><thead><tr><th>#</th><th>Country</th><th class="sorting_desc">Population</th></tr></thead>
<tbody>
{body}</tbody></table></body></html>"#
    )
}

pub fn world_html() -> String {
    s(r#"<html><body>
<span rel="current_population"><span class="rts-nr-int">8</span>,<span class="rts-nr-int">045</span>,<span class="rts-nr-int">311</span>,<span class="rts-nr-int">447</span></span>
<span rel="births_today"><span class="rts-nr-int">183</span>,<span class="rts-nr-int">211</span></span>
<span rel="dth1s_today"><span class="rts-nr-int">78</span>,<span class="rts-nr-int">350</span></span>
<span rel="absolute_growth"><span class="rts-nr-int">104</span>,<span class="rts-nr-int">861</span></span>
</body></html>"#)
}
