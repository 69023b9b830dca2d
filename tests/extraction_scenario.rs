// tests/extraction_scenario.rs
// Extraction over fixture feeds with the fixture company list.

use std::path::Path;
use std::sync::Arc;

use people_on_the_move::extract::{EventExtractor, ExtractorConfig};
use people_on_the_move::ingest::providers::rss::RssFetcher;
use people_on_the_move::ingest::providers::search_api::SearchApiFetcher;
use people_on_the_move::ingest::quota::DailyQuota;
use people_on_the_move::ingest::types::{RawItem, SourceFetcher};
use people_on_the_move::model::{Candidate, Company, MoveKind};
use people_on_the_move::registry::load_companies_from;
use people_on_the_move::source_weights::SourceWeights;
use people_on_the_move::CompanyRegistry;

const TRADE_XML: &str = include_str!("fixtures/trade_feed.xml");
const NEWSAPI_JSON: &str = include_str!("fixtures/newsapi.json");

fn registry() -> CompanyRegistry {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/companies.csv");
    CompanyRegistry::from_companies(load_companies_from(&path).unwrap()).unwrap()
}

fn extract_all(items: &[RawItem]) -> Vec<Candidate> {
    let ex = EventExtractor::new(ExtractorConfig::default(), SourceWeights::default());
    let reg = registry();
    items.iter().flat_map(|it| ex.extract(it, &reg)).collect()
}

#[tokio::test]
async fn trade_feed_yields_only_the_appointment() {
    let items = RssFetcher::from_fixture("meatpoultry-people", TRADE_XML)
        .try_fetch(None)
        .await
        .unwrap();
    let out = extract_all(&items);

    assert_eq!(out.len(), 1, "only the COO item describes a move: {out:?}");
    let c = &out[0];
    assert_eq!(c.company_id.as_str(), "tyson-foods");
    assert_eq!(c.person_name, "Jane Smith");
    assert_eq!(c.new_title.as_deref(), Some("COO"));
    assert_eq!(c.move_kind, MoveKind::Named);
    assert_eq!(
        c.source_url,
        "https://www.meatpoultry.com/articles/30001-tyson-foods-names-jane-smith-coo"
    );
    assert!(c.source_text_excerpt.contains("Jane Smith"));
    assert!(c.confidence_score >= ExtractorConfig::default().min_confidence);
    assert!(c.confidence_score <= 1.0);
}

#[tokio::test]
async fn search_results_are_matched_through_aliases() {
    let f = SearchApiFetcher::from_fixture("newsapi", NEWSAPI_JSON, Arc::new(DailyQuota::new(1)));
    let items = f.try_fetch(Some(&Company::new("Hormel Foods"))).await.unwrap();
    let out = extract_all(&items);

    assert_eq!(out.len(), 1);
    let c = &out[0];
    // "Hormel Foods" is an alias of "Hormel Foods, Inc."
    assert_eq!(c.company_id.as_str(), "hormel-foods-inc");
    assert_eq!(c.person_name, "John Doe");
    assert_eq!(c.move_kind, MoveKind::Promoted);
    assert_eq!(c.new_title.as_deref(), Some("CFO"));
    assert_eq!(c.source_id, "newsapi");
}

#[test]
fn untracked_company_gives_nothing() {
    let item = RawItem {
        source_id: "wire".into(),
        source_name: "PR Newswire".into(),
        fetched_at: chrono::Utc::now(),
        url: "https://www.prnewswire.com/news-releases/acme-1.html".into(),
        title: "Acme Packing appoints Jane Smith as CEO".into(),
        body_text: String::new(),
        published_at: None,
    };
    assert!(extract_all(&[item]).is_empty());
}
