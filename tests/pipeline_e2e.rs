// tests/pipeline_e2e.rs
// Full runs over fixture sources: fetch → extract → merge → draft.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use people_on_the_move::error::SourceFetchError;
use people_on_the_move::extract::{EventExtractor, ExtractorConfig};
use people_on_the_move::ingest::providers::rss::RssFetcher;
use people_on_the_move::ingest::types::{RawItem, SourceFetcher};
use people_on_the_move::model::{AnnouncementStatus, Company, GeneratorKind};
use people_on_the_move::pipeline::PipelineSettings;
use people_on_the_move::source_weights::SourceWeights;
use people_on_the_move::{
    CancelFlag, LocalStore, Pipeline, PostGenerator, RunOptions, Store, WorkflowEngine,
};

const TRADE_XML: &str = include_str!("fixtures/trade_feed.xml");
const WIRE_XML: &str = include_str!("fixtures/wire_feed.xml");

struct FailingSource;

#[async_trait]
impl SourceFetcher for FailingSource {
    async fn try_fetch(&self, _c: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError> {
        Err(SourceFetchError::Status(503))
    }
    fn source_id(&self) -> &str {
        "failing"
    }
}

struct SlowSource;

#[async_trait]
impl SourceFetcher for SlowSource {
    async fn try_fetch(&self, _c: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
    fn source_id(&self) -> &str {
        "slow"
    }
}

struct MalformedSource;

#[async_trait]
impl SourceFetcher for MalformedSource {
    async fn try_fetch(&self, _c: Option<&Company>) -> Result<Vec<RawItem>, SourceFetchError> {
        RssFetcher::from_fixture("malformed", "<html><body>not a feed</body></html>")
            .try_fetch(None)
            .await
    }
    fn source_id(&self) -> &str {
        "malformed"
    }
}

fn seeded_store() -> Arc<dyn Store> {
    let store: Arc<dyn Store> = Arc::new(LocalStore::in_memory());
    store
        .insert_company(Company::new("Tyson Foods").with_aliases(["Tyson"]))
        .unwrap();
    store.insert_company(Company::new("Hormel Foods")).unwrap();
    store.insert_company(Company::new("Cargill")).unwrap();
    store
}

fn build(store: Arc<dyn Store>, fetchers: Vec<Arc<dyn SourceFetcher>>) -> Pipeline {
    let generator = Arc::new(PostGenerator::templates_only(vec!["#MeatIndustry".into()]));
    let workflow = Arc::new(WorkflowEngine::new(Arc::clone(&store), generator));
    let extractor = EventExtractor::new(ExtractorConfig::default(), SourceWeights::default());
    Pipeline::new(
        fetchers,
        extractor,
        store,
        workflow,
        PipelineSettings {
            source_timeout: Duration::from_millis(300),
            days_back: 7,
            auto_draft: true,
        },
    )
}

fn fixture_sources() -> Vec<Arc<dyn SourceFetcher>> {
    vec![
        Arc::new(RssFetcher::from_fixture("meatpoultry-people", TRADE_XML)),
        Arc::new(RssFetcher::from_fixture("prnewswire-personnel", WIRE_XML)),
    ]
}

#[tokio::test]
async fn two_sources_one_announcement_with_draft() {
    let store = seeded_store();
    let p = build(Arc::clone(&store), fixture_sources());

    let report = p.run_once(&RunOptions::default(), &CancelFlag::new()).await.unwrap();
    assert_eq!(report.sources, 2);
    assert_eq!(report.items, 4);
    // the Cargill item is from 2001
    assert_eq!(report.recent_items, 3);
    assert_eq!(report.created, 1);
    assert_eq!(report.merged, 1);
    assert_eq!(report.drafts, 1);
    assert_eq!(report.errors, 0);

    let pending = store.list_by_status(Some(AnnouncementStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    let a = &pending[0];
    assert_eq!(a.company_id.as_str(), "tyson-foods");
    assert_eq!(a.person_name, "Jane Smith");
    assert_eq!(a.new_title.as_deref(), Some("COO"));
    assert_eq!(a.source_urls.len(), 2);
    assert!(a
        .source_urls
        .iter()
        .any(|u| u.contains("prnewswire.com")));

    let post = p.workflow().current_post(a.id).unwrap().expect("draft");
    assert_eq!(post.revision, 1);
    assert_eq!(post.generator_kind, GeneratorKind::Template);
    assert!(post.text.contains("Jane Smith"));
    assert!(post.text.contains("#TysonFoods"));
}

#[tokio::test]
async fn rerun_changes_nothing() {
    let store = seeded_store();
    let p = build(Arc::clone(&store), fixture_sources());
    let cancel = CancelFlag::new();

    p.run_once(&RunOptions::default(), &cancel).await.unwrap();
    let before = store.list_by_status(None).unwrap();

    let again = p.run_once(&RunOptions::default(), &cancel).await.unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.merged, 0);
    assert_eq!(again.unchanged, 2);
    assert_eq!(again.drafts, 0);

    let after = store.list_by_status(None).unwrap();
    assert_eq!(before, after);
    assert_eq!(store.posts_for(after[0].id).unwrap().len(), 1);
}

#[tokio::test]
async fn broken_sources_do_not_abort_the_run() {
    let store = seeded_store();
    let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![
        Arc::new(FailingSource),
        Arc::new(SlowSource),
        Arc::new(MalformedSource),
        Arc::new(RssFetcher::from_fixture("meatpoultry-people", TRADE_XML)),
    ];
    let p = build(Arc::clone(&store), fetchers);

    let t0 = Instant::now();
    let report = p.run_once(&RunOptions::default(), &CancelFlag::new()).await.unwrap();
    assert!(t0.elapsed() < Duration::from_secs(10), "slow source must time out");
    assert_eq!(report.sources, 4);
    assert_eq!(report.created, 1);
    assert_eq!(store.list_by_status(None).unwrap().len(), 1);
}

#[tokio::test]
async fn company_filter_limits_matching() {
    let store = seeded_store();
    let p = build(Arc::clone(&store), fixture_sources());

    let opts = RunOptions {
        company: Some("hormel".into()),
        auto_draft: None,
    };
    let report = p.run_once(&opts, &CancelFlag::new()).await.unwrap();
    assert_eq!(report.created, 0);
    assert!(store.list_by_status(None).unwrap().is_empty());

    let unknown = RunOptions {
        company: Some("Acme Widgets".into()),
        auto_draft: None,
    };
    assert!(p.run_once(&unknown, &CancelFlag::new()).await.is_err());
}

#[tokio::test]
async fn drafting_can_be_switched_off_per_run() {
    let store = seeded_store();
    let p = build(Arc::clone(&store), fixture_sources());
    let opts = RunOptions {
        company: None,
        auto_draft: Some(false),
    };
    let report = p.run_once(&opts, &CancelFlag::new()).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.drafts, 0);
    let a = &store.list_by_status(None).unwrap()[0];
    assert!(p.workflow().current_post(a.id).unwrap().is_none());
}

#[tokio::test]
async fn cancelled_run_writes_nothing() {
    let store = seeded_store();
    let p = build(Arc::clone(&store), fixture_sources());
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = p.run_once(&RunOptions::default(), &cancel).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.created, 0);
    assert!(store.list_by_status(None).unwrap().is_empty());
}

#[tokio::test]
async fn scheduler_stops_on_cancel() {
    let store = seeded_store();
    let p = Arc::new(build(Arc::clone(&store), fixture_sources()));
    let cancel = CancelFlag::new();

    let handle = tokio::spawn(people_on_the_move::ingest::scheduler::run_forever(
        Arc::clone(&p),
        Duration::from_secs(3600),
        RunOptions::default(),
        cancel.clone(),
    ));
    // first tick fires immediately
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();
    let runs = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler exits")
        .unwrap();
    assert_eq!(runs, 1);
    assert_eq!(store.list_by_status(None).unwrap().len(), 1);
}
