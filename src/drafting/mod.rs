// src/drafting/mod.rs
//! Post drafting: AI first, deterministic templates as the floor.
//!
//! `PostGenerator` never fails. Any `GenerationError` from the AI backend is
//! logged and the next strategy runs; the template strategy always succeeds.

pub mod ai;
pub mod templates;

use chrono::Utc;
use metrics::counter;

use crate::config::DraftingConfig;
use crate::model::{Announcement, GeneratorKind, Post, PostId, PostStatus};

pub use ai::{build_backend, DynBackend, MockBackend, MockReply, TextBackend, POST_SYSTEM_PROMPT};

/// Hard cap on post length in characters.
pub const MAX_POST_CHARS: usize = 3000;

pub struct PostGenerator {
    strategies: Vec<GeneratorKind>,
    backend: DynBackend,
    hashtags: Vec<String>,
}

impl PostGenerator {
    pub fn new(strategies: Vec<GeneratorKind>, backend: DynBackend, hashtags: Vec<String>) -> Self {
        let mut strategies = strategies;
        if !strategies.contains(&GeneratorKind::Template) {
            strategies.push(GeneratorKind::Template);
        }
        Self {
            strategies,
            backend,
            hashtags,
        }
    }

    pub fn from_config(cfg: &DraftingConfig) -> Self {
        Self::new(cfg.strategies.clone(), build_backend(cfg), cfg.hashtags.clone())
    }

    /// Templates only; used by tests and when drafting runs offline.
    pub fn templates_only(hashtags: Vec<String>) -> Self {
        Self::new(vec![GeneratorKind::Template], std::sync::Arc::new(ai::DisabledBackend), hashtags)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// First revision for an announcement.
    pub async fn generate(&self, a: &Announcement, company_name: &str) -> Post {
        let (text, kind, index) = self.draft(&self.strategies, a, company_name, None).await;
        new_post(a, 1, text, kind, index)
    }

    /// A further revision. An explicit template index skips the AI step.
    pub async fn regenerate(
        &self,
        a: &Announcement,
        company_name: &str,
        revision: u32,
        template_index: Option<usize>,
    ) -> Post {
        let order: &[GeneratorKind] = if template_index.is_some() {
            &[GeneratorKind::Template]
        } else {
            &[GeneratorKind::Ai, GeneratorKind::Template]
        };
        let (text, kind, index) = self.draft(order, a, company_name, template_index).await;
        new_post(a, revision, text, kind, index)
    }

    async fn draft(
        &self,
        order: &[GeneratorKind],
        a: &Announcement,
        company_name: &str,
        template_index: Option<usize>,
    ) -> (String, GeneratorKind, Option<usize>) {
        for kind in order {
            match kind {
                GeneratorKind::Template => break,
                GeneratorKind::Ai => {
                    let prompt = build_prompt(a, company_name);
                    match self.backend.complete(POST_SYSTEM_PROMPT, &prompt).await {
                        Ok(raw) => {
                            let text = clean_post(&raw);
                            if !text.is_empty() {
                                counter!("drafting_posts_total", "kind" => "ai").increment(1);
                                return (text, GeneratorKind::Ai, None);
                            }
                            counter!("drafting_fallback_total").increment(1);
                            tracing::warn!(announcement = %a.id, "AI draft was empty after cleanup");
                        }
                        Err(e) => {
                            counter!("drafting_fallback_total").increment(1);
                            tracing::info!(
                                announcement = %a.id,
                                backend = self.backend.name(),
                                error = %e,
                                "AI draft failed; falling back"
                            );
                        }
                    }
                }
            }
        }

        // Template is always the last resort.
        let (text, idx) = templates::render(a, company_name, template_index, &self.hashtags);
        counter!("drafting_posts_total", "kind" => "template").increment(1);
        (clean_post(&text), GeneratorKind::Template, Some(idx))
    }
}

fn new_post(
    a: &Announcement,
    revision: u32,
    text: String,
    generator_kind: GeneratorKind,
    template_index: Option<usize>,
) -> Post {
    Post {
        id: PostId::new(),
        announcement_id: a.id,
        revision,
        text,
        generator_kind,
        template_index,
        created_at: Utc::now(),
        status: PostStatus::Draft,
        approved_by: None,
        approved_at: None,
        posted_at: None,
        linkedin_url: None,
        version: 0,
    }
}

/// User message for the AI backend. Only fields we actually know.
pub fn build_prompt(a: &Announcement, company_name: &str) -> String {
    let mut lines = vec![
        "Write a LinkedIn post about this executive career move:".to_string(),
        String::new(),
        format!("Person: {}", a.person_name.trim()),
    ];
    if let Some(t) = a.new_title.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(format!("New title: {}", t.trim()));
    }
    if !company_name.trim().is_empty() {
        lines.push(format!("Company: {}", company_name.trim()));
    }
    lines.push(format!("Action: {}", a.move_kind.as_str()));
    if let Some(p) = a.previous_title.as_deref() {
        lines.push(format!("Previous title: {p}"));
    }
    lines.join("\n")
}

/// Trim, drop markdown emphasis, cap at `MAX_POST_CHARS`.
pub fn clean_post(raw: &str) -> String {
    let text = raw.trim().replace("**", "");
    if text.chars().count() <= MAX_POST_CHARS {
        return text;
    }
    text.chars().take(MAX_POST_CHARS).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnnouncementId, AnnouncementStatus, CompanyId, MoveKind};
    use std::sync::Arc;

    fn ann() -> Announcement {
        Announcement {
            id: AnnouncementId::new(),
            company_id: CompanyId::from_name("Tyson Foods"),
            person_name: "Jane Smith".into(),
            new_title: Some("Chief Operating Officer".into()),
            previous_title: None,
            move_kind: MoveKind::Promoted,
            source_urls: vec![],
            first_seen_at: Utc::now(),
            updated_at: Utc::now(),
            status: AnnouncementStatus::Pending,
            human_edited: false,
            confidence: 0.8,
            version: 1,
        }
    }

    fn generator(backend: MockBackend) -> (PostGenerator, Arc<MockBackend>) {
        let mock = Arc::new(backend);
        let g = PostGenerator::new(
            vec![GeneratorKind::Ai, GeneratorKind::Template],
            mock.clone(),
            vec!["#MeatIndustry".into()],
        );
        (g, mock)
    }

    #[tokio::test]
    async fn ai_success_is_used() {
        let (g, mock) = generator(MockBackend::echo());
        let p = g.generate(&ann(), "Tyson Foods").await;
        assert_eq!(p.generator_kind, GeneratorKind::Ai);
        assert_eq!(p.revision, 1);
        assert_eq!(p.status, PostStatus::Draft);
        assert!(p.text.contains("Jane Smith is now Chief Operating Officer at Tyson Foods"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn failing_ai_falls_back_deterministically() {
        let (g, _) = generator(MockBackend::failing(503));
        let a = ann();
        let x = g.generate(&a, "Tyson Foods").await;
        let y = g.generate(&a, "Tyson Foods").await;
        assert_eq!(x.generator_kind, GeneratorKind::Template);
        assert_eq!(x.text, y.text);
        assert_eq!(x.template_index, y.template_index);
    }

    #[tokio::test]
    async fn explicit_template_skips_ai() {
        let (g, mock) = generator(MockBackend::echo());
        let p = g.regenerate(&ann(), "Tyson Foods", 2, Some(1)).await;
        assert_eq!(p.generator_kind, GeneratorKind::Template);
        assert_eq!(p.template_index, Some(1));
        assert_eq!(p.revision, 2);
        assert_eq!(mock.calls(), 0);
        assert!(p.text.starts_with("Tyson Foods has promoted Jane Smith"));
    }

    #[tokio::test]
    async fn empty_ai_text_falls_back() {
        let (g, _) = generator(MockBackend::new(MockReply::Fixed("****".into())));
        let p = g.generate(&ann(), "Tyson Foods").await;
        assert_eq!(p.generator_kind, GeneratorKind::Template);
    }

    #[test]
    fn cleanup_caps_length() {
        let long = "a".repeat(MAX_POST_CHARS + 50);
        assert_eq!(clean_post(&long).chars().count(), MAX_POST_CHARS);
        assert_eq!(clean_post("  **Bold** text \n"), "Bold text");
    }
}
