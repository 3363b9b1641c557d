//! News channels and articles.
//!
//! Articles are drafted with pending metric deltas and only move public
//! metrics when published on the next tick. Suppressing a draft zeroes its
//! deltas; banning a channel suppresses all of its drafts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchfloor_common::catalog::{ChannelConfig, MetricDeltas};
use watchfloor_common::template::render;
use watchfloor_common::{ArticleKind, ChannelStance, Metric, SimError, SimResult};

use crate::random::RandomSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub key: String,
    pub name: String,
    pub stance: ChannelStance,
    pub credibility: u8,
    pub banned: bool,
}

impl From<&ChannelConfig> for Channel {
    fn from(cfg: &ChannelConfig) -> Self {
        Self {
            key: cfg.key.clone(),
            name: cfg.name.clone(),
            stance: cfg.stance,
            credibility: cfg.credibility.min(100),
            banned: false,
        }
    }
}

impl Channel {
    /// Stance and credibility scaling of a base delta.
    pub fn scale(&self, base: MetricDeltas) -> MetricDeltas {
        let factor = self.stance.delta_multiplier() * f64::from(self.credibility) / 100.0;
        let scale = |v: i32| (f64::from(v) * factor).round() as i32;
        MetricDeltas {
            awareness: scale(base.awareness),
            anger: scale(base.anger),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArticleTrigger {
    Action { flag_id: Uuid },
    Protest { protest_id: Uuid },
    Tier { metric: Metric, tier: u8 },
    Censorship { channel_key: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub channel_key: String,
    pub kind: ArticleKind,
    pub headline: String,
    pub summary: String,
    pub trigger: Option<ArticleTrigger>,
    /// Pending until published; zero once suppressed.
    pub deltas: MetricDeltas,
    pub drafted_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub suppressed: bool,
}

impl Article {
    pub fn is_pending(&self) -> bool {
        self.published_at.is_none() && !self.suppressed
    }
}

/// What an article says and why, before a channel is chosen.
pub struct Story<'a> {
    pub kind: ArticleKind,
    pub headline: &'a str,
    pub vars: Vec<(&'static str, String)>,
    pub deltas: MetricDeltas,
    pub trigger: Option<ArticleTrigger>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Newsroom {
    channels: Vec<Channel>,
    articles: Vec<Article>,
}

impl Newsroom {
    pub fn new(channels: &[ChannelConfig]) -> Self {
        Self {
            channels: channels.iter().map(Channel::from).collect(),
            articles: Vec::new(),
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn channel(&self, key: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.key == key)
    }

    pub fn article(&self, id: Uuid) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter().filter(|a| a.is_pending())
    }

    /// Random unbanned channel; `independent_only` limits to independent and critical outlets.
    pub fn pick_channel(&self, rng: &mut dyn RandomSource, independent_only: bool) -> Option<&Channel> {
        let open: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|c| !c.banned && (!independent_only || c.stance.is_independent()))
            .collect();
        rng.pick(open.len()).map(|i| open[i])
    }

    /// Write a story up as a draft on a randomly chosen open channel.
    pub fn draft(
        &self,
        story: Story<'_>,
        independent_only: bool,
        summary_template: &str,
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Option<Article> {
        let channel = self.pick_channel(rng, independent_only)?;
        let lookup = |var: &str| {
            if var == "channel" {
                return Some(channel.name.clone());
            }
            story
                .vars
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.clone())
        };
        Some(Article {
            id: Uuid::new_v4(),
            channel_key: channel.key.clone(),
            kind: story.kind,
            headline: render(story.headline, &lookup),
            summary: render(summary_template, &lookup),
            trigger: story.trigger,
            deltas: channel.scale(story.deltas),
            drafted_at: now,
            published_at: None,
            suppressed: false,
        })
    }

    // --- Checks for operator actions ---

    pub fn check_suppressible(&self, article_id: Uuid) -> SimResult<()> {
        let article = self
            .article(article_id)
            .ok_or_else(|| SimError::not_found("article", article_id))?;
        if article.suppressed {
            return Err(SimError::Conflict(format!("article {article_id} already suppressed")));
        }
        if article.published_at.is_some() {
            return Err(SimError::Conflict(format!("article {article_id} already published")));
        }
        Ok(())
    }

    pub fn check_bannable(&self, channel_key: &str) -> SimResult<()> {
        let channel = self
            .channel(channel_key)
            .ok_or_else(|| SimError::not_found("channel", channel_key))?;
        if channel.banned {
            return Err(SimError::Conflict(format!("channel {channel_key} already banned")));
        }
        Ok(())
    }

    // --- Mutations (applied by the session reducer) ---

    pub fn add(&mut self, article: Article) {
        if self.article(article.id).is_none() {
            self.articles.push(article);
        }
    }

    pub fn publish(&mut self, article_id: Uuid, at: DateTime<Utc>) -> Option<MetricDeltas> {
        let article = self.articles.iter_mut().find(|a| a.id == article_id)?;
        if !article.is_pending() {
            return None;
        }
        article.published_at = Some(at);
        Some(article.deltas)
    }

    pub fn suppress(&mut self, article_id: Uuid) {
        if let Some(article) = self
            .articles
            .iter_mut()
            .find(|a| a.id == article_id && a.published_at.is_none())
        {
            article.suppressed = true;
            article.deltas = MetricDeltas::ZERO;
        }
    }

    /// Ban a channel: its drafts are suppressed and surviving independent
    /// channels gain `credibility_boost`.
    pub fn ban(&mut self, channel_key: &str, credibility_boost: u8) {
        let Some(channel) = self.channels.iter_mut().find(|c| c.key == channel_key) else {
            return;
        };
        channel.banned = true;

        for article in self
            .articles
            .iter_mut()
            .filter(|a| a.channel_key == channel_key && a.published_at.is_none())
        {
            article.suppressed = true;
            article.deltas = MetricDeltas::ZERO;
        }
        for survivor in self
            .channels
            .iter_mut()
            .filter(|c| !c.banned && c.stance.is_independent())
        {
            survivor.credibility = survivor.credibility.saturating_add(credibility_boost).min(100);
        }
    }
}
