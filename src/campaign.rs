use crate::cadence::{Platform, PlatformCadence};
use crate::generator::{GenerateError, GenerationRequest, Post, UniquePostGenerator};
use crate::scheduler::{ScheduledSlot, ThemeRotation};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// One scheduled generation and its outcome. A failed slot never affects its siblings.
#[derive(Debug)]
pub struct PlannedPost {
    pub slot: ScheduledSlot,
    pub platform: Platform,
    pub time: Option<NaiveTime>,
    pub outcome: Result<Post, GenerateError>,
}

/// Slots already handled today by the daily loop.
#[derive(Debug, Default)]
pub struct DailyProgress {
    date: Option<NaiveDate>,
    completed: HashSet<(Platform, NaiveTime)>,
}

impl DailyProgress {
    fn roll_to(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.date = Some(date);
            self.completed.clear();
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.len()
    }

    /// Progress for a loop starting at `now`: slots whose time has already
    /// passed today count as done, so a late start or restart never backfills.
    pub fn resume_at(now: NaiveDateTime, cadences: &[PlatformCadence]) -> Self {
        let mut progress = Self::default();
        progress.roll_to(now.date());
        for cadence in cadences {
            for posting in cadence.daily_slots(now.date()) {
                if posting.time <= now.time() {
                    progress.completed.insert((posting.platform, posting.time));
                }
            }
        }
        progress
    }
}

pub struct Campaign {
    generator: UniquePostGenerator,
    rotation: ThemeRotation,
    cadences: Vec<PlatformCadence>,
    max_attempts: usize,
    include_emojis: bool,
}

impl Campaign {
    pub fn new(
        generator: UniquePostGenerator,
        rotation: ThemeRotation,
        cadences: Vec<PlatformCadence>,
        max_attempts: usize,
    ) -> Self {
        Self {
            generator,
            rotation,
            cadences,
            max_attempts,
            include_emojis: true,
        }
    }

    pub fn with_emojis(mut self, include_emojis: bool) -> Self {
        self.include_emojis = include_emojis;
        self
    }

    async fn generate(
        &self,
        theme: &str,
        platform: Platform,
        content_type: Option<String>,
    ) -> Result<Post, GenerateError> {
        let mut request =
            GenerationRequest::new(theme, platform).with_content_type(content_type);
        request.include_emojis = self.include_emojis;
        self.generator
            .generate_request(request, self.max_attempts)
            .await
    }

    /// One post per platform for each day of the horizon.
    pub async fn plan(&self, start_day: NaiveDate, horizon: usize) -> Vec<PlannedPost> {
        let slots = self.rotation.themes_for_horizon(start_day, horizon);
        info!(
            "Campaign: planning {} days from {} across {} platforms",
            slots.len(),
            start_day,
            self.cadences.len()
        );

        let mut planned = Vec::new();
        for slot in slots {
            for cadence in &self.cadences {
                info!(
                    "Campaign: generating {} post for {} with theme: {}",
                    cadence.platform,
                    slot.date.format("%A"),
                    slot.theme
                );
                let content_type = cadence
                    .daily_slots(slot.date)
                    .into_iter()
                    .next()
                    .and_then(|s| s.content_type);
                let outcome = self
                    .generate(&slot.theme, cadence.platform, content_type)
                    .await;
                if let Err(e) = &outcome {
                    warn!("Campaign: slot {} skipped: {}", slot.date, e);
                }
                planned.push(PlannedPost {
                    slot: slot.clone(),
                    platform: cadence.platform,
                    time: None,
                    outcome,
                });
            }
        }
        planned
    }

    /// Generates every cadence slot of `now`'s day whose time has passed and
    /// that has not been handled yet.
    pub async fn run_due(
        &self,
        now: NaiveDateTime,
        progress: &mut DailyProgress,
    ) -> Vec<PlannedPost> {
        let date = now.date();
        progress.roll_to(date);
        let theme = self.rotation.theme_for(date).to_string();

        let mut produced = Vec::new();
        for cadence in &self.cadences {
            for posting in cadence.daily_slots(date) {
                if posting.time > now.time()
                    || progress.completed.contains(&(posting.platform, posting.time))
                {
                    continue;
                }

                let outcome = self
                    .generate(&theme, posting.platform, posting.content_type.clone())
                    .await;
                match &outcome {
                    Ok(post) => info!(
                        "Campaign: {} post ready for {} {}: {}",
                        posting.platform, date, posting.time, post.content
                    ),
                    Err(e) => error!(
                        "Campaign: {} slot {} {} failed: {}",
                        posting.platform, date, posting.time, e
                    ),
                }
                progress.completed.insert((posting.platform, posting.time));
                produced.push(PlannedPost {
                    slot: ScheduledSlot {
                        date,
                        day_offset: 0,
                        theme: theme.clone(),
                    },
                    platform: posting.platform,
                    time: Some(posting.time),
                    outcome,
                });
            }
        }
        produced
    }

    pub async fn run(self, check_interval: Duration) {
        let mut ticker = interval(check_interval);
        let mut progress = DailyProgress::resume_at(Local::now().naive_local(), &self.cadences);
        info!(
            "Campaign: {} slots already past today, waiting for the next one",
            progress.completed()
        );
        loop {
            ticker.tick().await;
            let produced = self.run_due(Local::now().naive_local(), &mut progress).await;
            if produced.is_empty() {
                debug!("Campaign: nothing due");
            } else {
                info!(
                    "Campaign: handled {} slots ({} done today)",
                    produced.len(),
                    progress.completed()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::ScriptedGenerator;
    use crate::guard::DuplicateGuard;
    use crate::history::tests::MemoryBackend;
    use crate::history::{HistoryStore, MAX_HISTORY};
    use crate::scheduler::RotationPolicy;
    use std::sync::Arc;

    fn campaign(
        script: Vec<Result<&str, &str>>,
        cadences: Vec<PlatformCadence>,
        max_attempts: usize,
    ) -> (Campaign, Arc<ScriptedGenerator>, Arc<HistoryStore>) {
        let store = Arc::new(HistoryStore::load(
            Box::new(MemoryBackend::default()),
            MAX_HISTORY,
        ));
        let scripted = Arc::new(ScriptedGenerator::new(script));
        let generator = UniquePostGenerator::new(
            store.clone(),
            scripted.clone(),
            Arc::new(DuplicateGuard::new(0.8)),
            Duration::from_secs(5),
        );
        let rotation = ThemeRotation::new(
            vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()],
            RotationPolicy::RoundRobin,
        )
        .unwrap();
        (
            Campaign::new(generator, rotation, cadences, max_attempts),
            scripted,
            store,
        )
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn test_plan_isolates_exhausted_slot() {
        // Day two keeps repeating day one's text and exhausts; day three recovers.
        let (campaign, scripted, store) = campaign(
            vec![
                Ok("First post about treasury runway"),
                Ok("First post about treasury runway"),
                Ok("First post about treasury runway"),
                Ok("Third day brings a different angle entirely"),
            ],
            vec![PlatformCadence::default_for(Platform::Twitter)],
            2,
        );

        let planned = campaign.plan(friday(), 3).await;
        assert_eq!(planned.len(), 3);
        assert!(planned[0].outcome.is_ok());
        assert!(matches!(
            planned[1].outcome,
            Err(GenerateError::Exhausted { max_attempts: 2, .. })
        ));
        assert_eq!(planned[1].slot.theme, "Beta");
        assert!(planned[2].outcome.is_ok());
        assert_eq!(scripted.calls(), 4);
        assert_eq!(store.size(), 2);
    }

    #[tokio::test]
    async fn test_plan_one_post_per_platform() {
        let (campaign, _scripted, _store) = campaign(
            vec![
                Ok("twitter alpha"),
                Ok("linkedin alpha"),
                Ok("twitter beta"),
                Ok("linkedin beta"),
            ],
            vec![
                PlatformCadence::default_for(Platform::Twitter),
                PlatformCadence::default_for(Platform::LinkedIn),
            ],
            1,
        );

        let planned = campaign.plan(friday(), 2).await;
        let platforms: Vec<_> = planned.iter().map(|p| p.platform).collect();
        assert_eq!(
            platforms,
            vec![
                Platform::Twitter,
                Platform::LinkedIn,
                Platform::Twitter,
                Platform::LinkedIn
            ]
        );
        assert!(planned.iter().all(|p| p.outcome.is_ok()));
    }

    #[tokio::test]
    async fn test_run_due_only_past_slots_once() {
        let script = vec![
            Ok("slot one"),
            Ok("slot two is here"),
            Ok("slot three arrives later"),
        ];
        let (campaign, scripted, _store) = campaign(
            script,
            vec![PlatformCadence::default_for(Platform::LinkedIn)],
            1,
        );
        let mut progress = DailyProgress::default();

        // LinkedIn times: 08:00, 12:00, 17:00
        let noon = friday().and_hms_opt(12, 30, 0).unwrap();
        let produced = campaign.run_due(noon, &mut progress).await;
        assert_eq!(produced.len(), 2);
        // Friday is weekday 4, and 4 % 3 picks "Beta".
        assert!(produced.iter().all(|p| p.slot.theme == "Beta"));
        assert_eq!(produced[0].time, NaiveTime::from_hms_opt(8, 0, 0));

        // Same tick again: nothing new.
        assert!(campaign.run_due(noon, &mut progress).await.is_empty());

        let evening = friday().and_hms_opt(18, 0, 0).unwrap();
        let produced = campaign.run_due(evening, &mut progress).await;
        assert_eq!(produced.len(), 1);
        assert_eq!(scripted.calls(), 3);
        assert_eq!(progress.completed(), 3);
    }

    #[tokio::test]
    async fn test_progress_resets_next_day() {
        let (campaign, _scripted, _store) = campaign(
            vec![Ok("a"), Ok("b c"), Ok("d e f"), Ok("g h i j")],
            vec![PlatformCadence {
                platform: Platform::Telegram,
                posts_per_day: 1,
                optimal_times: vec![NaiveTime::from_hms_opt(7, 0, 0).unwrap()],
                weekend_factor: 1.0,
                content_mix: Vec::new(),
            }],
            1,
        );
        let mut progress = DailyProgress::default();

        let day_one = friday().and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(campaign.run_due(day_one, &mut progress).await.len(), 1);

        let day_two = day_one + chrono::Duration::days(1);
        assert_eq!(campaign.run_due(day_two, &mut progress).await.len(), 1);
        assert_eq!(progress.completed(), 1);
    }

    #[tokio::test]
    async fn test_late_start_does_not_backfill() {
        let (campaign, scripted, _store) = campaign(
            vec![Ok("late night treasury note")],
            vec![PlatformCadence::default_for(Platform::Twitter)],
            1,
        );

        // Every Twitter slot, including 00:00, is already behind 23:30.
        let late = friday().and_hms_opt(23, 30, 0).unwrap();
        let mut progress = DailyProgress::resume_at(late, &campaign.cadences);
        assert_eq!(progress.completed(), 8);
        assert!(campaign.run_due(late, &mut progress).await.is_empty());
        assert_eq!(scripted.calls(), 0);

        // Saturday 06:30: only the 06:00 slot of the reduced weekend table is due.
        let next_morning = late + chrono::Duration::hours(7);
        let produced = campaign.run_due(next_morning, &mut progress).await;
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].time, NaiveTime::from_hms_opt(6, 0, 0));
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test]
    async fn test_resume_midday_keeps_remaining_slots() {
        let (campaign, scripted, _store) = campaign(
            vec![Ok("evening update"), Ok("afternoon market view")],
            vec![PlatformCadence::default_for(Platform::LinkedIn)],
            1,
        );

        let start = friday().and_hms_opt(12, 30, 0).unwrap();
        let mut progress = DailyProgress::resume_at(start, &campaign.cadences);
        assert!(campaign.run_due(start, &mut progress).await.is_empty());

        let evening = friday().and_hms_opt(17, 5, 0).unwrap();
        let produced = campaign.run_due(evening, &mut progress).await;
        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].time, NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test]
    async fn test_slots_carry_distinct_content_types() {
        let (campaign, scripted, _store) = campaign(
            vec![
                Ok("morning thought leadership"),
                Ok("midday case study on treasury"),
                Ok("evening market analysis recap"),
            ],
            vec![PlatformCadence::default_for(Platform::LinkedIn)],
            1,
        );
        let mut progress = DailyProgress::default();

        let evening = friday().and_hms_opt(18, 0, 0).unwrap();
        assert_eq!(campaign.run_due(evening, &mut progress).await.len(), 3);

        let types: Vec<_> = scripted
            .requests()
            .into_iter()
            .map(|r| r.content_type.unwrap())
            .collect();
        assert_eq!(
            types,
            vec!["thought_leadership", "case_studies", "market_analysis"]
        );
    }
}
