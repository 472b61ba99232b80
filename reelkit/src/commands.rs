use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use reelkit_core::{
    bootstrap::Services,
    models::{Episode, Film, LoadLinksState, ProviderId, ProviderMetadata, SearchQuery, TestResult},
    service::{HeadlessPlayer, TestRunOutcome},
};

pub fn list_providers(services: &Services) -> Result<()> {
    let providers = services.registry.list();
    if providers.is_empty() {
        println!("No providers configured");
    }
    for provider in providers {
        println!("{}\t{}\t{}", provider.id, provider.name, provider.version);
    }
    Ok(())
}

pub async fn run_provider_tests(services: &Services, ids: &[String], json: bool) -> Result<()> {
    let providers: Vec<ProviderMetadata> = if ids.is_empty() {
        services.registry.list()
    } else {
        ids.iter()
            .map(|id| {
                services
                    .registry
                    .metadata(&ProviderId::new(id.as_str()))
                    .ok_or_else(|| anyhow!("Provider {id} is not configured"))
            })
            .collect::<Result<_>>()?
    };

    let job = services.test_job.clone();
    let run = job.invoke(&providers);
    tokio::pin!(run);

    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling provider tests");
            job.cancel();
            (&mut run).await
        }
    };

    let results = job.results().snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        results.iter().for_each(print_result);
    }

    if outcome == TestRunOutcome::Cancelled {
        bail!("Provider tests cancelled");
    }
    Ok(())
}

fn print_result(result: &TestResult) {
    println!(
        "{} ({}) score {:.0}%",
        result.provider.name,
        result.provider.id,
        result.score() * 100.0
    );
    for output in &result.outputs {
        println!(
            "  [{}] {} ({} ms) {}",
            output.status,
            output.name,
            output.time_taken.as_millis(),
            output.short_log.as_deref().unwrap_or_default()
        );
    }
}

#[derive(Debug)]
pub struct PlayRequest {
    pub provider_id: ProviderId,
    pub film_id: String,
    pub season: u32,
    pub episode: u32,
    pub queue_next: bool,
}

pub async fn play(services: &Services, request: PlayRequest) -> Result<()> {
    let api = services
        .registry
        .get(&request.provider_id)
        .ok_or_else(|| anyhow!("Provider {} is not configured", request.provider_id))?;

    let query = SearchQuery {
        id: Some(request.film_id.clone()),
        ..SearchQuery::default()
    };
    let summary = api
        .search(&query)
        .await?
        .results
        .into_iter()
        .find(|f| f.id.as_str() == request.film_id)
        .ok_or_else(|| anyhow!("Film {} not found on {}", request.film_id, request.provider_id))?;
    let film = api.get_film_details(&summary).await?;

    let episode = match &film {
        Film::Movie(_) => None,
        Film::TvShow(show) => Some(
            show.episode(request.season, request.episode)
                .cloned()
                .unwrap_or_else(|| Episode::synthetic(film.id(), request.season, request.episode)),
        ),
    };
    info!(
        film_id = %film.id(),
        kind = %film.kind(),
        episode = ?episode.as_ref().map(|e| &e.id),
        "Starting playback session"
    );

    let player = Arc::new(HeadlessPlayer::new());
    let session = services.session(film, request.provider_id, episode, player.clone());
    let mut ui = session.ui_state();
    let mut next = session.next_episode_updates();
    let _load = session.start()?;

    let wait = Duration::from_secs(services.config().resolver.timeout_seconds + 5);
    let state = {
        let state = tokio::time::timeout(
            wait,
            ui.wait_for(|s| matches!(s.load_links_state, LoadLinksState::Success | LoadLinksState::Error(_))),
        )
        .await??;
        state.load_links_state.clone()
    };

    if let LoadLinksState::Error(cause) = state {
        session.close().await?;
        bail!("Link resolution failed: {cause}");
    }

    if let Some(item) = player.current_item() {
        println!("{}", serde_json::to_string_pretty(&item)?);
    }

    if request.queue_next && session.film().is_tv_show() {
        tokio::time::timeout(wait, next.changed()).await??;
        match session.next_episode() {
            Some(episode) => {
                session.on_queue_next_episode().await?;
                println!(
                    "Queued {} ({} media items loaded)",
                    episode.id,
                    player.items().len()
                );
            }
            None => println!("No next episode"),
        }
    }

    session.close().await?;
    Ok(())
}
