//! Sample library content for trying out the UI without recording anything

use crate::catalog::{VodCatalog, VodError};
use chrono::Utc;
use rand::{Rng, RngCore};
use squadov_vod::VodMetadata;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const GAMES: [(&str, &str); 5] = [
    ("Valorant", "valorant"),
    ("Counter-Strike 2", "cs2"),
    ("League of Legends", "lol"),
    ("Overwatch 2", "overwatch2"),
    ("Rocket League", "rocketleague"),
];

const TITLES: [&str; 10] = [
    "Epic Clutch Win",
    "Amazing Highlight Reel",
    "Ranked Gameplay",
    "Tournament Match",
    "Practice Session",
    "Team Strategy Discussion",
    "Solo Queue Grind",
    "Championship Game",
    "Casual Fun Match",
    "Tutorial Walkthrough",
];

const TAG_POOL: [&str; 16] = [
    "highlight", "clutch", "ace", "winning", "ranked", "casual", "team", "solo",
    "practice", "tournament", "funny", "epic", "strategy", "tutorial", "review", "analysis",
];

const PLACEHOLDER_BYTES: usize = 1024;

fn pick<'a, R: Rng>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options[rng.random_range(0..options.len())]
}

/// Build `count` plausible VOD records for `user_id`
///
/// Records have no media yet; `file_size` is a made-up figure until saved.
pub fn generate_sample_vods<R: Rng>(rng: &mut R, user_id: &str, count: usize) -> Vec<VodMetadata> {
    (0..count)
        .map(|i| {
            let (game_name, game_id) = GAMES[rng.random_range(0..GAMES.len())];
            let title = pick(rng, &TITLES);

            let mut meta = VodMetadata::new();
            meta.user_id = user_id.to_string();
            meta.game_id = game_id.to_string();
            meta.game_name = game_name.to_string();
            meta.title = format!("{} #{}", title, i + 1);
            meta.description =
                format!("Sample VOD recording from {}. This is demonstration data.", game_name);
            meta.created_at = Utc::now() - chrono::Duration::days(rng.random_range(0..30));
            meta.duration = Duration::from_secs(60 * rng.random_range(5..45));
            meta.file_size = rng.random_range(100_000_000..2_000_000_000);
            meta.is_favorite = rng.random_bool(0.3);
            meta.tags = random_tags(rng);

            match game_id {
                "valorant" => {
                    meta.set_property("rank", pick(rng, &["Iron", "Bronze", "Silver", "Gold", "Platinum", "Diamond"]));
                    meta.set_property("map", pick(rng, &["Bind", "Haven", "Split", "Ascent", "Icebox", "Breeze"]));
                    meta.set_property("agent", pick(rng, &["Jett", "Phoenix", "Sage", "Sova", "Cypher", "Reyna"]));
                }
                "cs2" => {
                    meta.set_property(
                        "rank",
                        pick(rng, &["Silver", "Gold Nova", "Master Guardian", "Legendary Eagle", "Supreme", "Global Elite"]),
                    );
                    meta.set_property("map", pick(rng, &["Dust2", "Mirage", "Inferno", "Cache", "Overpass", "Vertigo"]));
                }
                "lol" => {
                    meta.set_property("rank", pick(rng, &["Bronze", "Silver", "Gold", "Platinum", "Diamond", "Master"]));
                    meta.set_property("champion", pick(rng, &["Jinx", "Yasuo", "Zed", "Ahri", "Thresh", "Lee Sin"]));
                    meta.set_property("role", pick(rng, &["Top", "Jungle", "Mid", "ADC", "Support"]));
                }
                _ => {}
            }

            meta
        })
        .collect()
}

/// Zero to three distinct tags
fn random_tags<R: Rng>(rng: &mut R) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for _ in 0..rng.random_range(0..4) {
        let tag = pick(rng, &TAG_POOL);
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Generate sample VODs and save them, each backed by a 1 KiB placeholder file
///
/// Placeholders are written to `scratch_dir` and copied into the catalog.
/// Returns the ids that were saved.
pub async fn seed_catalog(
    catalog: &dyn VodCatalog,
    scratch_dir: &Path,
    user_id: &str,
    count: usize,
) -> Result<Vec<String>, VodError> {
    let samples = generate_sample_vods(&mut rand::rng(), user_id, count);
    tokio::fs::create_dir_all(scratch_dir).await?;

    let mut ids = Vec::with_capacity(samples.len());
    for mut meta in samples {
        let placeholder = scratch_dir.join(format!("{}.mp4", meta.id));
        let mut data = vec![0u8; PLACEHOLDER_BYTES];
        rand::rng().fill_bytes(&mut data);
        tokio::fs::write(&placeholder, data).await?;

        let id = catalog.save(&placeholder, &mut meta).await?;
        tokio::fs::remove_file(&placeholder).await?;
        ids.push(id);
    }

    info!("🌱 Seeded {} demo VODs for {}", ids.len(), user_id);
    Ok(ids)
}
