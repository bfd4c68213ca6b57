use capsule_arena::capsule::layout_snapshot;
use capsule_arena::feedback::{CountingFeedback, ImpactFeedback};
use capsule_arena::logger::Logger;
use capsule_arena::post::{load_posts, select_month, MonthKey, Post, MONTH_POST_LIMIT};
use capsule_arena::{Arena, ArenaConfigs, PostId};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};

const CONTAINER_WIDTH: f32 = 320.0;
const CONTAINER_HEIGHT: f32 = 640.0;
const SETTLE_TIME: Duration = Duration::from_secs(4);

/// Usage: `capsule-arena [configs.json] [posts.json]`
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    Logger::init();

    let mut args = std::env::args().skip(1);
    let configs = match args.next() {
        Some(path) => ArenaConfigs::load(path)?,
        None => ArenaConfigs::default(),
    };
    let posts: Vec<Arc<Post>> = match args.next() {
        Some(path) => load_posts(path)?.into_iter().map(Arc::new).collect(),
        None => demo_posts(),
    };

    let month = MonthKey::of(Utc::now());
    let posts = select_month(&posts, month, MONTH_POST_LIMIT);
    log::info!("{} posts in {}", posts.len(), month.label());

    let feedback = Arc::new(CountingFeedback::default());
    let mut arena = Arena::new(configs, feedback.clone() as Arc<dyn ImpactFeedback>);
    if !arena.mount(CONTAINER_WIDTH, CONTAINER_HEIGHT) {
        anyhow::bail!("container has no area");
    }
    arena.populate(&posts);

    let mut snapshots = arena
        .snapshots()
        .ok_or_else(|| anyhow::anyhow!("arena not mounted"))?;
    let deadline = Instant::now() + SETTLE_TIME;
    let mut report = time::interval(Duration::from_secs(1));
    while Instant::now() < deadline {
        report.tick().await;
        let snapshot = snapshots.borrow_and_update().clone();
        let sleeping = arena
            .with_world(|world| {
                snapshot
                    .capsules
                    .iter()
                    .filter(|view| {
                        world
                            .capsule_state(&view.post_id)
                            .map_or(false, |state| state.sleeping)
                    })
                    .count()
            })
            .unwrap_or(0);
        log::info!(
            "frame {}: {} capsules, {} sleeping, {} impacts",
            snapshot.frame,
            snapshot.len(),
            sleeping,
            feedback.played()
        );
    }

    let radius = arena.configs().capsule_configs.radius;
    let snapshot = snapshots.borrow().clone();
    for sprite in layout_snapshot(&snapshot, radius) {
        log::info!(
            "{} at ({:.0}, {:.0}) {}",
            sprite.post_id,
            sprite.left,
            sprite.top,
            sprite.transform()
        );
    }

    // Tap the most recently dropped capsule.
    if let Some(view) = snapshot.capsules.last() {
        let now = Instant::now();
        arena.pointer_down(view.x, view.y, now);
        match arena.pointer_up(view.x, view.y, now + Duration::from_millis(80)) {
            Some(selection) => {
                for (platform, link) in selection.post.links() {
                    log::info!("{}: {}", platform, link);
                }
            }
            None => log::info!("Tap missed"),
        }
    }

    arena.teardown();
    Ok(())
}

fn demo_posts() -> Vec<Arc<Post>> {
    let now = Utc::now();
    let songs = [
        ("Blue in Green", "Miles Davis"),
        ("Teardrop", "Massive Attack"),
        ("Pink + White", "Frank Ocean"),
        ("Hyperballad", "Björk"),
        ("Nightcall", "Kavinsky"),
        ("", "Unknown"),
    ];

    songs
        .iter()
        .enumerate()
        .map(|(i, (title, artist))| {
            let created_at = (now - ChronoDuration::hours(i as i64)).max(month_start(now));
            Arc::new(Post {
                id: PostId::new(format!("demo-{}", i)),
                user_id: capsule_arena::ids::UserId("demo".to_owned()),
                title: title.to_string(),
                artist: artist.to_string(),
                album_art_url: String::new(),
                description: String::new(),
                spotify_link: Some(format!("https://open.spotify.com/track/demo{}", i)),
                apple_music_link: None,
                youtube_link: None,
                created_at,
                profiles: None,
                likes_count: Some(0),
                is_liked: Some(false),
            })
        })
        .collect()
}

fn month_start(now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    MonthKey::of(now).range().0
}
