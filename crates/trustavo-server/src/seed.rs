//! Demo content for a fresh node (`SEED_DEMO=true`).

use tracing::info;
use trustavo_store::{Result, Trustavo};

struct DemoIdentity {
    nickname: &'static str,
    languages: &'static [&'static str],
    signals: &'static [(&'static str, Option<&'static str>)],
}

const DEMO: &[DemoIdentity] = &[
    DemoIdentity {
        nickname: "Alice Chen",
        languages: &["English", "Chinese", "Spanish"],
        signals: &[(
            "Just discovered this amazing design framework! The color system is so well \
             thought out. 🎨\n\nWhat tools do you all use for design system management? \
             #design #tools",
            Some("https://picsum.photos/800/400"),
        )],
    },
    DemoIdentity {
        nickname: "Bob Wilson",
        languages: &["English", "French"],
        signals: &[(
            "The future of web development is edge computing. Cloudflare Workers are \
             changing the game! ⚡\n\nZero cold starts, global distribution, and incredible \
             performance. #tech #performance",
            None,
        )],
    },
];

/// Create the demo identities and their signals. Returns how many signals
/// were posted.
pub fn seed_demo(app: &Trustavo) -> Result<usize> {
    let mut posted = 0;
    for demo in DEMO {
        let languages: Vec<String> = demo.languages.iter().map(|l| l.to_string()).collect();
        let identity = app.identities().create(demo.nickname, &languages)?;
        for (content, image_url) in demo.signals {
            app.signals().post(&identity.id, content, *image_url)?;
            posted += 1;
        }
    }

    info!(identities = DEMO.len(), signals = posted, "Seeded demo content");
    Ok(posted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_demo() {
        let app = Trustavo::with_system_clock();
        assert_eq!(seed_demo(&app).unwrap(), 2);

        let feed = app.feed().global_timeline(None);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].author_name, "Bob Wilson");
        assert_eq!(feed[1].signal.tags, vec!["design", "tools"]);
        assert!(feed[1].signal.content.chars().count() <= 500);
    }
}
