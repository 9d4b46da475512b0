//! Fill in `published_at` and `author_index` on blog rows created before
//! those columns were populated
//!
//! Usage: `backfill_published_at` (reads `DATABASE_PATH`)

use portfolio_backend::config::Config;
use portfolio_backend::db::Database;
use portfolio_backend::services::blogs::{author_index, backfill_published_at};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    println!("Scanning database: {}", config.database.path);

    let db = Database::new(&config.database.path).await?;
    let posts = db.blogs_missing_published_at().await?;
    println!("Found {} posts to fix", posts.len());

    let mut failed = 0;
    for post in &posts {
        let published_at = backfill_published_at(post);
        let index = author_index(&post.author, &published_at);
        match db.set_published_at(&post.id, &published_at, &index).await {
            Ok(()) => println!("   ✓ Fixed blog {}: published_at = {}", post.id, published_at),
            Err(e) => {
                failed += 1;
                eprintln!("   ✗ Error fixing blog {}: {}", post.id, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} posts could not be fixed", failed, posts.len());
    }
    println!("Backfill complete!");
    Ok(())
}
