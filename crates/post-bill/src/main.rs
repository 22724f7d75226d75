//! Daily posting job: fetch recent bills from Congress.gov, pick the newest
//! one we haven't covered, summarize it with Claude, store it, and tweet the
//! digest. Designed to run on a schedule (see .github/workflows).

use anyhow::{Context, Result};
use clap::Parser;
use shared::{
    compose_tweet, BillSummary, BillSummarizer, Config, CongressClient, NewBill, Store,
    TwitterClient, TwitterKeys,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "post-bill")]
#[command(about = "Fetch, summarize, and post today's congressional bill")]
struct Args {
    /// How many recently-updated bills to consider
    #[arg(short, long, default_value = "20")]
    limit: usize,

    /// Print what would be posted without writing or tweeting
    #[arg(long)]
    dry_run: bool,

    /// Store the bill but skip the tweet
    #[arg(long)]
    skip_twitter: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = Config::from_env()?;

    let store = Store::connect_lazy(&config.database_url)?;
    if !args.dry_run {
        store.migrate().await.context("Failed to run migrations")?;
    }

    println!("\n📚 Fetching recent bills from Congress.gov...");
    let congress = CongressClient::new(config.congress_api_key)?;
    let listings = congress
        .fetch_recent_bills(args.limit)
        .await
        .context("Failed to fetch recent bills")?;

    if listings.is_empty() {
        println!("No recently updated bills found.");
        return Ok(());
    }
    println!("✓ Found {} bills", listings.len());

    // Newest-first; take the first bill we haven't already posted
    let mut candidate = None;
    for listing in &listings {
        let posted = if args.dry_run {
            store.is_posted(&listing.slug()).await.unwrap_or(false)
        } else {
            store
                .is_posted(&listing.slug())
                .await
                .context("Failed to check posted state")?
        };
        if !posted {
            candidate = Some(listing);
            break;
        }
    }

    let Some(listing) = candidate else {
        println!("All {} recent bills have already been posted.", listings.len());
        return Ok(());
    };

    let slug = listing.slug();
    println!("\n🏛️ Selected: {} ({})", listing.title, slug);

    println!("\n📖 Fetching bill summary text...");
    let text = congress
        .fetch_bill_summary_text(listing)
        .await
        .context("Failed to fetch bill summary text")?;
    let text = match text {
        Some(text) => {
            println!("✓ Got CRS summary ({} chars)", text.len());
            text
        }
        None => {
            println!("⚠ No CRS summary yet, summarizing from the title alone");
            listing.title.clone()
        }
    };

    println!("\n🤖 Summarizing with Claude...");
    let summarizer = BillSummarizer::new(config.anthropic_api_key)?;
    let summary = summarizer.summarize_bill(&listing.title, &text).await?;

    let (overview, points) = match summary {
        BillSummary::Success { overview, points } => {
            println!("✓ Summary ready ({} points)", points.len());
            (Some(overview), points)
        }
        BillSummary::Insufficient => {
            println!("⚠ Bill text too thin to summarize; posting without a digest");
            (None, Vec::new())
        }
        BillSummary::Failed(reason) => {
            anyhow::bail!("Summarization failed: {}", reason);
        }
    };

    let latest_action = listing.latest_action.as_ref();
    let new_bill = NewBill {
        slug: slug.clone(),
        congress: listing.congress,
        bill_type: listing.bill_type.clone(),
        number: listing
            .number
            .parse()
            .with_context(|| format!("Non-numeric bill number: {}", listing.number))?,
        title: listing.title.clone(),
        latest_action: latest_action.and_then(|a| a.text.clone()),
        latest_action_date: latest_action.and_then(|a| a.action_date.clone()),
        source_url: listing.source_url(),
        summary_overview: overview,
        summary_points: points,
    };

    if args.dry_run {
        let preview = preview_bill(&new_bill, &config.site_base_url);
        println!("\n--- dry run, nothing written ---\n{}", preview);
        return Ok(());
    }

    println!("\n💾 Storing bill...");
    let bill = store
        .upsert_bill(&new_bill)
        .await
        .context("Failed to store bill")?;
    println!("✓ Stored as id {}", bill.id);

    if args.skip_twitter {
        println!("\n⏭ Skipping tweet (--skip-twitter).");
        return Ok(());
    }

    let Some(keys) = TwitterKeys::from_env()? else {
        println!("\n⏭ No Twitter credentials configured; bill stored but not posted.");
        return Ok(());
    };

    println!("\n🐦 Posting to Twitter...");
    let tweet = compose_tweet(&bill, &config.site_base_url);
    let twitter = TwitterClient::new(keys)?;
    // A failed tweet leaves the bill unposted so the next run retries it
    let tweet_url = twitter
        .post_tweet(&tweet)
        .await
        .context("Failed to post tweet")?;
    store
        .mark_posted(&bill.slug, &tweet_url)
        .await
        .context("Failed to mark bill as posted")?;
    info!(slug = %bill.slug, url = %tweet_url, "bill posted");

    println!("\n✅ Done! Posted {}: {}", bill.slug, tweet_url);

    Ok(())
}

fn preview_bill(bill: &NewBill, site_base_url: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("slug:     {}\n", bill.slug));
    out.push_str(&format!("title:    {}\n", bill.title));
    if let Some(overview) = &bill.summary_overview {
        out.push_str(&format!("overview: {}\n", overview));
    }
    for point in &bill.summary_points {
        out.push_str(&format!("  - {}\n", point));
    }
    out.push_str(&format!(
        "link:     {}/b/{}\n",
        site_base_url.trim_end_matches('/'),
        bill.slug
    ));
    out
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}
