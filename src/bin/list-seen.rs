use clap::Parser;
use itertools::Itertools;
use job_watcher::store::SqliteStorage;
use job_watcher::{Settings, Storage};

/// Print every posting already reported.
#[derive(Debug, Parser)]
struct Args {
    /// Sqlite file with the seen postings, overrides DATABASE_PATH
    #[arg(short, long)]
    database: Option<String>,

    /// Only postings of this company
    #[arg(long)]
    company: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let settings = Settings::from_env();
    let database = args.database.as_deref().unwrap_or(&settings.database_path);
    let storage = SqliteStorage::new(database).await?;

    let records = storage.seen_get().await?;
    let by_company = records
        .iter()
        .filter(|r| args.company.as_ref().map_or(true, |c| &r.company == c))
        .map(|r| (r.company.as_str(), r))
        .into_group_map();

    for (company, records) in by_company.into_iter().sorted_by_key(|(c, _)| *c) {
        println!("{} ({})", company, records.len());
        for r in records {
            println!("  {}  {}", r.title, r.url);
        }
    }
    println!("Total seen: {}", storage.seen_count().await?);

    Ok(())
}
