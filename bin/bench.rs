use clap::{Arg, ArgAction, Command};
use company_catalog::{CatalogService, CompanyService, MemoryRepository};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("bench")
        .about("Bootstrap a company file into the in-memory store and report throughput")
        .arg(
            Arg::new("path")
                .long("path")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(Arg::new("charset").long("charset").default_value("utf-8"))
        .arg(
            Arg::new("merge")
                .long("merge")
                .help("Also replay the file as a website merge")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow::anyhow!("Provide --path <file>"))?;
    let label = matches.get_one::<String>("charset").map(String::as_str).unwrap_or("utf-8");
    let charset = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| anyhow::anyhow!("unknown charset label: {label}"))?;

    let repo = Arc::new(MemoryRepository::new());
    let service = CatalogService::new(repo.clone());

    let start = Instant::now();
    let summary = service.bootstrap(path, charset).await?;
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "source={} delimiter={:?} rows={} accepted={} rejected={} stored={}\nelapsed={:.2}s rows/sec={:.0}",
        path.display(),
        summary.delimiter,
        summary.row_count,
        summary.accepted,
        summary.rejected,
        repo.count()?,
        elapsed,
        summary.row_count as f64 / elapsed
    );

    if matches.get_flag("merge") {
        let mut reader = company_catalog::reader_from_path(path, charset).await?;
        let start = Instant::now();
        let summary = service.merge_websites(&mut *reader).await?;
        let elapsed = start.elapsed().as_secs_f64();
        println!(
            "merge rows={} accepted={} rejected={}\nelapsed={:.2}s rows/sec={:.0}",
            summary.row_count,
            summary.accepted,
            summary.rejected,
            elapsed,
            summary.row_count as f64 / elapsed
        );
    }
    Ok(())
}
